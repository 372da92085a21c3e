/*******************************************************************************
 * Copyright (c) 2020 Association Cénotélie (cenotelie.fr)
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Lesser General Public License as
 * published by the Free Software Foundation, either version 3
 * of the License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General
 * Public License along with this program.
 * If not, see <http://www.gnu.org/licenses/>.
 ******************************************************************************/

//! Module for the grammar facts consumed by the search core
//!
//! The generator computes these facts (rules, item array, states,
//! transitions, reductions, first sets, nullability) before any
//! counterexample work starts; they are read-only inputs here.

use std::fmt::Write as FmtWrite;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::sets::BitSet;

/// The unique identifier of a symbol; tokens come first, then variables
pub type SymbolId = usize;
/// The unique identifier of a rule
pub type RuleId = usize;
/// The unique identifier of an LR state
pub type StateId = usize;
/// A position within the flattened rule-item array
pub type ItemIndex = usize;

/// Symbol ID of the end-of-input marker
pub const SID_END: SymbolId = 0;

/// The associativity of a symbol
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Associativity {
    /// No associativity was declared
    Undefined,
    /// The symbol associates to the left
    Left,
    /// The symbol associates to the right
    Right
}

/// A grammar symbol (terminal or variable)
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// The symbol's name
    pub name: String,
    /// The symbol's declared precedence, if any
    pub prec: Option<i32>,
    /// The symbol's associativity
    pub assoc: Associativity
}

impl Symbol {
    /// Creates a new symbol without precedence
    pub fn new(name: &str) -> Symbol {
        Symbol {
            name: name.to_string(),
            prec: None,
            assoc: Associativity::Undefined
        }
    }

    /// Creates a new symbol with an explicit precedence and associativity
    pub fn with_prec(name: &str, prec: i32, assoc: Associativity) -> Symbol {
        Symbol {
            name: name.to_string(),
            prec: Some(prec),
            assoc
        }
    }
}

/// A grammar rule, its right-hand side being a span of the item array
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// The identifier of the left-hand side variable
    pub lhs: SymbolId,
    /// The position of the first right-hand side entry in the item array
    pub rhs: ItemIndex
}

/// A transition of an LR state
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// The symbol accessing the target state
    pub symbol: SymbolId,
    /// The target state
    pub target: StateId,
    /// Whether conflict resolution disabled this transition
    pub disabled: bool
}

/// A reduction of an LR state
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    /// The rule to reduce with
    pub rule: RuleId,
    /// The terminals to reduce on, over the whole symbol space
    pub lookahead: Option<BitSet>
}

/// An LR state as computed by the generator
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// The identifier of this state
    pub id: StateId,
    /// The symbol on which this state is reached
    pub accessing_symbol: SymbolId,
    /// The kernel items, as positions of their dots in the item array
    pub items: Vec<ItemIndex>,
    /// The transitions out of this state
    pub transitions: Vec<Transition>,
    /// The reductions of this state
    pub reductions: Vec<Reduction>
}

impl State {
    /// Gets the reduction for the given rule, if the state has one
    pub fn reduction_on(&self, rule: RuleId) -> Option<&Reduction> {
        self.reductions.iter().find(|red| red.rule == rule)
    }
}

/// The read-only facts about a grammar and its LALR(1) automaton
///
/// The item array `ritem` is the concatenation of all rule right-hand
/// sides; a non-negative entry is a symbol identifier, a negative entry
/// `v` closes the right-hand side of rule `-1 - v`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grammar {
    /// The number of terminal symbols
    pub ntokens: usize,
    /// The number of variable symbols
    pub nvars: usize,
    /// All symbols, terminals first
    pub symbols: Vec<Symbol>,
    /// The flattened rule-item array
    pub ritem: Vec<i32>,
    /// The rules, rule 0 being the augmented start rule
    pub rules: Vec<Rule>,
    /// The LR states
    pub states: Vec<State>,
    /// For each variable, the variables that can begin its derivations
    /// (reflexive and transitive), over the variable space
    pub firsts: Vec<BitSet>,
    /// For each variable, whether it derives the empty string
    pub nullable: Vec<bool>
}

impl Grammar {
    /// Gets the total number of symbols
    pub fn nsyms(&self) -> usize {
        self.ntokens + self.nvars
    }

    /// Determines whether the given symbol is a terminal
    pub fn is_token(&self, sid: SymbolId) -> bool {
        sid < self.ntokens
    }

    /// Determines whether the given symbol is a variable
    pub fn is_variable(&self, sid: SymbolId) -> bool {
        sid >= self.ntokens
    }

    /// Gets the index of a variable within the variable space
    pub fn var_index(&self, sid: SymbolId) -> usize {
        debug_assert!(self.is_variable(sid));
        sid - self.ntokens
    }

    /// Gets the symbol at the given item position, if the entry is not a
    /// rule-end marker
    pub fn item_symbol(&self, pos: ItemIndex) -> Option<SymbolId> {
        let value = self.ritem[pos];
        if value >= 0 {
            Some(value as SymbolId)
        } else {
            None
        }
    }

    /// Gets the rule closed by the marker at the given item position
    pub fn item_rule_end(&self, pos: ItemIndex) -> Option<RuleId> {
        let value = self.ritem[pos];
        if value < 0 {
            Some((-1 - value) as RuleId)
        } else {
            None
        }
    }

    /// Gets the rule owning the given item position by walking forward to
    /// the end of its right-hand side
    pub fn rule_of_item(&self, pos: ItemIndex) -> RuleId {
        let mut current = pos;
        while self.ritem[current] >= 0 {
            current += 1;
        }
        (-1 - self.ritem[current]) as RuleId
    }

    /// Determines whether the dot at the given position starts a
    /// right-hand side
    pub fn is_rule_start(&self, pos: ItemIndex) -> bool {
        pos == 0 || self.ritem[pos - 1] < 0
    }

    /// Determines whether the given variable is nullable
    pub fn is_nullable(&self, sid: SymbolId) -> bool {
        self.nullable[self.var_index(sid)]
    }

    /// Gets the name of the given symbol
    pub fn symbol_name(&self, sid: SymbolId) -> &str {
        &self.symbols[sid].name
    }

    /// Renders the dotted item at the given position
    pub fn item_to_string(&self, pos: ItemIndex) -> String {
        let rule = self.rule_of_item(pos);
        let mut result = String::new();
        let _ = write!(result, "{} ->", self.symbol_name(self.rules[rule].lhs));
        let mut current = self.rules[rule].rhs;
        while self.ritem[current] >= 0 {
            if current == pos {
                result.push_str(" .");
            }
            let _ = write!(result, " {}", self.symbol_name(self.ritem[current] as SymbolId));
            current += 1;
        }
        if current == pos {
            result.push_str(" .");
        }
        result
    }

    /// Checks that these facts have the shape the searches assume
    pub fn check(&self) -> Result<(), Error> {
        if self.symbols.len() != self.nsyms() {
            return Err(Error::MalformedGrammar(format!(
                "expected {} symbols, got {}",
                self.nsyms(),
                self.symbols.len()
            )));
        }
        if self.firsts.len() != self.nvars || self.nullable.len() != self.nvars {
            return Err(Error::MalformedGrammar(String::from(
                "firsts and nullable must cover every variable"
            )));
        }
        match self.ritem.last() {
            Some(value) if *value < 0 => {}
            _ => {
                return Err(Error::MalformedGrammar(String::from(
                    "the item array must close its last rule"
                )))
            }
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.lhs >= self.nsyms() || !self.is_variable(rule.lhs) {
                return Err(Error::MalformedGrammar(format!(
                    "rule {} has an invalid left-hand side",
                    index
                )));
            }
            if rule.rhs >= self.ritem.len() {
                return Err(Error::MalformedGrammar(format!(
                    "rule {} points outside the item array",
                    index
                )));
            }
        }
        for state in self.states.iter() {
            for transition in state.transitions.iter() {
                if transition.target >= self.states.len() {
                    return Err(Error::MalformedGrammar(format!(
                        "state {} has a transition to unknown state {}",
                        state.id, transition.target
                    )));
                }
            }
            for reduction in state.reductions.iter() {
                if reduction.rule >= self.rules.len() {
                    return Err(Error::MalformedGrammar(format!(
                        "state {} reduces unknown rule {}",
                        state.id, reduction.rule
                    )));
                }
            }
        }
        Ok(())
    }
}
