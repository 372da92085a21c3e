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

//! Module for the state-item graph
//!
//! A state item pairs an LR state with one dotted item inside it. The graph
//! connects state items through transition edges (shifting the dot over its
//! next symbol) and production edges (from an item whose dot precedes a
//! variable to the items starting that variable's rules in the same state),
//! together with the reverses of both relations. It is built once per run
//! and is read-only afterwards; every search of this crate runs over it.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as FmtWrite;
use std::io;
use std::rc::Rc;
use std::time::Instant;

use log::debug;

use crate::errors::Error;
use crate::grammar::{Grammar, ItemIndex, StateId, SymbolId};
use crate::sets::BitSet;

/// The index of a state item within the graph
pub type StateItemIdx = usize;

/// The target of a state item's transition edge
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransitionTarget {
    /// The state item reached by shifting the dot over the next symbol
    To(StateItemIdx),
    /// No transition: the dot is at the end of the right-hand side
    None,
    /// The transition was disabled by conflict resolution and pruned
    Disabled
}

impl TransitionTarget {
    /// Gets the target state item, if the edge is enabled
    pub fn target(self) -> Option<StateItemIdx> {
        match self {
            TransitionTarget::To(target) => Some(target),
            _ => None
        }
    }
}

/// An LR state paired with one dotted item inside it
#[derive(Debug, Clone)]
pub struct StateItem {
    /// The state containing the item
    pub state: StateId,
    /// The position of the item's dot in the item array
    pub item: ItemIndex,
    /// The terminals that may follow this position
    ///
    /// Reduce items carry the lookahead of their reduction; other items
    /// share the lookahead of the reduce items they reach through
    /// transitions.
    pub lookahead: Option<Rc<BitSet>>
}

/// The state-item graph over a grammar's LALR(1) automaton
pub struct StateItemGraph<'g> {
    /// The grammar facts this graph was built from
    grammar: &'g Grammar,
    /// Whether verbose diagnostics are enabled
    trace: bool,
    /// All state items, kernel items of each state first
    state_items: Vec<StateItem>,
    /// For each state, the index of its first state item
    state_item_map: Vec<StateItemIdx>,
    /// The transition edge of each state item
    trans: Vec<TransitionTarget>,
    /// For each state item, the state items with a transition into it
    rev_trans: Vec<BitSet>,
    /// For each state item with a dot before a variable, the production
    /// items of that variable in the same state; groups are shared between
    /// the items of a state producing the same variable
    prods: HashMap<StateItemIdx, Rc<BitSet>>,
    /// For each production item, the state items with a production edge
    /// into it
    rev_prods: HashMap<StateItemIdx, Rc<BitSet>>,
    /// For each variable, the terminals that can begin its derivations
    tfirsts: Vec<BitSet>
}

impl<'g> StateItemGraph<'g> {
    /// Builds the graph for the given grammar facts
    ///
    /// The build is single-shot: the returned graph is immutable and may
    /// be shared by any number of searches.
    pub fn build(grammar: &'g Grammar, trace: bool) -> Result<StateItemGraph<'g>, Error> {
        grammar.check()?;
        let start = Instant::now();
        let mut graph = StateItemGraph {
            grammar,
            trace,
            state_items: Vec::new(),
            state_item_map: Vec::new(),
            trans: Vec::new(),
            rev_trans: Vec::new(),
            prods: HashMap::new(),
            rev_prods: HashMap::new(),
            tfirsts: Vec::new()
        };
        graph.init_state_items();
        graph.init_trans();
        graph.init_prods();
        graph.gen_lookaheads();
        graph.init_tfirsts();
        graph.prune_disabled_paths();
        debug!(
            "state-item graph: {} items built in {:?}",
            graph.state_items.len(),
            start.elapsed()
        );
        Ok(graph)
    }

    /// Builds the graph and writes the diagnostic report to the stream
    pub fn build_reported(
        grammar: &'g Grammar,
        trace: bool,
        out: &mut dyn io::Write
    ) -> Result<StateItemGraph<'g>, Error> {
        let graph = StateItemGraph::build(grammar, trace)?;
        graph.report(out)?;
        Ok(graph)
    }

    /// Gets the grammar facts this graph was built from
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Determines whether verbose diagnostics are enabled
    pub fn trace(&self) -> bool {
        self.trace
    }

    /// Gets the number of state items in the graph
    pub fn len(&self) -> usize {
        self.state_items.len()
    }

    /// Determines whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.state_items.is_empty()
    }

    /// Gets the state item at the given index
    pub fn state_item(&self, idx: StateItemIdx) -> &StateItem {
        &self.state_items[idx]
    }

    /// Gets the index of a state item from its state and the offset of the
    /// item within the state
    pub fn state_item_index(&self, state: StateId, offset: usize) -> StateItemIdx {
        self.state_item_map[state] + offset
    }

    /// Gets a state item from its state and the offset of the item within
    /// the state
    pub fn state_item_lookup(&self, state: StateId, offset: usize) -> &StateItem {
        &self.state_items[self.state_item_index(state, offset)]
    }

    /// Gets the indices of the state items belonging to the given state
    pub fn items_of_state(&self, state: StateId) -> std::ops::Range<StateItemIdx> {
        self.state_item_map[state]..self.state_item_map[state + 1]
    }

    /// Gets the transition edge of the given state item
    pub fn transition(&self, idx: StateItemIdx) -> TransitionTarget {
        self.trans[idx]
    }

    /// Gets the state items with a transition into the given one
    pub fn rev_transitions(&self, idx: StateItemIdx) -> &BitSet {
        &self.rev_trans[idx]
    }

    /// Gets the production edges out of the given state item
    pub fn prods_lookup(&self, idx: StateItemIdx) -> Option<&Rc<BitSet>> {
        self.prods.get(&idx)
    }

    /// Gets the production edges into the given state item
    pub fn rev_prods_lookup(&self, idx: StateItemIdx) -> Option<&Rc<BitSet>> {
        self.rev_prods.get(&idx)
    }

    /// Gets the terminals that can begin a derivation of the variable
    pub fn tfirsts(&self, sid: SymbolId) -> &BitSet {
        &self.tfirsts[self.grammar.var_index(sid)]
    }

    /// Determines whether the given state item is a reduce item
    pub fn is_reduce_item(&self, idx: StateItemIdx) -> bool {
        let pos = self.state_items[idx].item;
        self.grammar.item_symbol(pos).is_none()
    }

    /// Determines, using precedence and associativity, whether the next
    /// production is allowed from the current production
    pub fn production_allowed(&self, idx: StateItemIdx, next: StateItemIdx) -> bool {
        let grammar = self.grammar;
        let lhs1 = grammar.rules[grammar.rule_of_item(self.state_items[idx].item)].lhs;
        let lhs2 = grammar.rules[grammar.rule_of_item(self.state_items[next].item)].lhs;
        let sym1 = &grammar.symbols[lhs1];
        let sym2 = &grammar.symbols[lhs2];
        if let (Some(prec1), Some(prec2)) = (sym1.prec, sym2.prec) {
            // Do not expand if lower precedence.
            if prec1 > prec2 {
                return false;
            }
            // Do not expand if same precedence, but left-associative.
            if prec1 == prec2 && sym1.assoc == crate::grammar::Associativity::Left {
                return false;
            }
        }
        true
    }

    /// Renders the state item at the given index
    pub fn state_item_to_string(&self, idx: StateItemIdx) -> String {
        let si = &self.state_items[idx];
        let mut result = String::new();
        let _ = write!(
            result,
            "{}: {}",
            si.state,
            self.grammar.item_to_string(si.item)
        );
        if let Some(lookahead) = &si.lookahead {
            result.push_str(" {");
            for (count, sym) in lookahead.iter().enumerate() {
                if count >= 3 {
                    result.push_str("...");
                    break;
                }
                if count > 0 {
                    result.push_str(", ");
                }
                result.push_str(self.grammar.symbol_name(sym));
            }
            result.push('}');
        }
        result
    }

    /// Populates the state items of every state: kernel items first, then
    /// the production items found by closing the kernel
    fn init_state_items(&mut self) {
        let grammar = self.grammar;
        // rules grouped by left-hand side
        let mut derives: Vec<Vec<usize>> = vec![Vec::new(); grammar.nvars];
        for (rule, data) in grammar.rules.iter().enumerate() {
            derives[grammar.var_index(data.lhs)].push(rule);
        }
        let production_items: Vec<BitSet> = grammar
            .states
            .iter()
            .map(|state| {
                let mut vars = BitSet::new(grammar.nvars);
                for &pos in state.items.iter() {
                    if let Some(sym) = grammar.item_symbol(pos) {
                        if grammar.is_variable(sym) {
                            vars.add_others(&grammar.firsts[grammar.var_index(sym)]);
                        }
                    }
                }
                let mut items = BitSet::new(grammar.ritem.len());
                for var in vars.iter() {
                    for &rule in derives[var].iter() {
                        // the start of the augmented rule is not an item
                        if grammar.rules[rule].rhs > 0 {
                            items.add(grammar.rules[rule].rhs);
                        }
                    }
                }
                items
            })
            .collect();
        for (id, state) in grammar.states.iter().enumerate() {
            self.state_item_map.push(self.state_items.len());
            for &pos in state.items.iter() {
                let rule = grammar.rule_of_item(pos);
                let lookahead = state
                    .reduction_on(rule)
                    .and_then(|red| red.lookahead.as_ref())
                    .map(|la| Rc::new(la.clone()));
                self.state_items.push(StateItem {
                    state: id,
                    item: pos,
                    lookahead
                });
                self.trans.push(TransitionTarget::None);
            }
            for pos in production_items[id].iter() {
                let lookahead = if grammar.ritem[pos] < 0 {
                    // a rule with an empty right-hand side reduces here
                    let rule = grammar.rule_of_item(pos);
                    state
                        .reduction_on(rule)
                        .and_then(|red| red.lookahead.as_ref())
                        .map(|la| Rc::new(la.clone()))
                } else {
                    None
                };
                self.state_items.push(StateItem {
                    state: id,
                    item: pos,
                    lookahead
                });
                self.trans.push(TransitionTarget::None);
            }
        }
        self.state_item_map.push(self.state_items.len());
        self.rev_trans = vec![BitSet::new(self.state_items.len()); self.state_items.len()];
    }

    /// Connects every non-reduce state item to the item one past its dot
    /// in the destination state of the enabled transition
    fn init_trans(&mut self) {
        let grammar = self.grammar;
        for (id, state) in grammar.states.iter().enumerate() {
            let by_symbol: HashMap<SymbolId, StateId> = state
                .transitions
                .iter()
                .filter(|transition| !transition.disabled)
                .map(|transition| (transition.symbol, transition.target))
                .collect();
            for idx in self.state_item_map[id]..self.state_item_map[id + 1] {
                let pos = self.state_items[idx].item;
                let sym = match grammar.item_symbol(pos) {
                    Some(sym) => sym,
                    None => continue
                };
                let dst = match by_symbol.get(&sym) {
                    Some(dst) => *dst,
                    None => continue
                };
                for (offset, &dpos) in grammar.states[dst].items.iter().enumerate() {
                    if dpos == pos + 1 {
                        // the target item after transition on sym
                        let target = self.state_item_map[dst] + offset;
                        self.trans[idx] = TransitionTarget::To(target);
                        self.rev_trans[target].add(idx);
                        break;
                    }
                }
            }
        }
    }

    /// Builds the production edges and their reverses within every state
    fn init_prods(&mut self) {
        let grammar = self.grammar;
        let nstate_items = self.state_items.len();
        let mut rev_prods: HashMap<StateItemIdx, BitSet> = HashMap::new();
        for (id, state) in grammar.states.iter().enumerate() {
            // group the production items of the state by produced variable
            let mut closure_map: HashMap<SymbolId, BitSet> = HashMap::new();
            for idx in self.state_item_map[id] + state.items.len()..self.state_item_map[id + 1] {
                let pos = self.state_items[idx].item;
                let lhs = grammar.rules[grammar.rule_of_item(pos)].lhs;
                closure_map
                    .entry(lhs)
                    .or_insert_with(|| BitSet::new(nstate_items))
                    .add(idx);
            }
            let closure_map: HashMap<SymbolId, Rc<BitSet>> = closure_map
                .into_iter()
                .map(|(sym, group)| (sym, Rc::new(group)))
                .collect();
            for idx in self.state_item_map[id]..self.state_item_map[id + 1] {
                let pos = self.state_items[idx].item;
                let sym = match grammar.item_symbol(pos) {
                    Some(sym) if grammar.is_variable(sym) => sym,
                    _ => continue
                };
                if let Some(group) = closure_map.get(&sym) {
                    self.prods.insert(idx, Rc::clone(group));
                    for target in group.iter() {
                        rev_prods
                            .entry(target)
                            .or_insert_with(|| BitSet::new(nstate_items))
                            .add(idx);
                    }
                }
            }
        }
        self.rev_prods = rev_prods
            .into_iter()
            .map(|(idx, sources)| (idx, Rc::new(sources)))
            .collect();
    }

    /// Propagates the lookahead of every reduce item backwards over
    /// reverse transitions, sharing a single set along each chain
    fn gen_lookaheads(&mut self) {
        for idx in 0..self.state_items.len() {
            if !self.is_reduce_item(idx) {
                continue;
            }
            let lookahead = match &self.state_items[idx].lookahead {
                Some(lookahead) => Rc::clone(lookahead),
                None => continue
            };
            let mut queue = VecDeque::new();
            queue.push_back(idx);
            while let Some(current) = queue.pop_front() {
                self.state_items[current].lookahead = Some(Rc::clone(&lookahead));
                for prev in self.rev_trans[current].iter() {
                    queue.push_back(prev);
                }
            }
        }
    }

    /// Computes, for each variable, the terminals that can begin one of
    /// its derivations
    fn init_tfirsts(&mut self) {
        let grammar = self.grammar;
        self.tfirsts = vec![BitSet::new(grammar.nsyms()); grammar.nvars];
        for rule in grammar.rules.iter() {
            let first = match grammar.item_symbol(rule.rhs) {
                Some(sym) if grammar.is_token(sym) => sym,
                _ => continue
            };
            let lhs = grammar.var_index(rule.lhs);
            for var in 0..grammar.nvars {
                if grammar.firsts[var].contains(lhs) {
                    self.tfirsts[var].add(first);
                }
            }
        }
    }

    /// Removes a state item from the searchable graph
    fn disable_state_item(&mut self, idx: StateItemIdx) {
        self.trans[idx] = TransitionTarget::Disabled;
        self.prods.remove(&idx);
        self.rev_prods.remove(&idx);
    }

    /// Prunes every path that only leads to a disabled transition
    fn prune_disabled_paths(&mut self) {
        for idx in (0..self.state_items.len()).rev() {
            if self.trans[idx] == TransitionTarget::None && !self.is_reduce_item(idx) {
                let mut queue = VecDeque::new();
                queue.push_back(idx);
                while let Some(current) = queue.pop_front() {
                    self.disable_state_item(current);
                    for prev in self.rev_trans[current].iter() {
                        queue.push_back(prev);
                    }
                }
            }
        }
    }

    /// Writes the set counts and, when tracing is enabled, the full graph
    /// and the token firsts table
    pub fn report(&self, out: &mut dyn io::Write) -> Result<(), Error> {
        writeln!(out, "# state items: {}", self.state_items.len())?;
        let count = self
            .trans
            .iter()
            .filter(|target| **target != TransitionTarget::None)
            .count();
        writeln!(out, "# transitions: {}", count)?;
        let count: usize = self.prods.values().map(|group| group.len()).sum();
        writeln!(out, "# productions: {}", count)?;
        let count: usize = self.rev_trans.iter().map(|sources| sources.len()).sum();
        writeln!(out, "# reverse transitions: {}", count)?;
        let count: usize = self.rev_prods.values().map(|sources| sources.len()).sum();
        writeln!(out, "# reverse productions: {}", count)?;
        if !self.trace {
            return Ok(());
        }
        for state in 0..self.grammar.states.len() {
            writeln!(out, "State {}:", state)?;
            for idx in self.items_of_state(state) {
                writeln!(out, "{}", self.grammar.item_to_string(self.state_items[idx].item))?;
                if let Some(target) = self.trans[idx].target() {
                    writeln!(out, "    -> {}", self.state_item_to_string(target))?;
                }
                for source in self.rev_trans[idx].iter() {
                    writeln!(out, "    <- {}", self.state_item_to_string(source))?;
                }
                if let Some(group) = self.prods_lookup(idx) {
                    for target in group.iter() {
                        writeln!(out, "    => {}", self.state_item_to_string(target))?;
                    }
                }
                if let Some(sources) = self.rev_prods_lookup(idx) {
                    for source in sources.iter() {
                        writeln!(out, "    <= {}", self.state_item_to_string(source))?;
                    }
                }
                writeln!(out)?;
            }
        }
        writeln!(out, "TOKEN FIRSTS")?;
        for var in 0..self.grammar.nvars {
            let sid = self.grammar.ntokens + var;
            writeln!(out, "  {} firsts", self.grammar.symbol_name(sid))?;
            for sym in self.tfirsts[var].iter() {
                writeln!(out, "    {}", self.grammar.symbol_name(sym))?;
            }
        }
        Ok(())
    }
}
