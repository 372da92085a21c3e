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

//! Module for the parser simulation
//!
//! A parse state is a persistent snapshot of a simulated parser
//! configuration: a stack of state items and the matching list of
//! derivations. A parse state only stores what it adds over its parent,
//! either before (prepend) or after (append) the parent's content, so
//! ancestors are shared between the many configurations a search explores.
//! The simulation primitives step a configuration forward by a transition,
//! a production, or a reduction, growing derivation trees as they go.

use std::cell::Cell;
use std::io;
use std::rc::Rc;

use crate::derivation::Derivation;
use crate::errors::Error;
use crate::grammar::{ItemIndex, SymbolId};
use crate::sets::BitSet;
use crate::state_graph::{StateItemGraph, StateItemIdx};

/// An ordered sequence of elements added by one parse state, with the
/// cached head, tail and cumulative size of the whole flattened chain
#[derive(Debug, Clone)]
pub struct Chunk<T: Clone> {
    /// The elements this parse state adds
    contents: Vec<T>,
    /// The first element of the flattened chain
    head: Option<T>,
    /// The last element of the flattened chain
    tail: Option<T>,
    /// The size of the flattened chain
    total_size: usize
}

impl<T: Clone> Chunk<T> {
    fn new() -> Chunk<T> {
        Chunk {
            contents: Vec::new(),
            head: None,
            tail: None,
            total_size: 0
        }
    }

    /// Builds the chunk of a fresh root from its full contents
    fn from_contents(contents: Vec<T>) -> Chunk<T> {
        let head = contents.first().cloned();
        let tail = contents.last().cloned();
        let total_size = contents.len();
        Chunk {
            contents,
            head,
            tail,
            total_size
        }
    }

    /// Creates the chunk of a child extending the given one
    fn extending(parent: &Chunk<T>) -> Chunk<T> {
        Chunk {
            contents: Vec::new(),
            head: parent.head.clone(),
            tail: parent.tail.clone(),
            total_size: parent.total_size
        }
    }

    /// Appends an element after the flattened chain
    pub fn append(&mut self, element: T) {
        self.contents.push(element.clone());
        self.tail = Some(element.clone());
        self.total_size += 1;
        if self.head.is_none() {
            self.head = Some(element);
        }
    }

    /// Prepends an element before the flattened chain
    pub fn prepend(&mut self, element: T) {
        self.contents.insert(0, element.clone());
        self.head = Some(element.clone());
        self.total_size += 1;
        if self.tail.is_none() {
            self.tail = Some(element);
        }
    }

    /// Gets the first element of the flattened chain
    pub fn head(&self) -> Option<T> {
        self.head.clone()
    }

    /// Gets the last element of the flattened chain
    pub fn tail(&self) -> Option<T> {
        self.tail.clone()
    }

    /// Gets the size of the flattened chain
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Gets the elements this parse state adds itself
    pub fn contents(&self) -> &[T] {
        &self.contents
    }
}

/// A persistent snapshot of a simulated parser configuration
pub struct ParseState {
    /// The stack of state items
    state_items: Chunk<StateItemIdx>,
    /// The derivations matching the stack
    derivs: Chunk<Rc<Derivation>>,
    /// The parse state this one extends
    parent: Option<Rc<ParseState>>,
    /// Whether the local contents go before or after the parent's
    prepend: bool,
    /// The number of production steps along the chain; `-1` disables the
    /// count, `0` marks the conflict item
    depth: i32,
    /// Set by the driver to keep this state eligible for cycle detection
    visited: Cell<bool>
}

impl ParseState {
    /// Creates a fresh root with empty content
    pub fn empty() -> Rc<ParseState> {
        Rc::new(ParseState {
            state_items: Chunk::new(),
            derivs: Chunk::new(),
            parent: None,
            prepend: false,
            depth: 0,
            visited: Cell::new(false)
        })
    }

    /// Creates a child that extends the parent with nothing yet
    pub fn copy(parent: &Rc<ParseState>, prepend: bool) -> ParseState {
        ParseState {
            state_items: Chunk::extending(&parent.state_items),
            derivs: Chunk::extending(&parent.derivs),
            parent: Some(Rc::clone(parent)),
            prepend,
            depth: parent.depth,
            visited: Cell::new(false)
        }
    }

    /// Creates a child that extends the parent with the given contents
    pub fn with_chunks(
        state_items: Vec<StateItemIdx>,
        derivs: Vec<Rc<Derivation>>,
        prepend: bool,
        parent: &Rc<ParseState>
    ) -> ParseState {
        let mut result = ParseState::copy(parent, prepend);
        result.state_items.total_size += state_items.len();
        if let Some(first) = state_items.first() {
            if prepend || result.state_items.head.is_none() {
                result.state_items.head = Some(*first);
            }
        }
        if let Some(last) = state_items.last() {
            if !prepend || result.state_items.tail.is_none() {
                result.state_items.tail = Some(*last);
            }
        }
        result.state_items.contents = state_items;
        result.derivs.total_size += derivs.len();
        if let Some(first) = derivs.first() {
            if prepend || result.derivs.head.is_none() {
                result.derivs.head = Some(Rc::clone(first));
            }
        }
        if let Some(last) = derivs.last() {
            if !prepend || result.derivs.tail.is_none() {
                result.derivs.tail = Some(Rc::clone(last));
            }
        }
        result.derivs.contents = derivs;
        result
    }

    /// Gets the stack of state items
    pub fn state_items(&self) -> &Chunk<StateItemIdx> {
        &self.state_items
    }

    /// Gets the derivations matching the stack
    pub fn derivs(&self) -> &Chunk<Rc<Derivation>> {
        &self.derivs
    }

    /// Gets the parse state this one extends
    pub fn parent(&self) -> Option<&Rc<ParseState>> {
        self.parent.as_ref()
    }

    /// Determines whether the local contents go before the parent's
    pub fn is_prepend(&self) -> bool {
        self.prepend
    }

    /// Gets the number of production steps along the chain
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Determines whether the driver marked this state for cycle detection
    pub fn is_visited(&self) -> bool {
        self.visited.get()
    }

    /// Marks this state as kept for cycle detection
    pub fn mark_visited(&self) {
        self.visited.set(true);
    }

    /// Flattens the chain into its state items and derivations, in
    /// logical order
    pub fn flatten(&self) -> (Vec<StateItemIdx>, Vec<Rc<Derivation>>) {
        // prepended contents come innermost-first, appended contents
        // come outermost-first
        let mut prepended: Vec<&ParseState> = Vec::new();
        let mut appended: Vec<&ParseState> = Vec::new();
        let mut current = Some(self);
        while let Some(ps) = current {
            if ps.prepend {
                prepended.push(ps);
            } else {
                appended.insert(0, ps);
            }
            current = ps.parent.as_deref();
        }
        let mut state_items = Vec::with_capacity(self.state_items.total_size);
        let mut derivs = Vec::with_capacity(self.derivs.total_size);
        for ps in prepended.iter().chain(appended.iter()) {
            state_items.extend_from_slice(&ps.state_items.contents);
            derivs.extend(ps.derivs.contents.iter().cloned());
        }
        debug_assert!(state_items.len() == self.state_items.total_size);
        debug_assert!(derivs.len() == self.derivs.total_size);
        (state_items, derivs)
    }
}

impl<'g> StateItemGraph<'g> {
    /// Determines whether the given symbols are equal or their first sets
    /// intersect
    pub fn compatible(&self, sym1: SymbolId, sym2: SymbolId) -> bool {
        let grammar = self.grammar();
        if sym1 == sym2 {
            true
        } else if grammar.is_token(sym1) && grammar.is_variable(sym2) {
            self.tfirsts(sym2).contains(sym1)
        } else if grammar.is_variable(sym1) && grammar.is_token(sym2) {
            self.tfirsts(sym1).contains(sym2)
        } else if grammar.is_variable(sym1) && grammar.is_variable(sym2) {
            !self.tfirsts(sym1).is_disjoint(self.tfirsts(sym2))
        } else {
            false
        }
    }

    /// Emits the parse states that result from taking transitions on
    /// nullable variables as long as possible from the given state item
    fn nullable_closure(
        &self,
        ps: &Rc<ParseState>,
        si: StateItemIdx,
        states: &mut Vec<Rc<ParseState>>
    ) {
        let grammar = self.grammar();
        let mut current = Rc::clone(ps);
        let mut prev = si;
        while let Some(next) = self.transition(prev).target() {
            let sym = match grammar.item_symbol(self.state_item(prev).item) {
                Some(sym) if grammar.is_variable(sym) && grammar.is_nullable(sym) => sym,
                _ => break
            };
            let mut next_ps = ParseState::copy(&current, false);
            next_ps.state_items.append(next);
            next_ps.derivs.append(Derivation::leaf(sym));
            let next_ps = Rc::new(next_ps);
            states.push(Rc::clone(&next_ps));
            current = next_ps;
            prev = next;
        }
    }

    /// Simulates a transition over the next symbol of the parse state's
    /// tail, then advances over nullable variables
    pub fn simulate_transition(&self, ps: &Rc<ParseState>) -> Vec<Rc<ParseState>> {
        let mut result = Vec::new();
        let si = match ps.state_items().tail() {
            Some(si) => si,
            None => return result
        };
        // a disabled transition cannot happen here, state items leading
        // to one are themselves disabled
        let next = match self.transition(si).target() {
            Some(next) => next,
            None => return result
        };
        let sym = match self.grammar().item_symbol(self.state_item(si).item) {
            Some(sym) => sym,
            None => return result
        };
        let mut next_ps = ParseState::copy(ps, false);
        next_ps.state_items.append(next);
        next_ps.derivs.append(Derivation::leaf(sym));
        let next_ps = Rc::new(next_ps);
        result.push(Rc::clone(&next_ps));
        self.nullable_closure(&next_ps, next, &mut result);
        result
    }

    /// Simulates every production step from the parse state's tail whose
    /// right-hand side can begin with something compatible with the
    /// given symbol
    pub fn simulate_production(
        &self,
        ps: &Rc<ParseState>,
        compat_sym: SymbolId
    ) -> Vec<Rc<ParseState>> {
        let mut result = Vec::new();
        let si = match ps.state_items().tail() {
            Some(si) => si,
            None => return result
        };
        let group = match self.prods_lookup(si) {
            Some(group) => Rc::clone(group),
            None => return result
        };
        for next in group.iter() {
            let first = match self.grammar().item_symbol(self.state_item(next).item) {
                Some(first) => first,
                None => continue
            };
            if !self.compatible(first, compat_sym) || !self.production_allowed(si, next) {
                continue;
            }
            let mut next_ps = ParseState::copy(ps, false);
            next_ps.state_items.append(next);
            if next_ps.depth >= 0 {
                next_ps.depth += 1;
            }
            let next_ps = Rc::new(next_ps);
            result.push(Rc::clone(&next_ps));
            self.nullable_closure(&next_ps, next, &mut result);
        }
        result
    }

    /// Simulates a reduction of the rule ending at the parse state's
    /// tail: pops its right-hand side, folds the popped derivations into
    /// a tree, and shifts the left-hand side
    ///
    /// `conflict_item` locates the dot marker inside the new derivation
    /// when the parse state sits exactly at the conflict; `symbol_set`
    /// constrains the predecessors considered when the stack does not
    /// reach below the reduced rule.
    pub fn simulate_reduction(
        &self,
        ps: &Rc<ParseState>,
        conflict_item: ItemIndex,
        rule_len: usize,
        symbol_set: Option<&BitSet>
    ) -> Vec<Rc<ParseState>> {
        let grammar = self.grammar();
        let mut result = Vec::new();
        let s_size = ps.state_items().total_size();
        let d_size = ps.derivs().total_size();
        assert!(s_size > rule_len && d_size >= rule_len);

        let (all_sis, all_derivs) = ps.flatten();
        let si_split = s_size - rule_len - 1;
        let d_split = d_size - rule_len;
        let mut popped_derivs = all_derivs;
        let kept_derivs = popped_derivs.drain(..d_split).collect::<Vec<Rc<Derivation>>>();
        let mut new_root = ParseState {
            state_items: Chunk::from_contents(all_sis[..si_split].to_vec()),
            derivs: Chunk::from_contents(kept_derivs),
            parent: None,
            prepend: false,
            depth: 0,
            visited: Cell::new(false)
        };

        // fold the popped derivations under the left-hand side
        let tail = *all_sis.last().unwrap();
        let rule = grammar.rule_of_item(self.state_item(tail).item);
        let lhs = grammar.rules[rule].lhs;
        let mut children = popped_derivs;
        if ps.depth() == 0 {
            let mut dot_pos = 0;
            let mut current = conflict_item;
            while current > 1 && grammar.ritem[current - 1] >= 0 {
                dot_pos += 1;
                current -= 1;
            }
            children.insert(dot_pos, Derivation::dot());
        }
        let deriv = Derivation::expansion(lhs, children);
        new_root.depth -= 1;
        new_root.derivs.append(deriv);

        if s_size != rule_len + 1 {
            // Shift the left-hand side over the uncovered stack top.
            let tail = new_root.state_items.tail().unwrap();
            let target = self.transition(tail).target().unwrap();
            new_root.state_items.append(target);
            result.push(Rc::new(new_root));
        } else {
            // The head state item is a production item, so the possible
            // source state items have to be prepended.
            let head = ps.state_items().head().unwrap();
            let new_root = Rc::new(new_root);
            for chain in self.reverse_production(head, symbol_set) {
                let p_state =
                    Rc::new(ParseState::with_chunks(chain, Vec::new(), true, &new_root));
                let mut shifted = ParseState::copy(&p_state, false);
                let tail = shifted.state_items.tail().unwrap();
                let target = self.transition(tail).target().unwrap();
                shifted.state_items.append(target);
                let shifted = Rc::new(shifted);
                result.push(Rc::clone(&shifted));
                let tail = shifted.state_items().tail().unwrap();
                self.nullable_closure(&shifted, tail, &mut result);
            }
        }
        result
    }

    /// Writes a diagnostic view of the parse state
    pub fn print_parse_state(
        &self,
        ps: &Rc<ParseState>,
        out: &mut dyn io::Write
    ) -> Result<(), Error> {
        writeln!(
            out,
            "(size {} depth {} rc {})",
            ps.state_items().total_size(),
            ps.depth(),
            Rc::strong_count(ps)
        )?;
        if let Some(head) = ps.state_items().head() {
            writeln!(out, "{}", self.state_item_to_string(head))?;
        }
        if let Some(tail) = ps.state_items().tail() {
            writeln!(out, "{}", self.state_item_to_string(tail))?;
        }
        if let Some(deriv) = ps.derivs().head() {
            writeln!(out, "{}", deriv.to_text(self.grammar()))?;
        }
        Ok(())
    }
}
