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

//! Module for the lookahead-sensitive searches over the state-item graph
//!
//! The searches walk the graph while tracking the set of terminals that can
//! legally follow the current position. Forward, a breadth-first search
//! finds the shortest path from the start state item to a conflict state
//! item under a required lookahead. Backward, reverse transition and
//! reverse production queries find the state items that can lead into a
//! given one while keeping the lookahead compatible.

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use log::{trace, warn};

use crate::errors::Error;
use crate::grammar::{SymbolId, SID_END};
use crate::sets::BitSet;
use crate::state_graph::{StateItemGraph, StateItemIdx};

/// When computing the shortest lookahead-sensitive path, only consider
/// state items that can reach the conflict state item
const OPTIMIZE_SHORTEST_PATH: bool = true;

/// A node of the shortest-path search: a state item, the search node it
/// was reached from, and the lookahead along this path
struct SearchNode {
    /// The state item of this node
    si: StateItemIdx,
    /// The arena index of the parent node
    parent: Option<usize>,
    /// The terminals that can follow the position of this node; siblings
    /// created by the same production step share one set
    lookahead: Rc<BitSet>
}

/// Appends a node to the search unless an equivalent node (same state
/// item, equal lookahead) was already visited
fn append_node(
    arena: &mut Vec<SearchNode>,
    visited: &mut HashSet<(StateItemIdx, Rc<BitSet>)>,
    queue: &mut VecDeque<usize>,
    node: SearchNode
) -> bool {
    if !visited.insert((node.si, Rc::clone(&node.lookahead))) {
        return false;
    }
    arena.push(node);
    queue.push_back(arena.len() - 1);
    true
}

/// A predecessor produced by a reverse production step
struct RevCandidate {
    /// The predecessor state item
    si: StateItemIdx,
    /// The lookahead after stepping back to it
    lookahead: Option<BitSet>
}

impl<'g> StateItemGraph<'g> {
    /// Computes the set of state items that can reach the given conflict
    /// item via a combination of transitions or production steps
    pub fn eligible_state_items(&self, target: StateItemIdx) -> BitSet {
        let mut result = BitSet::new(self.len());
        let mut queue = VecDeque::new();
        queue.push_back(target);
        while let Some(si) = queue.pop_front() {
            if result.contains(si) {
                continue;
            }
            result.add(si);
            // Consider reverse transitions and reverse productions.
            for prev in self.rev_transitions(si).iter() {
                queue.push_back(prev);
            }
            if self.grammar().is_rule_start(self.state_item(si).item) {
                if let Some(sources) = self.rev_prods_lookup(si) {
                    for prev in sources.iter() {
                        queue.push_back(prev);
                    }
                }
            }
        }
        result
    }

    /// Computes the shortest lookahead-sensitive path from the start state
    /// item to the given conflict state item
    ///
    /// The returned sequence starts at the start state item, ends at the
    /// target, and each adjacent pair is connected by a transition or a
    /// production edge; the lookahead accumulated along the path contains
    /// `next_sym` when the target is reached.
    pub fn shortest_path_from_start(
        &self,
        target: StateItemIdx,
        next_sym: SymbolId
    ) -> Result<Vec<StateItemIdx>, Error> {
        let eligible = if OPTIMIZE_SHORTEST_PATH {
            Some(self.eligible_state_items(target))
        } else {
            None
        };
        let mut arena: Vec<SearchNode> = Vec::new();
        let mut visited: HashSet<(StateItemIdx, Rc<BitSet>)> = HashSet::new();
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut initial = BitSet::new(self.grammar().nsyms());
        initial.add(SID_END);
        append_node(
            &mut arena,
            &mut visited,
            &mut queue,
            SearchNode {
                si: 0,
                parent: None,
                lookahead: Rc::new(initial)
            }
        );
        let mut found = None;
        while let Some(index) = queue.pop_front() {
            let si = arena[index].si;
            if si == target && arena[index].lookahead.contains(next_sym) {
                found = Some(index);
                break;
            }
            // Transition: the lookahead is inherited unchanged.
            if let Some(next_si) = self.transition(si).target() {
                if eligible.as_ref().map_or(true, |set| set.contains(next_si)) {
                    let lookahead = Rc::clone(&arena[index].lookahead);
                    append_node(
                        &mut arena,
                        &mut visited,
                        &mut queue,
                        SearchNode {
                            si: next_si,
                            parent: Some(index),
                            lookahead
                        }
                    );
                }
            }
            // Production step: compute the terminals that can follow the
            // produced variable; every destination shares the result.
            if let Some(group) = self.prods_lookup(si) {
                let group = Rc::clone(group);
                let lookahead =
                    Rc::new(self.production_lookahead(si, &arena[index].lookahead));
                for next_si in group.iter() {
                    if let Some(set) = eligible.as_ref() {
                        if !set.contains(next_si) {
                            continue;
                        }
                    }
                    append_node(
                        &mut arena,
                        &mut visited,
                        &mut queue,
                        SearchNode {
                            si: next_si,
                            parent: Some(index),
                            lookahead: Rc::clone(&lookahead)
                        }
                    );
                }
            }
        }
        match found {
            Some(index) => {
                let mut result = Vec::new();
                let mut current = Some(index);
                while let Some(node) = current {
                    result.push(arena[node].si);
                    current = arena[node].parent;
                }
                result.reverse();
                if self.trace() {
                    trace!("REDUCE ITEM PATH:");
                    for &si in result.iter() {
                        trace!("{}", self.state_item_to_string(si));
                    }
                }
                Ok(result)
            }
            None => {
                warn!("{}", Error::NoShortestPath);
                Err(Error::NoShortestPath)
            }
        }
    }

    /// Computes the lookahead inherited by the destinations of a
    /// production step from the given state item: the terminals that can
    /// start the rest of its production, then the parent lookahead once
    /// the rest can derive the empty string
    fn production_lookahead(&self, si: StateItemIdx, parent: &BitSet) -> BitSet {
        let grammar = self.grammar();
        let mut lookahead = BitSet::new(grammar.nsyms());
        let mut pos = self.state_item(si).item + 1;
        loop {
            match grammar.item_symbol(pos) {
                None => {
                    lookahead.add_others(parent);
                    break;
                }
                Some(sym) if grammar.is_token(sym) => {
                    lookahead.add(sym);
                    break;
                }
                Some(sym) => {
                    lookahead.add_others(self.tfirsts(sym));
                    if !grammar.is_nullable(sym) {
                        break;
                    }
                }
            }
            pos += 1;
        }
        lookahead
    }

    /// Determines whether the given terminal is in the symbol set or can
    /// begin a variable of the symbol set; a missing set is universal
    pub fn intersect_symbol(&self, sym: SymbolId, syms: Option<&BitSet>) -> bool {
        let syms = match syms {
            Some(syms) => syms,
            None => return true
        };
        let grammar = self.grammar();
        for other in syms.iter() {
            if sym == other {
                return true;
            }
            if grammar.is_variable(other) && self.tfirsts(other).contains(sym) {
                return true;
            }
        }
        false
    }

    /// Determines whether some terminal of `ts` is in the symbol set or
    /// can begin a variable of the symbol set; a missing set on either
    /// side is universal
    pub fn intersect(&self, ts: Option<&BitSet>, syms: Option<&BitSet>) -> bool {
        let (ts, syms) = match (ts, syms) {
            (Some(ts), Some(syms)) => (ts, syms),
            _ => return true
        };
        let grammar = self.grammar();
        for sym in syms.iter() {
            if ts.contains(sym) {
                return true;
            }
            if grammar.is_variable(sym) && !ts.is_disjoint(self.tfirsts(sym)) {
                return true;
            }
        }
        false
    }

    /// Computes the predecessors that can reach the given state item
    /// through one production step compatible with the lookahead
    fn reverse_production_step(
        &self,
        si: StateItemIdx,
        lookahead: Option<&BitSet>
    ) -> Vec<RevCandidate> {
        let mut result = Vec::new();
        let sources = match self.rev_prods_lookup(si) {
            Some(sources) => Rc::clone(sources),
            None => return result
        };
        let grammar = self.grammar();
        for prev in sources.iter() {
            if !self.production_allowed(prev, si) {
                continue;
            }
            let prev_lookahead = self.state_item(prev).lookahead.clone();
            if self.is_reduce_item(prev) {
                // Check that some lookaheads can be preserved.
                if !self.intersect(prev_lookahead.as_deref(), lookahead) {
                    continue;
                }
                let mut next = BitSet::new(grammar.nsyms());
                if let Some(la) = lookahead {
                    next.add_others(la);
                }
                if let Some(la) = &prev_lookahead {
                    next.add_others(la);
                }
                result.push(RevCandidate {
                    si: prev,
                    lookahead: Some(next)
                });
            } else {
                if let Some(la) = lookahead {
                    // The lookahead must be compatible with the first
                    // possible symbols of the rest of the production, or
                    // the rest of the production must derive the empty
                    // string and the lookahead be compatible with the
                    // item's own lookahead.
                    let mut applicable = false;
                    let mut rest_nullable = true;
                    let mut pos = self.state_item(prev).item;
                    while !applicable && rest_nullable {
                        match grammar.item_symbol(pos) {
                            None => break,
                            Some(sym) if grammar.is_token(sym) => {
                                applicable = self.intersect_symbol(sym, Some(la));
                                rest_nullable = false;
                            }
                            Some(sym) => {
                                applicable = self.intersect(Some(self.tfirsts(sym)), Some(la));
                                if !applicable {
                                    rest_nullable = grammar.is_nullable(sym);
                                }
                            }
                        }
                        pos += 1;
                    }
                    if !applicable && !rest_nullable {
                        continue;
                    }
                }
                let next = match &prev_lookahead {
                    Some(la) => (**la).clone(),
                    None => BitSet::new(grammar.nsyms())
                };
                result.push(RevCandidate {
                    si: prev,
                    lookahead: Some(next)
                });
            }
        }
        result
    }

    /// Computes the set of state items that can make a transition on the
    /// given symbol into the given state item under the lookahead
    ///
    /// When a guide is provided, only predecessors in one of the guide's
    /// states are kept.
    pub fn reverse_transition(
        &self,
        s: StateItemIdx,
        sym: SymbolId,
        lookahead: Option<&BitSet>,
        guide: Option<&BitSet>
    ) -> BitSet {
        let mut result = BitSet::new(self.len());
        let si = self.state_item(s);
        if self.grammar().states[si.state].accessing_symbol != sym {
            return result;
        }
        if s > 0 && si.item > 0 && self.grammar().ritem[si.item - 1] >= 0 {
            // There are state items that can make a transition on sym to
            // the current one; check that the lookahead is compatible.
            for prev in self.rev_transitions(s).iter() {
                let prev_si = self.state_item(prev);
                if let Some(states) = guide {
                    if !states.contains(prev_si.state) {
                        continue;
                    }
                }
                if lookahead.is_some()
                    && !self.intersect(prev_si.lookahead.as_deref(), lookahead)
                {
                    continue;
                }
                result.add(prev);
            }
            return result;
        }
        // A production item: the items that might use this production are
        // in the same state.
        for candidate in self.reverse_production_step(s, lookahead) {
            result.add(candidate.si);
        }
        result
    }

    /// Computes the sequences of state items that can make production
    /// steps into the given state item under the lookahead
    ///
    /// Each returned sequence is a prefix to prepend to a parse-state
    /// stack, innermost item first.
    pub fn reverse_production(
        &self,
        si: StateItemIdx,
        lookahead: Option<&BitSet>
    ) -> Vec<Vec<StateItemIdx>> {
        self.reverse_production_step(si, lookahead)
            .into_iter()
            .map(|candidate| vec![candidate.si])
            .collect()
    }
}
