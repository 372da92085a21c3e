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

//! Hand-built automaton facts for the unit tests of this crate

use crate::grammar::{Grammar, Reduction, Rule, State, Symbol, Transition};
use crate::sets::BitSet;

fn transition(symbol: usize, target: usize) -> Transition {
    Transition {
        symbol,
        target,
        disabled: false
    }
}

fn reduction(rule: usize, nsyms: usize, lookahead: &[usize]) -> Reduction {
    Reduction {
        rule,
        lookahead: Some(BitSet::from_elements(nsyms, lookahead))
    }
}

/// `$accept -> S $end ; S -> a`
///
/// Symbols: 0 `$end`, 1 `a`, 2 `$accept`, 3 `S`.
/// State items: 0 `0:$accept -> . S $end`, 1 `0:S -> . a`,
/// 2 `1:$accept -> S . $end`, 3 `2:S -> a .`, 4 `3:$accept -> S $end .`.
pub fn trivial_grammar() -> Grammar {
    Grammar {
        ntokens: 2,
        nvars: 2,
        symbols: vec![
            Symbol::new("$end"),
            Symbol::new("a"),
            Symbol::new("$accept"),
            Symbol::new("S")
        ],
        ritem: vec![3, 0, -1, 1, -2],
        rules: vec![Rule { lhs: 2, rhs: 0 }, Rule { lhs: 3, rhs: 3 }],
        states: vec![
            State {
                id: 0,
                accessing_symbol: 0,
                items: vec![0],
                transitions: vec![transition(3, 1), transition(1, 2)],
                reductions: Vec::new()
            },
            State {
                id: 1,
                accessing_symbol: 3,
                items: vec![1],
                transitions: vec![transition(0, 3)],
                reductions: Vec::new()
            },
            State {
                id: 2,
                accessing_symbol: 1,
                items: vec![4],
                transitions: Vec::new(),
                reductions: vec![reduction(1, 4, &[0])]
            },
            State {
                id: 3,
                accessing_symbol: 0,
                items: vec![2],
                transitions: Vec::new(),
                reductions: vec![reduction(0, 4, &[0])]
            },
        ],
        firsts: vec![
            BitSet::from_elements(2, &[0, 1]),
            BitSet::from_elements(2, &[1])
        ],
        nullable: vec![false, false]
    }
}

/// `$accept -> S $end ; S -> B A ; A -> %empty ; B -> b`
///
/// Symbols: 0 `$end`, 1 `b`, 2 `$accept`, 3 `S`, 4 `A`, 5 `B`.
/// State items: 0 `0:$accept -> . S $end`, 1 `0:S -> . B A`,
/// 2 `0:B -> . b`, 3 `1:$accept -> S . $end`, 4 `2:S -> B . A`,
/// 5 `2:A -> .`, 6 `3:B -> b .`, 7 `4:S -> B A .`,
/// 8 `5:$accept -> S $end .`.
pub fn nullable_grammar() -> Grammar {
    Grammar {
        ntokens: 2,
        nvars: 4,
        symbols: vec![
            Symbol::new("$end"),
            Symbol::new("b"),
            Symbol::new("$accept"),
            Symbol::new("S"),
            Symbol::new("A"),
            Symbol::new("B")
        ],
        ritem: vec![3, 0, -1, 5, 4, -2, -3, 1, -4],
        rules: vec![
            Rule { lhs: 2, rhs: 0 },
            Rule { lhs: 3, rhs: 3 },
            Rule { lhs: 4, rhs: 6 },
            Rule { lhs: 5, rhs: 7 },
        ],
        states: vec![
            State {
                id: 0,
                accessing_symbol: 0,
                items: vec![0],
                transitions: vec![transition(3, 1), transition(5, 2), transition(1, 3)],
                reductions: Vec::new()
            },
            State {
                id: 1,
                accessing_symbol: 3,
                items: vec![1],
                transitions: vec![transition(0, 5)],
                reductions: Vec::new()
            },
            State {
                id: 2,
                accessing_symbol: 5,
                items: vec![4],
                transitions: vec![transition(4, 4)],
                reductions: vec![reduction(2, 6, &[0])]
            },
            State {
                id: 3,
                accessing_symbol: 1,
                items: vec![8],
                transitions: Vec::new(),
                reductions: vec![reduction(3, 6, &[0])]
            },
            State {
                id: 4,
                accessing_symbol: 4,
                items: vec![5],
                transitions: Vec::new(),
                reductions: vec![reduction(1, 6, &[0])]
            },
            State {
                id: 5,
                accessing_symbol: 0,
                items: vec![2],
                transitions: Vec::new(),
                reductions: vec![reduction(0, 6, &[0])]
            },
        ],
        firsts: vec![
            BitSet::from_elements(4, &[0, 1, 3]),
            BitSet::from_elements(4, &[1, 3]),
            BitSet::from_elements(4, &[2]),
            BitSet::from_elements(4, &[3]),
        ],
        nullable: vec![false, false, true, false]
    }
}

/// `$accept -> E $end ; E -> E + E ; E -> n`
///
/// The classic ambiguous expression grammar with its shift/reduce conflict
/// on `+` in the state holding `E -> E + E .` and `E -> E . + E`.
///
/// Symbols: 0 `$end`, 1 `+`, 2 `n`, 3 `$accept`, 4 `E`.
/// State items: 0 `0:$accept -> . E $end`, 1 `0:E -> . E + E`,
/// 2 `0:E -> . n`, 3 `1:$accept -> E . $end`, 4 `1:E -> E . + E`,
/// 5 `2:E -> n .`, 6 `3:$accept -> E $end .`, 7 `4:E -> E + . E`,
/// 8 `4:E -> . E + E`, 9 `4:E -> . n`, 10 `5:E -> E . + E`,
/// 11 `5:E -> E + E .`.
pub fn expr_grammar() -> Grammar {
    Grammar {
        ntokens: 3,
        nvars: 2,
        symbols: vec![
            Symbol::new("$end"),
            Symbol::new("+"),
            Symbol::new("n"),
            Symbol::new("$accept"),
            Symbol::new("E")
        ],
        ritem: vec![4, 0, -1, 4, 1, 4, -2, 2, -3],
        rules: vec![
            Rule { lhs: 3, rhs: 0 },
            Rule { lhs: 4, rhs: 3 },
            Rule { lhs: 4, rhs: 7 },
        ],
        states: vec![
            State {
                id: 0,
                accessing_symbol: 0,
                items: vec![0],
                transitions: vec![transition(4, 1), transition(2, 2)],
                reductions: Vec::new()
            },
            State {
                id: 1,
                accessing_symbol: 4,
                items: vec![1, 4],
                transitions: vec![transition(0, 3), transition(1, 4)],
                reductions: Vec::new()
            },
            State {
                id: 2,
                accessing_symbol: 2,
                items: vec![8],
                transitions: Vec::new(),
                reductions: vec![reduction(2, 5, &[0, 1])]
            },
            State {
                id: 3,
                accessing_symbol: 0,
                items: vec![2],
                transitions: Vec::new(),
                reductions: vec![reduction(0, 5, &[0])]
            },
            State {
                id: 4,
                accessing_symbol: 1,
                items: vec![5],
                transitions: vec![transition(4, 5), transition(2, 2)],
                reductions: Vec::new()
            },
            State {
                id: 5,
                accessing_symbol: 4,
                items: vec![4, 6],
                transitions: vec![transition(1, 4)],
                reductions: vec![reduction(1, 5, &[0, 1])]
            },
        ],
        firsts: vec![
            BitSet::from_elements(2, &[0, 1]),
            BitSet::from_elements(2, &[1])
        ],
        nullable: vec![false, false]
    }
}
