//! Test support: derives the automaton facts the search core consumes
//! from a plain list of rules
//!
//! States are the LR(0) collection; reduction lookaheads are SLR follow
//! sets, which is all the core requires of its inputs.
#![allow(dead_code)]

use std::collections::HashMap;

use lrcex::grammar::{Grammar, Reduction, Rule, State, Symbol, Transition};
use lrcex::sets::BitSet;
use lrcex::state_graph::StateItemGraph;

/// Builds the grammar facts for the given rules
///
/// Symbol 0 is `$end`; the listed tokens follow, then `$accept` and the
/// listed variables. Rule 0 is `$accept -> <lhs of first rule> $end`.
pub fn build_grammar(tokens: &[&str], vars: &[&str], rules: &[(&str, &[&str])]) -> Grammar {
    let ntokens = tokens.len() + 1;
    let nvars = vars.len() + 1;
    let mut symbols = vec![Symbol::new("$end")];
    for token in tokens {
        symbols.push(Symbol::new(token));
    }
    symbols.push(Symbol::new("$accept"));
    for var in vars {
        symbols.push(Symbol::new(var));
    }
    let ids: HashMap<&str, usize> = tokens
        .iter()
        .enumerate()
        .map(|(index, name)| (*name, index + 1))
        .chain(
            vars.iter()
                .enumerate()
                .map(|(index, name)| (*name, ntokens + 1 + index))
        )
        .collect();

    let start = ids[rules[0].0];
    let mut ritem: Vec<i32> = vec![start as i32, 0, -1];
    let mut rule_table = vec![Rule {
        lhs: ntokens,
        rhs: 0
    }];
    for (index, (lhs, rhs)) in rules.iter().enumerate() {
        rule_table.push(Rule {
            lhs: ids[lhs],
            rhs: ritem.len()
        });
        for sym in rhs.iter() {
            ritem.push(ids[sym] as i32);
        }
        ritem.push(-(index as i32) - 2);
    }

    let nullable = compute_nullable(ntokens, nvars, &rule_table, &ritem);
    let firsts = compute_firsts(ntokens, nvars, &rule_table, &ritem);
    let follows = compute_follows(ntokens, nvars, &rule_table, &ritem, &nullable);
    let states = compute_states(ntokens, nvars, &rule_table, &ritem, &firsts, &follows);

    Grammar {
        ntokens,
        nvars,
        symbols,
        ritem,
        rules: rule_table,
        states,
        firsts,
        nullable
    }
}

/// Builds the grammar and its state-item graph in one go
pub fn build_graph<'g>(grammar: &'g Grammar) -> StateItemGraph<'g> {
    StateItemGraph::build(grammar, false).expect("well-formed grammar facts")
}

fn compute_nullable(ntokens: usize, nvars: usize, rules: &[Rule], ritem: &[i32]) -> Vec<bool> {
    let mut nullable = vec![false; nvars];
    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules.iter() {
            if nullable[rule.lhs - ntokens] {
                continue;
            }
            let mut pos = rule.rhs;
            let mut all_nullable = true;
            while ritem[pos] >= 0 {
                let sym = ritem[pos] as usize;
                if sym < ntokens || !nullable[sym - ntokens] {
                    all_nullable = false;
                    break;
                }
                pos += 1;
            }
            if all_nullable {
                nullable[rule.lhs - ntokens] = true;
                changed = true;
            }
        }
    }
    nullable
}

/// The reflexive transitive closure of "can appear as the first symbol of
/// a rule of", over variables
fn compute_firsts(ntokens: usize, nvars: usize, rules: &[Rule], ritem: &[i32]) -> Vec<BitSet> {
    let mut firsts: Vec<BitSet> = (0..nvars)
        .map(|var| BitSet::from_elements(nvars, &[var]))
        .collect();
    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules.iter() {
            let first = ritem[rule.rhs];
            if first < 0 || (first as usize) < ntokens {
                continue;
            }
            let src = first as usize - ntokens;
            let dst = rule.lhs - ntokens;
            for var in 0..nvars {
                if firsts[var].contains(dst) {
                    let before = firsts[var].len();
                    let addition = firsts[src].clone();
                    firsts[var].add_others(&addition);
                    if firsts[var].len() != before {
                        changed = true;
                    }
                }
            }
        }
    }
    firsts
}

/// Terminal first sets of every variable, over the whole symbol space
fn terminal_firsts(
    ntokens: usize,
    nvars: usize,
    rules: &[Rule],
    ritem: &[i32],
    nullable: &[bool]
) -> Vec<BitSet> {
    let nsyms = ntokens + nvars;
    let mut result: Vec<BitSet> = vec![BitSet::new(nsyms); nvars];
    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules.iter() {
            let lhs = rule.lhs - ntokens;
            let mut pos = rule.rhs;
            while ritem[pos] >= 0 {
                let sym = ritem[pos] as usize;
                if sym < ntokens {
                    if !result[lhs].contains(sym) {
                        result[lhs].add(sym);
                        changed = true;
                    }
                    break;
                }
                let before = result[lhs].len();
                let addition = result[sym - ntokens].clone();
                result[lhs].add_others(&addition);
                if result[lhs].len() != before {
                    changed = true;
                }
                if !nullable[sym - ntokens] {
                    break;
                }
                pos += 1;
            }
        }
    }
    result
}

fn compute_follows(
    ntokens: usize,
    nvars: usize,
    rules: &[Rule],
    ritem: &[i32],
    nullable: &[bool]
) -> Vec<BitSet> {
    let nsyms = ntokens + nvars;
    let tfirsts = terminal_firsts(ntokens, nvars, rules, ritem, nullable);
    let mut follows: Vec<BitSet> = vec![BitSet::new(nsyms); nvars];
    follows[0].add(0);
    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules.iter() {
            let mut pos = rule.rhs;
            while ritem[pos] >= 0 {
                let sym = ritem[pos] as usize;
                if sym >= ntokens {
                    let var = sym - ntokens;
                    let before = follows[var].len();
                    // everything that can start the rest of the rule
                    let mut rest = pos + 1;
                    let mut rest_nullable = true;
                    while ritem[rest] >= 0 {
                        let next = ritem[rest] as usize;
                        if next < ntokens {
                            follows[var].add(next);
                            rest_nullable = false;
                            break;
                        }
                        let addition = tfirsts[next - ntokens].clone();
                        follows[var].add_others(&addition);
                        if !nullable[next - ntokens] {
                            rest_nullable = false;
                            break;
                        }
                        rest += 1;
                    }
                    if rest_nullable {
                        let addition = follows[rule.lhs - ntokens].clone();
                        follows[var].add_others(&addition);
                    }
                    if follows[var].len() != before {
                        changed = true;
                    }
                }
                pos += 1;
            }
        }
    }
    follows
}

/// Builds the LR(0) collection with SLR reduction lookaheads
fn compute_states(
    ntokens: usize,
    nvars: usize,
    rules: &[Rule],
    ritem: &[i32],
    firsts: &[BitSet],
    follows: &[BitSet]
) -> Vec<State> {
    let mut derives: Vec<Vec<usize>> = vec![Vec::new(); nvars];
    for (index, rule) in rules.iter().enumerate() {
        derives[rule.lhs - ntokens].push(index);
    }
    let closure = |kernel: &[usize]| -> Vec<usize> {
        let mut vars = BitSet::new(nvars);
        for &pos in kernel {
            let sym = ritem[pos];
            if sym >= ntokens as i32 {
                vars.add_others(&firsts[sym as usize - ntokens]);
            }
        }
        let mut items = kernel.to_vec();
        for var in vars.iter() {
            for &rule in derives[var].iter() {
                if rules[rule].rhs > 0 {
                    items.push(rules[rule].rhs);
                }
            }
        }
        items.sort_unstable();
        items.dedup();
        items
    };

    let mut kernels: Vec<Vec<usize>> = vec![vec![0]];
    let mut accessing: Vec<usize> = vec![0];
    let mut known: HashMap<Vec<usize>, usize> = HashMap::new();
    known.insert(vec![0], 0);
    let mut transitions: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut index = 0;
    while index < kernels.len() {
        let items = closure(&kernels[index]);
        // group the items by the symbol after their dot
        let mut shifts: Vec<(usize, Vec<usize>)> = Vec::new();
        for &pos in items.iter() {
            if ritem[pos] < 0 {
                continue;
            }
            let sym = ritem[pos] as usize;
            match shifts.iter_mut().find(|(shifted, _)| *shifted == sym) {
                Some((_, kernel)) => kernel.push(pos + 1),
                None => shifts.push((sym, vec![pos + 1]))
            }
        }
        let mut outgoing = Vec::new();
        for (sym, mut kernel) in shifts {
            kernel.sort_unstable();
            let target = match known.get(&kernel) {
                Some(target) => *target,
                None => {
                    let target = kernels.len();
                    known.insert(kernel.clone(), target);
                    kernels.push(kernel);
                    accessing.push(sym);
                    target
                }
            };
            outgoing.push((sym, target));
        }
        transitions.push(outgoing);
        index += 1;
    }

    let nsyms = ntokens + nvars;
    kernels
        .iter()
        .enumerate()
        .map(|(id, kernel)| {
            let reductions = closure(kernel)
                .into_iter()
                .filter(|&pos| ritem[pos] < 0)
                .map(|pos| {
                    let rule = (-1 - ritem[pos]) as usize;
                    let mut lookahead = BitSet::new(nsyms);
                    lookahead.add_others(&follows[rules[rule].lhs - ntokens]);
                    Reduction {
                        rule,
                        lookahead: Some(lookahead)
                    }
                })
                .collect();
            State {
                id,
                accessing_symbol: accessing[id],
                items: kernel.clone(),
                transitions: transitions[id]
                    .iter()
                    .map(|&(symbol, target)| Transition {
                        symbol,
                        target,
                        disabled: false
                    })
                    .collect(),
                reductions
            }
        })
        .collect()
}

/// Finds the state items whose dotted item renders to the given text
pub fn find_items(graph: &StateItemGraph, text: &str) -> Vec<usize> {
    (0..graph.len())
        .filter(|&idx| graph.grammar().item_to_string(graph.state_item(idx).item) == text)
        .collect()
}

/// Finds the unique state item whose dotted item renders to the given text
pub fn find_item(graph: &StateItemGraph, text: &str) -> usize {
    let matches = find_items(graph, text);
    assert_eq!(matches.len(), 1, "ambiguous or missing item {:?}", text);
    matches[0]
}

/// Finds the state item with the given dotted item within a state
pub fn find_item_in_state(graph: &StateItemGraph, state: usize, text: &str) -> usize {
    let matches: Vec<usize> = find_items(graph, text)
        .into_iter()
        .filter(|&idx| graph.state_item(idx).state == state)
        .collect();
    assert_eq!(matches.len(), 1, "missing item {:?} in state {}", text, state);
    matches[0]
}

/// Renders a path of state items as their dotted items
pub fn render_path(graph: &StateItemGraph, path: &[usize]) -> Vec<String> {
    path.iter()
        .map(|&idx| graph.grammar().item_to_string(graph.state_item(idx).item))
        .collect()
}
