//! Structural invariants of the state-item graph over derived automatons

mod common;

use std::rc::Rc;

use common::{build_graph, build_grammar, find_item};
use lrcex::grammar::Grammar;
use lrcex::state_graph::TransitionTarget;

fn expr_grammar() -> Grammar {
    build_grammar(
        &["+", "n"],
        &["E"],
        &[("E", &["E", "+", "E"]), ("E", &["n"])]
    )
}

fn stmt_grammar() -> Grammar {
    // a grammar with a longer dependency chain and an empty rule
    build_grammar(
        &["if", "then", "else", "id"],
        &["stmt", "cond", "opt_else"],
        &[
            ("stmt", &["if", "cond", "then", "stmt", "opt_else"]),
            ("stmt", &["id"]),
            ("cond", &["id"]),
            ("opt_else", &["else", "stmt"]),
            ("opt_else", &[]),
        ]
    )
}

#[test]
fn transitions_and_reverses_are_mirrored() {
    for grammar in [expr_grammar(), stmt_grammar()].iter() {
        let graph = build_graph(grammar);
        for idx in 0..graph.len() {
            if let Some(target) = graph.transition(idx).target() {
                assert_eq!(
                    graph.state_item(target).item,
                    graph.state_item(idx).item + 1
                );
                assert!(graph.rev_transitions(target).contains(idx));
            }
        }
        for idx in 0..graph.len() {
            for source in graph.rev_transitions(idx).iter() {
                assert_eq!(graph.transition(source), TransitionTarget::To(idx));
            }
        }
    }
}

#[test]
fn production_edges_stay_within_their_state() {
    for grammar in [expr_grammar(), stmt_grammar()].iter() {
        let graph = build_graph(grammar);
        for idx in 0..graph.len() {
            let group = match graph.prods_lookup(idx) {
                Some(group) => group,
                None => continue
            };
            let next_sym = grammar.item_symbol(graph.state_item(idx).item).unwrap();
            for target in group.iter() {
                assert_eq!(graph.state_item(target).state, graph.state_item(idx).state);
                let rule = grammar.rule_of_item(graph.state_item(target).item);
                assert_eq!(grammar.rules[rule].lhs, next_sym);
                assert!(graph.rev_prods_lookup(target).unwrap().contains(idx));
            }
        }
    }
}

#[test]
fn lookaheads_propagate_by_sharing() {
    for grammar in [expr_grammar(), stmt_grammar()].iter() {
        let graph = build_graph(grammar);
        for idx in 0..graph.len() {
            if !graph.is_reduce_item(idx) {
                continue;
            }
            let lookahead = graph
                .state_item(idx)
                .lookahead
                .as_ref()
                .expect("reduce items carry a lookahead");
            assert!(!lookahead.is_empty());
            // everything reachable backwards over transitions shares it
            let mut queue = vec![idx];
            while let Some(current) = queue.pop() {
                let shared = graph.state_item(current).lookahead.as_ref().unwrap();
                assert!(Rc::ptr_eq(lookahead, shared));
                queue.extend(graph.rev_transitions(current).iter());
            }
        }
    }
}

#[test]
fn tfirsts_contain_terminals_only() {
    let grammar = stmt_grammar();
    let graph = build_graph(&grammar);
    for var in 0..grammar.nvars {
        for sym in graph.tfirsts(grammar.ntokens + var).iter() {
            assert!(grammar.is_token(sym));
        }
    }
    // stmt can begin with if and id, cond with id, opt_else with else
    let stmt = grammar.ntokens + 1;
    assert_eq!(
        graph.tfirsts(stmt).iter().collect::<Vec<usize>>(),
        vec![1, 4]
    );
    assert_eq!(
        graph.tfirsts(grammar.ntokens + 3).iter().collect::<Vec<usize>>(),
        vec![3]
    );
}

#[test]
fn disabling_a_transition_prunes_its_paths() {
    let mut grammar = expr_grammar();
    // resolve the shift/reduce conflict on + in favour of the reduction
    let conflict = {
        let graph = build_graph(&grammar);
        graph.state_item(find_item(&graph, "E -> E + E .")).state
    };
    for transition in grammar.states[conflict].transitions.iter_mut() {
        if transition.symbol == 1 {
            transition.disabled = true;
        }
    }
    let graph = build_graph(&grammar);
    let blocked = find_item(&graph, "E -> E + E .");
    // the item shifting + out of the conflict state is now unreachable
    let shifting = (0..graph.len()).find(|&idx| {
        graph.state_item(idx).state == graph.state_item(blocked).state
            && grammar.item_to_string(graph.state_item(idx).item) == "E -> E . + E"
    });
    assert_eq!(graph.transition(shifting.unwrap()), TransitionTarget::Disabled);
    // no enabled transition leads into a disabled state item
    for idx in 0..graph.len() {
        if let Some(target) = graph.transition(idx).target() {
            assert_ne!(graph.transition(target), TransitionTarget::Disabled);
        }
    }
}

#[test]
fn report_counts_match_the_graph() {
    let grammar = expr_grammar();
    let graph = build_graph(&grammar);
    let mut out = Vec::new();
    graph.report(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(&format!("# state items: {}", graph.len())));
    let transitions = (0..graph.len())
        .filter(|&idx| graph.transition(idx) != TransitionTarget::None)
        .count();
    assert!(text.contains(&format!("# transitions: {}", transitions)));
}
