// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use pretty_assertions::assert_eq;
use rstest::rstest;
use sig::{Atom, Expression, Literal, Statement};
use sig_compiler::{lower_to_rtl, Instruction, OptimizationLevel, OptimizationManager};

fn program() -> Vec<Statement> {
    vec![
        Statement::assign("a", Expression::Sum(Atom::Integer(2), Atom::Integer(3))),
        Statement::print_variable("a"),
        Statement::assign("unused", Expression::Sum(Atom::Integer(1), Atom::Integer(1))),
        Statement::print(Literal::String("done".into())),
        Statement::ret(0),
    ]
}

#[test]
fn no_optimization_keeps_every_instruction() {
    let lowered = lower_to_rtl(&program()).unwrap();
    let mut instructions = lowered.clone();

    let iterations = OptimizationManager::default().optimize(&mut instructions, OptimizationLevel::None);

    assert_eq!(iterations, 0);
    assert_eq!(instructions, lowered);
}

#[rstest]
#[case(OptimizationLevel::Basic)]
#[case(OptimizationLevel::Full)]
fn folding_and_dead_code(#[case] level: OptimizationLevel) {
    let mut instructions = lower_to_rtl(&program()).unwrap();

    OptimizationManager::default().optimize(&mut instructions, level);

    assert_eq!(instructions[0], Instruction::Move { destination: "a".into(), source: "5".into() });
    assert!(!instructions.iter().any(|insn| insn.destination() == Some("unused")));
    assert_eq!(instructions.len(), 4);
}

#[test]
fn optimizing_twice_changes_nothing() {
    let mut instructions = lower_to_rtl(&program()).unwrap();
    let mut manager = OptimizationManager::default();

    manager.optimize(&mut instructions, OptimizationLevel::Full);
    let optimized = instructions.clone();

    assert_eq!(manager.optimize(&mut instructions, OptimizationLevel::Full), 1);
    assert_eq!(instructions, optimized);
}
