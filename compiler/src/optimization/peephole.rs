// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use crate::rtl::Instruction;

use super::RtlOptimizer;

/// Local rewrites over adjacent moves:
///
/// * `mov r, v` followed by `mov r2, r` reads `v` directly in the second move.
///   The first move is left for [`super::DeadCodeEliminator`] to remove once
///   nothing reads `r` anymore.
/// * `mov r, r` is removed.
#[derive(Debug, Default)]
pub struct PeepholeOptimizer;

impl RtlOptimizer for PeepholeOptimizer {
    fn name(&self) -> &'static str {
        "Peephole"
    }

    fn is_useful(&self, instructions: &[Instruction]) -> bool {
        instructions.iter().any(|instruction| matches!(instruction, Instruction::Move { .. }))
    }

    fn optimize(&mut self, instructions: &mut Vec<Instruction>) -> bool {
        let before = instructions.len();
        instructions.retain(|instruction| {
            !matches!(instruction, Instruction::Move { destination, source } if destination == source)
        });

        let mut changed = instructions.len() != before;

        // Walking forwards lets a rewritten move feed the next one, so whole
        // chains collapse in a single run.
        for index in 1..instructions.len() {
            let (head, tail) = instructions.split_at_mut(index);

            let (Instruction::Move { destination: previous, source: value }, Instruction::Move { source, .. }) = (&head[index - 1], &mut tail[0]) else {
                continue;
            };

            if source == previous && source != value {
                *source = value.clone();
                changed = true;
            }
        }

        changed
    }
}
