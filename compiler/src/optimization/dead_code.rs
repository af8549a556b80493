// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::HashSet;

use crate::{backend::Amd64Register, rtl::Instruction};

use super::RtlOptimizer;

/// Removes moves into variables that nothing in the whole sequence reads.
///
/// Liveness is approximated over the entire program rather than per block, so
/// a variable read anywhere keeps every move into it alive. Moves into
/// physical registers are always kept, since syscalls and calls read those
/// implicitly.
#[derive(Debug, Default)]
pub struct DeadCodeEliminator;

impl RtlOptimizer for DeadCodeEliminator {
    fn name(&self) -> &'static str {
        "DeadCodeElimination"
    }

    /// Inline assembly may read anything.
    fn is_useful(&self, instructions: &[Instruction]) -> bool {
        !instructions.iter().any(|instruction| matches!(instruction, Instruction::InlineAsm { .. }))
    }

    fn optimize(&mut self, instructions: &mut Vec<Instruction>) -> bool {
        let used: HashSet<String> = instructions.iter()
            .rev()
            .flat_map(Instruction::sources)
            .map(str::to_string)
            .collect();

        let before = instructions.len();

        instructions.retain(|instruction| {
            let Instruction::Move { destination, .. } = instruction else {
                return true;
            };

            used.contains(destination) || Amd64Register::from_name(destination).is_some()
        });

        instructions.len() != before
    }
}
