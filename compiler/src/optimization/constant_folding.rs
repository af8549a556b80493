// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use crate::rtl::Instruction;

use super::RtlOptimizer;

/// Replaces arithmetic on two integer literals by a move of the result.
#[derive(Debug, Default)]
pub struct ConstantFolder;

impl RtlOptimizer for ConstantFolder {
    fn name(&self) -> &'static str {
        "ConstantFolding"
    }

    fn is_useful(&self, instructions: &[Instruction]) -> bool {
        instructions.iter().any(|instruction| matches!(instruction, Instruction::Math { .. }))
    }

    fn optimize(&mut self, instructions: &mut Vec<Instruction>) -> bool {
        let mut changed = false;

        for instruction in instructions.iter_mut() {
            let Instruction::Math { operation, destination, lhs, rhs } = instruction else {
                continue;
            };

            let (Ok(lhs), Ok(rhs)) = (lhs.parse::<i64>(), rhs.parse::<i64>()) else {
                continue;
            };

            let Some(result) = operation.fold(lhs, rhs) else {
                continue;
            };

            *instruction = Instruction::Move {
                destination: std::mem::take(destination),
                source: result.to_string(),
            };
            changed = true;
        }

        changed
    }
}
