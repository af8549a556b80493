// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod constant_folding;
mod dead_code;
mod peephole;

use log::debug;

pub use self::{
    constant_folding::ConstantFolder,
    dead_code::DeadCodeEliminator,
    peephole::PeepholeOptimizer,
};

use crate::{rtl::Instruction, OptimizationLevel};

/// A stateless transformation over the whole RTL sequence.
pub trait RtlOptimizer {
    #[must_use]
    fn name(&self) -> &'static str;

    /// Returns whether or not running the optimization is likely to be useful,
    /// e.g. actually optimizing something.
    #[must_use]
    fn is_useful(&self, instructions: &[Instruction]) -> bool {
        _ = instructions;
        true
    }

    /// Returns whether anything changed.
    fn optimize(&mut self, instructions: &mut Vec<Instruction>) -> bool;
}

/// Runs constant folding, dead-code elimination and the peephole optimizer,
/// in that order, until none of them changes anything.
pub struct OptimizationManager {
    passes: Vec<Box<dyn RtlOptimizer>>,
    max_iterations: usize,
}

impl std::fmt::Debug for OptimizationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizationManager")
            .field("passes", &self.passes.iter().map(|pass| pass.name()).collect::<Vec<_>>())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl Default for OptimizationManager {
    fn default() -> Self {
        Self::new(crate::CodegenConfig::DEFAULT_MAX_ITERATIONS)
    }
}

impl OptimizationManager {
    #[must_use]
    pub fn new(max_iterations: usize) -> Self {
        Self {
            passes: vec![
                Box::new(ConstantFolder),
                Box::new(DeadCodeEliminator),
                Box::new(PeepholeOptimizer),
            ],
            max_iterations,
        }
    }

    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Optimizes according to `level`, and returns the number of sweeps over
    /// the passes that were made.
    pub fn optimize(&mut self, instructions: &mut Vec<Instruction>, level: OptimizationLevel) -> usize {
        match level {
            OptimizationLevel::None => 0,
            OptimizationLevel::Basic => {
                self.sweep(instructions);
                1
            }
            OptimizationLevel::Full => self.run_to_fixed_point(instructions),
        }
    }

    pub fn run_to_fixed_point(&mut self, instructions: &mut Vec<Instruction>) -> usize {
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;

            if !self.sweep(instructions) {
                debug!("Fixed point reached after {iterations} iteration(s)");
                return iterations;
            }
        }

        debug!("Stopped optimizing after {iterations} iteration(s)");
        iterations
    }

    /// Runs every pass once.
    fn sweep(&mut self, instructions: &mut Vec<Instruction>) -> bool {
        let mut changed = false;

        for pass in &mut self.passes {
            if !pass.is_useful(instructions) {
                continue;
            }

            if pass.optimize(instructions) {
                debug!("{} changed the sequence, {} instruction(s) left", pass.name(), instructions.len());
                changed = true;
            }
        }

        changed
    }
}
