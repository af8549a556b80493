// Copyright (C) 2024 - 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use log::debug;
use sig::Statement;

use crate::{backend::Assembler, lower_to_rtl, CodegenConfig, CompileError, OptimizationManager};

/// What an empty program compiles to: it only exits.
pub const EMPTY_PROGRAM: &str = "section .text\nglobal _start\n\n_start:\n    mov rax, 60\n    xor rdi, rdi\n    syscall\n";

/// Compiles a statement tree to NASM assembly for Linux on AMD64, with the
/// default configuration.
pub fn generate_asm(statements: &[Statement]) -> Result<String, CompileError> {
    generate_asm_with_config(statements, &CodegenConfig::default())
}

pub fn generate_asm_with_config(statements: &[Statement], config: &CodegenConfig) -> Result<String, CompileError> {
    if statements.is_empty() {
        debug!("Empty program, only emitting an exit");
        return Ok(EMPTY_PROGRAM.to_string());
    }

    let mut instructions = lower_to_rtl(statements)?;
    debug!("Lowered {} statements to {} instructions", statements.len(), instructions.len());

    let mut optimizer = OptimizationManager::new(config.max_iterations);
    let iterations = optimizer.optimize(&mut instructions, config.optimization_level);
    debug!("Optimized in {iterations} iteration(s) at level {}", config.optimization_level.as_number());

    for instruction in &instructions {
        debug!("    {instruction}");
    }

    let output = Assembler::new(config).assemble(&instructions)?;
    Ok(output)
}
