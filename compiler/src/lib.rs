// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Compiles `sig` statement trees to NASM assembly for Linux on AMD64.
//!
//! The tree is lowered to RTL, optimized, and then turned into text by
//! cost-based instruction templates. See [`generate_asm`].

mod backend;
mod config;
mod context;
mod error;
mod lowering;
mod optimization;
mod pipeline;
pub mod rtl;

pub use self::{
    backend::{
        escape_string,
        AllocatableRegister,
        Allocation,
        Amd64ConditionCode,
        Amd64Register,
        Amd64RegisterNameMode,
        Assembler,
        InstructionTemplate,
        RegisterAllocator,
        TemplateGenerator,
        TemplateManager,
        TemplatePredicate,
    },
    config::{
        CodegenConfig,
        OptimizationLevel,
        SelectionMode,
    },
    context::{
        CodeGenContext,
        Location,
    },
    error::{
        CompileError,
        ConfigError,
        LoweringError,
        SelectionError,
    },
    lowering::lower_to_rtl,
    optimization::{
        ConstantFolder,
        DeadCodeEliminator,
        OptimizationManager,
        PeepholeOptimizer,
        RtlOptimizer,
    },
    pipeline::{
        generate_asm,
        generate_asm_with_config,
        EMPTY_PROGRAM,
    },
    rtl::{
        Instruction,
        OpKind,
    },
};
