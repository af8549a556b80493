// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod amd64;
mod assembler;
mod register_allocation;
mod template_manager;

pub use self::{
    amd64::{
        escape_string,
        Amd64ConditionCode,
        Amd64Register,
        Amd64RegisterNameMode,
    },
    assembler::Assembler,
    register_allocation::{
        AllocatableRegister,
        Allocation,
        RegisterAllocator,
    },
    template_manager::{
        InstructionTemplate,
        TemplateGenerator,
        TemplateManager,
        TemplatePredicate,
    },
};
