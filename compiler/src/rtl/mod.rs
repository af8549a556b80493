// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The register transfer language: a flat list of instructions sitting
//! between the statement tree and the assembly text.

mod builder;
mod instruction;

pub use self::{
    builder::RtlBuilder,
    instruction::{
        AssignedValue,
        BranchCondition,
        Call,
        Comparison,
        Data,
        Instruction,
        LabelKind,
        MathOperation,
        OpKind,
        PrintValue,
        Return,
        VarType,
    },
};
