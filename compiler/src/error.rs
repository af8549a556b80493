// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use thiserror::Error;

use crate::rtl::OpKind;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lowering(#[from] LoweringError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// The statement tree has a shape the code generator can't express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error("unknown relational operator `{operator}`")]
    UnknownOperator { operator: String },

    #[error("function `{name}` is defined inside function `{parent}`")]
    NestedFunction { name: String, parent: String },

    #[error("function definition without a name")]
    EmptyFunctionName,

    #[error("for loop without an induction variable")]
    MissingInductionVariable,

    #[error("for loop over `{variable}` has a step of zero")]
    ZeroStep { variable: String },

    #[error("`{name}` is a register name and cannot name a variable or function")]
    ReservedName { name: String },

    #[error("integer {value} does not fit in 32 bits")]
    IntegerOutOfRange { value: i64 },
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no template matches {kind} instruction `{instruction}`")]
    NoTemplate { kind: OpKind, instruction: String },

    #[error("template `{template}` cannot generate code for a {kind} instruction")]
    Malformed { template: &'static str, kind: OpKind },

    #[error("`{name}` holds an integer and cannot be assigned a string")]
    StringInIntegerVariable { name: String },

    #[error("failed to write assembly: {0}")]
    Format(#[from] std::fmt::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
