// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use serde::{Deserialize, Serialize};

use crate::{Atom, Condition, Expression, Literal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Statement {
    Asm(AsmStatement),
    Assign(AssignStatement),
    Call(CallStatement),
    Declare(DeclareStatement),
    For(ForStatement),
    Function(FunctionStatement),
    If(IfStatement),
    Print(PrintStatement),
    PrintVariable(PrintVariableStatement),
    Return(ReturnStatement),
    While(WhileStatement),
}

impl Statement {
    #[must_use]
    pub const fn is_control_flow(&self) -> bool {
        matches!(self, Self::For(..) | Self::If(..) | Self::While(..))
    }

    #[must_use]
    pub fn asm(text: impl Into<String>) -> Self {
        Self::Asm(AsmStatement { text: text.into() })
    }

    #[must_use]
    pub fn assign(name: impl Into<String>, value: impl Into<Expression>) -> Self {
        Self::Assign(AssignStatement { name: name.into(), value: value.into() })
    }

    #[must_use]
    pub fn call(name: impl Into<String>) -> Self {
        Self::Call(CallStatement { name: name.into() })
    }

    #[must_use]
    pub fn declare(name: impl Into<String>) -> Self {
        Self::Declare(DeclareStatement { name: name.into() })
    }

    #[must_use]
    pub fn function(name: impl Into<String>, body: Vec<Statement>) -> Self {
        Self::Function(FunctionStatement { name: name.into(), body })
    }

    #[must_use]
    pub fn print(value: Literal) -> Self {
        Self::Print(PrintStatement { value })
    }

    #[must_use]
    pub fn print_variable(name: impl Into<String>) -> Self {
        Self::PrintVariable(PrintVariableStatement { name: name.into() })
    }

    #[must_use]
    pub const fn ret(value: i64) -> Self {
        Self::Return(ReturnStatement { value })
    }
}

/// Text that is copied into the output as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmStatement {
    pub text: String,
}

/// `let name = value;` or `name = value;`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignStatement {
    pub name: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStatement {
    pub name: String,
}

/// `let name;`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclareStatement {
    pub name: String,
}

/// Counts `variable` from `init` up to and including `bound`, adding `step`
/// after every iteration. A negative step counts down to the bound instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForStatement {
    pub variable: String,
    pub init: Atom,
    pub bound: Atom,
    pub step: i64,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionStatement {
    pub name: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfStatement {
    pub condition: Condition,
    pub then_block: Vec<Statement>,

    #[serde(default)]
    pub elif_clauses: Vec<ElifClause>,

    #[serde(default)]
    pub else_block: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElifClause {
    pub condition: Condition,
    pub block: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintStatement {
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintVariableStatement {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnStatement {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhileStatement {
    pub condition: Condition,
    pub body: Vec<Statement>,
}
