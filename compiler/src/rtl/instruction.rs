// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use strum::{AsRefStr, EnumIter, EnumString};

/// The closed set of operation kinds an [`Instruction`] can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OpKind {
    Move,
    Call,
    Return,
    Label,
    Data,
    InlineAsm,
    Load,
    Store,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Compare,
    Jump,
    JumpConditional,
    Push,
    Pop,
    Syscall,
    IfStart,
    ElseStart,
    IfEnd,
    WhileStart,
    WhileEnd,
    ForStart,
    ForEnd,
}

impl Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum MathOperation {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl MathOperation {
    #[must_use]
    pub const fn kind(&self) -> OpKind {
        match self {
            Self::Add => OpKind::Add,
            Self::Sub => OpKind::Sub,
            Self::Mul => OpKind::Mul,
            Self::Div => OpKind::Div,
            Self::And => OpKind::And,
            Self::Or => OpKind::Or,
            Self::Xor => OpKind::Xor,
            Self::Shl => OpKind::Shl,
            Self::Shr => OpKind::Shr,
        }
    }

    /// Computes the result when both operands are known, with the 32-bit
    /// signed arithmetic the generated code performs. Returns `None` for
    /// operands outside that range and for operations that trap or depend on
    /// masking (division by zero, overflowing division, shifts of 32 or more).
    #[must_use]
    pub fn fold(&self, lhs: i64, rhs: i64) -> Option<i64> {
        let (Ok(lhs), Ok(rhs)) = (i32::try_from(lhs), i32::try_from(rhs)) else {
            return None;
        };

        let result = match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Div => lhs.checked_div(rhs)?,
            Self::And => lhs & rhs,
            Self::Or => lhs | rhs,
            Self::Xor => lhs ^ rhs,
            Self::Shl => lhs.checked_shl(u32::try_from(rhs).ok()?)?,
            Self::Shr => lhs.checked_shr(u32::try_from(rhs).ok()?)?,
        };

        Some(i64::from(result))
    }
}

/// One of the six relational operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, EnumIter, EnumString)]
pub enum Comparison {
    #[strum(serialize = "==")]
    Equal,

    #[strum(serialize = "!=")]
    NotEqual,

    #[strum(serialize = "<")]
    Less,

    #[strum(serialize = "<=")]
    LessOrEqual,

    #[strum(serialize = ">")]
    Greater,

    #[strum(serialize = ">=")]
    GreaterOrEqual,
}

impl Comparison {
    /// The comparison that holds exactly when this one doesn't.
    #[must_use]
    pub const fn inverse(&self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::Less => Self::GreaterOrEqual,
            Self::LessOrEqual => Self::Greater,
            Self::Greater => Self::LessOrEqual,
            Self::GreaterOrEqual => Self::Less,
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// The type the lowering stage observed for a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum VarType {
    Int,
    String,
    Uninitialized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchCondition {
    Compare {
        left: String,
        comparison: Comparison,
        right: String,
    },

    /// Taken when the operand is non-zero.
    Truthy(String),
}

impl BranchCondition {
    #[must_use]
    pub fn operands(&self) -> Vec<&str> {
        match self {
            Self::Compare { left, right, .. } => vec![left.as_str(), right.as_str()],
            Self::Truthy(operand) => vec![operand.as_str()],
        }
    }
}

impl Display for BranchCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compare { left, comparison, right } => write!(f, "{left} {comparison} {right}"),
            Self::Truthy(operand) => f.write_str(operand),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Plain,

    /// Starts a function body, which runs until the matching
    /// [`Return::EndOfFunction`].
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Print(PrintValue),
    Function {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintValue {
    Integer(i64),
    String(String),
    Variable {
        name: String,
        var_type: Option<VarType>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Return {
    /// Leaves the program with the given exit code.
    Program {
        exit_code: i64,
    },

    /// `return` inside a function body.
    Value {
        value: String,
    },

    /// The epilogue of a function, emitted even without an explicit return.
    EndOfFunction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    Declaration {
        name: String,
    },
    Assignment {
        name: String,
        value: AssignedValue,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignedValue {
    Integer(i64),
    String(String),
    Variable(String),
}

impl AssignedValue {
    /// The type of the value, if it can be known without looking at other
    /// variables.
    #[must_use]
    pub const fn value_type(&self) -> Option<VarType> {
        match self {
            Self::Integer(..) => Some(VarType::Int),
            Self::String(..) => Some(VarType::String),
            Self::Variable(..) => None,
        }
    }
}

impl Display for AssignedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => value.fmt(f),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Variable(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    //
    // Values
    //

    Move {
        destination: String,
        source: String,
    },

    Math {
        operation: MathOperation,
        destination: String,
        lhs: String,
        rhs: String,
    },

    Compare {
        lhs: String,
        rhs: String,
    },

    Load {
        destination: String,
        address: String,
    },

    Store {
        address: String,
        source: String,
    },

    Push {
        operand: String,
    },

    Pop {
        destination: String,
    },

    Data(Data),

    //
    // Control Flow
    //

    /// Jump when the condition is met, or always when there is none.
    Jump {
        condition: Option<Comparison>,
        target: String,
    },

    Label {
        name: String,
        kind: LabelKind,
    },

    Call(Call),

    Return(Return),

    Syscall {
        arguments: Vec<String>,
    },

    InlineAsm {
        text: String,
    },

    //
    // Region markers
    //

    IfStart {
        condition: BranchCondition,
        end_label: String,

        /// Where to go when the condition fails, if not to `end_label`.
        else_label: Option<String>,
        is_elif_condition: bool,
    },

    ElseStart {
        else_label: String,
        end_label: String,
        is_elif: bool,
    },

    IfEnd {
        end_label: String,
    },

    WhileStart {
        condition: BranchCondition,
        start_label: String,
        end_label: String,
    },

    WhileEnd {
        start_label: String,
        end_label: String,
    },

    ForStart {
        variable: String,
        init: String,
        bound: String,
        step: i64,
        start_label: String,
        end_label: String,
    },

    ForEnd {
        variable: String,
        step: i64,
        start_label: String,
        end_label: String,
    },
}

impl Instruction {
    #[must_use]
    pub const fn kind(&self) -> OpKind {
        match self {
            Self::Move { .. } => OpKind::Move,
            Self::Math { operation, .. } => operation.kind(),
            Self::Compare { .. } => OpKind::Compare,
            Self::Load { .. } => OpKind::Load,
            Self::Store { .. } => OpKind::Store,
            Self::Push { .. } => OpKind::Push,
            Self::Pop { .. } => OpKind::Pop,
            Self::Data(..) => OpKind::Data,
            Self::Jump { condition: None, .. } => OpKind::Jump,
            Self::Jump { condition: Some(..), .. } => OpKind::JumpConditional,
            Self::Label { .. } => OpKind::Label,
            Self::Call(..) => OpKind::Call,
            Self::Return(..) => OpKind::Return,
            Self::Syscall { .. } => OpKind::Syscall,
            Self::InlineAsm { .. } => OpKind::InlineAsm,
            Self::IfStart { .. } => OpKind::IfStart,
            Self::ElseStart { .. } => OpKind::ElseStart,
            Self::IfEnd { .. } => OpKind::IfEnd,
            Self::WhileStart { .. } => OpKind::WhileStart,
            Self::WhileEnd { .. } => OpKind::WhileEnd,
            Self::ForStart { .. } => OpKind::ForStart,
            Self::ForEnd { .. } => OpKind::ForEnd,
        }
    }

    /// The operand this instruction writes to, for the instructions that
    /// produce a value.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::Move { destination, .. }
                | Self::Math { destination, .. }
                | Self::Load { destination, .. }
                | Self::Pop { destination } => Some(destination.as_str()),
            _ => None,
        }
    }

    /// Every operand this instruction reads.
    #[must_use]
    pub fn sources(&self) -> Vec<&str> {
        match self {
            Self::Move { source, .. } => vec![source.as_str()],
            Self::Math { lhs, rhs, .. } => vec![lhs.as_str(), rhs.as_str()],
            Self::Compare { lhs, rhs } => vec![lhs.as_str(), rhs.as_str()],
            Self::Load { address, .. } => vec![address.as_str()],
            Self::Store { source, .. } => vec![source.as_str()],
            Self::Push { operand } => vec![operand.as_str()],
            Self::Data(Data::Assignment { value: AssignedValue::Variable(name), .. }) => vec![name.as_str()],
            Self::Call(Call::Print(PrintValue::Variable { name, .. })) => vec![name.as_str()],
            Self::Return(Return::Value { value }) => vec![value.as_str()],
            Self::Syscall { arguments } => arguments.iter().map(String::as_str).collect(),
            Self::IfStart { condition, .. } => condition.operands(),
            Self::WhileStart { condition, .. } => condition.operands(),
            Self::ForStart { init, bound, .. } => vec![init.as_str(), bound.as_str()],
            Self::ForEnd { variable, .. } => vec![variable.as_str()],
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_region_marker(&self) -> bool {
        matches!(self.kind(), OpKind::IfStart | OpKind::ElseStart | OpKind::IfEnd
            | OpKind::WhileStart | OpKind::WhileEnd | OpKind::ForStart | OpKind::ForEnd)
    }

    #[must_use]
    pub const fn is_function_start(&self) -> bool {
        matches!(self, Self::Label { kind: LabelKind::Function, .. })
    }

    #[must_use]
    pub const fn is_function_end(&self) -> bool {
        matches!(self, Self::Return(Return::EndOfFunction))
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = self.kind();

        match self {
            Self::Move { destination, source } => write!(f, "{kind} {destination}, {source}"),
            Self::Math { destination, lhs, rhs, .. } => write!(f, "{kind} {destination}, {lhs}, {rhs}"),
            Self::Compare { lhs, rhs } => write!(f, "{kind} {lhs}, {rhs}"),
            Self::Load { destination, address } => write!(f, "{kind} {destination}, [{address}]"),
            Self::Store { address, source } => write!(f, "{kind} [{address}], {source}"),
            Self::Push { operand } => write!(f, "{kind} {operand}"),
            Self::Pop { destination } => write!(f, "{kind} {destination}"),

            Self::Data(Data::Declaration { name }) => write!(f, "{kind} {name} (declaration)"),
            Self::Data(Data::Assignment { name, value }) => write!(f, "{kind} {name}, {value}"),

            Self::Jump { condition: None, target } => write!(f, "{kind} {target}"),
            Self::Jump { condition: Some(condition), target } => write!(f, "{kind} {condition} {target}"),

            Self::Label { name, kind: LabelKind::Plain } => write!(f, "{kind} {name}"),
            Self::Label { name, kind: LabelKind::Function } => write!(f, "{kind} {name} (function)"),

            Self::Call(Call::Function { name }) => write!(f, "{kind} {name}"),
            Self::Call(Call::Print(PrintValue::Integer(value))) => write!(f, "{kind} print {value}"),
            Self::Call(Call::Print(PrintValue::String(value))) => write!(f, "{kind} print {value:?}"),
            Self::Call(Call::Print(PrintValue::Variable { name, var_type })) => {
                write!(f, "{kind} print {name}")?;
                if let Some(var_type) = var_type {
                    write!(f, " ({})", var_type.as_ref())?;
                }
                Ok(())
            }

            Self::Return(Return::Program { exit_code }) => write!(f, "{kind} {exit_code}"),
            Self::Return(Return::Value { value }) => write!(f, "{kind} {value} (function)"),
            Self::Return(Return::EndOfFunction) => write!(f, "{kind} (end of function)"),

            Self::Syscall { arguments } => write!(f, "{kind} {}", arguments.join(", ")),
            Self::InlineAsm { text } => write!(f, "{kind} {text:?}"),

            Self::IfStart { condition, end_label, else_label, is_elif_condition } => {
                write!(f, "{kind} {condition} end={end_label}")?;
                if let Some(else_label) = else_label {
                    write!(f, " else={else_label}")?;
                }
                if *is_elif_condition {
                    f.write_str(" (elif)")?;
                }
                Ok(())
            }
            Self::ElseStart { else_label, end_label, is_elif } => {
                write!(f, "{kind} {else_label} end={end_label}")?;
                if *is_elif {
                    f.write_str(" (elif)")?;
                }
                Ok(())
            }
            Self::IfEnd { end_label } => write!(f, "{kind} {end_label}"),

            Self::WhileStart { condition, start_label, end_label } => write!(f, "{kind} {condition} {start_label}..{end_label}"),
            Self::WhileEnd { start_label, end_label } => write!(f, "{kind} {start_label}..{end_label}"),

            Self::ForStart { variable, init, bound, step, start_label, end_label } => {
                write!(f, "{kind} {variable} = {init} to {bound} step {step} {start_label}..{end_label}")
            }
            Self::ForEnd { variable, step, start_label, end_label } => {
                write!(f, "{kind} {variable} += {step} {start_label}..{end_label}")
            }
        }
    }
}
