// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use crate::rtl::Comparison;

/// The suffix of a `jcc` instruction, e.g. `ge` in `jge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amd64ConditionCode {
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    NotEqual,
}

impl From<Comparison> for Amd64ConditionCode {
    fn from(value: Comparison) -> Self {
        match value {
            Comparison::Equal => Self::Equal,
            Comparison::NotEqual => Self::NotEqual,
            Comparison::Less => Self::Less,
            Comparison::LessOrEqual => Self::LessOrEqual,
            Comparison::Greater => Self::Greater,
            Comparison::GreaterOrEqual => Self::GreaterOrEqual,
        }
    }
}

impl Display for Amd64ConditionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equal => f.write_str("e"),
            Self::Greater => f.write_str("g"),
            Self::GreaterOrEqual => f.write_str("ge"),
            Self::Less => f.write_str("l"),
            Self::LessOrEqual => f.write_str("le"),
            Self::NotEqual => f.write_str("ne"),
        }
    }
}
