// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Literal {
    Integer(i64),
    String(String),
}

/// The smallest value an expression or condition can refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Atom {
    Integer(i64),
    Variable(String),
}

impl Atom {
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    #[must_use]
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            Self::Integer(..) => None,
        }
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => value.fmt(f),
            Self::Variable(name) => f.write_str(name),
        }
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Self::Variable(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Expression {
    Literal(Literal),
    Variable(String),

    /// `lhs + rhs`
    Sum(Atom, Atom),
}

impl From<Literal> for Expression {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    /// The operator is kept as written, so the code generator can reject
    /// anything it doesn't understand.
    Compare {
        left: Atom,
        operator: String,
        right: Atom,
    },

    /// Non-zero means true.
    Truthy(Atom),
}

impl Condition {
    #[must_use]
    pub fn compare(left: impl Into<Atom>, operator: &str, right: impl Into<Atom>) -> Self {
        Self::Compare {
            left: left.into(),
            operator: operator.to_string(),
            right: right.into(),
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compare { left, operator, right } => write!(f, "{left} {operator} {right}"),
            Self::Truthy(atom) => atom.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Condition::compare("a", "==", 5_i64), "a == 5")]
    #[case(Condition::compare(-3_i64, ">=", "teller"), "-3 >= teller")]
    #[case(Condition::Truthy(Atom::variable("x")), "x")]
    fn condition_display(#[case] condition: Condition, #[case] expected: &str) {
        assert_eq!(condition.to_string(), expected);
    }

    #[test]
    fn tree_deserializes_from_json() {
        let condition: Condition = serde_json::from_str(r#"{"compare":{"left":{"variable":"a"},"operator":"<","right":{"integer":3}}}"#)
            .expect("valid condition");
        assert_eq!(condition, Condition::compare("a", "<", 3_i64));
    }
}
