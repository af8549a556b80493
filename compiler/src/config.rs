// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use serde::Deserialize;

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationLevel {
    /// No passes; every variable lives in memory.
    None,

    /// One sweep of the passes; variables get registers.
    Basic,

    /// The passes run until nothing changes anymore.
    #[default]
    Full,
}

impl OptimizationLevel {
    #[must_use]
    pub const fn as_number(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Basic => 1,
            Self::Full => 2,
        }
    }

    #[must_use]
    pub const fn from_number(level: u8) -> Self {
        match level {
            0 => Self::None,
            1 => Self::Basic,
            _ => Self::Full,
        }
    }

    #[must_use]
    pub const fn allocates_registers(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// What to do with an instruction no template can generate code for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Warn and leave the instruction out.
    #[default]
    Lenient,

    /// Fail the compilation.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct CodegenConfig {
    pub optimization_level: OptimizationLevel,
    pub max_iterations: usize,
    pub selection_mode: SelectionMode,
}

impl CodegenConfig {
    pub const DEFAULT_MAX_ITERATIONS: usize = 10;

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    #[must_use]
    pub fn with_optimization_level(mut self, level: OptimizationLevel) -> Self {
        self.optimization_level = level;
        self
    }

    #[must_use]
    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            optimization_level: OptimizationLevel::default(),
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            selection_mode: SelectionMode::default(),
        }
    }
}
