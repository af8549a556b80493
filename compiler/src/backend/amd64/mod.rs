// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod condition_code;
mod register;
mod templates;

pub use self::{
    condition_code::Amd64ConditionCode,
    register::{
        Amd64Register,
        Amd64RegisterNameMode,
    },
    templates::{
        escape_string,
        register_default_templates,
    },
};
