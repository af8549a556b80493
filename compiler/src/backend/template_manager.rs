// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use log::debug;

use crate::{rtl::Instruction, CodeGenContext, SelectionError};

pub type TemplatePredicate = fn(&Instruction) -> bool;

/// Appends the assembly for one instruction to the output.
pub type TemplateGenerator = fn(&Instruction, &mut CodeGenContext, &mut String) -> Result<(), SelectionError>;

/// One way of turning an RTL instruction into assembly text.
#[derive(Debug, Clone)]
pub struct InstructionTemplate {
    pattern_name: &'static str,
    description: &'static str,
    cost: u32,
    predicate: TemplatePredicate,
    generator: TemplateGenerator,
}

impl InstructionTemplate {
    #[must_use]
    pub const fn new(
        pattern_name: &'static str,
        description: &'static str,
        cost: u32,
        predicate: TemplatePredicate,
        generator: TemplateGenerator,
    ) -> Self {
        Self {
            pattern_name,
            description,
            cost,
            predicate,
            generator,
        }
    }

    #[must_use]
    pub const fn pattern_name(&self) -> &'static str {
        self.pattern_name
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        self.description
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    #[must_use]
    pub fn matches(&self, instruction: &Instruction) -> bool {
        (self.predicate)(instruction)
    }

    pub fn generate(&self, instruction: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
        (self.generator)(instruction, ctx, out)
    }
}

/// The ordered collection of templates, searched for the cheapest match.
#[derive(Debug, Clone)]
pub struct TemplateManager {
    templates: Vec<InstructionTemplate>,
}

impl Default for TemplateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateManager {
    /// Creates a manager with the AMD64 templates registered.
    #[must_use]
    pub fn new() -> Self {
        let mut manager = Self::empty();
        super::amd64::register_default_templates(&mut manager);
        debug!("Registered {} instruction templates", manager.templates.len());
        manager
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self {
            templates: Vec::new(),
        }
    }

    pub fn add_template(&mut self, template: InstructionTemplate) {
        self.templates.push(template);
    }

    #[must_use]
    pub fn templates(&self) -> &[InstructionTemplate] {
        &self.templates
    }

    /// Returns the cheapest template that matches. Of templates with the same
    /// cost, the one registered first wins.
    #[must_use]
    pub fn select(&self, instruction: &Instruction) -> Option<&InstructionTemplate> {
        let mut best: Option<&InstructionTemplate> = None;

        for template in &self.templates {
            if !template.matches(instruction) {
                continue;
            }

            if best.map_or(true, |best| template.cost < best.cost) {
                best = Some(template);
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    use super::*;
    use crate::rtl::{Call, OpKind, PrintValue, VarType};
    use pretty_assertions::assert_eq;

    fn is_print(instruction: &Instruction) -> bool {
        matches!(instruction, Instruction::Call(Call::Print(..)))
    }

    fn write_name(_: &Instruction, _: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
        out.write_str("written")?;
        Ok(())
    }

    #[test]
    fn cheapest_template_wins() {
        let mut manager = TemplateManager::empty();
        manager.add_template(InstructionTemplate::new("expensive", "", 3, is_print, write_name));
        manager.add_template(InstructionTemplate::new("cheap", "", 1, is_print, write_name));

        let instruction = Instruction::Call(Call::Print(PrintValue::Integer(1)));
        assert_eq!(manager.select(&instruction).map(InstructionTemplate::pattern_name), Some("cheap"));
    }

    #[test]
    fn first_registered_wins_ties() {
        let mut manager = TemplateManager::empty();
        manager.add_template(InstructionTemplate::new("first", "", 1, is_print, write_name));
        manager.add_template(InstructionTemplate::new("second", "", 1, is_print, write_name));

        let instruction = Instruction::Call(Call::Print(PrintValue::Integer(1)));
        for _ in 0..3 {
            assert_eq!(manager.select(&instruction).map(InstructionTemplate::pattern_name), Some("first"));
        }
    }

    #[test]
    fn no_match_gives_none() {
        let manager = TemplateManager::empty();
        assert!(manager.select(&Instruction::IfEnd { end_label: "x".into() }).is_none());
    }

    #[test]
    fn known_string_variable_beats_generic_print() {
        let manager = TemplateManager::new();

        let known = Instruction::Call(Call::Print(PrintValue::Variable { name: "s".into(), var_type: Some(VarType::String) }));
        let unknown = Instruction::Call(Call::Print(PrintValue::Variable { name: "s".into(), var_type: None }));

        assert_eq!(manager.select(&known).map(InstructionTemplate::pattern_name), Some("print_string_variable"));
        assert_eq!(manager.select(&known).map(InstructionTemplate::description), Some("Print string variable"));
        assert_eq!(manager.select(&unknown).map(InstructionTemplate::pattern_name), Some("print_variable_generic"));
        assert_eq!(manager.select(&unknown).map(InstructionTemplate::cost), Some(2));
    }

    #[test]
    fn default_templates_cover_every_lowered_kind() {
        let manager = TemplateManager::new();
        let kinds = [
            Instruction::Call(Call::Function { name: "f".into() }),
            Instruction::Label { name: "f".into(), kind: crate::rtl::LabelKind::Function },
            Instruction::IfEnd { end_label: "if_end0".into() },
            Instruction::InlineAsm { text: "nop".into() },
        ];

        for instruction in &kinds {
            assert!(manager.select(instruction).is_some(), "no template for {}", instruction.kind());
        }

        assert_eq!(kinds[0].kind(), OpKind::Call);
    }
}
