// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use super::{AssignedValue, BranchCondition, Call, Comparison, Data, Instruction, LabelKind, MathOperation, PrintValue, Return, VarType};

/// Appends instructions to a flat sequence. Nested regions are expressed by
/// the paired markers, never by nesting the sequence itself.
#[derive(Debug, Default)]
pub struct RtlBuilder {
    instructions: Vec<Instruction>,
}

impl RtlBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    #[must_use]
    pub fn build(self) -> Vec<Instruction> {
        self.instructions
    }

    pub fn mov(&mut self, destination: impl Into<String>, source: impl Into<String>) {
        self.push(Instruction::Move {
            destination: destination.into(),
            source: source.into(),
        });
    }

    pub fn math(&mut self, operation: MathOperation, destination: impl Into<String>, lhs: impl Into<String>, rhs: impl Into<String>) {
        self.push(Instruction::Math {
            operation,
            destination: destination.into(),
            lhs: lhs.into(),
            rhs: rhs.into(),
        });
    }

    pub fn compare(&mut self, lhs: impl Into<String>, rhs: impl Into<String>) {
        self.push(Instruction::Compare { lhs: lhs.into(), rhs: rhs.into() });
    }

    pub fn jump(&mut self, target: impl Into<String>) {
        self.push(Instruction::Jump { condition: None, target: target.into() });
    }

    pub fn jump_if(&mut self, condition: Comparison, target: impl Into<String>) {
        self.push(Instruction::Jump { condition: Some(condition), target: target.into() });
    }

    pub fn label(&mut self, name: impl Into<String>) {
        self.push(Instruction::Label { name: name.into(), kind: LabelKind::Plain });
    }

    pub fn function_label(&mut self, name: impl Into<String>) {
        self.push(Instruction::Label { name: name.into(), kind: LabelKind::Function });
    }

    pub fn print(&mut self, value: PrintValue) {
        self.push(Instruction::Call(Call::Print(value)));
    }

    pub fn print_variable(&mut self, name: impl Into<String>, var_type: Option<VarType>) {
        self.print(PrintValue::Variable { name: name.into(), var_type });
    }

    pub fn call_function(&mut self, name: impl Into<String>) {
        self.push(Instruction::Call(Call::Function { name: name.into() }));
    }

    pub fn exit(&mut self, exit_code: i64) {
        self.push(Instruction::Return(Return::Program { exit_code }));
    }

    pub fn return_value(&mut self, value: impl Into<String>) {
        self.push(Instruction::Return(Return::Value { value: value.into() }));
    }

    pub fn end_function(&mut self) {
        self.push(Instruction::Return(Return::EndOfFunction));
    }

    pub fn declare(&mut self, name: impl Into<String>) {
        self.push(Instruction::Data(Data::Declaration { name: name.into() }));
    }

    pub fn assign(&mut self, name: impl Into<String>, value: AssignedValue) {
        self.push(Instruction::Data(Data::Assignment { name: name.into(), value }));
    }

    pub fn inline_asm(&mut self, text: impl Into<String>) {
        self.push(Instruction::InlineAsm { text: text.into() });
    }

    pub fn syscall(&mut self, arguments: impl IntoIterator<Item = impl Into<String>>) {
        self.push(Instruction::Syscall {
            arguments: arguments.into_iter().map(Into::into).collect(),
        });
    }

    pub fn if_start(&mut self, condition: BranchCondition, end_label: &str, else_label: Option<&str>, is_elif_condition: bool) {
        self.push(Instruction::IfStart {
            condition,
            end_label: end_label.to_string(),
            else_label: else_label.map(str::to_string),
            is_elif_condition,
        });
    }

    pub fn else_start(&mut self, else_label: &str, end_label: &str, is_elif: bool) {
        self.push(Instruction::ElseStart {
            else_label: else_label.to_string(),
            end_label: end_label.to_string(),
            is_elif,
        });
    }

    pub fn if_end(&mut self, end_label: &str) {
        self.push(Instruction::IfEnd { end_label: end_label.to_string() });
    }

    pub fn while_start(&mut self, condition: BranchCondition, start_label: &str, end_label: &str) {
        self.push(Instruction::WhileStart {
            condition,
            start_label: start_label.to_string(),
            end_label: end_label.to_string(),
        });
    }

    pub fn while_end(&mut self, start_label: &str, end_label: &str) {
        self.push(Instruction::WhileEnd {
            start_label: start_label.to_string(),
            end_label: end_label.to_string(),
        });
    }
}
