// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Write;

use log::{debug, trace, warn};

use crate::{
    rtl::{Instruction, Return},
    CodeGenContext,
    CodegenConfig,
    SelectionError,
    SelectionMode,
};

use super::{Amd64Register, TemplateManager};

/// The generated text of the function currently being selected.
#[derive(Debug, Default)]
struct FunctionBuffer {
    prologue: String,
    body: String,
}

impl FunctionBuffer {
    fn finish(self, saved_registers: &[Amd64Register], epilogue: &str, out: &mut String) {
        out.push_str(&self.prologue);

        for register in saved_registers {
            _ = writeln!(out, "    push {register}");
        }

        out.push_str(&self.body);
        out.push_str(epilogue);
    }
}

/// Selects a template for every instruction and lays the result out as one
/// NASM file.
#[derive(Debug)]
pub struct Assembler {
    templates: TemplateManager,
    selection_mode: SelectionMode,
    ctx: CodeGenContext,
}

impl Assembler {
    #[must_use]
    pub fn new(config: &CodegenConfig) -> Self {
        let mut ctx = CodeGenContext::new(config.optimization_level);
        ctx.emit_data("newline", "db 0xA");

        Self {
            templates: TemplateManager::new(),
            selection_mode: config.selection_mode,
            ctx,
        }
    }

    #[must_use]
    pub fn with_templates(mut self, templates: TemplateManager) -> Self {
        self.templates = templates;
        self
    }

    #[must_use]
    pub fn context(&self) -> &CodeGenContext {
        &self.ctx
    }

    pub fn assemble(mut self, instructions: &[Instruction]) -> Result<String, SelectionError> {
        let mut main = String::new();
        let mut functions = String::new();
        let mut function: Option<FunctionBuffer> = None;
        let mut main_terminated = false;

        for instruction in instructions {
            let Some(template) = self.templates.select(instruction) else {
                match self.selection_mode {
                    SelectionMode::Lenient => {
                        warn!("No template matches `{instruction}`, dropping it");
                        continue;
                    }

                    SelectionMode::Strict => {
                        return Err(SelectionError::NoTemplate {
                            kind: instruction.kind(),
                            instruction: instruction.to_string(),
                        });
                    }
                }
            };

            trace!("Selected `{}` ({}) for `{instruction}`", template.pattern_name(), template.description());

            if instruction.is_function_start() {
                if let Some(unfinished) = function.take() {
                    warn!("Function started before the previous one ended");
                    unfinished.finish(&[], "", &mut functions);
                }

                let mut buffer = FunctionBuffer::default();
                template.generate(instruction, &mut self.ctx, &mut buffer.prologue)?;
                function = Some(buffer);
                continue;
            }

            if instruction.is_function_end() {
                if let Some(buffer) = function.take() {
                    let mut epilogue = String::new();
                    template.generate(instruction, &mut self.ctx, &mut epilogue)?;
                    buffer.finish(self.ctx.saved_registers(), &epilogue, &mut functions);
                    continue;
                }
            }

            match &mut function {
                Some(buffer) => template.generate(instruction, &mut self.ctx, &mut buffer.body)?,
                None => {
                    template.generate(instruction, &mut self.ctx, &mut main)?;
                    main_terminated = matches!(instruction, Instruction::Return(Return::Program { .. }));
                }
            }
        }

        if let Some(unfinished) = function.take() {
            warn!("Function body was never closed");
            unfinished.finish(&[], "", &mut functions);
        }

        if !main_terminated {
            debug!("Top-level code doesn't exit, appending exit(0)");
            self.ctx.optimal_mov(&mut main, "rax", "60")?;
            self.ctx.optimal_mov(&mut main, "rdi", "0")?;
            writeln!(main, "    syscall")?;
        }

        Ok(self.compose(&main, &functions))
    }

    fn compose(&self, main: &str, functions: &str) -> String {
        let mut output = String::from("section .data\n");
        output.push_str(self.ctx.data_section());

        if !self.ctx.bss_section().is_empty() {
            output.push_str("\nsection .bss\n");
            output.push_str(self.ctx.bss_section());
        }

        output.push_str("\nsection .text\nglobal _start\n\n_start:\n");
        output.push_str(main);

        if !functions.is_empty() {
            output.push_str("\n; Function definitions\n");
            output.push_str(functions);
        }

        output
    }
}
