// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Write;

use crate::{
    backend::{InstructionTemplate, TemplateManager},
    context::Location,
    rtl::{Call, Instruction, LabelKind, Return},
    CodeGenContext,
    SelectionError,
};

use super::malformed;

pub(super) fn register(manager: &mut TemplateManager) {
    manager.add_template(InstructionTemplate::new(
        "function_def",
        "Function prologue",
        1,
        |insn| matches!(insn, Instruction::Label { kind: LabelKind::Function, .. }),
        function_def,
    ));

    manager.add_template(InstructionTemplate::new(
        "function_call",
        "Call a function",
        1,
        |insn| matches!(insn, Instruction::Call(Call::Function { .. })),
        function_call,
    ));

    manager.add_template(InstructionTemplate::new(
        "function_return",
        "Function epilogue",
        1,
        |insn| matches!(insn, Instruction::Return(Return::EndOfFunction)),
        function_return,
    ));

    manager.add_template(InstructionTemplate::new(
        "value_return",
        "Return a value in rax",
        1,
        |insn| matches!(insn, Instruction::Return(Return::Value { .. })),
        value_return,
    ));
}

fn function_def(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Label { name, .. } = insn else {
        return Err(malformed("function_def", insn));
    };

    ctx.enter_function(name);

    writeln!(out, "\n{name}:")?;
    writeln!(out, "    push rbp")?;
    writeln!(out, "    mov rbp, rsp")?;
    Ok(())
}

/// Variables in caller-saved registers don't survive the call, so they are
/// kept on the stack around it.
fn function_call(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Call(Call::Function { name }) = insn else {
        return Err(malformed("function_call", insn));
    };

    let live = ctx.register_allocator().caller_saved_used();
    for register in &live {
        writeln!(out, "    push {register}")?;
    }

    writeln!(out, "    call {name}")?;

    for register in live.iter().rev() {
        writeln!(out, "    pop {register}")?;
    }

    Ok(())
}

/// The pushes of the callee-saved registers are only known once the whole
/// body has been generated, so the assembler inserts them after the
/// prologue. The pops are written here, in reverse.
fn function_return(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    if !insn.is_function_end() {
        return Err(malformed("function_return", insn));
    }

    if ctx.returns_early() {
        if let Some(name) = ctx.current_function() {
            writeln!(out, "{name}_ret:")?;
        }
    }

    for register in ctx.leave_function().iter().rev() {
        writeln!(out, "    pop {register}")?;
    }

    writeln!(out, "    mov rsp, rbp")?;
    writeln!(out, "    pop rbp")?;
    writeln!(out, "    ret")?;
    Ok(())
}

fn value_return(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Return(Return::Value { value }) = insn else {
        return Err(malformed("value_return", insn));
    };

    match ctx.location_of(value) {
        Location::Immediate(value) => ctx.optimal_mov(out, "rax", &value.to_string())?,
        Location::Register(register) => writeln!(out, "    mov rax, {register}")?,
        location => writeln!(out, "    mov eax, {}", location.long())?,
    }

    let Some(name) = ctx.current_function().map(str::to_string) else {
        // Outside a function this leaves the program.
        writeln!(out, "    mov rdi, rax")?;
        writeln!(out, "    mov rax, 60")?;
        writeln!(out, "    syscall")?;
        return Ok(());
    };

    ctx.mark_early_return();
    writeln!(out, "    jmp {name}_ret")?;
    Ok(())
}
