// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Write;

use crate::{
    backend::{InstructionTemplate, TemplateManager},
    context::Location,
    rtl::{Call, Instruction, PrintValue, VarType},
    CodeGenContext,
    SelectionError,
};

use super::{escape_string, malformed, write_syscall};

pub(super) fn register(manager: &mut TemplateManager) {
    manager.add_template(InstructionTemplate::new(
        "print_string_literal",
        "Print string literal",
        1,
        |insn| matches!(insn, Instruction::Call(Call::Print(PrintValue::String(..)))),
        print_string_literal,
    ));

    manager.add_template(InstructionTemplate::new(
        "print_int_literal",
        "Print integer literal",
        1,
        |insn| matches!(insn, Instruction::Call(Call::Print(PrintValue::Integer(..)))),
        print_int_literal,
    ));

    manager.add_template(InstructionTemplate::new(
        "print_int_variable",
        "Print integer variable",
        1,
        |insn| matches!(insn, Instruction::Call(Call::Print(PrintValue::Variable { var_type: Some(VarType::Int), .. }))),
        print_int_variable,
    ));

    manager.add_template(InstructionTemplate::new(
        "print_string_variable",
        "Print string variable",
        1,
        |insn| matches!(insn, Instruction::Call(Call::Print(PrintValue::Variable { var_type: Some(VarType::String), .. }))),
        print_string_variable,
    ));

    manager.add_template(InstructionTemplate::new(
        "print_variable_generic",
        "Print variable (generic fallback)",
        2,
        |insn| matches!(insn, Instruction::Call(Call::Print(PrintValue::Variable { .. }))),
        print_variable_generic,
    ));
}

fn print_literal(ctx: &mut CodeGenContext, out: &mut String, text: &str) -> Result<(), SelectionError> {
    let label = ctx.new_string_label();

    let bytes = escape_string(text);
    if bytes.is_empty() {
        ctx.emit_data(&label, "db 0xA");
    } else {
        ctx.emit_data(&label, &format!("db {bytes}, 0xA"));
    }

    write_syscall(ctx, out, &label, &(text.len() + 1).to_string())?;
    Ok(())
}

fn print_string_literal(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Call(Call::Print(PrintValue::String(text))) = insn else {
        return Err(malformed("print_string_literal", insn));
    };

    print_literal(ctx, out, text)
}

fn print_int_literal(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Call(Call::Print(PrintValue::Integer(value))) = insn else {
        return Err(malformed("print_int_literal", insn));
    };

    print_literal(ctx, out, &value.to_string())
}

fn variable_name<'a>(insn: &'a Instruction, template: &'static str) -> Result<&'a str, SelectionError> {
    match insn {
        Instruction::Call(Call::Print(PrintValue::Variable { name, .. })) => Ok(name.as_str()),
        _ => Err(malformed(template, insn)),
    }
}

/// There is no integer-to-text conversion routine, so this only loads the
/// value and leaves a marker in the output.
fn print_integer_stub(ctx: &CodeGenContext, out: &mut String, name: &str) -> std::fmt::Result {
    match ctx.location_of(name) {
        Location::Register(register) => {
            writeln!(out, "    ; Print integer variable {name} from {register}")?;
        }

        location => {
            writeln!(out, "    ; Print integer variable {name}")?;
            writeln!(out, "    mov eax, {}", location.long())?;
        }
    }

    writeln!(out, "    ; Integer printing is not implemented")
}

fn print_string_by_name(ctx: &CodeGenContext, out: &mut String, name: &str) -> std::fmt::Result {
    ctx.optimal_mov(out, "rax", "1")?;
    ctx.optimal_mov(out, "rdi", "1")?;
    writeln!(out, "    mov rsi, qword [{name}]")?;
    writeln!(out, "    mov edx, dword [{name}_len]")?;
    writeln!(out, "    syscall")?;
    writeln!(out, "    ; Print newline")?;
    write_syscall(ctx, out, "newline", "1")
}

fn print_int_variable(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let name = variable_name(insn, "print_int_variable")?;
    print_integer_stub(ctx, out, name)?;
    Ok(())
}

fn print_string_variable(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let name = variable_name(insn, "print_string_variable")?;
    print_string_by_name(ctx, out, name)?;
    Ok(())
}

/// Looks at what the context learned about the variable while generating
/// code, since the lowering stage may not have known its type.
fn print_variable_generic(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let name = variable_name(insn, "print_variable_generic")?;

    match ctx.variable_type(name) {
        Some(VarType::String) => print_string_by_name(ctx, out, name)?,
        Some(VarType::Int) => print_integer_stub(ctx, out, name)?,
        _ => {
            writeln!(out, "    ; Print variable {name} (unknown type, treating as string)")?;
            write_syscall(ctx, out, name, "64")?;
        }
    }

    Ok(())
}
