// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The NASM templates for Linux on AMD64, and the helpers they share.

mod control_flow;
mod function;
mod misc;
mod print;
mod variable;

use std::fmt::Write;

use crate::{
    backend::TemplateManager,
    context::Location,
    rtl::{BranchCondition, Instruction, VarType},
    CodeGenContext,
    SelectionError,
};

use super::{Amd64ConditionCode, Amd64Register};

pub fn register_default_templates(manager: &mut TemplateManager) {
    misc::register_syscall_templates(manager);
    print::register(manager);
    variable::register(manager);
    misc::register(manager);
    function::register(manager);
    control_flow::register(manager);
    misc::register_exit_templates(manager);
}

fn malformed(template: &'static str, instruction: &Instruction) -> SelectionError {
    SelectionError::Malformed {
        template,
        kind: instruction.kind(),
    }
}

/// Loads the 32-bit value of `operand` into `eax`.
fn load_eax(ctx: &CodeGenContext, out: &mut String, operand: &str) -> std::fmt::Result {
    match ctx.location_of(operand) {
        Location::Immediate(value) => ctx.optimal_mov(out, "eax", &value.to_string()),
        location => writeln!(out, "    mov eax, {}", location.long()),
    }
}

/// Jumps to `target` when `condition` doesn't hold, and falls through when it
/// does.
fn branch_unless(ctx: &CodeGenContext, out: &mut String, condition: &BranchCondition, target: &str) -> std::fmt::Result {
    match condition {
        BranchCondition::Compare { left, comparison, right } => {
            load_eax(ctx, out, left)?;
            writeln!(out, "    cmp eax, {}", ctx.location_of(right).long())?;

            let code = Amd64ConditionCode::from(comparison.inverse());
            writeln!(out, "    j{code} {target}")
        }

        BranchCondition::Truthy(operand) => match ctx.location_of(operand) {
            Location::Immediate(0) => writeln!(out, "    jmp {target}"),

            // Always true, so there is nothing to check.
            Location::Immediate(..) => Ok(()),

            location => {
                writeln!(out, "    cmp {}, 0", location.long())?;
                writeln!(out, "    je {target}")
            }
        },
    }
}

/// Stores an integer in the variable `name`, giving it storage first if it
/// has none yet: a register when possible, and the data section otherwise.
fn store_integer(ctx: &mut CodeGenContext, out: &mut String, name: &str, source: &Location) -> std::fmt::Result {
    ctx.set_variable_type(name, VarType::Int);

    if let Some(register) = ctx.register_of(name) {
        return move_into_register(ctx, out, register, source);
    }

    if ctx.is_declared(name) {
        return store_to_memory(out, name, source);
    }

    if let Some(register) = ctx.allocate_variable(name) {
        writeln!(out, "; Register allocation: {name} -> {register}")?;
        return move_into_register(ctx, out, register, source);
    }

    match source {
        Location::Immediate(value) if ctx.is_straight_line() => {
            ctx.emit_data(name, &format!("dd {value}"));
            writeln!(out, "; Variable {name} = {value} (type: int)")
        }

        _ => {
            ctx.emit_data(name, "dd 0");
            store_to_memory(out, name, source)
        }
    }
}

fn move_into_register(ctx: &CodeGenContext, out: &mut String, register: Amd64Register, source: &Location) -> std::fmt::Result {
    match source {
        Location::Immediate(value) => ctx.optimal_mov(out, register.name64(), &value.to_string()),
        Location::Register(source) if *source == register => Ok(()),
        Location::Register(source) => writeln!(out, "    mov {register}, {source}"),
        Location::Memory(..) => writeln!(out, "    mov {}, {}", register.name32(), source.long()),
    }
}

fn store_to_memory(out: &mut String, name: &str, source: &Location) -> std::fmt::Result {
    match source {
        Location::Immediate(..) | Location::Register(..) => {
            writeln!(out, "    mov dword [{name}], {}", source.long())
        }

        Location::Memory(..) => {
            writeln!(out, "    mov eax, {}", source.long())?;
            writeln!(out, "    mov dword [{name}], eax")
        }
    }
}

/// A string variable holds the address of its text, and `name_len` holds the
/// length. Every value gets its own data label, so reassigning only rewrites
/// the two slots.
fn store_string(ctx: &mut CodeGenContext, out: &mut String, name: &str, text: &str) -> Result<(), SelectionError> {
    claim_string_slots(ctx, name)?;

    let label = ctx.new_string_label();
    let bytes = escape_string(text);
    let directive = if bytes.is_empty() { "db 0".to_string() } else { format!("db {bytes}") };
    ctx.emit_data(&label, &directive);

    let length = text.len();
    writeln!(out, "; Variable {name} = {text:?} (type: string)")?;

    if !ctx.is_declared(name) && ctx.is_straight_line() {
        ctx.emit_data(name, &format!("dq {label}"));
        ctx.emit_data(&format!("{name}_len"), &format!("dd {length}"));
        return Ok(());
    }

    reserve_string_slots(ctx, name);
    writeln!(out, "    mov rax, {label}")?;
    writeln!(out, "    mov qword [{name}], rax")?;
    writeln!(out, "    mov dword [{name}_len], {length}")?;
    Ok(())
}

/// Copies the address and length of the string in `source` to `name`.
fn copy_string(ctx: &mut CodeGenContext, out: &mut String, name: &str, source: &str) -> Result<(), SelectionError> {
    claim_string_slots(ctx, name)?;
    reserve_string_slots(ctx, name);

    writeln!(out, "; Variable {name} = {source} (type: string)")?;
    writeln!(out, "    mov rax, qword [{source}]")?;
    writeln!(out, "    mov qword [{name}], rax")?;
    writeln!(out, "    mov eax, dword [{source}_len]")?;
    writeln!(out, "    mov dword [{name}_len], eax")?;
    Ok(())
}

/// An address doesn't fit in the 32-bit storage of an integer variable.
fn claim_string_slots(ctx: &mut CodeGenContext, name: &str) -> Result<(), SelectionError> {
    if ctx.register_of(name).is_some() || ctx.variable_type(name) == Some(VarType::Int) {
        return Err(SelectionError::StringInIntegerVariable { name: name.to_string() });
    }

    ctx.set_variable_type(name, VarType::String);
    Ok(())
}

fn reserve_string_slots(ctx: &mut CodeGenContext, name: &str) {
    if !ctx.is_declared(name) {
        ctx.emit_data(name, "dq 0");
    }

    let length = format!("{name}_len");
    if !ctx.is_declared(&length) {
        ctx.emit_data(&length, "dd 0");
    }
}

/// Writes the syscall that prints `length` bytes starting at `address`.
fn write_syscall(ctx: &CodeGenContext, out: &mut String, address: &str, length: &str) -> std::fmt::Result {
    ctx.optimal_mov(out, "rax", "1")?;
    ctx.optimal_mov(out, "rdi", "1")?;
    writeln!(out, "    mov rsi, {address}")?;
    ctx.optimal_mov(out, "rdx", length)?;
    writeln!(out, "    syscall")
}

/// Formats text as the operands of a NASM `db` directive. Printable
/// characters are quoted; quotes and everything else become numbers.
#[must_use]
pub fn escape_string(text: &str) -> String {
    let mut pieces = Vec::new();
    let mut run = String::new();

    for byte in text.bytes() {
        if (byte.is_ascii_graphic() && byte != b'"') || byte == b' ' {
            run.push(byte as char);
            continue;
        }

        if !run.is_empty() {
            pieces.push(format!("\"{run}\""));
            run.clear();
        }

        pieces.push(byte.to_string());
    }

    if !run.is_empty() {
        pieces.push(format!("\"{run}\""));
    }

    pieces.join(", ")
}
