// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Write;

use crate::{
    backend::{amd64::{Amd64ConditionCode, Amd64Register}, InstructionTemplate, TemplateManager},
    context::Location,
    rtl::{Instruction, LabelKind, MathOperation, Return},
    CodeGenContext,
    SelectionError,
};

use super::{load_eax, malformed, store_integer, store_to_memory};

/// Linux passes the syscall number and its arguments in these, in order.
const SYSCALL_REGISTERS: [&str; 7] = ["rax", "rdi", "rsi", "rdx", "r10", "r8", "r9"];

pub(super) fn register_syscall_templates(manager: &mut TemplateManager) {
    manager.add_template(InstructionTemplate::new(
        "syscall",
        "Generic syscall",
        1,
        |insn| matches!(insn, Instruction::Syscall { .. }),
        syscall,
    ));
}

pub(super) fn register(manager: &mut TemplateManager) {
    manager.add_template(InstructionTemplate::new(
        "math_add",
        "Add into the destination register",
        1,
        |insn| matches!(insn, Instruction::Math { operation: MathOperation::Add, .. }),
        math_add,
    ));

    manager.add_template(InstructionTemplate::new(
        "math_generic",
        "Arithmetic through eax",
        2,
        |insn| matches!(insn, Instruction::Math { .. }),
        math_generic,
    ));

    manager.add_template(InstructionTemplate::new(
        "move",
        "Move",
        1,
        |insn| matches!(insn, Instruction::Move { .. }),
        move_value,
    ));

    manager.add_template(InstructionTemplate::new(
        "compare",
        "Compare through eax",
        1,
        |insn| matches!(insn, Instruction::Compare { .. }),
        compare,
    ));

    manager.add_template(InstructionTemplate::new(
        "jump",
        "Conditional or unconditional jump",
        1,
        |insn| matches!(insn, Instruction::Jump { .. }),
        jump,
    ));

    manager.add_template(InstructionTemplate::new(
        "label",
        "Plain label",
        1,
        |insn| matches!(insn, Instruction::Label { kind: LabelKind::Plain, .. }),
        label,
    ));

    manager.add_template(InstructionTemplate::new(
        "push",
        "Push onto the stack",
        1,
        |insn| matches!(insn, Instruction::Push { .. }),
        push,
    ));

    manager.add_template(InstructionTemplate::new(
        "pop",
        "Pop off the stack",
        1,
        |insn| matches!(insn, Instruction::Pop { .. }),
        pop,
    ));

    manager.add_template(InstructionTemplate::new(
        "load",
        "Load from memory",
        1,
        |insn| matches!(insn, Instruction::Load { .. }),
        load,
    ));

    manager.add_template(InstructionTemplate::new(
        "store",
        "Store to memory",
        1,
        |insn| matches!(insn, Instruction::Store { .. }),
        store,
    ));
}

pub(super) fn register_exit_templates(manager: &mut TemplateManager) {
    manager.add_template(InstructionTemplate::new(
        "exit_optimized",
        "Optimized program exit",
        1,
        |insn| matches!(insn, Instruction::Return(Return::Program { .. })),
        exit,
    ));

    manager.add_template(InstructionTemplate::new(
        "inline_asm",
        "Inline assembly",
        1,
        |insn| matches!(insn, Instruction::InlineAsm { .. }),
        inline_asm,
    ));
}

/// A destination operand that names a hardware register rather than a
/// variable.
fn physical_register(ctx: &CodeGenContext, operand: &str) -> Option<Amd64Register> {
    if ctx.register_of(operand).is_some() {
        return None;
    }

    Amd64Register::from_name(operand)
}

/// Writes the result in `eax` to `destination`.
fn store_result(ctx: &mut CodeGenContext, out: &mut String, destination: &str) -> std::fmt::Result {
    if let Some(register) = physical_register(ctx, destination) {
        if register == Amd64Register::Rax {
            return Ok(());
        }
        return writeln!(out, "    mov {}, eax", register.name32());
    }

    store_integer(ctx, out, destination, &Location::Register(Amd64Register::Rax))
}

fn syscall(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Syscall { arguments } = insn else {
        return Err(malformed("syscall", insn));
    };

    for (register, argument) in SYSCALL_REGISTERS.iter().zip(arguments) {
        match ctx.register_of(argument) {
            Some(source) => writeln!(out, "    mov {register}, {source}")?,
            None => ctx.optimal_mov(out, register, argument)?,
        }
    }

    writeln!(out, "    syscall")?;
    Ok(())
}

fn math_add(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Math { destination, lhs, rhs, .. } = insn else {
        return Err(malformed("math_add", insn));
    };

    // `x = x + y` with x in a register needs no detour through eax.
    if let (true, Some(register)) = (destination == lhs, ctx.register_of(destination)) {
        writeln!(out, "    add {}, {}", register.name32(), ctx.location_of(rhs).long())?;
        return Ok(());
    }

    emit_math(ctx, out, MathOperation::Add, destination, lhs, rhs)
}

fn math_generic(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Math { operation, destination, lhs, rhs } = insn else {
        return Err(malformed("math_generic", insn));
    };

    emit_math(ctx, out, *operation, destination, lhs, rhs)
}

fn emit_math(ctx: &mut CodeGenContext, out: &mut String, operation: MathOperation, destination: &str, lhs: &str, rhs: &str) -> Result<(), SelectionError> {
    load_eax(ctx, out, lhs)?;

    let rhs = ctx.location_of(rhs);
    match operation {
        MathOperation::Add | MathOperation::Sub | MathOperation::And | MathOperation::Or | MathOperation::Xor => {
            writeln!(out, "    {} eax, {}", operation.as_ref(), rhs.long())?;
        }

        MathOperation::Mul => match rhs {
            Location::Immediate(value) => writeln!(out, "    imul eax, eax, {value}")?,
            rhs => writeln!(out, "    imul eax, {}", rhs.long())?,
        },

        MathOperation::Div => {
            match &rhs {
                Location::Immediate(value) => ctx.optimal_mov(out, "ecx", &value.to_string())?,
                rhs => writeln!(out, "    mov ecx, {}", rhs.long())?,
            }
            writeln!(out, "    cdq")?;
            writeln!(out, "    idiv ecx")?;
        }

        MathOperation::Shl | MathOperation::Shr => {
            // Integers are signed, so shifting right keeps the sign.
            let mnemonic = if operation == MathOperation::Shl { "shl" } else { "sar" };
            match rhs {
                Location::Immediate(value) => writeln!(out, "    {mnemonic} eax, {value}")?,
                rhs => {
                    writeln!(out, "    mov ecx, {}", rhs.long())?;
                    writeln!(out, "    {mnemonic} eax, cl")?;
                }
            }
        }
    }

    store_result(ctx, out, destination)?;
    Ok(())
}

fn move_value(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Move { destination, source } = insn else {
        return Err(malformed("move", insn));
    };

    let source = ctx.location_of(source);

    let Some(register) = physical_register(ctx, destination) else {
        store_integer(ctx, out, destination, &source)?;
        return Ok(());
    };

    match source {
        Location::Immediate(value) => ctx.optimal_mov(out, register.name64(), &value.to_string())?,
        Location::Register(source) if source == register => (),
        Location::Register(source) => writeln!(out, "    mov {register}, {source}")?,
        source => writeln!(out, "    mov {}, {}", register.name32(), source.long())?,
    }

    Ok(())
}

fn compare(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Compare { lhs, rhs } = insn else {
        return Err(malformed("compare", insn));
    };

    load_eax(ctx, out, lhs)?;
    writeln!(out, "    cmp eax, {}", ctx.location_of(rhs).long())?;
    Ok(())
}

fn jump(insn: &Instruction, _: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Jump { condition, target } = insn else {
        return Err(malformed("jump", insn));
    };

    match condition {
        Some(condition) => writeln!(out, "    j{} {target}", Amd64ConditionCode::from(*condition))?,
        None => writeln!(out, "    jmp {target}")?,
    }

    Ok(())
}

fn label(insn: &Instruction, _: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Label { name, .. } = insn else {
        return Err(malformed("label", insn));
    };

    writeln!(out, "{name}:")?;
    Ok(())
}

fn quad_operand(location: &Location) -> String {
    match location {
        Location::Immediate(value) => value.to_string(),
        Location::Register(register) => register.name64().to_string(),
        Location::Memory(name) => format!("qword [{name}]"),
    }
}

fn push(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Push { operand } = insn else {
        return Err(malformed("push", insn));
    };

    writeln!(out, "    push {}", quad_operand(&ctx.location_of(operand)))?;
    Ok(())
}

fn pop(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Pop { destination } = insn else {
        return Err(malformed("pop", insn));
    };

    match ctx.location_of(destination) {
        Location::Immediate(..) => return Err(malformed("pop", insn)),
        location => writeln!(out, "    pop {}", quad_operand(&location))?,
    }

    Ok(())
}

fn load(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Load { destination, address } = insn else {
        return Err(malformed("load", insn));
    };

    writeln!(out, "    mov eax, dword [{address}]")?;
    store_result(ctx, out, destination)?;
    Ok(())
}

fn store(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Store { address, source } = insn else {
        return Err(malformed("store", insn));
    };

    store_to_memory(out, address, &ctx.location_of(source))?;
    Ok(())
}

fn exit(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Return(Return::Program { exit_code }) = insn else {
        return Err(malformed("exit_optimized", insn));
    };

    ctx.optimal_mov(out, "rax", "60")?;
    ctx.optimal_mov(out, "rdi", &exit_code.to_string())?;
    writeln!(out, "    syscall")?;
    Ok(())
}

fn inline_asm(insn: &Instruction, _: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::InlineAsm { text } = insn else {
        return Err(malformed("inline_asm", insn));
    };

    writeln!(out, "    {text}")?;
    Ok(())
}
