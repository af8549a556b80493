// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Write;

use crate::{
    backend::{InstructionTemplate, TemplateManager},
    context::Location,
    rtl::Instruction,
    CodeGenContext,
    SelectionError,
};

use super::{branch_unless, load_eax, malformed, store_integer};

pub(super) fn register(manager: &mut TemplateManager) {
    manager.add_template(InstructionTemplate::new(
        "if_start",
        "Start of an if or elif clause",
        1,
        |insn| matches!(insn, Instruction::IfStart { .. }),
        if_start,
    ));

    manager.add_template(InstructionTemplate::new(
        "else_start",
        "Start of an else or elif clause",
        1,
        |insn| matches!(insn, Instruction::ElseStart { .. }),
        else_start,
    ));

    manager.add_template(InstructionTemplate::new(
        "if_end",
        "End of an if statement",
        1,
        |insn| matches!(insn, Instruction::IfEnd { .. }),
        if_end,
    ));

    manager.add_template(InstructionTemplate::new(
        "while_start",
        "Start of a while loop",
        1,
        |insn| matches!(insn, Instruction::WhileStart { .. }),
        while_start,
    ));

    manager.add_template(InstructionTemplate::new(
        "while_end",
        "End of a while loop",
        1,
        |insn| matches!(insn, Instruction::WhileEnd { .. }),
        while_end,
    ));

    manager.add_template(InstructionTemplate::new(
        "for_start",
        "Initialization and condition of a for loop",
        1,
        |insn| matches!(insn, Instruction::ForStart { .. }),
        for_start,
    ));

    manager.add_template(InstructionTemplate::new(
        "for_end",
        "Increment of a for loop",
        1,
        |insn| matches!(insn, Instruction::ForEnd { .. }),
        for_end,
    ));
}

fn if_start(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::IfStart { condition, end_label, else_label, is_elif_condition } = insn else {
        return Err(malformed("if_start", insn));
    };

    if *is_elif_condition {
        writeln!(out, "; Elif condition: {condition}")?;
    } else {
        writeln!(out, "; If statement: {condition}")?;

        // An elif clause continues the region of its if statement.
        ctx.enter_region();
    }

    let target = else_label.as_deref().unwrap_or(end_label);
    branch_unless(ctx, out, condition, target)?;
    Ok(())
}

fn else_start(insn: &Instruction, _: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::ElseStart { else_label, end_label, .. } = insn else {
        return Err(malformed("else_start", insn));
    };

    writeln!(out, "    jmp {end_label}")?;
    writeln!(out, "{else_label}:")?;
    Ok(())
}

fn if_end(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::IfEnd { end_label } = insn else {
        return Err(malformed("if_end", insn));
    };

    writeln!(out, "{end_label}:")?;
    ctx.leave_region();
    Ok(())
}

fn while_start(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::WhileStart { condition, start_label, end_label } = insn else {
        return Err(malformed("while_start", insn));
    };

    writeln!(out, "{start_label}:")?;
    writeln!(out, "; While condition: {condition}")?;
    branch_unless(ctx, out, condition, end_label)?;

    ctx.enter_region();
    Ok(())
}

fn while_end(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::WhileEnd { start_label, end_label } = insn else {
        return Err(malformed("while_end", insn));
    };

    writeln!(out, "    jmp {start_label}")?;
    writeln!(out, "{end_label}:")?;
    ctx.leave_region();
    Ok(())
}

fn for_start(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::ForStart { variable, init, bound, step, start_label, end_label } = insn else {
        return Err(malformed("for_start", insn));
    };

    writeln!(out, "; For loop initialization")?;
    let init = ctx.location_of(init);
    store_integer(ctx, out, variable, &init)?;

    // Counting down stops below the bound instead of above it.
    let (comparison, exit_jump) = if *step > 0 { ("<=", "jg") } else { (">=", "jl") };

    writeln!(out, "{start_label}:")?;
    writeln!(out, "; For condition: {variable} {comparison} {bound}")?;
    load_eax(ctx, out, variable)?;
    writeln!(out, "    cmp eax, {}", ctx.location_of(bound).long())?;
    writeln!(out, "    {exit_jump} {end_label}")?;

    ctx.enter_region();
    Ok(())
}

fn for_end(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::ForEnd { variable, step, start_label, end_label } = insn else {
        return Err(malformed("for_end", insn));
    };

    let operand = match ctx.location_of(variable) {
        Location::Immediate(..) => return Err(malformed("for_end", insn)),
        location => location.long(),
    };

    writeln!(out, "; For loop increment")?;
    match step {
        1 => writeln!(out, "    inc {operand}")?,
        -1 => writeln!(out, "    dec {operand}")?,
        step => writeln!(out, "    add {operand}, {step}")?,
    }

    writeln!(out, "    jmp {start_label}")?;
    writeln!(out, "{end_label}:")?;
    ctx.leave_region();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rtl::{BranchCondition, Comparison, RtlBuilder}, OptimizationLevel};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn generate_all(instructions: &[Instruction], ctx: &mut CodeGenContext) -> String {
        let manager = TemplateManager::new();
        let mut out = String::new();
        for insn in instructions {
            manager.select(insn).expect("template").generate(insn, ctx, &mut out).expect("generated");
        }
        out
    }

    fn x_less_than(value: &str) -> BranchCondition {
        BranchCondition::Compare {
            left: "x".into(),
            comparison: Comparison::Less,
            right: value.into(),
        }
    }

    #[test]
    fn if_else() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::None);
        let mut builder = RtlBuilder::new();
        builder.if_start(x_less_than("5"), "if_end0", Some("else1"), false);
        builder.inline_asm("nop");
        builder.else_start("else1", "if_end0", false);
        builder.inline_asm("nop");
        builder.if_end("if_end0");

        let out = generate_all(&builder.build(), &mut ctx);

        assert_eq!(out, "; If statement: x < 5\n    mov eax, dword [x]\n    cmp eax, 5\n    jge else1\n    nop\n    jmp if_end0\nelse1:\n    nop\nif_end0:\n");
        assert!(ctx.is_straight_line());
    }

    #[test]
    fn elif_keeps_a_single_region() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::None);
        let mut builder = RtlBuilder::new();
        builder.if_start(x_less_than("5"), "if_end0", Some("else1"), false);
        builder.else_start("else1", "if_end0", true);
        builder.if_start(x_less_than("9"), "if_end0", None, true);
        builder.if_end("if_end0");

        let instructions = builder.build();
        let out = generate_all(&instructions[..3], &mut ctx);
        assert!(!ctx.is_straight_line());
        assert!(out.contains("; Elif condition: x < 9\n    mov eax, dword [x]\n    cmp eax, 9\n    jge if_end0\n"), "{out}");

        generate_all(&instructions[3..], &mut ctx);
        assert!(ctx.is_straight_line());
    }

    #[test]
    fn while_loop() {
        let mut builder = RtlBuilder::new();
        builder.while_start(BranchCondition::Truthy("running".into()), "while_start0", "while_end1");
        builder.while_end("while_start0", "while_end1");

        let out = generate_all(&builder.build(), &mut CodeGenContext::new(OptimizationLevel::None));

        assert_eq!(out, "while_start0:\n; While condition: running\n    cmp dword [running], 0\n    je while_end1\n    jmp while_start0\nwhile_end1:\n");
    }

    fn for_loop(step: i64) -> Vec<Instruction> {
        vec![
            Instruction::ForStart {
                variable: "i".into(),
                init: "1".into(),
                bound: "3".into(),
                step,
                start_label: "for_start0".into(),
                end_label: "for_end1".into(),
            },
            Instruction::ForEnd {
                variable: "i".into(),
                step,
                start_label: "for_start0".into(),
                end_label: "for_end1".into(),
            },
        ]
    }

    #[test]
    fn for_loop_in_memory() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::None);

        let out = generate_all(&for_loop(1), &mut ctx);

        assert_eq!(ctx.data_section(), "i: dd 1\n");
        assert_eq!(out, "; For loop initialization\n; Variable i = 1 (type: int)\nfor_start0:\n; For condition: i <= 3\n    mov eax, dword [i]\n    cmp eax, 3\n    jg for_end1\n; For loop increment\n    inc dword [i]\n    jmp for_start0\nfor_end1:\n");
    }

    #[rstest]
    #[case(1, "    cmp eax, 3\n    jg for_end1\n", "    inc ebx\n")]
    #[case(-1, "    cmp eax, 3\n    jl for_end1\n", "    dec ebx\n")]
    #[case(4, "    cmp eax, 3\n    jg for_end1\n", "    add ebx, 4\n")]
    fn for_loop_in_register(#[case] step: i64, #[case] condition: &str, #[case] increment: &str) {
        let mut ctx = CodeGenContext::new(OptimizationLevel::Full);

        let out = generate_all(&for_loop(step), &mut ctx);

        assert!(out.starts_with("; For loop initialization\n; Register allocation: i -> rbx\n    mov rbx, 1\nfor_start0:\n"), "{out}");
        assert!(out.contains(&format!("    mov eax, ebx\n{condition}")), "{out}");
        assert!(out.contains(&format!("; For loop increment\n{increment}    jmp for_start0\n")), "{out}");
    }
}
