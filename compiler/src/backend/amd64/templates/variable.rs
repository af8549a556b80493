// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Write;

use crate::{
    backend::{InstructionTemplate, TemplateManager},
    context::Location,
    rtl::{AssignedValue, Data, Instruction, VarType},
    CodeGenContext,
    SelectionError,
};

use super::{copy_string, malformed, store_integer, store_string};

pub(super) fn register(manager: &mut TemplateManager) {
    manager.add_template(InstructionTemplate::new(
        "var_assign",
        "Variable assignment with register allocation",
        1,
        |insn| matches!(insn, Instruction::Data(Data::Assignment { .. })),
        assign,
    ));

    manager.add_template(InstructionTemplate::new(
        "var_declaration",
        "Variable declaration",
        1,
        |insn| matches!(insn, Instruction::Data(Data::Declaration { .. })),
        declare,
    ));
}

fn assign(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Data(Data::Assignment { name, value }) = insn else {
        return Err(malformed("var_assign", insn));
    };

    match value {
        AssignedValue::Integer(value) => store_integer(ctx, out, name, &Location::Immediate(*value))?,
        AssignedValue::String(text) => store_string(ctx, out, name, text)?,
        AssignedValue::Variable(source) if ctx.variable_type(source) == Some(VarType::String) => {
            copy_string(ctx, out, name, source)?;
        }
        AssignedValue::Variable(source) => {
            let location = ctx.location_of(source);
            store_integer(ctx, out, name, &location)?;
        }
    }

    Ok(())
}

fn declare(insn: &Instruction, ctx: &mut CodeGenContext, out: &mut String) -> Result<(), SelectionError> {
    let Instruction::Data(Data::Declaration { name }) = insn else {
        return Err(malformed("var_declaration", insn));
    };

    if !ctx.is_declared(name) && ctx.register_of(name).is_none() {
        ctx.emit_bss(name, "resq 1  ; Uninitialized variable");
    }

    ctx.set_variable_type(name, VarType::Uninitialized);
    writeln!(out, "; Variable declaration: {name}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OptimizationLevel;
    use pretty_assertions::assert_eq;

    fn assignment(name: &str, value: AssignedValue) -> Instruction {
        Instruction::Data(Data::Assignment { name: name.into(), value })
    }

    #[test]
    fn declaration_reserves_bss() {
        let mut ctx = CodeGenContext::default();
        let mut out = String::new();

        declare(&Instruction::Data(Data::Declaration { name: "z".into() }), &mut ctx, &mut out).unwrap();

        assert_eq!(ctx.bss_section(), "z: resq 1  ; Uninitialized variable\n");
        assert_eq!(ctx.variable_type("z"), Some(VarType::Uninitialized));
        assert_eq!(out, "; Variable declaration: z\n");
    }

    #[test]
    fn string_assignment_points_at_its_text() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::Full);
        let mut out = String::new();

        assign(&assignment("s", AssignedValue::String("hallo".into())), &mut ctx, &mut out).unwrap();

        assert_eq!(ctx.data_section(), "str0: db \"hallo\"\ns: dq str0\ns_len: dd 5\n");
        assert_eq!(ctx.variable_type("s"), Some(VarType::String));
    }

    #[test]
    fn reassigning_a_string_rebinds_at_run_time() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::Full);
        let mut out = String::new();

        assign(&assignment("s", AssignedValue::String("first".into())), &mut ctx, &mut out).unwrap();
        out.clear();
        assign(&assignment("s", AssignedValue::String("second".into())), &mut ctx, &mut out).unwrap();

        assert_eq!(ctx.data_section(), "str0: db \"first\"\ns: dq str0\ns_len: dd 5\nstr1: db \"second\"\n");
        assert_eq!(out, "; Variable s = \"second\" (type: string)\n    mov rax, str1\n    mov qword [s], rax\n    mov dword [s_len], 6\n");
    }

    #[test]
    fn declared_variable_takes_a_string() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::Full);
        let mut out = String::new();

        declare(&Instruction::Data(Data::Declaration { name: "z".into() }), &mut ctx, &mut out).unwrap();
        out.clear();
        assign(&assignment("z", AssignedValue::String("hi".into())), &mut ctx, &mut out).unwrap();

        assert_eq!(ctx.bss_section(), "z: resq 1  ; Uninitialized variable\n");
        assert_eq!(ctx.data_section(), "str0: db \"hi\"\nz_len: dd 0\n");
        assert_eq!(out, "; Variable z = \"hi\" (type: string)\n    mov rax, str0\n    mov qword [z], rax\n    mov dword [z_len], 2\n");
        assert_eq!(ctx.variable_type("z"), Some(VarType::String));
    }

    #[test]
    fn string_inside_a_branch_is_stored_at_run_time() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::Full);
        let mut out = String::new();

        ctx.enter_region();
        assign(&assignment("s", AssignedValue::String("x".into())), &mut ctx, &mut out).unwrap();

        assert_eq!(ctx.data_section(), "str0: db \"x\"\ns: dq 0\ns_len: dd 0\n");
        assert!(out.ends_with("    mov rax, str0\n    mov qword [s], rax\n    mov dword [s_len], 1\n"));
    }

    #[test]
    fn string_into_an_integer_variable_is_rejected() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::Full);
        let mut out = String::new();

        assign(&assignment("x", AssignedValue::Integer(1)), &mut ctx, &mut out).unwrap();
        let result = assign(&assignment("x", AssignedValue::String("a".into())), &mut ctx, &mut out);

        assert!(matches!(result, Err(SelectionError::StringInIntegerVariable { name }) if name == "x"));
    }

    #[test]
    fn copying_a_string_copies_address_and_length() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::Full);
        let mut out = String::new();

        assign(&assignment("s", AssignedValue::String("a".into())), &mut ctx, &mut out).unwrap();
        out.clear();
        assign(&assignment("t", AssignedValue::Variable("s".into())), &mut ctx, &mut out).unwrap();

        assert!(ctx.data_section().ends_with("t: dq 0\nt_len: dd 0\n"));
        assert_eq!(out, "; Variable t = s (type: string)\n    mov rax, qword [s]\n    mov qword [t], rax\n    mov eax, dword [s_len]\n    mov dword [t_len], eax\n");
        assert_eq!(ctx.variable_type("t"), Some(VarType::String));
    }

    #[test]
    fn copying_an_integer_between_registers() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::Full);
        let mut out = String::new();

        assign(&assignment("x", AssignedValue::Integer(5)), &mut ctx, &mut out).unwrap();
        assign(&assignment("y", AssignedValue::Variable("x".into())), &mut ctx, &mut out).unwrap();

        assert_eq!(out, "; Register allocation: x -> rbx\n    mov rbx, 5\n; Register allocation: y -> r12\n    mov r12, rbx\n");
    }

    #[test]
    fn assigning_a_declared_variable_stores_in_memory() {
        let mut ctx = CodeGenContext::new(OptimizationLevel::Full);
        let mut out = String::new();

        declare(&Instruction::Data(Data::Declaration { name: "z".into() }), &mut ctx, &mut out).unwrap();
        out.clear();
        assign(&assignment("z", AssignedValue::Integer(3)), &mut ctx, &mut out).unwrap();

        assert_eq!(out, "    mov dword [z], 3\n");
        assert_eq!(ctx.variable_type("z"), Some(VarType::Int));
    }
}
