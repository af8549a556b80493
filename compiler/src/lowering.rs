// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Turns the statement tree into a flat RTL sequence. Nested blocks are
//! appended to the same sequence, framed by region markers.

use log::debug;
use sig::*;

use crate::{
    backend::Amd64Register,
    rtl::{AssignedValue, BranchCondition, Comparison, Instruction, MathOperation, PrintValue, RtlBuilder, VarType},
    CodeGenContext,
    LoweringError,
};

pub fn lower_to_rtl(statements: &[Statement]) -> Result<Vec<Instruction>, LoweringError> {
    let mut lowerer = Lowerer::new();

    for statement in statements {
        statement.lower(&mut lowerer)?;
    }

    let instructions = lowerer.builder.build();

    debug!("Lowered {} statement(s) into {} instruction(s):", statements.len(), instructions.len());
    for instruction in &instructions {
        debug!("    {instruction}");
    }

    Ok(instructions)
}

struct Lowerer {
    builder: RtlBuilder,

    /// Only used for minting labels and remembering variable types; its
    /// other state is thrown away.
    ctx: CodeGenContext,
    current_function: Option<String>,
}

impl Lowerer {
    fn new() -> Self {
        Self {
            builder: RtlBuilder::new(),
            ctx: CodeGenContext::default(),
            current_function: None,
        }
    }

    fn lower_block(&mut self, block: &[Statement]) -> Result<(), LoweringError> {
        for statement in block {
            statement.lower(self)?;
        }

        Ok(())
    }
}

trait LowerStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError>;
}

impl LowerStatement for Statement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        match self {
            Statement::Asm(statement) => statement.lower(lowerer),
            Statement::Assign(statement) => statement.lower(lowerer),
            Statement::Call(statement) => statement.lower(lowerer),
            Statement::Declare(statement) => statement.lower(lowerer),
            Statement::For(statement) => statement.lower(lowerer),
            Statement::Function(statement) => statement.lower(lowerer),
            Statement::If(statement) => statement.lower(lowerer),
            Statement::Print(statement) => statement.lower(lowerer),
            Statement::PrintVariable(statement) => statement.lower(lowerer),
            Statement::Return(statement) => statement.lower(lowerer),
            Statement::While(statement) => statement.lower(lowerer),
        }
    }
}

impl LowerStatement for AsmStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        lowerer.builder.inline_asm(&self.text);
        Ok(())
    }
}

impl LowerStatement for AssignStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        let name = variable_name(&self.name)?;

        match &self.value {
            Expression::Literal(Literal::Integer(value)) => {
                let value = integer(*value)?;
                lowerer.ctx.set_variable_type(name, VarType::Int);
                lowerer.builder.assign(name, AssignedValue::Integer(value));
            }

            Expression::Literal(Literal::String(value)) => {
                lowerer.ctx.set_variable_type(name, VarType::String);
                lowerer.builder.assign(name, AssignedValue::String(value.clone()));
            }

            Expression::Variable(source) => {
                let source = variable_name(source)?;
                if let Some(var_type) = lowerer.ctx.variable_type(source) {
                    lowerer.ctx.set_variable_type(name, var_type);
                }
                lowerer.builder.assign(name, AssignedValue::Variable(source.to_string()));
            }

            Expression::Sum(lhs, rhs) => {
                let (lhs, rhs) = (operand(lhs)?, operand(rhs)?);
                lowerer.ctx.set_variable_type(name, VarType::Int);
                lowerer.builder.math(MathOperation::Add, name, lhs, rhs);
            }
        }

        Ok(())
    }
}

impl LowerStatement for CallStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        lowerer.builder.call_function(variable_name(&self.name)?);
        Ok(())
    }
}

impl LowerStatement for DeclareStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        let name = variable_name(&self.name)?;
        lowerer.ctx.set_variable_type(name, VarType::Uninitialized);
        lowerer.builder.declare(name);
        Ok(())
    }
}

impl LowerStatement for ForStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        if self.variable.is_empty() {
            return Err(LoweringError::MissingInductionVariable);
        }

        variable_name(&self.variable)?;

        if self.step == 0 {
            return Err(LoweringError::ZeroStep { variable: self.variable.clone() });
        }

        integer(self.step)?;
        let (init, bound) = (operand(&self.init)?, operand(&self.bound)?);

        let start_label = lowerer.ctx.new_label("for_start");
        let end_label = lowerer.ctx.new_label("for_end");

        lowerer.ctx.set_variable_type(&self.variable, VarType::Int);

        lowerer.builder.push(Instruction::ForStart {
            variable: self.variable.clone(),
            init,
            bound,
            step: self.step,
            start_label: start_label.clone(),
            end_label: end_label.clone(),
        });

        lowerer.lower_block(&self.body)?;

        lowerer.builder.push(Instruction::ForEnd {
            variable: self.variable.clone(),
            step: self.step,
            start_label,
            end_label,
        });

        Ok(())
    }
}

impl LowerStatement for FunctionStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        if self.name.is_empty() {
            return Err(LoweringError::EmptyFunctionName);
        }

        variable_name(&self.name)?;

        if let Some(parent) = &lowerer.current_function {
            return Err(LoweringError::NestedFunction {
                name: self.name.clone(),
                parent: parent.clone(),
            });
        }

        lowerer.current_function = Some(self.name.clone());
        lowerer.builder.function_label(&self.name);

        lowerer.lower_block(&self.body)?;

        lowerer.builder.end_function();
        lowerer.current_function = None;
        Ok(())
    }
}

impl LowerStatement for IfStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        let clauses: Vec<(&Condition, &[Statement])> = std::iter::once((&self.condition, self.then_block.as_slice()))
            .chain(self.elif_clauses.iter().map(|clause| (&clause.condition, clause.block.as_slice())))
            .collect();

        let end_label = lowerer.ctx.new_label("if_end");

        // Each clause jumps to the next one when its condition fails. The
        // last clause jumps to the else block, or straight to the end.
        let mut else_label: Option<String> = None;
        for (index, (condition, block)) in clauses.iter().enumerate() {
            let is_last = index + 1 == clauses.len();
            let next_label = (!is_last || self.else_block.is_some()).then(|| lowerer.ctx.new_label("else"));

            if let Some(label) = &else_label {
                lowerer.builder.else_start(label, &end_label, true);
            }

            let condition = branch_condition(condition)?;
            lowerer.builder.if_start(condition, &end_label, next_label.as_deref(), index != 0);
            lowerer.lower_block(block)?;

            else_label = next_label;
        }

        if let (Some(label), Some(else_block)) = (&else_label, &self.else_block) {
            lowerer.builder.else_start(label, &end_label, false);
            lowerer.lower_block(else_block)?;
        }

        lowerer.builder.if_end(&end_label);
        Ok(())
    }
}

impl LowerStatement for PrintStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        let value = match &self.value {
            Literal::Integer(value) => PrintValue::Integer(*value),
            Literal::String(value) => PrintValue::String(value.clone()),
        };

        lowerer.builder.print(value);
        Ok(())
    }
}

impl LowerStatement for PrintVariableStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        let name = variable_name(&self.name)?;
        let var_type = lowerer.ctx.variable_type(name);
        lowerer.builder.print_variable(name, var_type);
        Ok(())
    }
}

impl LowerStatement for ReturnStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        if lowerer.current_function.is_some() {
            lowerer.builder.return_value(self.value.to_string());
        } else {
            lowerer.builder.exit(self.value);
        }

        Ok(())
    }
}

impl LowerStatement for WhileStatement {
    fn lower(&self, lowerer: &mut Lowerer) -> Result<(), LoweringError> {
        let condition = branch_condition(&self.condition)?;

        let start_label = lowerer.ctx.new_label("while_start");
        let end_label = lowerer.ctx.new_label("while_end");

        lowerer.builder.while_start(condition, &start_label, &end_label);
        lowerer.lower_block(&self.body)?;
        lowerer.builder.while_end(&start_label, &end_label);

        Ok(())
    }
}

fn branch_condition(condition: &Condition) -> Result<BranchCondition, LoweringError> {
    match condition {
        Condition::Compare { left, operator, right } => {
            let comparison: Comparison = operator.parse()
                .map_err(|_| LoweringError::UnknownOperator { operator: operator.clone() })?;

            Ok(BranchCondition::Compare {
                left: operand(left)?,
                comparison,
                right: operand(right)?,
            })
        }

        Condition::Truthy(atom) => Ok(BranchCondition::Truthy(operand(atom)?)),
    }
}

/// Operands are resolved by name during selection, so a variable called
/// `rcx` would be read as the register.
fn variable_name(name: &str) -> Result<&str, LoweringError> {
    if Amd64Register::is_register_name(name) {
        return Err(LoweringError::ReservedName { name: name.to_string() });
    }

    Ok(name)
}

/// Integer operands are encoded as 32-bit immediates.
fn integer(value: i64) -> Result<i64, LoweringError> {
    match i32::try_from(value) {
        Ok(..) => Ok(value),
        Err(..) => Err(LoweringError::IntegerOutOfRange { value }),
    }
}

fn operand(atom: &Atom) -> Result<String, LoweringError> {
    if let Atom::Integer(value) = atom {
        integer(*value)?;
    }

    if let Some(name) = atom.as_variable() {
        variable_name(name)?;
    }

    Ok(atom.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtl::{Call, Data, OpKind, Return};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn kinds(instructions: &[Instruction]) -> Vec<OpKind> {
        instructions.iter().map(Instruction::kind).collect()
    }

    #[test]
    fn straight_line_statements_map_one_to_one() {
        let tree = vec![
            Statement::print(Literal::String("hi".into())),
            Statement::assign("x", 5_i64),
            Statement::declare("z"),
            Statement::print_variable("x"),
            Statement::asm("nop"),
            Statement::ret(0),
        ];

        let instructions = lower_to_rtl(&tree).unwrap();

        assert_eq!(instructions.len(), tree.len());
        assert_eq!(instructions[0], Instruction::Call(Call::Print(PrintValue::String("hi".into()))));
        assert_eq!(instructions[1], Instruction::Data(Data::Assignment { name: "x".into(), value: AssignedValue::Integer(5) }));
        assert_eq!(instructions[3], Instruction::Call(Call::Print(PrintValue::Variable { name: "x".into(), var_type: Some(VarType::Int) })));
        assert_eq!(instructions[5], Instruction::Return(Return::Program { exit_code: 0 }));
    }

    #[test]
    fn variable_copy_inherits_type() {
        let tree = vec![
            Statement::assign("s", Literal::String("hallo".into())),
            Statement::assign("t", Expression::Variable("s".into())),
            Statement::print_variable("t"),
            Statement::print_variable("unknown"),
        ];

        let instructions = lower_to_rtl(&tree).unwrap();

        assert_eq!(instructions[2], Instruction::Call(Call::Print(PrintValue::Variable { name: "t".into(), var_type: Some(VarType::String) })));
        assert_eq!(instructions[3], Instruction::Call(Call::Print(PrintValue::Variable { name: "unknown".into(), var_type: None })));
    }

    #[test]
    fn function_is_framed_by_label_and_end() {
        let tree = vec![
            Statement::function("helper", vec![Statement::print(Literal::Integer(1)), Statement::ret(3)]),
            Statement::call("helper"),
        ];

        let instructions = lower_to_rtl(&tree).unwrap();

        assert_eq!(kinds(&instructions), vec![OpKind::Label, OpKind::Call, OpKind::Return, OpKind::Return, OpKind::Call]);
        assert!(instructions[0].is_function_start());
        assert_eq!(instructions[2], Instruction::Return(Return::Value { value: "3".into() }));
        assert!(instructions[3].is_function_end());
    }

    #[test]
    fn nested_function_is_rejected() {
        let tree = vec![Statement::function("outer", vec![Statement::function("inner", Vec::new())])];

        assert_eq!(lower_to_rtl(&tree), Err(LoweringError::NestedFunction {
            name: "inner".into(),
            parent: "outer".into(),
        }));
    }

    #[rstest]
    #[case("=")]
    #[case("=>")]
    #[case("and")]
    fn unknown_operator_is_rejected(#[case] operator: &str) {
        let tree = vec![Statement::While(WhileStatement {
            condition: Condition::compare("a", operator, 1_i64),
            body: Vec::new(),
        })];

        assert_eq!(lower_to_rtl(&tree), Err(LoweringError::UnknownOperator { operator: operator.into() }));
    }

    #[test]
    fn if_without_else_jumps_to_end() {
        let tree = vec![Statement::If(IfStatement {
            condition: Condition::compare("a", "<", 3_i64),
            then_block: vec![Statement::print(Literal::Integer(1))],
            elif_clauses: Vec::new(),
            else_block: None,
        })];

        let instructions = lower_to_rtl(&tree).unwrap();

        assert_eq!(instructions.first(), Some(&Instruction::IfStart {
            condition: BranchCondition::Compare { left: "a".into(), comparison: Comparison::Less, right: "3".into() },
            end_label: "if_end0".into(),
            else_label: None,
            is_elif_condition: false,
        }));
        assert_eq!(instructions.last(), Some(&Instruction::IfEnd { end_label: "if_end0".into() }));
    }

    #[test]
    fn elif_chain_links_every_clause() {
        let tree = vec![Statement::If(IfStatement {
            condition: Condition::compare("a", "==", "b"),
            then_block: vec![Statement::print(Literal::Integer(1))],
            elif_clauses: vec![ElifClause {
                condition: Condition::compare("a", "==", "c"),
                block: vec![Statement::print(Literal::Integer(2))],
            }],
            else_block: Some(vec![Statement::print(Literal::Integer(3))]),
        })];

        let instructions = lower_to_rtl(&tree).unwrap();

        assert_eq!(kinds(&instructions), vec![
            OpKind::IfStart, OpKind::Call,
            OpKind::ElseStart, OpKind::IfStart, OpKind::Call,
            OpKind::ElseStart, OpKind::Call,
            OpKind::IfEnd,
        ]);

        let Instruction::IfStart { else_label: Some(first_else), .. } = &instructions[0] else {
            panic!("expected an if start with an else label");
        };
        let Instruction::ElseStart { else_label, is_elif: true, .. } = &instructions[2] else {
            panic!("expected an elif clause");
        };
        assert_eq!(first_else, else_label);

        let Instruction::IfStart { else_label: Some(second_else), is_elif_condition: true, .. } = &instructions[3] else {
            panic!("expected an elif condition");
        };
        let Instruction::ElseStart { else_label, is_elif: false, .. } = &instructions[5] else {
            panic!("expected the else clause");
        };
        assert_eq!(second_else, else_label);
    }

    #[test]
    fn for_loop_carries_its_variable_on_both_markers() {
        let tree = vec![Statement::For(ForStatement {
            variable: "i".into(),
            init: Atom::Integer(1),
            bound: Atom::Integer(10),
            step: 2,
            body: vec![Statement::print_variable("i")],
        })];

        let instructions = lower_to_rtl(&tree).unwrap();

        assert_eq!(instructions[0], Instruction::ForStart {
            variable: "i".into(),
            init: "1".into(),
            bound: "10".into(),
            step: 2,
            start_label: "for_start0".into(),
            end_label: "for_end1".into(),
        });
        assert_eq!(instructions[1], Instruction::Call(Call::Print(PrintValue::Variable { name: "i".into(), var_type: Some(VarType::Int) })));
        assert_eq!(instructions[2], Instruction::ForEnd {
            variable: "i".into(),
            step: 2,
            start_label: "for_start0".into(),
            end_label: "for_end1".into(),
        });
    }

    #[rstest]
    #[case("", 1, LoweringError::MissingInductionVariable)]
    #[case("i", 0, LoweringError::ZeroStep { variable: "i".into() })]
    fn malformed_for_loops(#[case] variable: &str, #[case] step: i64, #[case] expected: LoweringError) {
        let tree = vec![Statement::For(ForStatement {
            variable: variable.into(),
            init: Atom::Integer(0),
            bound: Atom::Integer(3),
            step,
            body: Vec::new(),
        })];

        assert_eq!(lower_to_rtl(&tree), Err(expected));
    }

    #[test]
    fn sum_lowers_to_add() {
        let tree = vec![Statement::assign("z", Expression::Sum(Atom::Integer(2), Atom::variable("x")))];

        assert_eq!(lower_to_rtl(&tree).unwrap(), vec![Instruction::Math {
            operation: MathOperation::Add,
            destination: "z".into(),
            lhs: "2".into(),
            rhs: "x".into(),
        }]);
    }

    #[rstest]
    #[case(Statement::assign("rcx", 1_i64))]
    #[case(Statement::assign("x", Expression::Variable("rdx".into())))]
    #[case(Statement::assign("x", Expression::Sum(Atom::variable("eax"), Atom::Integer(1))))]
    #[case(Statement::declare("r12"))]
    #[case(Statement::print_variable("rsi"))]
    #[case(Statement::function("rbx", Vec::new()))]
    #[case(Statement::call("rdi"))]
    #[case(Statement::While(WhileStatement { condition: Condition::compare("r8d", "<", 3_i64), body: Vec::new() }))]
    fn register_names_are_reserved(#[case] statement: Statement) {
        let error = lower_to_rtl(&[statement]).unwrap_err();

        assert!(matches!(error, LoweringError::ReservedName { .. }), "{error}");
    }

    #[test]
    fn for_variable_cannot_be_a_register() {
        let tree = vec![Statement::For(ForStatement {
            variable: "rcx".into(),
            init: Atom::Integer(0),
            bound: Atom::Integer(3),
            step: 1,
            body: Vec::new(),
        })];

        assert_eq!(lower_to_rtl(&tree), Err(LoweringError::ReservedName { name: "rcx".into() }));
    }

    #[test]
    fn names_that_only_resemble_registers_are_fine() {
        let tree = vec![
            Statement::assign("rax_count", 1_i64),
            Statement::assign("r16", 2_i64),
        ];

        assert!(lower_to_rtl(&tree).is_ok());
    }

    #[rstest]
    #[case(Statement::assign("x", 4_294_967_296_i64), 4_294_967_296)]
    #[case(Statement::assign("x", Expression::Sum(Atom::variable("x"), Atom::Integer(i64::from(i32::MAX) + 1))), 2_147_483_648)]
    #[case(Statement::If(IfStatement {
        condition: Condition::compare("x", "==", i64::from(i32::MIN) - 1),
        then_block: Vec::new(),
        elif_clauses: Vec::new(),
        else_block: None,
    }), -2_147_483_649)]
    fn integers_must_fit_in_32_bits(#[case] statement: Statement, #[case] value: i64) {
        assert_eq!(lower_to_rtl(&[statement]), Err(LoweringError::IntegerOutOfRange { value }));
    }

    #[test]
    fn for_loop_bounds_and_step_must_fit_in_32_bits() {
        let for_loop = |bound: i64, step: i64| vec![Statement::For(ForStatement {
            variable: "i".into(),
            init: Atom::Integer(0),
            bound: Atom::Integer(bound),
            step,
            body: Vec::new(),
        })];

        assert_eq!(lower_to_rtl(&for_loop(1 << 40, 1)), Err(LoweringError::IntegerOutOfRange { value: 1 << 40 }));
        assert_eq!(lower_to_rtl(&for_loop(3, i64::MIN)), Err(LoweringError::IntegerOutOfRange { value: i64::MIN }));
        assert!(lower_to_rtl(&for_loop(i64::from(i32::MAX), 1)).is_ok());
    }
}
