//! Compiles the arithmetic subset of the language to bytecode for the [`VM`](crate::vm::VM).
//!
//! Only integer and boolean literals and the four arithmetic operators are supported. Everything
//! else is reported as [`CompilerError::Unsupported`]; use the evaluator for the full language.

mod bytecode;

use crate::ast::{Expression, InfixOperator, Program, Statement};
use crate::code::{make_instruction, Instructions, Op};
use crate::object::Object;
pub use bytecode::{Bytecode, BytecodeError};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("compiling `{0}` is not supported")]
    Unsupported(String),
    #[error("too many constants, the limit is {}", u16::MAX as usize + 1)]
    TooManyConstants,
}

/// Compiler is responsible for taking an AST and turning it into bytecode.
#[derive(Default)]
pub struct Compiler {
    pub constants: Vec<Rc<Object>>,
    instructions: Instructions,
}

impl Compiler {
    pub fn new() -> Self {
        Default::default()
    }

    /// new_with_state returns a Compiler that keeps appending to the constants of a previous
    /// compilation. This is needed by the REPL.
    pub fn new_with_state(constants: Vec<Rc<Object>>) -> Self {
        Compiler {
            constants,
            ..Default::default()
        }
    }

    pub fn compile(&mut self, program: &Program) -> Result<Bytecode, CompilerError> {
        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }

        Ok(self.bytecode())
    }

    fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    pub fn current_instructions(&self) -> &Instructions {
        &self.instructions
    }

    fn compile_statement(&mut self, stmt: &Statement) -> Result<(), CompilerError> {
        match stmt {
            Statement::Expression(exp) => {
                self.compile_expression(exp)?;
                self.emit(Op::Pop, &[]);
                Ok(())
            }
            other => Err(CompilerError::Unsupported(other.to_string())),
        }
    }

    fn compile_expression(&mut self, exp: &Expression) -> Result<(), CompilerError> {
        match exp {
            Expression::IntegerLiteral(v) => {
                let constant = self.add_constant(Object::Integer(*v))?;
                self.emit(Op::Constant, &[constant]);
            }
            Expression::Boolean(true) => {
                self.emit(Op::True, &[]);
            }
            Expression::Boolean(false) => {
                self.emit(Op::False, &[]);
            }
            Expression::Infix(operator, left, right) => {
                let op = match operator {
                    InfixOperator::Plus => Op::Add,
                    InfixOperator::Minus => Op::Sub,
                    InfixOperator::Asterisk => Op::Mul,
                    InfixOperator::Slash => Op::Div,
                    _ => return Err(CompilerError::Unsupported(exp.to_string())),
                };

                self.compile_expression(left)?;
                self.compile_expression(right)?;
                self.emit(op, &[]);
            }
            other => return Err(CompilerError::Unsupported(other.to_string())),
        }

        Ok(())
    }

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let pos = self.instructions.len();
        self.instructions.extend(make_instruction(op, operands));
        pos
    }

    fn add_constant(&mut self, obj: Object) -> Result<usize, CompilerError> {
        if self.constants.len() > u16::MAX as usize {
            return Err(CompilerError::TooManyConstants);
        }

        self.constants.push(Rc::new(obj));
        Ok(self.constants.len() - 1)
    }
}
