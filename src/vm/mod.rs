use crate::code::{read_operands, Instructions, Op};
use crate::compiler::Bytecode;
use crate::object::Object;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VMError {
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack empty")]
    StackEmpty,
    #[error("type mismatch: {1} {0} {2}")]
    TypeMismatch(&'static str, &'static str, &'static str),
    #[error("unknown operation {0}")]
    UnknownOperation(Op),
    #[error("unknown op code {0} at {1}")]
    UnknownOpCode(u8, usize),
    #[error("truncated {0} instruction at {1}")]
    TruncatedInstruction(Op, usize),
    #[error("constant {0} is not in the constant pool")]
    UnknownConstant(usize),
    #[error("division by zero")]
    DivisionByZero,
}

/// STACK_SIZE is how deep we can go
pub const STACK_SIZE: usize = 2048;

/// VM is responsible for executing bytecode. It will do the fetch/decode/execute loop for instructions.
pub struct VM {
    constants: Vec<Rc<Object>>,
    instructions: Instructions,

    stack: Vec<Rc<Object>>,
    sp: usize, // aka stack pointer. Always points to the next value. Top of stack is `stack[sp-1]`
}

impl VM {
    pub fn new(bytecode: Bytecode) -> Self {
        VM {
            constants: bytecode.constants,
            instructions: bytecode.instructions,
            stack: vec![Object::null(); STACK_SIZE],
            sp: 0,
        }
    }

    /// Runs the instruction stream to completion and returns the value most recently popped off
    /// the stack, which is the value of the last expression statement.
    pub fn run(&mut self) -> Result<Rc<Object>, VMError> {
        let mut ip = 0;

        while ip < self.instructions.len() {
            let op_code = self.instructions[ip];
            let op = Op::lookup_op(op_code).ok_or(VMError::UnknownOpCode(op_code, ip))?;

            let (operands, width) = read_operands(op, &self.instructions[ip + 1..])
                .ok_or(VMError::TruncatedInstruction(op, ip))?;

            match op {
                Op::Constant => {
                    let const_index = operands[0];
                    let constant = self
                        .constants
                        .get(const_index)
                        .cloned()
                        .ok_or(VMError::UnknownConstant(const_index))?;

                    self.push(constant)?;
                }
                Op::Add | Op::Sub | Op::Mul | Op::Div => self.execute_binary_operation(op)?,
                Op::True => self.push(Object::boolean(true))?,
                Op::False => self.push(Object::boolean(false))?,
                Op::Pop => {
                    self.pop()?;
                }
            }

            ip += 1 + width;
        }

        Ok(self.last_popped_stack_elem())
    }

    pub fn stack_top(&self) -> Option<Rc<Object>> {
        self.sp.checked_sub(1).map(|top| Rc::clone(&self.stack[top]))
    }

    fn execute_binary_operation(&mut self, op: Op) -> Result<(), VMError> {
        let right = self.pop()?;
        let left = self.pop()?;

        match (left.as_ref(), right.as_ref()) {
            (Object::Integer(l), Object::Integer(r)) => {
                self.execute_binary_integer_operation(op, *l, *r)
            }
            (l, r) => Err(VMError::TypeMismatch(
                symbol(op),
                l.type_name(),
                r.type_name(),
            )),
        }
    }

    fn execute_binary_integer_operation(&mut self, op: Op, l: i64, r: i64) -> Result<(), VMError> {
        let result = match op {
            Op::Add => l.wrapping_add(r),
            Op::Sub => l.wrapping_sub(r),
            Op::Mul => l.wrapping_mul(r),
            Op::Div if r == 0 => return Err(VMError::DivisionByZero),
            Op::Div => l.wrapping_div(r),
            _ => return Err(VMError::UnknownOperation(op)),
        };

        self.push(Rc::new(Object::Integer(result)))
    }

    /// The slot just above the stack pointer still holds whatever `Op::Pop` removed last.
    pub fn last_popped_stack_elem(&self) -> Rc<Object> {
        self.stack
            .get(self.sp)
            .cloned()
            .unwrap_or_else(Object::null)
    }

    fn push(&mut self, obj: Rc<Object>) -> Result<(), VMError> {
        if self.sp >= STACK_SIZE {
            return Err(VMError::StackOverflow);
        }

        self.stack[self.sp] = obj;
        self.sp += 1;

        Ok(())
    }

    fn pop(&mut self) -> Result<Rc<Object>, VMError> {
        if self.sp == 0 {
            Err(VMError::StackEmpty)
        } else {
            self.sp -= 1;
            Ok(Rc::clone(&self.stack[self.sp]))
        }
    }
}

fn symbol(op: Op) -> &'static str {
    match op {
        Op::Add => "+",
        Op::Sub => "-",
        Op::Mul => "*",
        Op::Div => "/",
        other => other.name(),
    }
}
