use byteorder::{BigEndian, ByteOrder};
use std::fmt;

/// Instructions is a stream of bytecode instructions
pub type Instructions = Vec<u8>;

/// Op is the first byte in an Instruction, followed by an optional number of fixed-width operands.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    Constant,
    Add,
    Sub,
    Mul,
    Div,
    True,
    False,
    Pop,
}

impl Op {
    /// Returns the human-readable name of the Op code
    pub fn name(&self) -> &'static str {
        match self {
            Op::Constant => "OpConstant",
            Op::Add => "OpAdd",
            Op::Sub => "OpSub",
            Op::Mul => "OpMul",
            Op::Div => "OpDiv",
            Op::True => "OpTrue",
            Op::False => "OpFalse",
            Op::Pop => "OpPop",
        }
    }

    /// Width in bytes of each operand. Every operand is currently a big-endian u16.
    pub fn operand_widths(&self) -> &'static [usize] {
        match self {
            Op::Constant => &[2],
            _ => &[],
        }
    }

    pub fn lookup_op(op_code: u8) -> Option<Op> {
        match op_code {
            0 => Some(Op::Constant),
            1 => Some(Op::Add),
            2 => Some(Op::Sub),
            3 => Some(Op::Mul),
            4 => Some(Op::Div),
            5 => Some(Op::True),
            6 => Some(Op::False),
            7 => Some(Op::Pop),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decodes the operands of `op` from the start of `instructions`, returning them along with the
/// number of bytes read. Returns `None` if the stream ends mid-operand.
pub fn read_operands(op: Op, instructions: &[u8]) -> Option<(Vec<usize>, usize)> {
    let widths = op.operand_widths();
    let mut operands = Vec::with_capacity(widths.len());
    let mut offset = 0;

    for width in widths {
        let bytes = instructions.get(offset..offset + width)?;
        operands.push(BigEndian::read_u16(bytes) as usize);
        offset += width;
    }

    Some((operands, offset))
}

pub fn make_instruction(op: Op, operands: &[usize]) -> Instructions {
    let mut instruction = vec![op as u8];

    for (o, width) in operands.iter().zip(op.operand_widths()) {
        let mut buf = vec![0; *width];
        BigEndian::write_u16(&mut buf, *o as u16);
        instruction.extend(buf);
    }

    instruction
}

/// Disassembles `instructions`, one instruction per line prefixed with its offset.
pub fn fmt_instructions(instructions: &[u8]) -> String {
    let mut result = String::new();

    let mut i = 0;

    while i < instructions.len() {
        let op_code = instructions[i];
        let op = match Op::lookup_op(op_code) {
            Some(op) => op,
            None => return format!("Unknown op code {} at {}", op_code, i),
        };

        if i > 0 {
            result.push('\n');
        }

        result.push_str(&format!("{:04} {}", i, op.name()));

        i += 1; // slurp the op_code

        match read_operands(op, &instructions[i..]) {
            Some((operands, offset)) => {
                for operand in operands {
                    result.push_str(&format!(" {}", operand));
                }

                i += offset; // slurp the operands
            }
            None => {
                result.push_str(" <truncated>");
                break;
            }
        }
    }

    result
}
