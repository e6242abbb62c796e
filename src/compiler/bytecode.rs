use crate::code::Instructions;
use crate::object::Object;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use std::rc::Rc;
use thiserror::Error;

const MAGIC: &[u8; 4] = b"HMJB";
const VERSION: u8 = 1;
const INTEGER_TAG: u8 = 0;

/// Bytecode is the output of the compiler: a flat instruction stream plus the constant pool it
/// indexes into.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Rc<Object>>,
}

#[derive(Debug, Error)]
pub enum BytecodeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("not a bytecode file")]
    BadMagic,
    #[error("unsupported bytecode version {0}")]
    UnsupportedVersion(u8),
    #[error("unknown constant tag {0}")]
    UnknownConstantTag(u8),
    #[error("cannot serialise a {0} constant")]
    UnsupportedConstant(&'static str),
    #[error("{0} is too large to serialise")]
    TooLarge(&'static str),
    #[error("expected {expected} bytes of instructions, found {found}")]
    Truncated { expected: u32, found: usize },
}

impl Bytecode {
    /// Serialises the bytecode. All multi-byte values are big-endian:
    ///
    /// ```text
    /// magic "HMJB" | version u8 | constant count u16 | (tag u8, i64)* | length u32 | instructions
    /// ```
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), BytecodeError> {
        w.write_all(MAGIC)?;
        w.write_u8(VERSION)?;

        let count = u16::try_from(self.constants.len())
            .map_err(|_| BytecodeError::TooLarge("constant pool"))?;
        w.write_u16::<BigEndian>(count)?;

        for constant in &self.constants {
            match constant.as_ref() {
                Object::Integer(v) => {
                    w.write_u8(INTEGER_TAG)?;
                    w.write_i64::<BigEndian>(*v)?;
                }
                other => return Err(BytecodeError::UnsupportedConstant(other.type_name())),
            }
        }

        let len = u32::try_from(self.instructions.len())
            .map_err(|_| BytecodeError::TooLarge("instruction stream"))?;
        w.write_u32::<BigEndian>(len)?;
        w.write_all(&self.instructions)?;

        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, BytecodeError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != *MAGIC {
            return Err(BytecodeError::BadMagic);
        }

        let version = r.read_u8()?;
        if version != VERSION {
            return Err(BytecodeError::UnsupportedVersion(version));
        }

        let count = r.read_u16::<BigEndian>()?;
        let mut constants = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match r.read_u8()? {
                INTEGER_TAG => constants.push(Rc::new(Object::Integer(r.read_i64::<BigEndian>()?))),
                tag => return Err(BytecodeError::UnknownConstantTag(tag)),
            }
        }

        let len = r.read_u32::<BigEndian>()?;
        // The claimed length is untrusted, so let the reader bound the allocation.
        let mut instructions = Vec::new();
        r.by_ref().take(u64::from(len)).read_to_end(&mut instructions)?;
        if instructions.len() != len as usize {
            return Err(BytecodeError::Truncated {
                expected: len,
                found: instructions.len(),
            });
        }

        Ok(Bytecode {
            instructions,
            constants,
        })
    }
}
