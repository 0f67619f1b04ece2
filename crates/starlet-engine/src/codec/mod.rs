//! Binary encoding of compiled programs.
//!
//! ## Layout
//!
//! ```text
//! magic      "slk\0"
//! version    u32 LE
//! options    u32 LE   dialect bitmask
//! header     section  filename
//! constants  section  tagged literals
//! names      section  predeclared names, universal names
//! globals    section  name and position of each global
//! functions  section  one record per function, toplevel first
//! ```
//!
//! Each section is prefixed by its byte length as a u32 LE. Inside sections,
//! integers are LEB128 varints (zig-zag for signed values) and strings are a
//! length followed by UTF-8 bytes.
//!
//! ## Structure
//!
//! - `writer.rs` - `Encoder` and the section writers
//! - `reader.rs` - `Decoder`, the section readers and structural validation

mod reader;
mod writer;

use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use crate::compiler::Program;
use crate::error::DecodeError;
use crate::options::FileOptions;

use reader::Decoder;
use writer::Encoder;

/// Prefix identifying a compiled program.
pub const MAGIC: &[u8; 4] = b"slk\0";

/// Version of the encoding produced by this build.
pub const VERSION: u32 = 1;

const TAG_STRING: u8 = 0;
const TAG_BYTES: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_BIGINT: u8 = 3;
const TAG_FLOAT: u8 = 4;

const TAG_CAPTURE_CELL: u8 = 0;
const TAG_CAPTURE_FREE: u8 = 1;

impl Program {
    /// Encodes the program.
    pub fn encode(&self) -> Vec<u8> {
        let mut e = Encoder::default();
        e.wr_raw(MAGIC);
        e.wr_u32le(VERSION);
        e.wr_u32le(self.options.to_bits());
        e.wr_section(|s| writer::write_header(s, self));
        e.wr_section(|s| writer::write_constants(s, &self.constants));
        e.wr_section(|s| writer::write_names(s, self));
        e.wr_section(|s| writer::write_globals(s, &self.globals));
        e.wr_section(|s| writer::write_functions(s, &self.functions));
        let bytes = e.into_bytes();
        debug!(path = %self.filename, size = bytes.len(), "encoded program");
        bytes
    }

    /// Writes the encoded program to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&self.encode())
    }

    /// Decodes a program, validating it for execution.
    pub fn decode(data: &[u8]) -> Result<Program, DecodeError> {
        if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
            return Err(DecodeError::NotCompiled);
        }
        let mut d = Decoder::new(&data[MAGIC.len()..]);
        let version = d.rd_u32le()?;
        if version != VERSION {
            return Err(DecodeError::Version {
                found: version,
                expected: VERSION,
            });
        }
        let bits = d.rd_u32le()?;
        let options = FileOptions::from_bits(bits)
            .ok_or_else(|| DecodeError::corrupt(format!("unknown option bits {:#x}", bits)))?;

        let filename = d.rd_section(reader::read_header)?;
        let constants = d.rd_section(reader::read_constants)?;
        let (predeclared, universals) = d.rd_section(reader::read_names)?;
        let globals = d.rd_section(reader::read_globals)?;
        let functions = d.rd_section(reader::read_functions)?;
        d.finish()?;

        let program = Program {
            filename: Arc::from(filename),
            options,
            constants,
            functions,
            globals,
            predeclared,
            universals,
        };
        reader::validate(&program)?;
        debug!(path = %program.filename, size = data.len(), "decoded program");
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Constant, OpCode};

    fn compile(src: &str, options: FileOptions) -> Program {
        let (_, program) =
            crate::source_program_options(options, "t.star", src, &|name| name == "p").expect("Should compile");
        program
    }

    const SAMPLE: &str = r#"
def f(a, b=2, *args, **kwargs):
    "doc"
    x = [a, b, 1.5, b"\x00", 123456789012345678901234567890, -7]
    def g():
        return x
    return g

y = f(p)
z = {"k": (1, 2)}
"#;

    #[test]
    fn test_roundtrip_is_identical() {
        let program = compile(SAMPLE, FileOptions::default());
        let decoded = Program::decode(&program.encode()).expect("decode");
        assert_eq!(decoded, program);
    }

    #[test]
    fn test_roundtrip_preserves_options() {
        let options = FileOptions::permissive();
        let program = compile("x = 1\n", options);
        let decoded = Program::decode(&program.encode()).expect("decode");
        assert_eq!(decoded.options, options);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = compile(SAMPLE, FileOptions::default()).encode();
        let b = compile(SAMPLE, FileOptions::default()).encode();
        assert_eq!(a, b);
    }

    #[test]
    fn test_header_layout() {
        let bytes = compile("x = 1\n", FileOptions::default()).encode();
        assert_eq!(&bytes[..4], b"slk\0");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), VERSION);
    }

    #[test]
    fn test_garbage_is_not_compiled() {
        let err = Program::decode(b"This is not a compiled Starlark program.").expect_err("garbage");
        assert_eq!(err, DecodeError::NotCompiled);
        assert_eq!(Program::decode(b"").expect_err("empty"), DecodeError::NotCompiled);
    }

    #[test]
    fn test_wrong_version() {
        let mut bytes = compile("x = 1\n", FileOptions::default()).encode();
        bytes[4] = 99;
        assert!(matches!(
            Program::decode(&bytes),
            Err(DecodeError::Version { found: 99, expected: VERSION })
        ));
    }

    #[test]
    fn test_every_truncation_is_an_error() {
        let bytes = compile(SAMPLE, FileOptions::default()).encode();
        for len in 4..bytes.len() {
            let err = Program::decode(&bytes[..len]).expect_err("truncated input");
            assert!(
                matches!(err, DecodeError::Truncated | DecodeError::Corrupt(_)),
                "len {}: {:?}",
                len,
                err
            );
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = compile("x = 1\n", FileOptions::default()).encode();
        bytes.push(0);
        assert!(matches!(Program::decode(&bytes), Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn test_unknown_option_bits_rejected() {
        let mut bytes = compile("x = 1\n", FileOptions::default()).encode();
        bytes[11] = 0x80;
        assert!(matches!(Program::decode(&bytes), Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut program = compile("x = 1\n", FileOptions::default());
        program.functions[0].code[0].arg = 42;
        assert_eq!(program.functions[0].code[0].opcode, OpCode::Constant);
        let err = Program::decode(&program.encode()).expect_err("bad constant index");
        assert!(err.to_string().contains("out of range"), "{}", err);
    }

    #[test]
    fn test_bigint_and_float_constants() {
        let program = compile("x = 123456789012345678901234567890\ny = -0.0\n", FileOptions::default());
        let decoded = Program::decode(&program.encode()).expect("decode");
        assert!(matches!(decoded.constants[0], Constant::BigInt(_)));
        assert_eq!(decoded.constants[1], Constant::Float(0.0));
    }

    #[test]
    fn test_write_to() {
        let program = compile("x = 1\n", FileOptions::default());
        let mut buf = Vec::new();
        program.write_to(&mut buf).expect("write");
        assert_eq!(buf, program.encode());
    }
}
