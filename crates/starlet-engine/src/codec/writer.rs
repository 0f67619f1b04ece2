//! Encoding of programs.

use crate::compiler::{Capture, Constant, Funcode, Named, Program};
use crate::lexer::Position;

use super::{
    TAG_BIGINT, TAG_BYTES, TAG_CAPTURE_CELL, TAG_CAPTURE_FREE, TAG_FLOAT, TAG_INT, TAG_STRING,
};

/// Byte sink with the primitive writers used by every section.
#[derive(Default)]
pub(super) struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn wr_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn wr_u32le(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn wr_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Unsigned LEB128.
    pub fn wr_uvarint(&mut self, mut v: u64) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    /// Zig-zag encoded signed LEB128.
    pub fn wr_varint(&mut self, v: i64) {
        self.wr_uvarint(((v << 1) ^ (v >> 63)) as u64);
    }

    pub fn wr_len(&mut self, n: usize) {
        self.wr_uvarint(n as u64);
    }

    pub fn wr_bytes(&mut self, bytes: &[u8]) {
        self.wr_len(bytes.len());
        self.wr_raw(bytes);
    }

    pub fn wr_str(&mut self, s: &str) {
        self.wr_bytes(s.as_bytes());
    }

    pub fn wr_pos(&mut self, pos: Position) {
        self.wr_uvarint(u64::from(pos.line));
        self.wr_uvarint(u64::from(pos.col));
    }

    fn wr_named(&mut self, named: &Named) {
        self.wr_str(&named.name);
        self.wr_pos(named.pos);
    }

    /// Writes a section body prefixed by its length.
    pub fn wr_section(&mut self, body: impl FnOnce(&mut Encoder)) {
        let mut section = Encoder::default();
        body(&mut section);
        self.wr_u32le(section.buf.len() as u32);
        self.wr_raw(&section.buf);
    }
}

pub(super) fn write_header(e: &mut Encoder, program: &Program) {
    e.wr_str(&program.filename);
}

pub(super) fn write_constants(e: &mut Encoder, constants: &[Constant]) {
    e.wr_len(constants.len());
    for constant in constants {
        match constant {
            Constant::String(s) => {
                e.wr_u8(TAG_STRING);
                e.wr_str(s);
            }
            Constant::Bytes(b) => {
                e.wr_u8(TAG_BYTES);
                e.wr_bytes(b);
            }
            Constant::Int(i) => {
                e.wr_u8(TAG_INT);
                e.wr_varint(*i);
            }
            Constant::BigInt(i) => {
                e.wr_u8(TAG_BIGINT);
                e.wr_bytes(&i.to_signed_bytes_le());
            }
            Constant::Float(f) => {
                e.wr_u8(TAG_FLOAT);
                e.wr_raw(&f.to_bits().to_le_bytes());
            }
        }
    }
}

pub(super) fn write_names(e: &mut Encoder, program: &Program) {
    for names in [&program.predeclared, &program.universals] {
        e.wr_len(names.len());
        for name in names {
            e.wr_str(name);
        }
    }
}

pub(super) fn write_globals(e: &mut Encoder, globals: &[Named]) {
    e.wr_len(globals.len());
    for global in globals {
        e.wr_named(global);
    }
}

pub(super) fn write_functions(e: &mut Encoder, functions: &[Funcode]) {
    e.wr_len(functions.len());
    for fc in functions {
        write_funcode(e, fc);
    }
}

fn write_funcode(e: &mut Encoder, fc: &Funcode) {
    e.wr_str(&fc.name);
    e.wr_pos(fc.pos);
    match &fc.doc {
        Some(doc) => {
            e.wr_u8(1);
            e.wr_str(doc);
        }
        None => e.wr_u8(0),
    }
    e.wr_len(fc.num_params);
    e.wr_len(fc.num_defaults);
    e.wr_u8(u8::from(fc.has_varargs) | (u8::from(fc.has_kwargs) << 1));

    e.wr_len(fc.locals.len());
    for local in &fc.locals {
        e.wr_named(local);
    }
    e.wr_len(fc.cells.len());
    for &cell in &fc.cells {
        e.wr_len(cell);
    }
    e.wr_len(fc.freevars.len());
    for free in &fc.freevars {
        e.wr_str(&free.name);
        e.wr_pos(free.pos);
        let (tag, index) = match free.source {
            Capture::Cell(i) => (TAG_CAPTURE_CELL, i),
            Capture::Free(i) => (TAG_CAPTURE_FREE, i),
        };
        e.wr_u8(tag);
        e.wr_uvarint(u64::from(index));
    }

    e.wr_len(fc.code.len());
    for insn in &fc.code {
        e.wr_u8(insn.opcode as u8);
        if insn.opcode.has_arg() {
            e.wr_uvarint(u64::from(insn.arg));
        }
    }

    // pcs are delta-encoded; the table is sorted by pc
    e.wr_len(fc.lines.len());
    let mut last_pc = 0u32;
    for entry in &fc.lines {
        e.wr_uvarint(u64::from(entry.pc - last_pc));
        e.wr_pos(entry.pos);
        last_pc = entry.pc;
    }
    e.wr_len(fc.max_stack);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
        let mut e = Encoder::default();
        f(&mut e);
        e.into_bytes()
    }

    #[test]
    fn test_uvarint_encoding() {
        assert_eq!(encoded(|e| e.wr_uvarint(0)), vec![0]);
        assert_eq!(encoded(|e| e.wr_uvarint(127)), vec![0x7f]);
        assert_eq!(encoded(|e| e.wr_uvarint(300)), vec![0xac, 0x02]);
    }

    #[test]
    fn test_zigzag_encoding() {
        assert_eq!(encoded(|e| e.wr_varint(0)), vec![0]);
        assert_eq!(encoded(|e| e.wr_varint(-1)), vec![1]);
        assert_eq!(encoded(|e| e.wr_varint(1)), vec![2]);
        assert_eq!(encoded(|e| e.wr_varint(i64::MIN)).len(), 10);
    }

    #[test]
    fn test_section_length_prefix() {
        let bytes = encoded(|e| e.wr_section(|s| s.wr_str("ab")));
        assert_eq!(bytes, vec![3, 0, 0, 0, 2, b'a', b'b']);
    }
}
