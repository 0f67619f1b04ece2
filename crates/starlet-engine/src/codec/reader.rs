//! Decoding and validation of programs.

use num_bigint::BigInt;

use crate::compiler::{Capture, Constant, FreeVar, Funcode, Instruction, LineEntry, Named, OpCode, Program};
use crate::error::DecodeError;
use crate::lexer::Position;

use super::{
    TAG_BIGINT, TAG_BYTES, TAG_CAPTURE_CELL, TAG_CAPTURE_FREE, TAG_FLOAT, TAG_INT, TAG_STRING,
};

type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Cursor over an input slice with the primitive readers.
pub(super) struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn rd_raw(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated);
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn rd_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.rd_raw(1)?[0])
    }

    pub fn rd_u32le(&mut self) -> DecodeResult<u32> {
        let b = self.rd_raw(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn rd_uvarint(&mut self) -> DecodeResult<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = self.rd_u8()?;
            let bits = u64::from(byte & 0x7f);
            if shift == 63 && bits > 1 {
                return Err(DecodeError::corrupt("varint overflows 64 bits"));
            }
            value |= bits << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::corrupt("varint too long"))
    }

    pub fn rd_varint(&mut self) -> DecodeResult<i64> {
        let v = self.rd_uvarint()?;
        Ok(((v >> 1) as i64) ^ -((v & 1) as i64))
    }

    pub fn rd_u32(&mut self) -> DecodeResult<u32> {
        u32::try_from(self.rd_uvarint()?).map_err(|_| DecodeError::corrupt("value exceeds 32 bits"))
    }

    pub fn rd_len(&mut self) -> DecodeResult<usize> {
        usize::try_from(self.rd_u32()?).map_err(|_| DecodeError::corrupt("length out of range"))
    }

    /// Reads an element count. Every element takes at least one byte, so a
    /// count beyond the remaining input means the input was cut short.
    fn rd_count(&mut self) -> DecodeResult<usize> {
        let n = self.rd_len()?;
        if n > self.remaining() {
            return Err(DecodeError::Truncated);
        }
        Ok(n)
    }

    pub fn rd_bytes(&mut self) -> DecodeResult<&'a [u8]> {
        let n = self.rd_len()?;
        self.rd_raw(n)
    }

    pub fn rd_str(&mut self) -> DecodeResult<String> {
        let bytes = self.rd_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::corrupt("invalid UTF-8 in string"))
    }

    pub fn rd_pos(&mut self) -> DecodeResult<Position> {
        Ok(Position::new(self.rd_u32()?, self.rd_u32()?))
    }

    fn rd_named(&mut self) -> DecodeResult<Named> {
        Ok(Named {
            name: self.rd_str()?,
            pos: self.rd_pos()?,
        })
    }

    /// Reads a length-prefixed section and hands its body to `f`, which must
    /// consume it exactly.
    pub fn rd_section<T>(&mut self, f: impl FnOnce(&mut Decoder<'a>) -> DecodeResult<T>) -> DecodeResult<T> {
        let n = self.rd_u32le()? as usize;
        let body = self.rd_raw(n)?;
        let mut section = Decoder::new(body);
        let value = f(&mut section)?;
        section.finish()?;
        Ok(value)
    }

    /// Fails if any input is left over.
    pub fn finish(&self) -> DecodeResult<()> {
        if self.remaining() != 0 {
            return Err(DecodeError::corrupt(format!("{} trailing bytes", self.remaining())));
        }
        Ok(())
    }
}

pub(super) fn read_header(d: &mut Decoder<'_>) -> DecodeResult<String> {
    d.rd_str()
}

pub(super) fn read_constants(d: &mut Decoder<'_>) -> DecodeResult<Vec<Constant>> {
    let n = d.rd_count()?;
    let mut constants = Vec::with_capacity(n);
    for _ in 0..n {
        let constant = match d.rd_u8()? {
            TAG_STRING => Constant::String(d.rd_str()?),
            TAG_BYTES => Constant::Bytes(d.rd_bytes()?.to_vec()),
            TAG_INT => Constant::Int(d.rd_varint()?),
            TAG_BIGINT => Constant::BigInt(BigInt::from_signed_bytes_le(d.rd_bytes()?)),
            TAG_FLOAT => {
                let b = d.rd_raw(8)?;
                let mut bits = [0u8; 8];
                bits.copy_from_slice(b);
                Constant::Float(f64::from_bits(u64::from_le_bytes(bits)))
            }
            tag => return Err(DecodeError::corrupt(format!("unknown constant tag {}", tag))),
        };
        constants.push(constant);
    }
    Ok(constants)
}

pub(super) fn read_names(d: &mut Decoder<'_>) -> DecodeResult<(Vec<String>, Vec<String>)> {
    fn read_list(d: &mut Decoder<'_>) -> DecodeResult<Vec<String>> {
        let n = d.rd_count()?;
        let mut names = Vec::with_capacity(n);
        for _ in 0..n {
            names.push(d.rd_str()?);
        }
        Ok(names)
    }
    let predeclared = read_list(d)?;
    let universals = read_list(d)?;
    Ok((predeclared, universals))
}

pub(super) fn read_globals(d: &mut Decoder<'_>) -> DecodeResult<Vec<Named>> {
    let n = d.rd_count()?;
    let mut globals = Vec::with_capacity(n);
    for _ in 0..n {
        globals.push(d.rd_named()?);
    }
    Ok(globals)
}

pub(super) fn read_functions(d: &mut Decoder<'_>) -> DecodeResult<Vec<Funcode>> {
    let n = d.rd_count()?;
    let mut functions = Vec::with_capacity(n);
    for _ in 0..n {
        functions.push(read_funcode(d)?);
    }
    Ok(functions)
}

fn read_funcode(d: &mut Decoder<'_>) -> DecodeResult<Funcode> {
    let name = d.rd_str()?;
    let pos = d.rd_pos()?;
    let doc = match d.rd_u8()? {
        0 => None,
        1 => Some(d.rd_str()?),
        other => return Err(DecodeError::corrupt(format!("invalid doc flag {}", other))),
    };
    let num_params = d.rd_len()?;
    let num_defaults = d.rd_len()?;
    let flags = d.rd_u8()?;
    if flags & !0b11 != 0 {
        return Err(DecodeError::corrupt(format!("invalid parameter flags {:#x}", flags)));
    }

    let n = d.rd_count()?;
    let mut locals = Vec::with_capacity(n);
    for _ in 0..n {
        locals.push(d.rd_named()?);
    }

    let n = d.rd_count()?;
    let mut cells = Vec::with_capacity(n);
    for _ in 0..n {
        cells.push(d.rd_len()?);
    }

    let n = d.rd_count()?;
    let mut freevars = Vec::with_capacity(n);
    for _ in 0..n {
        let name = d.rd_str()?;
        let pos = d.rd_pos()?;
        let source = match d.rd_u8()? {
            TAG_CAPTURE_CELL => Capture::Cell(d.rd_u32()?),
            TAG_CAPTURE_FREE => Capture::Free(d.rd_u32()?),
            tag => return Err(DecodeError::corrupt(format!("unknown capture tag {}", tag))),
        };
        freevars.push(FreeVar { name, pos, source });
    }

    let n = d.rd_count()?;
    let mut code = Vec::with_capacity(n);
    for _ in 0..n {
        let byte = d.rd_u8()?;
        let opcode =
            OpCode::from_u8(byte).ok_or_else(|| DecodeError::corrupt(format!("invalid opcode {}", byte)))?;
        let arg = if opcode.has_arg() { d.rd_u32()? } else { 0 };
        code.push(Instruction { opcode, arg });
    }

    let n = d.rd_count()?;
    let mut lines = Vec::with_capacity(n);
    let mut pc = 0u32;
    for _ in 0..n {
        pc = pc
            .checked_add(d.rd_u32()?)
            .ok_or_else(|| DecodeError::corrupt("line table pc overflows"))?;
        lines.push(LineEntry { pc, pos: d.rd_pos()? });
    }
    let max_stack = d.rd_len()?;

    Ok(Funcode {
        name,
        pos,
        doc,
        num_params,
        num_defaults,
        has_varargs: flags & 1 != 0,
        has_kwargs: flags & 2 != 0,
        locals,
        cells,
        freevars,
        code,
        lines,
        max_stack,
    })
}

/// Checks every index a program carries so that execution cannot go out of
/// range.
pub(super) fn validate(program: &Program) -> DecodeResult<()> {
    if program.functions.is_empty() {
        return Err(DecodeError::corrupt("program has no toplevel function"));
    }
    if program.toplevel().num_params != 0 || !program.toplevel().freevars.is_empty() {
        return Err(DecodeError::corrupt("toplevel function takes parameters"));
    }
    for (index, fc) in program.functions.iter().enumerate() {
        validate_funcode(program, fc)
            .map_err(|msg| DecodeError::corrupt(format!("function {} ({}): {}", index, fc.name, msg)))?;
    }
    Ok(())
}

fn validate_funcode(program: &Program, fc: &Funcode) -> std::result::Result<(), String> {
    let extra = usize::from(fc.has_varargs) + usize::from(fc.has_kwargs);
    if fc.num_params < extra || fc.num_params > fc.locals.len() {
        return Err("parameter count out of range".into());
    }
    if fc.num_defaults > fc.num_params - extra {
        return Err("default count out of range".into());
    }
    if let Some(&cell) = fc.cells.iter().find(|&&c| c >= fc.locals.len()) {
        return Err(format!("cell index {} out of range", cell));
    }

    let Some(last) = fc.code.last() else {
        return Err("empty code".into());
    };
    if !matches!(last.opcode, OpCode::Return | OpCode::Jump) {
        return Err("code may run past its end".into());
    }

    let in_range = |arg: u32, len: usize| (arg as usize) < len;
    for (pc, insn) in fc.code.iter().enumerate() {
        let arg = insn.arg;
        let ok = match insn.opcode {
            OpCode::Constant => in_range(arg, program.constants.len()),
            OpCode::Local | OpCode::SetLocal | OpCode::LocalCell | OpCode::SetLocalCell => {
                in_range(arg, fc.locals.len())
            }
            OpCode::Free => in_range(arg, fc.freevars.len()),
            OpCode::Global | OpCode::SetGlobal => in_range(arg, program.globals.len()),
            OpCode::Predeclared => in_range(arg, program.predeclared.len()),
            OpCode::Universal => in_range(arg, program.universals.len()),
            op if op.is_jump() => in_range(arg, fc.code.len()),
            OpCode::MakeFunc => {
                let index = arg as usize;
                if index == 0 || index >= program.functions.len() {
                    false
                } else {
                    program.functions[index].freevars.iter().all(|free| match free.source {
                        Capture::Cell(slot) => fc.cells.contains(&(slot as usize)),
                        Capture::Free(i) => in_range(i, fc.freevars.len()),
                    })
                }
            }
            _ => true,
        };
        if !ok {
            return Err(format!("instruction {} at pc {} is out of range", insn, pc));
        }
    }

    if !fc.lines.windows(2).all(|w| w[0].pc < w[1].pc) {
        return Err("line table is not sorted".into());
    }
    if fc.lines.last().is_some_and(|e| e.pc as usize > fc.code.len()) {
        return Err("line table pc out of range".into());
    }
    Ok(())
}
