//! The addressing-mode evaluator.
//!
//! Exposes source reads and destination writes as two plain functions that
//! own their own mutation rather than a pointer-like location handle that
//! could alias a register and a memory cell: `read_source` takes
//! `&mut RegisterFile` only for the autoincrement side effect,
//! `write_destination` takes `&mut RegisterFile` and `&mut Memory` and
//! performs the write itself.

use crate::error::Result;
use crate::instruction::{constant_generator_value, AddressingMode};
use crate::memory::Memory;
use crate::registers::{Reg, RegisterFile, PC};

/// A 16-bit value read from a source operand, together with the cycles the
/// fetch contributed.
pub struct SourceRead {
    pub value: u16,
    pub cycles: u32,
}

fn sign_extend_ext(ext: u16) -> i32 {
    ext as i16 as i32
}

fn low_byte(value: u16) -> u16 {
    value & 0x00FF
}

/// Read a source operand.
///
/// `ext` is the extension word already fetched by the decoder for this
/// operand, if its mode needed one. `current_pc` must already be the PC
/// value *after* every extension word of the current instruction has been
/// consumed, per the PC-relative-modes invariant. Fails with
/// [`crate::error::EmulatorError::MemoryAccessError`] only when the mode
/// reads through memory and the effective address is out of bounds for a
/// word fetch.
pub fn read_source(
    regs: &mut RegisterFile,
    mem: &Memory,
    reg: Reg,
    mode: AddressingMode,
    byte_op: bool,
    ext: Option<u16>,
    current_pc: u16,
) -> Result<SourceRead> {
    if let Some(constant) = constant_generator_value(reg, mode) {
        let value = constant as i16 as u16;
        log::trace!("constant generator R{reg}/{mode:?} -> {value:#06x}");
        return Ok(SourceRead { value, cycles: 1 });
    }

    Ok(match mode {
        AddressingMode::Register => {
            let raw = regs.read(reg);
            let value = if byte_op { low_byte(raw) } else { raw };
            SourceRead { value, cycles: 1 }
        }
        AddressingMode::Indexed => {
            let base = regs.read(reg);
            let addr = base.wrapping_add(sign_extend_ext(ext.unwrap_or(0)) as u16);
            let value = read_operand(mem, addr, byte_op)?;
            SourceRead { value, cycles: 2 }
        }
        AddressingMode::Indirect => {
            let addr = regs.read(reg);
            let value = read_operand(mem, addr, byte_op)?;
            SourceRead { value, cycles: 1 }
        }
        AddressingMode::IndirectAutoincrement => {
            let addr = regs.read(reg);
            let value = read_operand(mem, addr, byte_op)?;
            let step: u16 = if byte_op { 1 } else { 2 };
            regs.write(reg, addr.wrapping_add(step));
            SourceRead { value, cycles: 1 }
        }
        AddressingMode::Immediate => SourceRead {
            value: ext.unwrap_or(0),
            cycles: 1,
        },
        AddressingMode::Absolute => {
            let addr = ext.unwrap_or(0);
            let value = read_operand(mem, addr, byte_op)?;
            SourceRead { value, cycles: 2 }
        }
        AddressingMode::Symbolic => {
            let addr = current_pc.wrapping_add(sign_extend_ext(ext.unwrap_or(0)) as u16);
            let value = read_operand(mem, addr, byte_op)?;
            SourceRead { value, cycles: 2 }
        }
    })
}

fn read_operand(mem: &Memory, addr: u16, byte_op: bool) -> Result<u16> {
    if byte_op {
        Ok(mem.read_byte(addr) as u16)
    } else {
        mem.read_word(addr)
    }
}

fn write_operand(mem: &mut Memory, addr: u16, byte_op: bool, value: u16) -> Result<()> {
    if byte_op {
        mem.write_byte(addr, low_byte(value) as u8);
        Ok(())
    } else {
        mem.write_word(addr, value)
    }
}

/// Write a value to a destination operand, honoring byte/word width. Returns
/// the cycles the destination phase contributes. Only Register, Indexed,
/// Absolute, and Symbolic are valid destination modes; the decoder never
/// produces Indirect, Indirect-autoincrement, or Immediate as a destination.
pub fn write_destination(
    regs: &mut RegisterFile,
    mem: &mut Memory,
    reg: Reg,
    mode: AddressingMode,
    byte_op: bool,
    ext: Option<u16>,
    current_pc: u16,
    value: u16,
) -> Result<u32> {
    Ok(match mode {
        AddressingMode::Register => {
            let stored = if byte_op {
                low_byte(value) | (regs.read(reg) & 0xFF00)
            } else {
                value
            };
            regs.write(reg, stored);
            0
        }
        AddressingMode::Indexed => {
            let base = regs.read(reg);
            let addr = base.wrapping_add(sign_extend_ext(ext.unwrap_or(0)) as u16);
            write_operand(mem, addr, byte_op, value)?;
            3
        }
        AddressingMode::Absolute => {
            let addr = ext.unwrap_or(0);
            write_operand(mem, addr, byte_op, value)?;
            3
        }
        AddressingMode::Symbolic => {
            let addr = current_pc.wrapping_add(sign_extend_ext(ext.unwrap_or(0)) as u16);
            write_operand(mem, addr, byte_op, value)?;
            3
        }
        AddressingMode::Indirect
        | AddressingMode::IndirectAutoincrement
        | AddressingMode::Immediate => {
            debug_assert!(false, "{:?} is not a valid destination addressing mode", mode);
            0
        }
    })
}

/// Effective address of an operand, for instructions (PUSH, single-operand
/// ops) that need the address without going through a full read/write pair.
/// Returns `None` for `Register` (no memory address involved).
pub fn effective_address(
    regs: &RegisterFile,
    reg: Reg,
    mode: AddressingMode,
    ext: Option<u16>,
    current_pc: u16,
) -> Option<u16> {
    match mode {
        AddressingMode::Register => None,
        AddressingMode::Indexed => Some(
            regs.read(reg)
                .wrapping_add(sign_extend_ext(ext.unwrap_or(0)) as u16),
        ),
        AddressingMode::Indirect | AddressingMode::IndirectAutoincrement => Some(regs.read(reg)),
        AddressingMode::Immediate => None,
        AddressingMode::Absolute => Some(ext.unwrap_or(0)),
        AddressingMode::Symbolic => {
            Some(current_pc.wrapping_add(sign_extend_ext(ext.unwrap_or(0)) as u16))
        }
    }
}

/// `true` if `reg` is PC, which changes how the caller must treat the result
/// of a write (PC-relative symbolic addressing already accounts for this at
/// the instruction-fetch level, not here).
pub fn is_pc(reg: Reg) -> bool {
    reg == PC
}
