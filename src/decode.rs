//! The instruction decoder: turns a 16-bit opcode word plus its extension
//! words into a [`DecodedInstruction`].
//!
//! The MSP430 opcode space is structured rather than enumerated, so decoding
//! is a small cascade of field extractions per format (double-operand,
//! single-operand, jump) rather than a flat per-opcode table.

use crate::error::{EmulatorError, Result};
use crate::instruction::{
    constant_generator_value, AddressingMode, DecodedInstruction, DoubleOperandOp, Instruction,
    JumpCondition, SingleOperandOp,
};

fn opcode_field(word: u16) -> u8 {
    ((word >> 12) & 0xF) as u8
}

fn bw_bit(word: u16) -> bool {
    (word & 0x0040) != 0
}

fn double_operand_op(field: u8) -> Option<DoubleOperandOp> {
    Some(match field {
        0x4 => DoubleOperandOp::Mov,
        0x5 => DoubleOperandOp::Add,
        0x6 => DoubleOperandOp::Addc,
        0x7 => DoubleOperandOp::Subc,
        0x8 => DoubleOperandOp::Sub,
        0x9 => DoubleOperandOp::Cmp,
        0xA => DoubleOperandOp::Dadd,
        0xB => DoubleOperandOp::Bit,
        0xC => DoubleOperandOp::Bic,
        0xD => DoubleOperandOp::Bis,
        0xE => DoubleOperandOp::Xor,
        0xF => DoubleOperandOp::And,
        _ => return None,
    })
}

fn single_operand_op(field: u8) -> Option<SingleOperandOp> {
    Some(match field {
        0b000 => SingleOperandOp::Rrc,
        0b001 => SingleOperandOp::Swpb,
        0b010 => SingleOperandOp::Rra,
        0b011 => SingleOperandOp::Sxt,
        0b100 => SingleOperandOp::Push,
        0b101 => SingleOperandOp::Call,
        0b110 => SingleOperandOp::Reti,
        _ => return None,
    })
}

fn jump_condition(field: u8) -> JumpCondition {
    match field {
        0b000 => JumpCondition::Ne,
        0b001 => JumpCondition::Eq,
        0b010 => JumpCondition::Nc,
        0b011 => JumpCondition::C,
        0b100 => JumpCondition::N,
        0b101 => JumpCondition::Ge,
        0b110 => JumpCondition::L,
        _ => JumpCondition::Jmp,
    }
}

fn sign_extend_jump_offset(raw: u16) -> i16 {
    let field = raw & 0x03FF;
    if field & 0x0200 != 0 {
        (field | 0xFC00) as i16
    } else {
        field as i16
    }
}

/// Decode one instruction word. `fetch_extension` is called (at most twice,
/// in fetch order: source word before destination word) to obtain extension
/// words as the decoder discovers it needs them; this lets the host supply
/// them lazily from memory at `PC + 2`, `PC + 4`, ... without the decoder
/// owning a memory reference itself.
pub fn decode(
    word: u16,
    mut fetch_extension: impl FnMut(u8) -> Result<u16>,
) -> Result<DecodedInstruction> {
    let top_field = opcode_field(word);

    // Format III: jumps, top 3 bits = 001.
    if (word & 0xE000) == 0x2000 {
        let condition = jump_condition(((word >> 10) & 0x7) as u8);
        let offset = sign_extend_jump_offset(word);
        // The field itself covers the full signed 10-bit range (-512..=511),
        // but the documented jump range is asymmetric: -512 is excluded.
        if !(-511..=512).contains(&offset) {
            log::warn!("jump offset {offset} outside -511..=512 in opcode {word:#06x}");
            return Err(EmulatorError::InvalidInstruction {
                opcode: word,
                detail: "jump offset outside -511..=512",
            });
        }
        return Ok(DecodedInstruction {
            opcode: word,
            instruction: Instruction::Jump { condition, offset },
            extension_words: [0, 0],
        });
    }

    // Format II: single-operand, top 6 bits = 000100.
    if (word & 0xFC00) == 0x1000 {
        let op_field = ((word >> 7) & 0x7) as u8;
        let op = single_operand_op(op_field).ok_or_else(|| {
            log::warn!("reserved single-operand opcode {word:#06x}");
            EmulatorError::InvalidInstruction {
                opcode: word,
                detail: "reserved single-operand opcode",
            }
        })?;
        let byte_op = bw_bit(word);
        // Format II reuses the full 2-bit As encoding (not a 1-bit Ad), so
        // @Rn and @Rn+ destinations are valid here even though Format I's
        // destination field only ever carries a 1-bit Ad.
        let as_bits = ((word >> 4) & 0x3) as u8;
        let dst_reg = (word & 0xF) as u8;
        let dst_mode = AddressingMode::from_source_bits(as_bits, dst_reg);

        // The single operand is resolved through the same source-style
        // table as Format I, so it is subject to the same constant-generator
        // bypass: e.g. "RRC @R3" (the "#1" encoding) never fetches an
        // extension word even though `Indexed` ordinarily needs one.
        let is_constant_generator = constant_generator_value(dst_reg, dst_mode).is_some();

        let mut extension_words = [0u16; 2];
        if dst_mode.needs_extension_word() && !is_constant_generator {
            extension_words[0] = fetch_extension(0)?;
        }

        return Ok(DecodedInstruction {
            opcode: word,
            instruction: Instruction::SingleOperand {
                op,
                byte_op,
                dst_reg,
                dst_mode,
            },
            extension_words,
        });
    }

    // Format I: double-operand, top field 0x4-0xF.
    if let Some(op) = double_operand_op(top_field) {
        let src_reg = ((word >> 8) & 0xF) as u8;
        let ad_bit = ((word >> 7) & 0x1) as u8;
        let byte_op = bw_bit(word);
        let as_bits = ((word >> 4) & 0x3) as u8;
        let dst_reg = (word & 0xF) as u8;

        let src_mode = AddressingMode::from_source_bits(as_bits, src_reg);
        let dst_mode = AddressingMode::from_dest_bits(ad_bit, dst_reg);

        // A constant-generator source never consumes an extension word, even
        // when its resolved mode is one that ordinarily would (R3 + Indexed
        // resolves to the same `AddressingMode::Indexed` as a real indexed
        // source, but the encoding is a hardwired "+1", not a real offset).
        let src_is_constant_generator = constant_generator_value(src_reg, src_mode).is_some();

        let mut extension_words = [0u16; 2];
        let mut slot = 0usize;
        if src_mode.needs_extension_word() && !src_is_constant_generator {
            extension_words[slot] = fetch_extension(slot as u8)?;
            slot += 1;
        }
        if dst_mode.needs_extension_word() {
            extension_words[slot] = fetch_extension(slot as u8)?;
        }

        return Ok(DecodedInstruction {
            opcode: word,
            instruction: Instruction::DoubleOperand {
                op,
                byte_op,
                src_reg,
                src_mode,
                dst_reg,
                dst_mode,
            },
            extension_words,
        });
    }

    log::warn!("undefined opcode {word:#06x}");
    Err(EmulatorError::InvalidInstruction {
        opcode: word,
        detail: "undefined opcode",
    })
}

/// Decode the instruction at `pc`, fetching any needed extension words
/// directly from `memory`. A thin convenience wrapper over [`decode`] for
/// hosts that already have a [`crate::memory::Memory`] in hand.
pub fn decode_at(memory: &crate::memory::Memory, pc: u16) -> Result<DecodedInstruction> {
    let word = memory
        .read_word(pc)
        .map_err(|_| EmulatorError::InvalidInstruction {
            opcode: 0,
            detail: "instruction fetch out of bounds",
        })?;
    decode(word, |slot| memory.read_word(pc.wrapping_add(2 + 2 * slot as u16)))
}

/// Encode a decoded instruction back into its opcode word and extension
/// words, the inverse of [`decode`]. Used by the decode/encode round-trip
/// property check.
pub fn encode(decoded: &DecodedInstruction) -> (u16, [u16; 2]) {
    (decoded.opcode, decoded.extension_words)
}
