//! Typed instruction representation.
//!
//! A decoded instruction is a tagged [`Instruction`] variant carrying its own
//! operand registers, addressing modes, and byte/word flag directly on the
//! struct, so executors can match on it exhaustively without reaching back
//! into separate mutable CPU state to find an operand.

use crate::registers::Reg;

/// The three MSP430 instruction formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Double-operand, opcodes 0x4-0xF.
    FormatI,
    /// Single-operand, opcode family 0x1000-0x13FF.
    FormatII,
    /// Conditional/unconditional jump, opcode family 0x2000-0x3FFF.
    FormatIII,
}

/// One of the seven MSP430 addressing modes, already resolved from the raw
/// As/Ad bits plus the encoded register (so `R2`/Indexed decodes straight to
/// `Absolute`, `R0`/Indexed to `Symbolic`, and so on) rather than carried as
/// raw bits the evaluator would have to re-interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// The operand is the register's value directly.
    Register,
    /// `X(Rn)`: effective address is `Rn + sign_extend(ext)`.
    Indexed,
    /// `@Rn`: effective address is `Rn`.
    Indirect,
    /// `@Rn+`: effective address is `Rn`, which is then incremented.
    IndirectAutoincrement,
    /// `#N`: encoded as `@PC+`; the extension word is the value itself.
    Immediate,
    /// `&ADDR`: effective address is the extension word (encoded via R2).
    Absolute,
    /// `ADDR`: effective address is `PC + sign_extend(ext)` (encoded via R0).
    Symbolic,
}

impl AddressingMode {
    /// Whether this mode consumes one extension word.
    pub fn needs_extension_word(self) -> bool {
        matches!(
            self,
            AddressingMode::Indexed
                | AddressingMode::Immediate
                | AddressingMode::Absolute
                | AddressingMode::Symbolic
        )
    }

    /// Decode a *source* mode from the raw 2-bit As field plus the encoded
    /// register, resolving the PC/SR special cases. R3 (CG2) is not special
    /// at this layer: it decodes to the same modes as any other register.
    /// The constant-generator substitution ([`constant_generator_value`])
    /// is a separate, later lookup on the (register, mode) pair this
    /// produces.
    pub fn from_source_bits(as_bits: u8, reg: Reg) -> AddressingMode {
        use crate::registers::{PC, SR};
        match (as_bits, reg) {
            (0b00, _) => AddressingMode::Register,
            (0b01, PC) => AddressingMode::Symbolic,
            (0b01, SR) => AddressingMode::Absolute,
            (0b01, _) => AddressingMode::Indexed,
            (0b10, _) => AddressingMode::Indirect,
            (0b11, PC) => AddressingMode::Immediate,
            (0b11, _) => AddressingMode::IndirectAutoincrement,
            _ => unreachable!("As is a 2-bit field"),
        }
    }

    /// Decode a *destination* mode from the raw 1-bit Ad field plus the
    /// encoded register. Indirect and Indirect-autoincrement are not
    /// representable as destinations; callers must not construct them here.
    pub fn from_dest_bits(ad_bit: u8, reg: Reg) -> AddressingMode {
        use crate::registers::{PC, SR};
        match (ad_bit, reg) {
            (0, _) => AddressingMode::Register,
            (1, PC) => AddressingMode::Symbolic,
            (1, SR) => AddressingMode::Absolute,
            (1, _) => AddressingMode::Indexed,
            _ => unreachable!("Ad is a 1-bit field"),
        }
    }
}

/// The constant generator table from the data model: for the six
/// `(register, mode)` source pairs that trigger it, returns the fixed value
/// the source evaluates to, bypassing both the register and memory. Applies
/// only to source operands; returns `None` for every other pair, including
/// `(R2, Register)` and `(R2, Indexed)`, which the table explicitly calls
/// out as *not* constant (an ordinary SR read and an absolute address,
/// respectively).
pub fn constant_generator_value(reg: Reg, mode: AddressingMode) -> Option<i32> {
    use crate::registers::CG2;
    use crate::registers::SR;
    match (reg, mode) {
        (SR, AddressingMode::Indirect) => Some(4),
        (SR, AddressingMode::IndirectAutoincrement) => Some(8),
        (CG2, AddressingMode::Register) => Some(0),
        (CG2, AddressingMode::Indexed) => Some(1),
        (CG2, AddressingMode::Indirect) => Some(2),
        (CG2, AddressingMode::IndirectAutoincrement) => Some(-1),
        _ => None,
    }
}

/// Format I (double-operand) mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubleOperandOp {
    Mov,
    Add,
    Addc,
    Subc,
    Sub,
    Cmp,
    Dadd,
    Bit,
    Bic,
    Bis,
    Xor,
    And,
}

/// Format II (single-operand) mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleOperandOp {
    Rrc,
    Swpb,
    Rra,
    Sxt,
    Push,
    Call,
    Reti,
}

/// Format III (jump) conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpCondition {
    /// JNE/JNZ: branch if Z == 0.
    Ne,
    /// JEQ/JZ: branch if Z == 1.
    Eq,
    /// JNC/JLO: branch if C == 0.
    Nc,
    /// JC/JHS: branch if C == 1.
    C,
    /// JN: branch if N == 1.
    N,
    /// JGE: branch if (N xor V) == 0.
    Ge,
    /// JL: branch if (N xor V) == 1.
    L,
    /// JMP: unconditional.
    Jmp,
}

/// A fully decoded instruction, ready for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// A double-operand (Format I) instruction.
    DoubleOperand {
        op: DoubleOperandOp,
        byte_op: bool,
        src_reg: Reg,
        src_mode: AddressingMode,
        dst_reg: Reg,
        dst_mode: AddressingMode,
    },
    /// A single-operand (Format II) instruction.
    SingleOperand {
        op: SingleOperandOp,
        byte_op: bool,
        dst_reg: Reg,
        dst_mode: AddressingMode,
    },
    /// A conditional or unconditional jump (Format III).
    Jump {
        condition: JumpCondition,
        /// Signed word offset, range -511..=512.
        offset: i16,
    },
}

impl Instruction {
    /// The instruction format this decodes to.
    pub fn format(&self) -> Format {
        match self {
            Instruction::DoubleOperand { .. } => Format::FormatI,
            Instruction::SingleOperand { .. } => Format::FormatII,
            Instruction::Jump { .. } => Format::FormatIII,
        }
    }

    /// Number of extension words (0, 1, or 2) this instruction consumes,
    /// given the already-decoded addressing modes.
    pub fn extension_word_count(&self) -> u8 {
        match self {
            Instruction::DoubleOperand {
                src_reg,
                src_mode,
                dst_mode,
                ..
            } => {
                let src_is_cg = constant_generator_value(*src_reg, *src_mode).is_some();
                let src_count = (src_mode.needs_extension_word() && !src_is_cg) as u8;
                src_count + dst_mode.needs_extension_word() as u8
            }
            Instruction::SingleOperand {
                dst_reg, dst_mode, ..
            } => {
                let is_cg = constant_generator_value(*dst_reg, *dst_mode).is_some();
                (dst_mode.needs_extension_word() && !is_cg) as u8
            }
            Instruction::Jump { .. } => 0,
        }
    }

    /// Total instruction length in bytes, including extension words.
    pub fn length(&self) -> u16 {
        2 + 2 * self.extension_word_count() as u16
    }
}

/// A decoded instruction paired with the extension words it consumed, in
/// fetch order (source extension word before destination, per the encoding
/// rule in the ISA).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// The instruction word as fetched.
    pub opcode: u16,
    /// The decoded instruction.
    pub instruction: Instruction,
    /// Extension words, in fetch order. Unused slots are zero.
    pub extension_words: [u16; 2],
}
