//! Textual disassembly, for the core's own diagnostics.
//!
//! Each addressing mode has a fixed textual form (`Rn`, `X(Rn)`, `@Rn`,
//! `@Rn+`, `#N`, `&ADDR`, `ADDR`); since the decoder already resolves every
//! extension word up front, an operand always renders with its concrete
//! value rather than a placeholder.

use crate::instruction::{
    AddressingMode, DecodedInstruction, DoubleOperandOp, Instruction, JumpCondition,
    SingleOperandOp,
};
use crate::registers::{Reg, PC, SP, SR};

fn register_name(reg: Reg) -> String {
    match reg {
        PC => "PC".to_string(),
        SP => "SP".to_string(),
        SR => "SR".to_string(),
        _ => format!("R{reg}"),
    }
}

/// Render one operand in its addressing mode's textual form. A
/// constant-generator `(reg, mode)` pair renders as the immediate value it
/// evaluates to, matching how a real MSP430 disassembler shows `#4` rather
/// than `@R2` — the constant generator is transparent in assembly syntax.
fn format_operand(reg: Reg, mode: AddressingMode, ext: Option<u16>) -> String {
    if let Some(constant) = crate::instruction::constant_generator_value(reg, mode) {
        return format!("#{:#06x}", constant as i16 as u16);
    }
    match mode {
        AddressingMode::Register => register_name(reg),
        AddressingMode::Indexed => format!("{:#06x}({})", ext.unwrap_or(0), register_name(reg)),
        AddressingMode::Indirect => format!("@{}", register_name(reg)),
        AddressingMode::IndirectAutoincrement => format!("@{}+", register_name(reg)),
        AddressingMode::Immediate => format!("#{:#06x}", ext.unwrap_or(0)),
        AddressingMode::Absolute => format!("&{:#06x}", ext.unwrap_or(0)),
        AddressingMode::Symbolic => format!("{:#06x}", ext.unwrap_or(0)),
    }
}

fn double_operand_mnemonic(op: DoubleOperandOp) -> &'static str {
    match op {
        DoubleOperandOp::Mov => "MOV",
        DoubleOperandOp::Add => "ADD",
        DoubleOperandOp::Addc => "ADDC",
        DoubleOperandOp::Subc => "SUBC",
        DoubleOperandOp::Sub => "SUB",
        DoubleOperandOp::Cmp => "CMP",
        DoubleOperandOp::Dadd => "DADD",
        DoubleOperandOp::Bit => "BIT",
        DoubleOperandOp::Bic => "BIC",
        DoubleOperandOp::Bis => "BIS",
        DoubleOperandOp::Xor => "XOR",
        DoubleOperandOp::And => "AND",
    }
}

fn single_operand_mnemonic(op: SingleOperandOp) -> &'static str {
    match op {
        SingleOperandOp::Rrc => "RRC",
        SingleOperandOp::Swpb => "SWPB",
        SingleOperandOp::Rra => "RRA",
        SingleOperandOp::Sxt => "SXT",
        SingleOperandOp::Push => "PUSH",
        SingleOperandOp::Call => "CALL",
        SingleOperandOp::Reti => "RETI",
    }
}

fn jump_mnemonic(condition: JumpCondition) -> &'static str {
    match condition {
        JumpCondition::Ne => "JNE",
        JumpCondition::Eq => "JEQ",
        JumpCondition::Nc => "JNC",
        JumpCondition::C => "JC",
        JumpCondition::N => "JN",
        JumpCondition::Ge => "JGE",
        JumpCondition::L => "JL",
        JumpCondition::Jmp => "JMP",
    }
}

/// Whether this single-operand mnemonic's B/W bit is architecturally
/// meaningful. SWPB and SXT are fixed-width regardless of the encoded bit;
/// CALL and RETI never carry a width distinction either.
fn single_operand_has_byte_variant(op: SingleOperandOp) -> bool {
    matches!(op, SingleOperandOp::Rrc | SingleOperandOp::Rra | SingleOperandOp::Push)
}

fn extension_words_for(
    src_mode: AddressingMode,
    dst_mode: AddressingMode,
    src_reg: Reg,
    extension_words: &[u16; 2],
) -> (Option<u16>, Option<u16>) {
    let src_is_cg = crate::instruction::constant_generator_value(src_reg, src_mode).is_some();
    let src_needs = src_mode.needs_extension_word() && !src_is_cg;
    let src_ext = src_needs.then(|| extension_words[0]);
    let dst_ext = dst_mode
        .needs_extension_word()
        .then(|| extension_words[if src_needs { 1 } else { 0 }]);
    (src_ext, dst_ext)
}

/// Render a decoded instruction in the core's disassembly grammar: uppercase
/// mnemonic, `.B` suffix for byte operations, `, `-separated operands, and
/// jumps rendered as `JMP ±N` (`JMP 0` for a zero offset).
pub fn disassemble(decoded: &DecodedInstruction) -> String {
    match decoded.instruction {
        Instruction::DoubleOperand {
            op,
            byte_op,
            src_reg,
            src_mode,
            dst_reg,
            dst_mode,
        } => {
            let (src_ext, dst_ext) =
                extension_words_for(src_mode, dst_mode, src_reg, &decoded.extension_words);
            let suffix = if byte_op { ".B" } else { "" };
            let src_text = format_operand(src_reg, src_mode, src_ext);
            let dst_text = format_operand(dst_reg, dst_mode, dst_ext);
            format!(
                "{}{} {}, {}",
                double_operand_mnemonic(op),
                suffix,
                src_text,
                dst_text
            )
        }
        Instruction::SingleOperand {
            op,
            byte_op,
            dst_reg,
            dst_mode,
        } => {
            if op == SingleOperandOp::Reti {
                return "RETI".to_string();
            }
            let ext = dst_mode
                .needs_extension_word()
                .then(|| decoded.extension_words[0]);
            let suffix = if byte_op && single_operand_has_byte_variant(op) {
                ".B"
            } else {
                ""
            };
            let operand = format_operand(dst_reg, dst_mode, ext);
            format!("{}{} {}", single_operand_mnemonic(op), suffix, operand)
        }
        Instruction::Jump { condition, offset } => {
            let mnemonic = jump_mnemonic(condition);
            match offset.cmp(&0) {
                std::cmp::Ordering::Greater => format!("{mnemonic} +{offset}"),
                std::cmp::Ordering::Equal => format!("{mnemonic} 0"),
                std::cmp::Ordering::Less => format!("{mnemonic} {offset}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    fn disasm_word(word: u16, exts: &[u16]) -> String {
        let mut iter = exts.iter().copied();
        let decoded = decode(word, |_| Ok(iter.next().unwrap())).unwrap();
        disassemble(&decoded)
    }

    #[test]
    fn register_to_register_add() {
        let word = 0x5000 | (5 << 8) | 6;
        assert_eq!(disasm_word(word, &[]), "ADD R5, R6");
    }

    #[test]
    fn byte_mov_has_dot_b_suffix() {
        let word = 0x4000 | (1 << 8) | 0x0040 | 3;
        assert_eq!(disasm_word(word, &[]), "MOV.B R1, R3");
    }

    #[test]
    fn indexed_operand_renders_offset_and_register() {
        let word = 0x5000 | (5 << 8) | (0b01 << 4) | 6;
        assert_eq!(disasm_word(word, &[0x0010]), "ADD 0x0010(R5), R6");
    }

    #[test]
    fn indirect_autoincrement_operand() {
        let word = 0x5000 | (5 << 8) | (0b11 << 4) | 6;
        assert_eq!(disasm_word(word, &[]), "ADD @R5+, R6");
    }

    #[test]
    fn immediate_operand_renders_hash_prefix() {
        let word = 0x5000 | (0 << 8) | (0b11 << 4) | 6;
        assert_eq!(disasm_word(word, &[0x1234]), "ADD #0x1234, R6");
    }

    #[test]
    fn constant_generator_renders_as_immediate_not_cg_register() {
        // SUB @R3 (Indexed bits), R4 is the "#1" encoding.
        let word = 0x8000 | (3 << 8) | (0b01 << 4) | 4;
        assert_eq!(disasm_word(word, &[]), "SUB #0x0001, R4");
    }

    #[test]
    fn absolute_and_symbolic_render_with_sigil() {
        // MOV &0x0200, R5 (src = SR, As=01 -> Absolute)
        let abs_word = 0x4000 | (2 << 8) | (0b01 << 4) | 5;
        assert_eq!(disasm_word(abs_word, &[0x0200]), "MOV &0x0200, R5");

        // MOV 0x0040, R5 (src = PC, As=01 -> Symbolic)
        let sym_word = 0x4000 | (0 << 8) | (0b01 << 4) | 5;
        assert_eq!(disasm_word(sym_word, &[0x0040]), "MOV 0x0040, R5");
    }

    #[test]
    fn push_and_swpb() {
        let push = 0x1000 | (0b100 << 7) | 4;
        assert_eq!(disasm_word(push, &[]), "PUSH R4");

        let swpb = 0x1000 | (0b001 << 7) | 4;
        assert_eq!(disasm_word(swpb, &[]), "SWPB R4");
    }

    #[test]
    fn reti_has_no_operand() {
        let word = 0x1000 | (0b110 << 7);
        assert_eq!(disasm_word(word, &[]), "RETI");
    }

    #[test]
    fn jumps_render_signed_offset_with_zero_special_cased() {
        let positive = 0x2000 | (0b111 << 10) | 10;
        assert_eq!(disasm_word(positive, &[]), "JMP +10");

        let negative = 0x2000 | (0b000 << 10) | 0x03FB; // JNE, -5
        assert_eq!(disasm_word(negative, &[]), "JNE -5");

        let zero = 0x2000 | (0b111 << 10);
        assert_eq!(disasm_word(zero, &[]), "JMP 0");
    }

    #[test]
    fn register_aliases_render_as_pc_sp_sr() {
        // MOV PC, SP (extremely unusual but encodable: src=R0, dst=R1)
        let word = 0x4000 | (PC as u16) << 8 | SP as u16;
        assert_eq!(disasm_word(word, &[]), "MOV PC, SP");
    }
}
