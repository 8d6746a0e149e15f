//! Instruction executors: one semantic function per mnemonic family, flag
//! computation, and cycle accounting.
//!
//! Dispatch is a match on the tagged [`Instruction`] variant, so the
//! compiler can prove every mnemonic family is handled; each family shares
//! its flag computation through the small arithmetic/logic helpers below
//! rather than recomputing carry/zero/negative/overflow inline per op.

use crate::error::{EmulatorError, Result};
use crate::evaluate::{self, SourceRead};
use crate::instruction::{
    AddressingMode, DecodedInstruction, DoubleOperandOp, Instruction, JumpCondition,
    SingleOperandOp,
};
use crate::memory::Memory;
use crate::registers::{RegisterFile, PC, SP};

/// Outcome of one `ALU`-style computation: the result plus the four flags,
/// each `None` when the instruction's contract leaves that flag untouched.
struct FlagResult {
    result: u16,
    carry: Option<bool>,
    zero: Option<bool>,
    negative: Option<bool>,
    overflow: Option<bool>,
}

fn sign_mask(byte_op: bool) -> u16 {
    if byte_op {
        0x0080
    } else {
        0x8000
    }
}

fn width_mask(byte_op: bool) -> u32 {
    if byte_op {
        0x00FF
    } else {
        0xFFFF
    }
}

fn is_negative(value: u16, byte_op: bool) -> bool {
    value & sign_mask(byte_op) != 0
}

/// `dst + src + carry_in`, with standard two's-complement overflow.
fn add_with_carry(dst: u16, src: u16, carry_in: bool, byte_op: bool) -> FlagResult {
    let mask = width_mask(byte_op);
    let a = dst as u32 & mask;
    let b = src as u32 & mask;
    let sum = a + b + carry_in as u32;
    let result = (sum & mask) as u16;
    let carry = sum > mask;
    let sign_a = is_negative(a as u16, byte_op);
    let sign_b = is_negative(b as u16, byte_op);
    let sign_r = is_negative(result, byte_op);
    let overflow = sign_a == sign_b && sign_r != sign_a;
    FlagResult {
        result,
        carry: Some(carry),
        zero: Some(result == 0),
        negative: Some(sign_r),
        overflow: Some(overflow),
    }
}

/// `dst - src - (1 - carry_in)`, i.e. `dst + !src + carry_in`, computed via
/// the standard two's-complement subtraction-as-addition identity.
///
/// Per the open question in the design notes on SUB's carry-at-zero result:
/// the reference clears C when the result is zero (which, for a subtraction,
/// only happens when the operands are numerically equal at this width), so
/// that case is forced to C=0 here rather than left at the "no borrow
/// occurred" value the addition identity would otherwise produce.
fn sub_with_borrow(dst: u16, src: u16, carry_in: bool, byte_op: bool) -> FlagResult {
    let mask = width_mask(byte_op);
    let inverted_src = (!(src as u32) & mask) as u16;
    let mut flags = add_with_carry(dst, inverted_src, carry_in, byte_op);
    if flags.result == 0 {
        flags.carry = Some(false);
    }
    flags
}

fn dadd(dst: u16, src: u16, carry_in: bool, byte_op: bool) -> FlagResult {
    let nibbles = if byte_op { 2 } else { 4 };
    let mut carry = carry_in as u32;
    let mut result: u32 = 0;
    for i in 0..nibbles {
        let shift = i * 4;
        let da = (dst as u32 >> shift) & 0xF;
        let db = (src as u32 >> shift) & 0xF;
        let mut sum = da + db + carry;
        if sum > 9 {
            sum += 6;
            carry = 1;
        } else {
            carry = 0;
        }
        result |= (sum & 0xF) << shift;
    }
    let result = result as u16;
    FlagResult {
        result,
        carry: Some(carry != 0),
        zero: Some(result == 0),
        negative: Some(is_negative(result, byte_op)),
        // DADD's V flag is documented as undefined by the hardware; this
        // core reports it as always clear.
        overflow: Some(false),
    }
}

fn logic_and(dst: u16, src: u16, byte_op: bool) -> FlagResult {
    let result = dst & src;
    FlagResult {
        result,
        carry: Some(result != 0),
        zero: Some(result == 0),
        negative: Some(is_negative(result, byte_op)),
        overflow: Some(false),
    }
}

fn logic_xor(dst: u16, src: u16, byte_op: bool) -> FlagResult {
    let result = dst ^ src;
    let overflow = is_negative(src, byte_op) && is_negative(dst, byte_op);
    FlagResult {
        result,
        carry: Some(result != 0),
        zero: Some(result == 0),
        negative: Some(is_negative(result, byte_op)),
        overflow: Some(overflow),
    }
}

fn apply_flags(regs: &mut RegisterFile, flags: &FlagResult) {
    if let Some(c) = flags.carry {
        regs.set_carry(c);
    }
    if let Some(z) = flags.zero {
        regs.set_zero(z);
    }
    if let Some(n) = flags.negative {
        regs.set_negative(n);
    }
    if let Some(v) = flags.overflow {
        regs.set_overflow(v);
    }
}

// --- Cycle accounting ---------------------------------------------------

fn src_extra_cycles(mode: AddressingMode) -> u32 {
    match mode {
        AddressingMode::Register => 0,
        AddressingMode::Immediate
        | AddressingMode::Indirect
        | AddressingMode::IndirectAutoincrement => 1,
        AddressingMode::Indexed | AddressingMode::Absolute | AddressingMode::Symbolic => 2,
    }
}

fn dst_extra_cycles(mode: AddressingMode) -> u32 {
    match mode {
        AddressingMode::Register => 0,
        AddressingMode::Indexed | AddressingMode::Absolute | AddressingMode::Symbolic => 3,
        _ => 0,
    }
}

/// Total cycle cost of a Format I instruction, per the dominant combinations
/// the reference's own test suite pins down. Built additively (base fetch +
/// source-mode cost + destination-mode cost) with two literal overrides for
/// the rows the spec calls out by name rather than by formula: MOV/BIT/CMP
/// with an immediate source to a register destination cost one cycle less
/// than the additive model would give, and an absolute-to-absolute transfer
/// costs one more.
fn double_operand_cycles(op: DoubleOperandOp, src_mode: AddressingMode, dst_mode: AddressingMode) -> u32 {
    let base = 1 + src_extra_cycles(src_mode) + dst_extra_cycles(dst_mode);
    if matches!(op, DoubleOperandOp::Mov | DoubleOperandOp::Bit | DoubleOperandOp::Cmp)
        && src_mode == AddressingMode::Immediate
        && dst_mode == AddressingMode::Register
    {
        return 1;
    }
    if src_mode == AddressingMode::Absolute && dst_mode == AddressingMode::Absolute {
        return 7;
    }
    base
}

fn single_operand_cycles(mode: AddressingMode) -> u32 {
    match mode {
        AddressingMode::Register => 1,
        AddressingMode::Indirect | AddressingMode::IndirectAutoincrement => 3,
        _ => 4,
    }
}

const JUMP_CYCLES: u32 = 2;
const RETI_CYCLES: u32 = 5;

// --- Top-level dispatch ---------------------------------------------------

/// Execute one already-decoded instruction.
///
/// `regs.pc()` must already point past the instruction and its extension
/// words (the host advances PC before calling this, per the data-flow
/// contract), since PC-relative source/destination resolution and the
/// CALL/jump targets are computed relative to that already-advanced value.
pub fn execute(
    decoded: &DecodedInstruction,
    regs: &mut RegisterFile,
    mem: &mut Memory,
) -> Result<u32> {
    match decoded.instruction {
        Instruction::DoubleOperand {
            op,
            byte_op,
            src_reg,
            src_mode,
            dst_reg,
            dst_mode,
        } => execute_double_operand(
            op,
            byte_op,
            src_reg,
            src_mode,
            dst_reg,
            dst_mode,
            &decoded.extension_words,
            regs,
            mem,
        ),
        Instruction::SingleOperand {
            op,
            byte_op,
            dst_reg,
            dst_mode,
        } => execute_single_operand(
            op,
            byte_op,
            dst_reg,
            dst_mode,
            &decoded.extension_words,
            regs,
            mem,
        ),
        Instruction::Jump { condition, offset } => execute_jump(condition, offset, regs),
    }
}

fn extension_words_for(
    src_mode: AddressingMode,
    dst_mode: AddressingMode,
    src_reg: crate::registers::Reg,
    extension_words: &[u16; 2],
) -> (Option<u16>, Option<u16>) {
    use crate::instruction::constant_generator_value;
    let src_is_cg = constant_generator_value(src_reg, src_mode).is_some();
    let src_needs = src_mode.needs_extension_word() && !src_is_cg;
    let src_ext = if src_needs { Some(extension_words[0]) } else { None };
    let dst_ext = if dst_mode.needs_extension_word() {
        Some(extension_words[if src_needs { 1 } else { 0 }])
    } else {
        None
    };
    (src_ext, dst_ext)
}

#[allow(clippy::too_many_arguments)]
fn execute_double_operand(
    op: DoubleOperandOp,
    byte_op: bool,
    src_reg: crate::registers::Reg,
    src_mode: AddressingMode,
    dst_reg: crate::registers::Reg,
    dst_mode: AddressingMode,
    extension_words: &[u16; 2],
    regs: &mut RegisterFile,
    mem: &mut Memory,
) -> Result<u32> {
    let (src_ext, dst_ext) = extension_words_for(src_mode, dst_mode, src_reg, extension_words);
    let current_pc = regs.pc();

    let SourceRead { value: src_val, .. } =
        evaluate::read_source(regs, mem, src_reg, src_mode, byte_op, src_ext, current_pc)?;

    // MOV never reads the destination; every other Format I op does a
    // read-modify-write and needs the current destination value first.
    let dst_val = if op == DoubleOperandOp::Mov {
        0
    } else {
        read_destination_value(regs, mem, dst_reg, dst_mode, byte_op, dst_ext, current_pc)?
    };

    let (result, flags) = match op {
        DoubleOperandOp::Mov => (src_val, None),
        DoubleOperandOp::Add => {
            let f = add_with_carry(dst_val, src_val, false, byte_op);
            (f.result, Some(f))
        }
        DoubleOperandOp::Addc => {
            let f = add_with_carry(dst_val, src_val, regs.carry(), byte_op);
            (f.result, Some(f))
        }
        DoubleOperandOp::Sub | DoubleOperandOp::Cmp => {
            let f = sub_with_borrow(dst_val, src_val, true, byte_op);
            (f.result, Some(f))
        }
        DoubleOperandOp::Subc => {
            let f = sub_with_borrow(dst_val, src_val, regs.carry(), byte_op);
            (f.result, Some(f))
        }
        DoubleOperandOp::Dadd => {
            let f = dadd(dst_val, src_val, regs.carry(), byte_op);
            (f.result, Some(f))
        }
        DoubleOperandOp::And | DoubleOperandOp::Bit => {
            let f = logic_and(dst_val, src_val, byte_op);
            (f.result, Some(f))
        }
        DoubleOperandOp::Xor => {
            let f = logic_xor(dst_val, src_val, byte_op);
            (f.result, Some(f))
        }
        DoubleOperandOp::Bic => (dst_val & !src_val, None),
        DoubleOperandOp::Bis => (dst_val | src_val, None),
    };

    if let Some(flags) = &flags {
        apply_flags(regs, flags);
    }

    // CMP and BIT compute a result only to derive flags; neither writes back.
    if !matches!(op, DoubleOperandOp::Cmp | DoubleOperandOp::Bit) {
        evaluate::write_destination(regs, mem, dst_reg, dst_mode, byte_op, dst_ext, current_pc, result)?;
    }

    Ok(double_operand_cycles(op, src_mode, dst_mode))
}

/// Read the current value at a destination location for a read-modify-write
/// op, without the write side effects `evaluate::write_destination` has and
/// without the constant-generator/autoincrement behavior that only applies
/// to source reads (destinations never trigger either).
fn read_destination_value(
    regs: &RegisterFile,
    mem: &Memory,
    reg: crate::registers::Reg,
    mode: AddressingMode,
    byte_op: bool,
    ext: Option<u16>,
    current_pc: u16,
) -> Result<u16> {
    if mode == AddressingMode::Register {
        let raw = regs.read(reg);
        return Ok(if byte_op { raw & 0x00FF } else { raw });
    }
    let addr = evaluate::effective_address(regs, reg, mode, ext, current_pc)
        .expect("non-register destination always has an effective address");
    if byte_op {
        Ok(mem.read_byte(addr) as u16)
    } else {
        mem.read_word(addr)
    }
}

fn execute_single_operand(
    op: SingleOperandOp,
    byte_op: bool,
    reg: crate::registers::Reg,
    mode: AddressingMode,
    extension_words: &[u16; 2],
    regs: &mut RegisterFile,
    mem: &mut Memory,
) -> Result<u32> {
    if op == SingleOperandOp::Reti {
        let current_sp = regs.sp();
        let (sr_word, sp_after_sr) = mem.pop_word(current_sp)?;
        let (pc_word, sp_after_pc) = mem.pop_word(sp_after_sr)?;
        regs.set_sp(sp_after_pc);
        regs.set_status(crate::registers::Status::from_bits_truncate(sr_word));
        regs.set_pc(pc_word);
        return Ok(RETI_CYCLES);
    }

    let ext = if mode.needs_extension_word() {
        Some(extension_words[0])
    } else {
        None
    };
    let current_pc = regs.pc();
    let addr = evaluate::effective_address(regs, reg, mode, ext, current_pc);
    let SourceRead { value, .. } =
        evaluate::read_source(regs, mem, reg, mode, byte_op, ext, current_pc)?;

    match op {
        SingleOperandOp::Push => {
            push_value(regs, mem, byte_op, value)?;
        }
        SingleOperandOp::Call => {
            push_value(regs, mem, false, regs.pc())?;
            regs.set_pc(value);
        }
        SingleOperandOp::Rrc => {
            let carry_in = regs.carry();
            let msb = sign_mask(byte_op);
            let carry_out = value & 1 != 0;
            let mut result = value >> 1;
            if carry_in {
                result |= msb;
            }
            apply_flags(
                regs,
                &FlagResult {
                    result,
                    carry: Some(carry_out),
                    zero: Some(result == 0),
                    negative: Some(is_negative(result, byte_op)),
                    overflow: Some(false),
                },
            );
            write_back_operand(regs, mem, reg, mode, byte_op, addr, result)?;
        }
        SingleOperandOp::Rra => {
            let msb = sign_mask(byte_op);
            let carry_out = value & 1 != 0;
            let sign = value & msb;
            let result = (value >> 1) | sign;
            apply_flags(
                regs,
                &FlagResult {
                    result,
                    carry: Some(carry_out),
                    zero: Some(result == 0),
                    negative: Some(is_negative(result, byte_op)),
                    overflow: Some(false),
                },
            );
            write_back_operand(regs, mem, reg, mode, byte_op, addr, result)?;
        }
        SingleOperandOp::Swpb => {
            let result = (value >> 8) | ((value & 0x00FF) << 8);
            write_back_operand(regs, mem, reg, mode, false, addr, result)?;
        }
        SingleOperandOp::Sxt => {
            let low = value & 0x00FF;
            let result = if low & 0x80 != 0 { low | 0xFF00 } else { low };
            apply_flags(
                regs,
                &FlagResult {
                    result,
                    carry: Some(result != 0),
                    zero: Some(result == 0),
                    negative: Some(is_negative(result, false)),
                    overflow: Some(false),
                },
            );
            write_back_operand(regs, mem, reg, mode, false, addr, result)?;
        }
        SingleOperandOp::Reti => unreachable!("handled above"),
    }

    Ok(single_operand_cycles(mode))
}

fn write_back_operand(
    regs: &mut RegisterFile,
    mem: &mut Memory,
    reg: crate::registers::Reg,
    mode: AddressingMode,
    byte_op: bool,
    addr: Option<u16>,
    value: u16,
) -> Result<()> {
    if mode == AddressingMode::Register {
        let stored = if byte_op {
            (value & 0x00FF) | (regs.read(reg) & 0xFF00)
        } else {
            value
        };
        regs.write(reg, stored);
        return Ok(());
    }
    let addr = addr.expect("non-register operand always has an effective address");
    if byte_op {
        mem.write_byte(addr, (value & 0x00FF) as u8);
    } else {
        mem.write_word(addr, value)?;
    }
    Ok(())
}

fn push_value(regs: &mut RegisterFile, mem: &mut Memory, byte_op: bool, value: u16) -> Result<()> {
    let sp = regs.sp() as i32;
    let new_sp = sp - 2;
    if new_sp < 0 {
        return Err(EmulatorError::StackOverflow { sp: new_sp });
    }
    let new_sp = new_sp as u16;
    if byte_op {
        mem.write_byte(new_sp, (value & 0x00FF) as u8);
    } else {
        mem.write_word(new_sp, value)?;
    }
    regs.set_sp(new_sp);
    Ok(())
}

fn jump_taken(condition: JumpCondition, regs: &RegisterFile) -> bool {
    match condition {
        JumpCondition::Ne => !regs.zero(),
        JumpCondition::Eq => regs.zero(),
        JumpCondition::Nc => !regs.carry(),
        JumpCondition::C => regs.carry(),
        JumpCondition::N => regs.negative(),
        JumpCondition::Ge => regs.negative() == regs.overflow(),
        JumpCondition::L => regs.negative() != regs.overflow(),
        JumpCondition::Jmp => true,
    }
}

fn execute_jump(condition: JumpCondition, offset: i16, regs: &mut RegisterFile) -> Result<u32> {
    if !(-511..=512).contains(&offset) {
        return Err(EmulatorError::InvalidInstruction {
            opcode: 0,
            detail: "jump offset out of range",
        });
    }
    if jump_taken(condition, regs) {
        // The displacement is relative to the jump instruction's own
        // address, not the already-advanced PC the host hands us: back out
        // the 2 bytes `step` advanced past the instruction word before
        // applying it.
        let displacement = 2i32 * offset as i32;
        regs.set_pc((regs.pc() as i32 - 2 + displacement) as u16);
    }
    Ok(JUMP_CYCLES)
}

/// `true` if `reg` is PC; used by callers that need to special-case writes
/// to the program counter (e.g. to skip a subsequent normal PC advance).
pub fn writes_pc(reg: crate::registers::Reg) -> bool {
    reg == PC
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::registers::{CG2, SR};

    fn run(word: u16, exts: &[u16], regs: &mut RegisterFile, mem: &mut Memory) -> Result<u32> {
        let mut iter = exts.iter().copied();
        let decoded = decode(word, |_| Ok(iter.next().unwrap())).unwrap();
        regs.set_pc(regs.pc().wrapping_add(decoded.instruction.length()));
        execute(&decoded, regs, mem)
    }

    #[test]
    fn s1_add_register_to_register() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(5, 0x1234);
        regs.write(6, 0x5678);
        let word = 0x5000 | (5 << 8) | 6;
        let cycles = run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(6), 0x68AC);
        assert!(!regs.carry());
        assert!(!regs.zero());
        assert!(!regs.negative());
        assert!(!regs.overflow());
        assert_eq!(cycles, 1);
    }

    #[test]
    fn s2_add_unsigned_carry() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(5, 0xFFFF);
        regs.write(4, 0x0001);
        let word = 0x5000 | (5 << 8) | 4;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(4), 0x0000);
        assert!(regs.carry());
        assert!(regs.zero());
        assert!(!regs.negative());
        assert!(!regs.overflow());
    }

    #[test]
    fn s3_add_signed_overflow() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(5, 0x7FFF);
        regs.write(4, 0x0001);
        let word = 0x5000 | (5 << 8) | 4;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(4), 0x8000);
        assert!(!regs.carry());
        assert!(!regs.zero());
        assert!(regs.negative());
        assert!(regs.overflow());
    }

    #[test]
    fn s4_sub_to_zero_clears_carry() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(1, 0x1234);
        regs.write(4, 0x1234);
        // SUB R1, R4
        let word = 0x8000 | (1 << 8) | 4;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(4), 0x0000);
        assert!(regs.zero());
        assert!(!regs.carry());
        assert!(!regs.overflow());
    }

    #[test]
    fn s5_dec_from_zero() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(4, 0x0000);
        // SUB #1, R4 == src reg 3 (CG2), As=01 (Indexed -> constant +1)
        let word = 0x8000 | (3 << 8) | (0b01 << 4) | 4;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(4), 0xFFFF);
        assert!(!regs.zero());
        assert!(regs.negative());
        assert!(!regs.carry());
        assert!(!regs.overflow());
    }

    #[test]
    fn s6_dec_from_0x8000() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(4, 0x8000);
        let word = 0x8000 | (3 << 8) | (0b01 << 4) | 4;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(4), 0x7FFF);
        assert!(!regs.zero());
        assert!(!regs.negative());
        assert!(regs.carry());
        assert!(regs.overflow());
    }

    #[test]
    fn s7_mov_byte_preserves_high_byte() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(1, 0x1234);
        regs.write(3, 0x5678);
        // MOV.B R1, R3
        let word = 0x4000 | (1 << 8) | 0x0040 | 3;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(3), 0x5634);
    }

    #[test]
    fn s8_indirect_autoincrement_word() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(5, 0x2000);
        regs.write(6, 0x1234);
        mem.write_word(0x2000, 0x5678).unwrap();
        // ADD @R5+, R6
        let word = 0x5000 | (5 << 8) | (0b11 << 4) | 6;
        let cycles = run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(6), 0x68AC);
        assert_eq!(regs.read(5), 0x2002);
        assert_eq!(cycles, 2);
    }

    #[test]
    fn s9_constant_generator_plus_four() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(6, 0x1000);
        // ADD @R2, R6 (src reg=SR, As=10 Indirect -> CG +4)
        let word = 0x5000 | (SR as u16) << 8 | (0b10 << 4) | 6;
        let cycles = run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(6), 0x1004);
        assert_eq!(cycles, 1);
    }

    #[test]
    fn s10_swpb() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(4, 0x1234);
        // SWPB R4: op field=001
        let word = 0x1000 | (0b001 << 7) | 4;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(4), 0x3412);
        assert!(!regs.overflow());
    }

    #[test]
    fn s11_sxt_of_0x80() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(4, 0x0080);
        // SXT R4: op field=011
        let word = 0x1000 | (0b011 << 7) | 4;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(4), 0xFF80);
        assert!(regs.negative());
        assert!(!regs.zero());
        assert!(regs.carry());
        assert!(!regs.overflow());
    }

    #[test]
    fn s12_jmp_positive_offset() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.set_pc(0x1000);
        // JMP +10, unconditional (field 0b111)
        let word = 0x2000 | (0b111 << 10) | 10;
        let cycles = run(word, &[], &mut regs, &mut mem).unwrap();
        // PC is 0x1002 (already advanced past the jump word) before the
        // jump's own back-out and displacement are applied:
        // 0x1002 - 2 + 2*10 = 0x1014.
        assert_eq!(regs.pc(), 0x1014);
        assert_eq!(cycles, 2);
    }

    #[test]
    fn s13_jnz_taken_and_not_taken() {
        let mut mem = Memory::new();
        let word = 0x2000 | (0b000 << 10) | 0x03FB; // JNE, offset -5

        let mut regs_taken = RegisterFile::new();
        regs_taken.set_pc(0x1000);
        regs_taken.set_zero(false);
        let cycles = run(word, &[], &mut regs_taken, &mut mem).unwrap();
        // PC is 0x1002 (already advanced) before the jump's own back-out and
        // displacement are applied: 0x1002 - 2 + 2*(-5) = 0x0FF6.
        assert_eq!(regs_taken.pc(), 0x0FF6);
        assert_eq!(cycles, 2);

        let mut regs_not_taken = RegisterFile::new();
        regs_not_taken.set_pc(0x1000);
        regs_not_taken.set_zero(true);
        let cycles = run(word, &[], &mut regs_not_taken, &mut mem).unwrap();
        assert_eq!(regs_not_taken.pc(), 0x1002);
        assert_eq!(cycles, 2);
    }

    #[test]
    fn s14_push_pop_round_trip() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.set_sp(0x1000);
        regs.write(4, 0x1234);
        // PUSH R4: op field=100
        let push = 0x1000 | (0b100 << 7) | 4;
        run(push, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.sp(), 0x0FFE);

        // POP R5 == MOV @SP+, R5
        let pop = 0x4000 | (SP as u16) << 8 | (0b11 << 4) | 5;
        run(pop, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.sp(), 0x1000);
        assert_eq!(regs.read(5), 0x1234);
    }

    #[test]
    fn cmp_does_not_write_back_destination() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(5, 0x0001);
        regs.write(6, 0x0001);
        let word = 0x9000 | (5 << 8) | 6; // CMP R5, R6
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(6), 0x0001, "CMP must not mutate its destination");
        assert!(regs.zero());
    }

    #[test]
    fn bic_and_bis_leave_flags_untouched() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.set_carry(true);
        regs.set_negative(true);
        regs.write(5, 0x00FF);
        regs.write(6, 0xFFFF);
        let word = 0xC000 | (5 << 8) | 6; // BIC R5, R6
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(6), 0xFF00);
        assert!(regs.carry());
        assert!(regs.negative());
    }

    #[test]
    fn call_pushes_return_address_and_jumps() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.set_sp(0x1000);
        regs.set_pc(0x0300);
        regs.write(7, 0x4000);
        // CALL R7: op field=101
        let word = 0x1000 | (0b101 << 7) | 7;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.pc(), 0x4000);
        assert_eq!(regs.sp(), 0x0FFE);
        let (ret_addr, _) = mem.pop_word(regs.sp()).unwrap();
        assert_eq!(ret_addr, 0x0302);
    }

    #[test]
    fn reti_restores_sr_and_pc() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.set_sp(0x1000);
        let sp_after_push = mem.push_word(0x1000, 0x0400).unwrap(); // PC
        let sp_after_push = mem.push_word(sp_after_push, 0x0005).unwrap(); // SR (Z|N)
        regs.set_sp(sp_after_push);
        // RETI: op field=110
        let word = 0x1000 | (0b110 << 7);
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.pc(), 0x0400);
        assert_eq!(regs.sp(), 0x1000);
        assert!(regs.zero());
        assert!(regs.negative());
    }

    #[test]
    fn jump_offset_out_of_range_is_invalid() {
        let condition = JumpCondition::Jmp;
        let mut regs = RegisterFile::new();
        regs.set_pc(0x1000);
        assert!(execute_jump(condition, 513, &mut regs).is_err());
        assert!(execute_jump(condition, -512, &mut regs).is_err());
    }

    #[test]
    fn xor_overflow_is_and_of_both_signs() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(5, 0x8000);
        regs.write(6, 0x8000);
        let word = 0xE000 | (5 << 8) | 6; // XOR R5, R6
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(6), 0x0000);
        assert!(regs.overflow());
        assert!(regs.zero());
    }

    #[test]
    fn cg2_register_source_is_always_zero_even_if_register_holds_other_value() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new();
        regs.write(CG2, 0x9999);
        regs.write(6, 0x0010);
        // BIS R3, R6 (src reg=R3, Register mode -> CG constant 0)
        let word = 0xD000 | (CG2 as u16) << 8 | 6;
        run(word, &[], &mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(6), 0x0010, "CG 0 OR'd in should not change destination");
    }
}
