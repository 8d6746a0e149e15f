//! The top-level CPU facade: fetch, decode, evaluate, execute, in one call.
//!
//! `Cpu` owns a register file and drives it against a caller-supplied
//! [`Memory`] — there is exactly one collaborator, so no bus or device
//! routing trait is needed here.

use crate::decode::decode_at;
use crate::disasm::disassemble;
use crate::error::Result;
use crate::execute::execute;
use crate::memory::Memory;
use crate::registers::RegisterFile;

/// Address of the MSP430 reset vector: on reset, PC is loaded from the word
/// stored here, unless [`CpuConfig::reset_vector_override`] supplies one
/// directly.
pub const RESET_VECTOR_ADDR: u16 = 0xFFFE;

/// Seeds for non-default power-on state, so a host can construct a `Cpu`
/// with a starting PC and cycle count without faking a reset sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuConfig {
    /// If set, `reset()` loads PC from this value instead of reading the
    /// reset vector from memory. Lets tests seed a starting PC without
    /// having to place a vector at `0xFFFE` in the test image.
    pub reset_vector_override: Option<u16>,
    /// Initial value of the cycle counter, for hosts that want cycle counts
    /// to account for a reset sequence's own bus activity.
    pub start_cycles: u32,
}

/// The CPU: a register file plus a running cycle count, executing against
/// caller-owned memory.
pub struct Cpu {
    regs: RegisterFile,
    total_cycles: u32,
    config: CpuConfig,
}

impl Cpu {
    /// Build a CPU with every register cleared; call [`Cpu::reset`] to load
    /// the initial PC before stepping it.
    pub fn new(config: CpuConfig) -> Self {
        Cpu {
            regs: RegisterFile::new(),
            total_cycles: config.start_cycles,
            config,
        }
    }

    /// Current register file.
    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Mutable register file, for hosts that need to poke state directly
    /// (e.g. test setup, or an external collaborator handling interrupts).
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Total cycles executed since construction or the last reset.
    pub fn total_cycles(&self) -> u32 {
        self.total_cycles
    }

    /// Perform a hardware reset: clear every register, then load PC from
    /// the reset vector (or the configured override) and reseed the cycle
    /// counter from [`CpuConfig::start_cycles`].
    pub fn reset(&mut self, memory: &Memory) -> Result<()> {
        let pc = match self.config.reset_vector_override {
            Some(pc) => pc,
            None => memory.read_word(RESET_VECTOR_ADDR)?,
        };
        self.regs = RegisterFile::new();
        self.regs.set_pc(pc);
        self.total_cycles = self.config.start_cycles;
        log::debug!("reset: PC={pc:#06x} total_cycles={}", self.total_cycles);
        Ok(())
    }

    /// Fetch, decode, evaluate, and execute the instruction at the current
    /// PC, advancing PC past it and any extension words first (per the
    /// evaluator's PC-relative-addressing contract). Returns the cycle cost
    /// of the instruction just executed.
    pub fn step(&mut self, memory: &mut Memory) -> Result<u32> {
        let pc_before = self.regs.pc();
        let decoded = decode_at(memory, pc_before)?;
        self.regs.adv_pc(decoded.instruction.length());
        let cycles = execute(&decoded, &mut self.regs, memory)?;
        self.total_cycles = self.total_cycles.wrapping_add(cycles);
        log::trace!("step @ {pc_before:#06x}: {cycles} cycles, total={}", self.total_cycles);
        Ok(cycles)
    }

    /// Like [`Cpu::step`], but also returns the disassembled text of the
    /// instruction about to run, captured before PC advances or any side
    /// effect happens — for a host that wants to log what will execute
    /// without re-deriving it after the fact.
    pub fn debug_step(&mut self, memory: &mut Memory) -> Result<(String, u32)> {
        let decoded = decode_at(memory, self.regs.pc())?;
        let text = disassemble(&decoded);
        self.regs.adv_pc(decoded.instruction.length());
        let cycles = execute(&decoded, &mut self.regs, memory)?;
        self.total_cycles = self.total_cycles.wrapping_add(cycles);
        Ok((text, cycles))
    }
}
