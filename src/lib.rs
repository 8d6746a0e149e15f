//! Cycle-accurate instruction execution engine for the TI MSP430 (FR2xx/FR4xx)
//! CPU.
//!
//! This crate is the core of an MSP430 emulator: the register file, the
//! 64 KiB memory view, the addressing-mode evaluator, the instruction
//! decoder, and the per-mnemonic executors. It has no opinion on where
//! firmware images come from, how diagnostics are rendered to a user, or how
//! peripherals are modelled — those are a host's job. A host wires a
//! [`memory::Memory`] and a [`cpu::Cpu`] together and calls [`cpu::Cpu::step`]
//! in a loop.
//!
//! ```
//! use msp430_core::{cpu::{Cpu, CpuConfig, RESET_VECTOR_ADDR}, memory::Memory};
//!
//! let mut mem = Memory::new();
//! mem.write_word(RESET_VECTOR_ADDR, 0x0200).unwrap();
//! mem.write_word(0x0200, 0x4000 | (0b11 << 4) | 5).unwrap(); // MOV #0x1234, R5
//! mem.write_word(0x0202, 0x1234).unwrap();
//!
//! let mut cpu = Cpu::new(CpuConfig::default());
//! cpu.reset(&mem).unwrap();
//! let cycles = cpu.step(&mut mem).unwrap();
//! assert_eq!(cpu.registers().read(5), 0x1234);
//! assert_eq!(cycles, 1);
//! ```

pub mod cpu;
pub mod decode;
pub mod disasm;
pub mod error;
pub mod evaluate;
pub mod execute;
pub mod instruction;
pub mod memory;
pub mod registers;

pub use cpu::{Cpu, CpuConfig};
pub use error::{EmulatorError, Result};
pub use instruction::{DecodedInstruction, Instruction};
pub use memory::Memory;
pub use registers::RegisterFile;
