// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Single register access, the only way the engine touches hardware.
//!
//! A transport may be memory mapped ([`MmioTransport`]) or sit on top of an
//! indirect bus such as I2C or SPI, in which case the board provides its own
//! implementation. [`ProtectedTransport`] layers the password unlock dance
//! some PMICs require on top of any other transport.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::ReadWrite;

/// Failures reported by a register transport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BusError {
    /// The device did not acknowledge the transfer.
    Nack,
    /// The offset is not aligned to the register width.
    Misaligned,
    /// The offset is outside of the register bank.
    OutOfRange,
    /// Any other bus or controller fault.
    Fault,
}

/// Read and write a single device register.
///
/// Offsets are byte offsets from the start of the device's register bank.
pub trait RegisterTransport {
    /// Read the register at `offset`.
    fn read(&self, offset: u32) -> Result<u32, BusError>;

    /// Write `value` to the register at `offset`.
    fn write(&self, offset: u32, value: u32) -> Result<(), BusError>;

    /// Replace the bits selected by `mask` with the matching bits of `value`.
    fn update_bits(&self, offset: u32, mask: u32, value: u32) -> Result<(), BusError> {
        let old = self.read(offset)?;
        self.write(offset, (old & !mask) | (value & mask))
    }
}

/// Transport for a memory mapped bank of 32-bit registers.
pub struct MmioTransport<'a> {
    regs: &'a [ReadWrite<u32>],
}

impl<'a> MmioTransport<'a> {
    /// Register at offset `4 * n` is `regs[n]`.
    pub const fn new(regs: &'a [ReadWrite<u32>]) -> MmioTransport<'a> {
        MmioTransport { regs }
    }

    fn register(&self, offset: u32) -> Result<&ReadWrite<u32>, BusError> {
        if offset % 4 != 0 {
            return Err(BusError::Misaligned);
        }
        self.regs
            .get((offset / 4) as usize)
            .ok_or(BusError::OutOfRange)
    }
}

impl RegisterTransport for MmioTransport<'_> {
    fn read(&self, offset: u32) -> Result<u32, BusError> {
        Ok(self.register(offset)?.get())
    }

    fn write(&self, offset: u32, value: u32) -> Result<(), BusError> {
        self.register(offset)?.set(value);
        Ok(())
    }
}

/// Write protection level of a register behind a password register.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProtectLevel {
    /// Plain write.
    None,
    /// Unlock once, then write.
    Level1,
    /// Unlock and write, twice.
    Level2,
}

/// Transport wrapper for chips with password protected registers.
///
/// Before writing a protected register the wrapper writes
/// `offset ^ unlock_key` to the password register. Level 2 registers need the
/// unlock and the write to be issued twice in a row. Reads are passed through
/// untouched.
pub struct ProtectedTransport<'a> {
    inner: &'a dyn RegisterTransport,
    password_reg: u32,
    unlock_key: u32,
    levels: &'a [(u32, ProtectLevel)],
}

impl<'a> ProtectedTransport<'a> {
    /// `levels` lists every protected register with its level; registers not
    /// listed are written directly.
    pub fn new(
        inner: &'a dyn RegisterTransport,
        password_reg: u32,
        unlock_key: u32,
        levels: &'a [(u32, ProtectLevel)],
    ) -> ProtectedTransport<'a> {
        ProtectedTransport {
            inner,
            password_reg,
            unlock_key,
            levels,
        }
    }

    fn level(&self, offset: u32) -> ProtectLevel {
        self.levels
            .iter()
            .find(|(reg, _)| *reg == offset)
            .map_or(ProtectLevel::None, |(_, level)| *level)
    }

    fn unlocked_write(&self, offset: u32, value: u32) -> Result<(), BusError> {
        self.inner
            .write(self.password_reg, offset ^ self.unlock_key)?;
        self.inner.write(offset, value)
    }
}

impl RegisterTransport for ProtectedTransport<'_> {
    fn read(&self, offset: u32) -> Result<u32, BusError> {
        self.inner.read(offset)
    }

    fn write(&self, offset: u32, value: u32) -> Result<(), BusError> {
        match self.level(offset) {
            ProtectLevel::None => self.inner.write(offset, value),
            ProtectLevel::Level1 => self.unlocked_write(offset, value),
            ProtectLevel::Level2 => {
                self.unlocked_write(offset, value)?;
                self.unlocked_write(offset, value)
            }
        }
    }
}
