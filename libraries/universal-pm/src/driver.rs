// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Device type descriptors.
//!
//! A [`UniversalDriver`] holds everything that is common to all devices of
//! one type: the register tables, the pending interrupt check, the pin state
//! mapping and the capability flags. It is immutable and meant to be a
//! `static` shared by every [`UniversalDevice`](crate::UniversalDevice) of
//! that type. Device specific behavior that cannot be expressed as a table is
//! supplied through [`PmCallbacks`].

use crate::condition::PinStateMap;
use crate::context::RegisterContext;
use crate::error_codes::{ConfigError, ErrorCode, TableKind};
use crate::sync::LockKind;
use crate::table::{self, RegEntry, RegOp};
use crate::transport::RegisterTransport;

/// The register tables of a device type.
///
/// An empty table means the device has nothing to do at that step.
#[derive(Clone, Copy, Debug)]
pub struct PmTables<'a> {
    /// Captures the context before the device is powered down.
    pub save: &'a [RegEntry],
    /// Read-only table compared against the saved context to detect whether
    /// the device lost power.
    pub context_check: &'a [RegEntry],
    /// Writes the saved context back.
    pub restore: &'a [RegEntry],
    /// Masks the device's interrupts.
    pub irq_disable: &'a [RegEntry],
    /// Unmasks the device's interrupts.
    pub irq_enable: &'a [RegEntry],
    /// Software visible clock gating, run before the clocks are gated.
    pub clk_disable: &'a [RegEntry],
    /// Software visible clock ungating, run after the clocks are ungated.
    pub clk_enable: &'a [RegEntry],
    /// Configures wake-up sources before the clocks are gated.
    pub wakeup: &'a [RegEntry],
}

impl<'a> PmTables<'a> {
    /// No work at any step.
    pub const fn empty() -> PmTables<'a> {
        PmTables {
            save: &[],
            context_check: &[],
            restore: &[],
            irq_disable: &[],
            irq_enable: &[],
            clk_disable: &[],
            clk_enable: &[],
            wakeup: &[],
        }
    }

    fn all(&self) -> [(TableKind, &'a [RegEntry]); 8] {
        [
            (TableKind::Save, self.save),
            (TableKind::ContextCheck, self.context_check),
            (TableKind::Restore, self.restore),
            (TableKind::IrqDisable, self.irq_disable),
            (TableKind::IrqEnable, self.irq_enable),
            (TableKind::ClockDisable, self.clk_disable),
            (TableKind::ClockEnable, self.clk_enable),
            (TableKind::Wakeup, self.wakeup),
        ]
    }
}

/// How the pending check status value is interpreted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Polarity {
    /// An interrupt is pending when `status & mask == compare`.
    PendingOnMatch,
    /// An interrupt is pending when `status & mask != compare`.
    PendingOnMismatch,
}

/// Decides whether an interrupt is in flight after the IRQ disable table ran.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingIrqCheck {
    /// Status register to read.
    pub offset: u32,
    /// Bits of the status register that are compared.
    pub mask: u32,
    /// Value the masked bits are compared with.
    pub compare: u32,
    /// Whether a match or a mismatch means pending.
    pub polarity: Polarity,
}

impl PendingIrqCheck {
    /// Interpret a value read from the status register.
    pub fn is_pending(&self, status: u32) -> bool {
        let matched = status & self.mask == self.compare;
        match self.polarity {
            Polarity::PendingOnMatch => matched,
            Polarity::PendingOnMismatch => !matched,
        }
    }
}

/// What to do when a settle poll runs out of time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum TimeoutPolicy {
    /// Stop the table and report [`ErrorCode::Timeout`].
    #[default]
    Fail,
    /// Log a warning and carry on as if the register had settled.
    Proceed,
}

/// Capability flags of a device type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PmFlags {
    /// Run the save table only once; the saved values never change.
    pub save_once: bool,
    /// Compare live registers against the context before restoring, and skip
    /// the restore when nothing was lost.
    pub check_context_loss: bool,
    /// The device raises interrupts.
    pub irq: bool,
    /// The device owns DMA channels.
    pub dma: bool,
    /// Spin lock or ticket lock around the runtime state.
    pub lock: LockKind,
    /// Take the IRQ sub-lock around the IRQ disable/enable window.
    pub irq_sublock: bool,
    /// Run the suspend and resume callbacks inside the IRQ sub-lock.
    pub callback_in_irq_lock: bool,
    /// System sleep saves the context and gates the clocks instead of only
    /// running the callbacks.
    pub system_context: bool,
    /// Runtime PM is enabled; system suspend drops back to runtime suspend.
    pub runtime_pm: bool,
}

impl PmFlags {
    /// Runtime PM on, every other capability off.
    pub const fn new() -> PmFlags {
        PmFlags {
            save_once: false,
            check_context_loss: false,
            irq: false,
            dma: false,
            lock: LockKind::Spin,
            irq_sublock: false,
            callback_in_irq_lock: false,
            system_context: false,
            runtime_pm: true,
        }
    }
}

impl Default for PmFlags {
    fn default() -> PmFlags {
        PmFlags::new()
    }
}

/// Device specific PM hooks.
///
/// Everything except [`first_resume`](PmCallbacks::first_resume) defaults to
/// doing nothing. A returned error aborts the current transition and is
/// reported as [`ErrorCode::CallbackFailed`].
pub trait PmCallbacks {
    /// Bring the device up for the first time.
    ///
    /// Replaces the generic runtime resume sequence on the very first resume,
    /// when no context has been saved yet.
    fn first_resume(
        &self,
        regs: &dyn RegisterTransport,
        ctx: &mut RegisterContext<'_>,
    ) -> Result<(), ErrorCode>;

    /// Last device specific step before the wake-up table and clock gating.
    fn runtime_suspend(
        &self,
        _regs: &dyn RegisterTransport,
        _ctx: &mut RegisterContext<'_>,
    ) -> Result<(), ErrorCode> {
        Ok(())
    }

    /// Runs once interrupts are unmasked again.
    fn runtime_resume(
        &self,
        _regs: &dyn RegisterTransport,
        _ctx: &mut RegisterContext<'_>,
    ) -> Result<(), ErrorCode> {
        Ok(())
    }

    /// Restore state that is not expressible as a flat register table. Runs
    /// after the restore table, and only when the context was lost.
    fn restore(
        &self,
        _regs: &dyn RegisterTransport,
        _ctx: &mut RegisterContext<'_>,
    ) -> Result<(), ErrorCode> {
        Ok(())
    }

    /// System sleep entry.
    fn suspend(
        &self,
        _regs: &dyn RegisterTransport,
        _ctx: &mut RegisterContext<'_>,
    ) -> Result<(), ErrorCode> {
        Ok(())
    }

    /// System sleep exit.
    fn resume(
        &self,
        _regs: &dyn RegisterTransport,
        _ctx: &mut RegisterContext<'_>,
    ) -> Result<(), ErrorCode> {
        Ok(())
    }
}

/// Descriptor of a device type.
#[derive(Clone, Copy, Debug)]
pub struct UniversalDriver<'a> {
    /// Name used in log messages.
    pub name: &'a str,
    /// Register tables run at each step.
    pub tables: PmTables<'a>,
    /// Checked after the IRQ disable table; a pending interrupt defers the
    /// suspend.
    pub irq_pending: Option<PendingIrqCheck>,
    /// Pin state per PM action.
    pub pin_map: PinStateMap<'a>,
    /// Capabilities of the device type.
    pub flags: PmFlags,
    /// What an expired settle poll does.
    pub timeout_policy: TimeoutPolicy,
    /// Inactivity before [`autosuspend`](crate::UniversalDevice::autosuspend)
    /// suspends the device. `None` suspends immediately.
    pub autosuspend_delay_ms: Option<u32>,
}

impl<'a> UniversalDriver<'a> {
    /// A driver with default flags, standard pin states and no pending
    /// check.
    pub const fn new(name: &'a str, tables: PmTables<'a>) -> UniversalDriver<'a> {
        UniversalDriver {
            name,
            tables,
            irq_pending: None,
            pin_map: PinStateMap::standard(),
            flags: PmFlags::new(),
            timeout_policy: TimeoutPolicy::Fail,
            autosuspend_delay_ms: None,
        }
    }

    /// Replace the capability flags.
    pub const fn with_flags(mut self, flags: PmFlags) -> UniversalDriver<'a> {
        self.flags = flags;
        self
    }

    /// Set the pending interrupt check.
    pub const fn with_pending_check(mut self, check: PendingIrqCheck) -> UniversalDriver<'a> {
        self.irq_pending = Some(check);
        self
    }

    /// Replace the pin state mapping.
    pub const fn with_pin_map(mut self, pin_map: PinStateMap<'a>) -> UniversalDriver<'a> {
        self.pin_map = pin_map;
        self
    }

    /// Set what an expired settle poll does.
    pub const fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> UniversalDriver<'a> {
        self.timeout_policy = policy;
        self
    }

    /// Suspend on [`autosuspend`](crate::UniversalDevice::autosuspend) only
    /// after `ms` milliseconds without activity.
    pub const fn with_autosuspend_delay(mut self, ms: u32) -> UniversalDriver<'a> {
        self.autosuspend_delay_ms = Some(ms);
        self
    }

    /// Whether any table needs a timer for its settle polls.
    pub fn needs_timer(&self) -> bool {
        self.tables
            .all()
            .iter()
            .any(|(_, t)| table::table_polls(t))
    }

    /// Check the descriptor against a context of `ctx_len` slots.
    pub fn validate(&self, ctx_len: usize) -> Result<(), ConfigError> {
        for (kind, entries) in self.tables.all() {
            table::validate_table(entries, kind, ctx_len)?;
        }

        if self
            .tables
            .context_check
            .iter()
            .any(|entry| entry.op != RegOp::Read)
        {
            return Err(ConfigError::InvalidEntry(TableKind::ContextCheck));
        }

        if self.flags.check_context_loss && self.tables.context_check.is_empty() {
            return Err(ConfigError::MissingTable(TableKind::ContextCheck));
        }
        if self.flags.irq && self.tables.irq_disable.is_empty() {
            return Err(ConfigError::MissingTable(TableKind::IrqDisable));
        }
        if self.irq_pending.is_some() && !self.flags.irq {
            return Err(ConfigError::PendingCheckWithoutIrq);
        }

        self.pin_map.validate(ctx_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SAVE: [RegEntry; 2] = [RegEntry::read(0x0, 0), RegEntry::read(0x4, 1)];
    static CHECK: [RegEntry; 1] = [RegEntry::read(0x0, 0)];
    static BAD_CHECK: [RegEntry; 1] = [RegEntry::write(0x0, 0)];
    static IRQ_OFF: [RegEntry; 1] = [RegEntry::write(0x20, 1)];

    fn tables() -> PmTables<'static> {
        let mut tables = PmTables::empty();
        tables.save = &SAVE;
        tables.restore = &SAVE;
        tables
    }

    #[test]
    fn pending_polarity() {
        let mut check = PendingIrqCheck {
            offset: 0x30,
            mask: 0x80,
            compare: 0,
            polarity: Polarity::PendingOnMatch,
        };
        assert!(check.is_pending(0x00));
        assert!(!check.is_pending(0x80));
        assert!(check.is_pending(0x7f));

        check.polarity = Polarity::PendingOnMismatch;
        assert!(!check.is_pending(0x00));
        assert!(check.is_pending(0x80));
    }

    #[test]
    fn validates_indexes() {
        let driver = UniversalDriver::new("t", tables());
        assert_eq!(driver.validate(2), Ok(()));
        assert_eq!(
            driver.validate(1),
            Err(ConfigError::IndexOutOfRange { index: 1 })
        );
    }

    #[test]
    fn feature_flags_need_tables() {
        let flags = PmFlags {
            check_context_loss: true,
            ..PmFlags::new()
        };
        let driver = UniversalDriver::new("t", tables()).with_flags(flags);
        assert_eq!(
            driver.validate(2),
            Err(ConfigError::MissingTable(TableKind::ContextCheck))
        );

        let mut t = tables();
        t.context_check = &BAD_CHECK;
        let driver = UniversalDriver::new("t", t).with_flags(flags);
        assert_eq!(
            driver.validate(2),
            Err(ConfigError::InvalidEntry(TableKind::ContextCheck))
        );

        t.context_check = &CHECK;
        let driver = UniversalDriver::new("t", t).with_flags(flags);
        assert_eq!(driver.validate(2), Ok(()));

        let irq = PmFlags {
            irq: true,
            ..PmFlags::new()
        };
        let driver = UniversalDriver::new("t", tables()).with_flags(irq);
        assert_eq!(
            driver.validate(2),
            Err(ConfigError::MissingTable(TableKind::IrqDisable))
        );

        let check = PendingIrqCheck {
            offset: 0,
            mask: 1,
            compare: 1,
            polarity: Polarity::PendingOnMatch,
        };
        let mut t = tables();
        t.irq_disable = &IRQ_OFF;
        let driver = UniversalDriver::new("t", t).with_pending_check(check);
        assert_eq!(driver.validate(2), Err(ConfigError::PendingCheckWithoutIrq));
        assert_eq!(driver.with_flags(irq).validate(2), Ok(()));
    }

    #[test]
    fn timer_requirement() {
        static POLLED: [RegEntry; 1] = [RegEntry::write(0x0, 0).with_timeout(1, 10)];
        let mut t = tables();
        assert!(!UniversalDriver::new("t", t).needs_timer());
        t.clk_enable = &POLLED;
        assert!(UniversalDriver::new("t", t).needs_timer());
        assert_eq!(TimeoutPolicy::default(), TimeoutPolicy::Fail);
    }
}
