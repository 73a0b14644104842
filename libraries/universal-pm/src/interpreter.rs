// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! The register table interpreter.
//!
//! Tables are straight-line code: entries run strictly front to back and the
//! first error stops the table. There is no rollback, the context keeps
//! whatever values were read before the failure.
//!
//! The only place the interpreter waits is the settle poll after a write.
//! The poll spins on the transport, re-reading the register as fast as the
//! transport allows, until the value matches or the deadline measured on the
//! device's [`Time`] source passes.

use log::{debug, trace, warn};

use crate::config::CONFIG;
use crate::context::RegisterContext;
use crate::driver::TimeoutPolicy;
use crate::error_codes::{ConfigError, ErrorCode};
use crate::hil::Time;
use crate::table::{Augment, Poll, RegEntry, RegOp};
use crate::transport::RegisterTransport;

/// Executes register tables against one device.
pub struct TableInterpreter<'a> {
    regs: &'a dyn RegisterTransport,
    timer: Option<&'a dyn Time>,
    policy: TimeoutPolicy,
}

impl<'a> TableInterpreter<'a> {
    /// `timer` is only needed by tables that poll.
    pub fn new(
        regs: &'a dyn RegisterTransport,
        timer: Option<&'a dyn Time>,
        policy: TimeoutPolicy,
    ) -> TableInterpreter<'a> {
        TableInterpreter {
            regs,
            timer,
            policy,
        }
    }

    /// Run every entry of `table` in order.
    pub fn process(
        &self,
        ctx: &mut RegisterContext<'_>,
        table: &[RegEntry],
    ) -> Result<(), ErrorCode> {
        table.iter().try_for_each(|entry| self.step(ctx, entry))
    }

    /// Compare the live registers named by a read-only `table` with the
    /// values saved in `ctx`.
    ///
    /// Returns `true` as soon as one register differs, which means the device
    /// lost its context. The context itself is not modified.
    pub fn compare(
        &self,
        ctx: &RegisterContext<'_>,
        table: &[RegEntry],
    ) -> Result<bool, ErrorCode> {
        for entry in table {
            let live = self.read(entry.offset)?;
            let saved = ctx.get(entry.ctx_index)?;
            if live != saved {
                if CONFIG.debug_context_loss {
                    debug!(
                        "context lost at {:#x}: saved {:#x}, live {:#x}",
                        entry.offset, saved, live
                    );
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn step(&self, ctx: &mut RegisterContext<'_>, entry: &RegEntry) -> Result<(), ErrorCode> {
        let offset = entry.offset;
        match entry.op {
            RegOp::Read => {
                let value = self.read(offset)?;
                ctx.set(entry.ctx_index, value)?;
                self.trace(entry, value);
            }
            RegOp::FlushRead => {
                let value = self.read(offset)?;
                self.trace(entry, value);
            }
            RegOp::Write => {
                let value = ctx.get(entry.ctx_index)?;
                self.write(offset, value)?;
                self.trace(entry, value);
            }
            RegOp::WriteThenRead => {
                let value = ctx.get(entry.ctx_index)?;
                self.write(offset, value)?;
                self.read(offset)?;
                self.trace(entry, value);
            }
            RegOp::ReadModifyWrite(op) => {
                let current = self.read(offset)?;
                let value = op.apply(current, ctx.get(entry.ctx_index)?);
                self.write(offset, value)?;
                self.trace(entry, value);
            }
            RegOp::WriteAugmented(op) => {
                let augment = match entry.augment {
                    Augment::Static(value) => value,
                    Augment::Combine { left, op, right } => {
                        op.apply(ctx.get(left)?, ctx.get(right)?)
                    }
                    // Identity for `op`, the slot is written unchanged.
                    Augment::None => op.identity(),
                };
                let value = op.apply(ctx.get(entry.ctx_index)?, augment);
                self.write(offset, value)?;
                self.trace(entry, value);
            }
        }

        match entry.poll {
            Some(poll) if entry.op.writes() => self.poll(offset, &poll),
            _ => Ok(()),
        }
    }

    fn poll(&self, offset: u32, poll: &Poll) -> Result<(), ErrorCode> {
        let timer = self.timer.ok_or(ConfigError::NoTimer)?;
        let budget = timer.ticks_from_us(poll.timeout_us);
        let start = timer.now();

        loop {
            let value = self.read(offset)?;
            if value & poll.mask == poll.expected {
                return Ok(());
            }
            if timer.now().wrapping_sub(start) >= budget {
                warn!(
                    "register {:#x} did not settle within {}us (last read {:#x})",
                    offset, poll.timeout_us, value
                );
                return match self.policy {
                    TimeoutPolicy::Fail => Err(ErrorCode::Timeout { offset }),
                    TimeoutPolicy::Proceed => Ok(()),
                };
            }
            core::hint::spin_loop();
        }
    }

    pub(crate) fn read(&self, offset: u32) -> Result<u32, ErrorCode> {
        self.regs.read(offset).map_err(|err| {
            warn!("read of {:#x} failed: {:?}", offset, err);
            ErrorCode::RegisterAccessFailed { offset }
        })
    }

    pub(crate) fn write(&self, offset: u32, value: u32) -> Result<(), ErrorCode> {
        self.regs.write(offset, value).map_err(|err| {
            warn!("write of {:#x} to {:#x} failed: {:?}", value, offset, err);
            ErrorCode::RegisterAccessFailed { offset }
        })
    }

    fn trace(&self, entry: &RegEntry, value: u32) {
        if CONFIG.trace_register_tables {
            trace!("{:?} {:#x} = {:#x}", entry.op, entry.offset, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::BitOp;
    use crate::transport::BusError;
    use core::cell::{Cell, RefCell};
    use std::vec::Vec;

    #[derive(Debug, PartialEq)]
    enum Access {
        Read(u32),
        Write(u32, u32),
    }

    struct Regs {
        values: RefCell<[u32; 16]>,
        log: RefCell<Vec<Access>>,
        broken: Option<u32>,
    }

    impl Regs {
        fn new() -> Regs {
            Regs {
                values: RefCell::new([0; 16]),
                log: RefCell::new(Vec::new()),
                broken: None,
            }
        }

        fn set(&self, offset: u32, value: u32) {
            self.values.borrow_mut()[(offset / 4) as usize] = value;
        }
    }

    impl RegisterTransport for Regs {
        fn read(&self, offset: u32) -> Result<u32, BusError> {
            self.log.borrow_mut().push(Access::Read(offset));
            if self.broken == Some(offset) {
                return Err(BusError::Nack);
            }
            Ok(self.values.borrow()[(offset / 4) as usize])
        }

        fn write(&self, offset: u32, value: u32) -> Result<(), BusError> {
            self.log.borrow_mut().push(Access::Write(offset, value));
            if self.broken == Some(offset) {
                return Err(BusError::Nack);
            }
            self.set(offset, value);
            Ok(())
        }
    }

    /// 1 MHz counter that advances by `step` on every read.
    struct Ticker {
        now: Cell<u32>,
        step: u32,
    }

    impl Time for Ticker {
        fn now(&self) -> u32 {
            let now = self.now.get();
            self.now.set(now.wrapping_add(self.step));
            now
        }

        fn frequency(&self) -> u32 {
            1_000_000
        }
    }

    macro_rules! ctx {
        ($storage:ident, $values:expr) => {{
            let mut ctx = RegisterContext::new(&mut $storage);
            ctx.populate(&$values).unwrap();
            ctx
        }};
    }

    #[test]
    fn reads_and_writes_in_order() {
        let regs = Regs::new();
        regs.set(0x0, 0x11);
        regs.set(0x4, 0x22);
        let mut storage = [0u32; 2];
        let mut ctx = ctx!(storage, [0, 0]);
        let interp = TableInterpreter::new(&regs, None, TimeoutPolicy::Fail);

        let table = [
            RegEntry::read(0x0, 0),
            RegEntry::read(0x4, 1),
            RegEntry::flush_read(0x8),
            RegEntry::write_then_read(0xc, 1),
        ];
        interp.process(&mut ctx, &table).unwrap();

        assert_eq!(ctx.values(), &[0x11, 0x22]);
        assert_eq!(
            *regs.log.borrow(),
            [
                Access::Read(0x0),
                Access::Read(0x4),
                Access::Read(0x8),
                Access::Write(0xc, 0x22),
                Access::Read(0xc),
            ]
        );
    }

    #[test]
    fn read_modify_write() {
        let regs = Regs::new();
        regs.set(0x10, 0xf0);
        let mut storage = [0u32; 2];
        let mut ctx = ctx!(storage, [0x0f, 0x30]);
        let interp = TableInterpreter::new(&regs, None, TimeoutPolicy::Fail);

        interp
            .process(&mut ctx, &[RegEntry::rmw(0x10, 0, BitOp::Or)])
            .unwrap();
        assert_eq!(regs.values.borrow()[4], 0xff);

        interp
            .process(&mut ctx, &[RegEntry::rmw(0x10, 1, BitOp::And)])
            .unwrap();
        assert_eq!(regs.values.borrow()[4], 0x30);
    }

    #[test]
    fn rmw_read_failure_skips_write() {
        let mut regs = Regs::new();
        regs.broken = Some(0x10);
        let mut storage = [0u32; 1];
        let mut ctx = ctx!(storage, [1]);
        let interp = TableInterpreter::new(&regs, None, TimeoutPolicy::Fail);

        assert_eq!(
            interp.process(&mut ctx, &[RegEntry::rmw(0x10, 0, BitOp::Or)]),
            Err(ErrorCode::RegisterAccessFailed { offset: 0x10 })
        );
        assert_eq!(*regs.log.borrow(), [Access::Read(0x10)]);
    }

    #[test]
    fn augmented_writes() {
        let regs = Regs::new();
        let mut storage = [0u32; 3];
        let mut ctx = ctx!(storage, [0x02, 0x10, 0x01]);
        let interp = TableInterpreter::new(&regs, None, TimeoutPolicy::Fail);

        let table = [
            RegEntry::write_augmented(
                0x0,
                0,
                BitOp::Or,
                Augment::Combine {
                    left: 1,
                    op: BitOp::Or,
                    right: 2,
                },
            ),
            RegEntry::write_augmented(0x4, 1, BitOp::And, Augment::Static(0x30)),
        ];
        interp.process(&mut ctx, &table).unwrap();

        assert_eq!(
            *regs.log.borrow(),
            [Access::Write(0x0, 0x13), Access::Write(0x4, 0x10)]
        );
    }

    #[test]
    fn failure_stops_table_and_keeps_partial_context() {
        let mut regs = Regs::new();
        regs.broken = Some(0x4);
        regs.set(0x0, 0xaa);
        regs.set(0x8, 0xbb);
        let mut storage = [0u32; 3];
        let mut ctx = ctx!(storage, [0, 0, 0]);
        let interp = TableInterpreter::new(&regs, None, TimeoutPolicy::Fail);

        let table = [
            RegEntry::read(0x0, 0),
            RegEntry::read(0x4, 1),
            RegEntry::read(0x8, 2),
        ];
        assert_eq!(
            interp.process(&mut ctx, &table),
            Err(ErrorCode::RegisterAccessFailed { offset: 0x4 })
        );
        assert_eq!(ctx.values(), &[0xaa, 0, 0]);
        assert_eq!(regs.log.borrow().len(), 2);
    }

    #[test]
    fn out_of_range_slot_is_configuration_error() {
        let regs = Regs::new();
        let mut storage = [0u32; 1];
        let mut ctx = ctx!(storage, [0]);
        let interp = TableInterpreter::new(&regs, None, TimeoutPolicy::Fail);

        assert_eq!(
            interp.process(&mut ctx, &[RegEntry::write(0x0, 3)]),
            Err(ErrorCode::ConfigurationError(ConfigError::IndexOutOfRange {
                index: 3
            }))
        );
        assert!(regs.log.borrow().is_empty());
    }

    #[test]
    fn poll_settles() {
        let regs = Regs::new();
        let ticker = Ticker {
            now: Cell::new(0),
            step: 1,
        };
        let mut storage = [0u32; 1];
        let mut ctx = ctx!(storage, [0x5]);
        let interp = TableInterpreter::new(&regs, Some(&ticker), TimeoutPolicy::Fail);

        // The written value reads back immediately.
        let table = [RegEntry::write(0x0, 0).with_poll(0x1, 0x1, 10)];
        interp.process(&mut ctx, &table).unwrap();
        assert_eq!(
            *regs.log.borrow(),
            [Access::Write(0x0, 0x5), Access::Read(0x0)]
        );
    }

    #[test]
    fn poll_timeout_strict() {
        let regs = Regs::new();
        let ticker = Ticker {
            now: Cell::new(u32::MAX - 2),
            step: 1,
        };
        let mut storage = [0u32; 1];
        let mut ctx = ctx!(storage, [0x4]);
        let interp = TableInterpreter::new(&regs, Some(&ticker), TimeoutPolicy::Fail);

        let table = [
            RegEntry::write(0x0, 0).with_timeout(0x1, 5),
            RegEntry::write(0x4, 0),
        ];
        assert_eq!(
            interp.process(&mut ctx, &table),
            Err(ErrorCode::Timeout { offset: 0x0 })
        );
        let log = regs.log.borrow();
        // Deadline crosses the counter wrap; the next entry never runs.
        assert_eq!(log.iter().filter(|a| **a == Access::Read(0x0)).count(), 5);
        assert!(!log.contains(&Access::Write(0x4, 0x4)));
    }

    #[test]
    fn poll_timeout_proceeds() {
        let regs = Regs::new();
        let ticker = Ticker {
            now: Cell::new(0),
            step: 10,
        };
        let mut storage = [0u32; 1];
        let mut ctx = ctx!(storage, [0x4]);
        let interp = TableInterpreter::new(&regs, Some(&ticker), TimeoutPolicy::Proceed);

        let table = [
            RegEntry::write(0x0, 0).with_timeout(0x1, 5),
            RegEntry::write(0x4, 0),
        ];
        interp.process(&mut ctx, &table).unwrap();
        assert!(regs.log.borrow().contains(&Access::Write(0x4, 0x4)));
    }

    #[test]
    fn poll_without_timer() {
        let regs = Regs::new();
        let mut storage = [0u32; 1];
        let mut ctx = ctx!(storage, [0]);
        let interp = TableInterpreter::new(&regs, None, TimeoutPolicy::Proceed);

        assert_eq!(
            interp.process(&mut ctx, &[RegEntry::write(0x0, 0).with_timeout(0, 1)]),
            Err(ErrorCode::ConfigurationError(ConfigError::NoTimer))
        );
    }

    #[test]
    fn compare_detects_drift() {
        let regs = Regs::new();
        regs.set(0x4, 0x1234);
        let mut storage = [0u32; 1];
        let ctx = ctx!(storage, [0x1234]);
        let interp = TableInterpreter::new(&regs, None, TimeoutPolicy::Fail);
        let check = [RegEntry::read(0x4, 0)];

        assert_eq!(interp.compare(&ctx, &check), Ok(false));
        regs.set(0x4, 0x5678);
        assert_eq!(interp.compare(&ctx, &check), Ok(true));
        assert_eq!(ctx.values(), &[0x1234]);
    }
}
