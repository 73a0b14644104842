// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! # Universal PM
//!
//! A device-agnostic power management engine. A device vendor describes the
//! register-level work needed to suspend, resume, idle and wake a device as
//! flat tables of register operations, and this crate executes those tables
//! uniformly for every device type.
//!
//! The crate is built around a small interpreter:
//!
//!  * A [`RegisterContext`] is a per-device array of `u32` slots, populated
//!    once from a driver supplied template.
//!  * A register table is a `&[RegEntry]`: an ordered, immutable list of
//!    reads, writes, read-modify-writes and augmented writes, optionally
//!    followed by a bounded poll for the register to settle.
//!  * A [`UniversalDriver`] describes one device type: its tables, its
//!    capability flags and how PM actions map to pin states. Many devices can
//!    share a single driver.
//!  * A [`UniversalDevice`] owns the runtime state for one device instance
//!    behind a per-device lock and sequences the tables together with the
//!    clock, DMA and pin control collaborators.
//!
//! Branching is never expressed inside a table. When a device needs a
//! different sequence the orchestrator selects a different table, and pin
//! selection can consult a small immutable [`condition::Condition`] tree.
//!
//! ## Using Universal PM
//!
//! Hardware access happens through the traits in [`hil`] and
//! [`transport::RegisterTransport`]. A board implements (or reuses) those and
//! then builds a device:
//!
//! ```rust
//! use core::cell::RefCell;
//! use universal_pm::table::RegEntry;
//! use universal_pm::transport::{BusError, RegisterTransport};
//! use universal_pm::{
//!     DeviceId, ErrorCode, PmCallbacks, PmTables, RegisterContext, UniversalDevice,
//!     UniversalDriver,
//! };
//!
//! struct Regs(RefCell<[u32; 16]>);
//!
//! impl RegisterTransport for Regs {
//!     fn read(&self, offset: u32) -> Result<u32, BusError> {
//!         Ok(self.0.borrow()[(offset / 4) as usize])
//!     }
//!
//!     fn write(&self, offset: u32, value: u32) -> Result<(), BusError> {
//!         self.0.borrow_mut()[(offset / 4) as usize] = value;
//!         Ok(())
//!     }
//! }
//!
//! struct Ops;
//!
//! impl PmCallbacks for Ops {
//!     fn first_resume(
//!         &self,
//!         _regs: &dyn RegisterTransport,
//!         _ctx: &mut RegisterContext<'_>,
//!     ) -> Result<(), ErrorCode> {
//!         Ok(())
//!     }
//! }
//!
//! static SAVE: [RegEntry; 1] = [RegEntry::read(0x10, 0)];
//! static RESTORE: [RegEntry; 1] = [RegEntry::write(0x10, 0)];
//!
//! let mut tables = PmTables::empty();
//! tables.save = &SAVE;
//! tables.restore = &RESTORE;
//! let driver = UniversalDriver::new("demo", tables);
//!
//! let regs = Regs(RefCell::new([0; 16]));
//! let mut storage = [0u32; 1];
//! let device = UniversalDevice::new(DeviceId(0), "demo0", &driver, &regs, &Ops, &mut storage);
//! device.create_reg_context(&[0]).unwrap();
//!
//! device.runtime_resume().unwrap(); // first resume runs the callback only
//! device.runtime_suspend().unwrap();
//! device.runtime_resume().unwrap();
//! ```

#![no_std]
#![cfg_attr(not(test), forbid(unsafe_code))]
#![deny(missing_docs)]

pub mod condition;
pub mod context;
pub mod device;
pub mod driver;
pub mod error_codes;
pub mod hil;
pub mod interpreter;
pub mod registry;
pub mod sync;
pub mod table;
pub mod transport;

mod config;
mod coordinators;
mod irq;
mod pm;
mod rpm;
mod save_restore;

#[doc(inline)]
pub use crate::context::RegisterContext;
#[doc(inline)]
pub use crate::device::{DeviceId, DeviceRuntimeState, PowerState, UniversalDevice};
#[doc(inline)]
pub use crate::driver::{
    PendingIrqCheck, PmCallbacks, PmFlags, PmTables, TimeoutPolicy, UniversalDriver,
};
#[doc(inline)]
pub use crate::error_codes::{ConfigError, ErrorCode, PmStage};
#[doc(inline)]
pub use crate::registry::DeviceRegistry;

// This is used to run the tests on a host
#[cfg(test)]
#[macro_use]
extern crate std;
