// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! A device instance driven by the PM engine.
//!
//! [`UniversalDevice`] ties a [`UniversalDriver`] to one concrete device: its
//! register transport, its clocks, DMA channels, pins and timer, and its
//! [`DeviceRuntimeState`]. The runtime state lives behind the device lock, so
//! every public operation below is serialized per device, while operations on
//! different devices never contend.
//!
//! The orchestration itself (runtime and system PM) is implemented in
//! separate modules as further `impl UniversalDevice` blocks. The methods in
//! this file expose the individual steps, each under the device lock.

use spin::mutex::{SpinMutex, SpinMutexGuard};

use crate::context::RegisterContext;
use crate::driver::{PmCallbacks, UniversalDriver};
use crate::error_codes::{ConfigError, ErrorCode, PmStage};
use crate::hil::{ClockInterface, DmaChannel, PinControl, PmAction, Time};
use crate::interpreter::TableInterpreter;
use crate::sync::DeviceLock;
use crate::table::RegEntry;
use crate::transport::RegisterTransport;

/// Maximum number of DMA channels a device can own.
pub const MAX_DMA_CHANNELS: usize = 32;

/// Identifier of a bound device, unique within a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceId(pub usize);

/// Where a device is in its PM life cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PowerState {
    /// Powered and usable.
    Active,
    /// Suspended by runtime PM. Every device starts here.
    RuntimeSuspended,
    /// Suspended as part of system sleep.
    SystemSuspended,
}

/// Mutable PM state of one device.
pub struct DeviceRuntimeState<'a> {
    pub(crate) ctx: RegisterContext<'a>,
    pub(crate) context_saved: bool,
    pub(crate) context_loss_cnt: u32,
    pub(crate) first_resume_done: bool,
    /// Bit `n` set when DMA channel `n` was paused by the engine.
    pub(crate) dma_paused: u32,
    pub(crate) state: PowerState,
    /// Timer tick of the last activity, used by autosuspend.
    pub(crate) last_busy: Option<u32>,
}

impl<'a> DeviceRuntimeState<'a> {
    fn new(storage: &'a mut [u32]) -> DeviceRuntimeState<'a> {
        DeviceRuntimeState {
            ctx: RegisterContext::new(storage),
            context_saved: false,
            context_loss_cnt: 0,
            first_resume_done: false,
            dma_paused: 0,
            state: PowerState::RuntimeSuspended,
            last_busy: None,
        }
    }

    /// The register context.
    pub fn context(&self) -> &RegisterContext<'a> {
        &self.ctx
    }

    /// Whether the save table has run at least once.
    pub fn context_saved(&self) -> bool {
        self.context_saved
    }

    /// How many restores found the context lost.
    pub fn context_loss_count(&self) -> u32 {
        self.context_loss_cnt
    }

    /// Whether the first resume callback has succeeded.
    pub fn first_resume_done(&self) -> bool {
        self.first_resume_done
    }

    /// Bit `n` set while DMA channel `n` is paused by the engine.
    pub fn dma_paused(&self) -> u32 {
        self.dma_paused
    }

    /// The current power state.
    pub fn power_state(&self) -> PowerState {
        self.state
    }

    /// Timer tick of the last recorded activity.
    pub fn last_busy(&self) -> Option<u32> {
        self.last_busy
    }
}

/// One device instance under the control of the PM engine.
///
/// The device owns its runtime state and borrows everything else: the
/// driver descriptor and the platform collaborators.
pub struct UniversalDevice<'a> {
    id: DeviceId,
    name: &'a str,
    pub(crate) driver: &'a UniversalDriver<'a>,
    pub(crate) regs: &'a dyn RegisterTransport,
    pub(crate) ops: &'a dyn PmCallbacks,
    pub(crate) timer: Option<&'a dyn Time>,
    pub(crate) clocks: &'a [&'a dyn ClockInterface],
    pub(crate) dma: &'a [&'a dyn DmaChannel],
    pub(crate) pins: Option<&'a dyn PinControl>,
    pub(crate) state: DeviceLock<DeviceRuntimeState<'a>>,
    irq_lock: Option<&'a SpinMutex<()>>,
    own_irq_lock: SpinMutex<()>,
}

impl<'a> UniversalDevice<'a> {
    /// `storage` backs the register context and must be at least as long as
    /// the template later passed to
    /// [`create_reg_context`](UniversalDevice::create_reg_context).
    pub fn new(
        id: DeviceId,
        name: &'a str,
        driver: &'a UniversalDriver<'a>,
        regs: &'a dyn RegisterTransport,
        ops: &'a dyn PmCallbacks,
        storage: &'a mut [u32],
    ) -> UniversalDevice<'a> {
        UniversalDevice {
            id,
            name,
            driver,
            regs,
            ops,
            timer: None,
            clocks: &[],
            dma: &[],
            pins: None,
            state: DeviceLock::new(driver.flags.lock, DeviceRuntimeState::new(storage)),
            irq_lock: None,
            own_irq_lock: SpinMutex::new(()),
        }
    }

    /// Time source for settle polls and autosuspend.
    pub fn with_timer(mut self, timer: &'a dyn Time) -> UniversalDevice<'a> {
        self.timer = Some(timer);
        self
    }

    /// Clocks gated on suspend and ungated on resume.
    pub fn with_clocks(mut self, clocks: &'a [&'a dyn ClockInterface]) -> UniversalDevice<'a> {
        self.clocks = clocks;
        self
    }

    /// DMA channels paused across a suspend, at most
    /// [`MAX_DMA_CHANNELS`].
    pub fn with_dma(mut self, channels: &'a [&'a dyn DmaChannel]) -> UniversalDevice<'a> {
        self.dma = channels;
        self
    }

    /// Pin controller for the device's pin states.
    pub fn with_pins(mut self, pins: &'a dyn PinControl) -> UniversalDevice<'a> {
        self.pins = Some(pins);
        self
    }

    /// Use `lock` as the IRQ sub-lock, so the board's interrupt handler can
    /// take it without a reference to the device.
    ///
    /// Without it the device uses a sub-lock of its own, reachable through
    /// [`lock_irq`](UniversalDevice::lock_irq).
    pub fn with_irq_lock(mut self, lock: &'a SpinMutex<()>) -> UniversalDevice<'a> {
        self.irq_lock = Some(lock);
        self
    }

    /// The device's registry id.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// The device's instance name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The device type descriptor.
    pub fn driver(&self) -> &'a UniversalDriver<'a> {
        self.driver
    }

    /// Instantiate the register context from the driver's template.
    ///
    /// The device description is validated against the template length
    /// first. This can only be done once per device.
    pub fn create_reg_context(&self, template: &[u32]) -> Result<(), ErrorCode> {
        let mut st = self.state.lock();
        if st.ctx.is_populated() {
            return Err(ConfigError::ContextExists.into());
        }

        self.driver.validate(template.len())?;
        if self.timer.is_none()
            && (self.driver.needs_timer() || self.driver.autosuspend_delay_ms.is_some())
        {
            return Err(ConfigError::NoTimer.into());
        }
        if self.driver.flags.dma && self.dma.len() > MAX_DMA_CHANNELS {
            return Err(ConfigError::TooManyChannels.into());
        }

        st.ctx.populate(template)
    }

    /// Read a device register outside of any table.
    pub fn reg_read(&self, offset: u32) -> Result<u32, ErrorCode> {
        self.interpreter().read(offset)
    }

    /// Write a device register outside of any table.
    pub fn reg_write(&self, offset: u32, value: u32) -> Result<(), ErrorCode> {
        self.interpreter().write(offset, value)
    }

    /// Run an arbitrary table against the device's context.
    pub fn process_table(&self, table: &[RegEntry]) -> Result<(), ErrorCode> {
        let mut st = self.state.lock();
        self.interpreter().process(&mut st.ctx, table)
    }

    /// Run the save table, honoring the save-once policy.
    pub fn save_context(&self) -> Result<(), ErrorCode> {
        self.save_locked(&mut self.state.lock())
    }

    /// Restore the context, skipping the restore when the device kept it.
    pub fn restore_context(&self) -> Result<(), ErrorCode> {
        self.restore_locked(&mut self.state.lock())
    }

    /// Mask the device's interrupts. Returns [`ErrorCode::Busy`] when one is
    /// still pending.
    pub fn disable_irq(&self) -> Result<(), ErrorCode> {
        self.disable_irq_locked(&mut self.state.lock())
    }

    /// Unmask the device's interrupts.
    pub fn enable_irq(&self) -> Result<(), ErrorCode> {
        self.enable_irq_locked(&mut self.state.lock())
    }

    /// Apply the pin state mapped to `action`. Best effort.
    pub fn select_pin_state(&self, action: PmAction) {
        self.select_pin_state_locked(&self.state.lock(), action)
    }

    /// Run the clock disable table and gate the clocks.
    pub fn disable_clk(&self) -> Result<(), ErrorCode> {
        self.disable_clk_locked(&mut self.state.lock())
    }

    /// Ungate the clocks and run the clock enable table.
    pub fn enable_clk(&self) -> Result<(), ErrorCode> {
        self.enable_clk_locked(&mut self.state.lock())
    }

    /// Inspect the runtime state under the device lock.
    pub fn with_state<R, F: FnOnce(&DeviceRuntimeState<'a>) -> R>(&self, f: F) -> R {
        let st = self.state.lock();
        f(&*st)
    }

    /// How many restores found the context lost.
    pub fn context_loss_count(&self) -> u32 {
        self.with_state(|st| st.context_loss_cnt)
    }

    /// The current power state.
    pub fn power_state(&self) -> PowerState {
        self.with_state(|st| st.state)
    }

    pub(crate) fn interpreter(&self) -> TableInterpreter<'a> {
        TableInterpreter::new(self.regs, self.timer, self.driver.timeout_policy)
    }

    /// Take the IRQ sub-lock from the device's interrupt handler.
    ///
    /// When the driver sets [`PmFlags::irq_sublock`](crate::PmFlags), the
    /// engine holds this lock while it masks or unmasks the device's
    /// interrupts, and around the suspend and resume callbacks if
    /// `callback_in_irq_lock` is also set. The interrupt handler must hold it
    /// while touching the device so it never runs inside that window.
    ///
    /// Only the sub-lock is taken, never the device lock, so the handler may
    /// run while a PM transition is in progress.
    pub fn lock_irq(&self) -> SpinMutexGuard<'_, ()> {
        self.irq_mutex().lock()
    }

    /// Like [`lock_irq`](UniversalDevice::lock_irq), but gives up instead of
    /// spinning when the engine holds the sub-lock.
    pub fn try_lock_irq(&self) -> Option<SpinMutexGuard<'_, ()>> {
        self.irq_mutex().try_lock()
    }

    fn irq_mutex(&self) -> &SpinMutex<()> {
        self.irq_lock.unwrap_or(&self.own_irq_lock)
    }

    /// Take the IRQ sub-lock if the device asks for one.
    pub(crate) fn irq_sublock(&self) -> Option<SpinMutexGuard<'_, ()>> {
        if self.driver.flags.irq_sublock {
            Some(self.lock_irq())
        } else {
            None
        }
    }

    pub(crate) fn now(&self) -> Option<u32> {
        self.timer.map(|timer| timer.now())
    }

    /// Report a failed device callback as [`ErrorCode::CallbackFailed`].
    pub(crate) fn callback(
        &self,
        stage: PmStage,
        result: Result<(), ErrorCode>,
    ) -> Result<(), ErrorCode> {
        result.map_err(|err| {
            log::warn!("{}: {:?} callback failed: {:?}", self.name, stage, err);
            ErrorCode::CallbackFailed { stage }
        })
    }
}

impl core::fmt::Debug for UniversalDevice<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UniversalDevice")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("driver", &self.driver.name)
            .finish()
    }
}
