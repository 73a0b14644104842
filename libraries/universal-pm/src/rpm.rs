// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Runtime PM.
//!
//! Suspend runs, under the device lock:
//!
//! 1. save the context,
//! 2. pause busy DMA channels,
//! 3. mask interrupts (inside the IRQ sub-lock if requested), bailing out
//!    with `Busy` when one is pending,
//! 4. select the suspend pins,
//! 5. the driver's suspend callback, inside or outside the sub-lock,
//! 6. configure wake-up sources,
//! 7. gate the clocks.
//!
//! Resume mirrors it: restore, ungate clocks, resume pins, unmask interrupts,
//! the driver's resume callback, then resume DMA. The very first resume of a
//! device has no saved context to restore and only runs the driver's
//! `first_resume` callback.
//!
//! The first error stops the sequence. Only `Busy` is unwound, because it is
//! the one error the caller is expected to retry.

use log::{debug, warn};

use crate::device::{DeviceRuntimeState, PowerState, UniversalDevice};
use crate::error_codes::{ErrorCode, PmStage};
use crate::hil::PmAction;

impl<'a> UniversalDevice<'a> {
    /// Put the device into runtime suspend.
    ///
    /// Does nothing if the device is not active. Returns
    /// [`ErrorCode::Busy`] if an interrupt was pending; the device is then
    /// left active and the call should be retried later.
    pub fn runtime_suspend(&self) -> Result<(), ErrorCode> {
        self.runtime_suspend_locked(&mut self.state.lock(), PmAction::Suspend)
    }

    /// Bring the device back from runtime suspend.
    pub fn runtime_resume(&self) -> Result<(), ErrorCode> {
        self.runtime_resume_locked(&mut self.state.lock())
    }

    /// Record device activity, postponing the next autosuspend.
    pub fn mark_last_busy(&self) {
        let now = self.now();
        self.state.lock().last_busy = now;
    }

    /// Suspend the device if it has been idle for the driver's autosuspend
    /// delay.
    ///
    /// Returns [`ErrorCode::Busy`] while the delay has not elapsed.
    pub fn autosuspend(&self) -> Result<(), ErrorCode> {
        let mut st = self.state.lock();

        if let (Some(delay), Some(timer), Some(last)) =
            (self.driver.autosuspend_delay_ms, self.timer, st.last_busy)
        {
            if timer.now().wrapping_sub(last) < timer.ticks_from_ms(delay) {
                return Err(ErrorCode::Busy);
            }
        }
        self.runtime_suspend_locked(&mut st, PmAction::Autosuspend)
    }

    pub(crate) fn runtime_suspend_locked(
        &self,
        st: &mut DeviceRuntimeState<'a>,
        action: PmAction,
    ) -> Result<(), ErrorCode> {
        if st.state != PowerState::Active {
            return Ok(());
        }

        let mut paused = 0;
        match self.suspend_sequence(st, action, &mut paused) {
            Ok(()) => {
                st.state = PowerState::RuntimeSuspended;
                debug!("{}: runtime suspended", self.name());
                Ok(())
            }
            Err(ErrorCode::Busy) => {
                self.abort_suspend(st, paused);
                Err(ErrorCode::Busy)
            }
            Err(err) => {
                warn!("{}: runtime suspend failed: {:?}", self.name(), err);
                Err(err)
            }
        }
    }

    pub(crate) fn runtime_resume_locked(
        &self,
        st: &mut DeviceRuntimeState<'a>,
    ) -> Result<(), ErrorCode> {
        if !st.first_resume_done {
            self.callback(
                PmStage::FirstResume,
                self.ops.first_resume(self.regs, &mut st.ctx),
            )?;
            st.first_resume_done = true;
            st.state = PowerState::Active;
            return Ok(());
        }
        if st.state == PowerState::Active {
            return Ok(());
        }

        match self.resume_sequence(st) {
            Ok(()) => {
                st.state = PowerState::Active;
                debug!("{}: runtime resumed", self.name());
                Ok(())
            }
            Err(err) => {
                warn!("{}: runtime resume failed: {:?}", self.name(), err);
                Err(err)
            }
        }
    }

    fn suspend_sequence(
        &self,
        st: &mut DeviceRuntimeState<'a>,
        action: PmAction,
        paused: &mut u32,
    ) -> Result<(), ErrorCode> {
        let flags = &self.driver.flags;

        self.save_locked(st)?;
        *paused = self.pause_dma_locked(st);

        {
            let _irq = self.irq_sublock();
            self.disable_irq_locked(st)?;
            self.select_pin_state_locked(st, action);
            if flags.callback_in_irq_lock {
                self.callback(
                    PmStage::RuntimeSuspend,
                    self.ops.runtime_suspend(self.regs, &mut st.ctx),
                )?;
            }
        }
        if !flags.callback_in_irq_lock {
            self.callback(
                PmStage::RuntimeSuspend,
                self.ops.runtime_suspend(self.regs, &mut st.ctx),
            )?;
        }

        // Wake-up sources need the clocks still running.
        self.interpreter()
            .process(&mut st.ctx, self.driver.tables.wakeup)?;
        self.disable_clk_locked(st)
    }

    fn resume_sequence(&self, st: &mut DeviceRuntimeState<'a>) -> Result<(), ErrorCode> {
        let flags = &self.driver.flags;

        self.restore_locked(st)?;
        self.enable_clk_locked(st)?;
        self.select_pin_state_locked(st, PmAction::Resume);

        {
            let _irq = self.irq_sublock();
            self.enable_irq_locked(st)?;
            if flags.callback_in_irq_lock {
                self.callback(
                    PmStage::RuntimeResume,
                    self.ops.runtime_resume(self.regs, &mut st.ctx),
                )?;
            }
        }
        if !flags.callback_in_irq_lock {
            self.callback(
                PmStage::RuntimeResume,
                self.ops.runtime_resume(self.regs, &mut st.ctx),
            )?;
        }

        let paused = st.dma_paused;
        self.resume_dma_locked(st, paused);
        Ok(())
    }

    /// Undo a suspend that stopped on a pending interrupt, leaving the device
    /// active.
    fn abort_suspend(&self, st: &mut DeviceRuntimeState<'a>, paused: u32) {
        debug!("{}: interrupt pending, suspend deferred", self.name());
        {
            let _irq = self.irq_sublock();
            if let Err(err) = self.enable_irq_locked(st) {
                warn!("{}: cannot unmask interrupts: {:?}", self.name(), err);
            }
        }
        self.resume_dma_locked(st, paused);
        st.last_busy = self.now();
    }
}
