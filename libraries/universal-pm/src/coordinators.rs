// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Pin, clock and DMA coordination.
//!
//! Clock gating is asymmetric. On the way down the register table quiesces
//! the device before the clocks stop; on the way up the clocks run before any
//! register write that depends on them.

use log::warn;

use crate::device::{DeviceRuntimeState, UniversalDevice, MAX_DMA_CHANNELS};
use crate::error_codes::ErrorCode;
use crate::hil::PmAction;

impl<'a> UniversalDevice<'a> {
    /// Failures are logged and otherwise ignored: a device whose pins could
    /// not be switched still suspends and resumes.
    pub(crate) fn select_pin_state_locked(&self, st: &DeviceRuntimeState<'a>, action: PmAction) {
        let Some(pins) = self.pins else {
            return;
        };

        match self.driver.pin_map.get(action).resolve(&st.ctx) {
            Ok(Some(state)) => {
                if pins.select_state(state).is_err() {
                    warn!("{}: failed to select {:?} pins", self.name(), state);
                }
            }
            Ok(None) => {}
            Err(err) => warn!(
                "{}: no pin state for {:?}: {:?}",
                self.name(),
                action,
                err
            ),
        }
    }

    pub(crate) fn disable_clk_locked(
        &self,
        st: &mut DeviceRuntimeState<'a>,
    ) -> Result<(), ErrorCode> {
        self.interpreter()
            .process(&mut st.ctx, self.driver.tables.clk_disable)?;
        for clock in self.clocks {
            if clock.is_enabled() {
                clock.disable();
            }
        }
        Ok(())
    }

    pub(crate) fn enable_clk_locked(
        &self,
        st: &mut DeviceRuntimeState<'a>,
    ) -> Result<(), ErrorCode> {
        for clock in self.clocks {
            if !clock.is_enabled() {
                clock.enable();
            }
        }
        self.interpreter()
            .process(&mut st.ctx, self.driver.tables.clk_enable)
    }

    /// Pause every busy channel that is not paused yet.
    ///
    /// Returns the channels paused by this call.
    pub(crate) fn pause_dma_locked(&self, st: &mut DeviceRuntimeState<'a>) -> u32 {
        if !self.driver.flags.dma {
            return 0;
        }

        let mut paused = 0;
        for (n, channel) in self.dma.iter().enumerate().take(MAX_DMA_CHANNELS) {
            let bit = 1u32 << n;
            if st.dma_paused & bit == 0 && channel.is_active() {
                channel.pause();
                paused |= bit;
            }
        }
        st.dma_paused |= paused;
        paused
    }

    /// Resume the paused channels selected by `mask`.
    pub(crate) fn resume_dma_locked(&self, st: &mut DeviceRuntimeState<'a>, mask: u32) {
        for (n, channel) in self.dma.iter().enumerate().take(MAX_DMA_CHANNELS) {
            let bit = 1u32 << n;
            if st.dma_paused & mask & bit != 0 {
                channel.resume();
                st.dma_paused &= !bit;
            }
        }
    }
}
