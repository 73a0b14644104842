// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! System sleep.
//!
//! A device that is runtime suspended is brought back to full power before
//! its system suspend callback runs. What happens next depends on the driver:
//!
//!  * Minimal: only the callbacks run. If runtime PM is enabled the device
//!    then drops back into runtime suspend, and on resume it is woken through
//!    the runtime resume path.
//!  * Context aware (`PmFlags::system_context`): the context is saved, the
//!    pins put to sleep and the clocks gated, and resume undoes exactly that.

use log::debug;

use crate::device::{PowerState, UniversalDevice};
use crate::error_codes::{ErrorCode, PmStage};
use crate::hil::PmAction;

impl UniversalDevice<'_> {
    /// Prepare the device for system sleep.
    pub fn suspend(&self) -> Result<(), ErrorCode> {
        let mut st = self.state.lock();
        if st.state == PowerState::SystemSuspended {
            return Ok(());
        }
        if st.state == PowerState::RuntimeSuspended {
            self.runtime_resume_locked(&mut st)?;
        }

        self.callback(PmStage::Suspend, self.ops.suspend(self.regs, &mut st.ctx))?;

        if self.driver.flags.system_context {
            self.save_locked(&mut st)?;
            self.select_pin_state_locked(&st, PmAction::Suspend);
            self.disable_clk_locked(&mut st)?;
            st.state = PowerState::SystemSuspended;
        } else if self.driver.flags.runtime_pm {
            self.runtime_suspend_locked(&mut st, PmAction::Suspend)?;
        }
        debug!("{}: suspended ({:?})", self.name(), st.state);
        Ok(())
    }

    /// Bring the device back after system sleep.
    pub fn resume(&self) -> Result<(), ErrorCode> {
        let mut st = self.state.lock();
        match st.state {
            PowerState::SystemSuspended => {
                self.enable_clk_locked(&mut st)?;
                self.restore_locked(&mut st)?;
                self.select_pin_state_locked(&st, PmAction::Resume);
                st.state = PowerState::Active;
            }
            PowerState::RuntimeSuspended => self.runtime_resume_locked(&mut st)?,
            PowerState::Active => {}
        }

        self.callback(PmStage::Resume, self.ops.resume(self.regs, &mut st.ctx))?;
        st.last_busy = self.now();
        debug!("{}: resumed", self.name());
        Ok(())
    }
}
