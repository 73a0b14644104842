// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Context save and restore with context loss detection.

use log::debug;

use crate::device::{DeviceRuntimeState, UniversalDevice};
use crate::error_codes::{ErrorCode, PmStage};

impl<'a> UniversalDevice<'a> {
    pub(crate) fn save_locked(&self, st: &mut DeviceRuntimeState<'a>) -> Result<(), ErrorCode> {
        if self.driver.flags.save_once && st.context_saved {
            return Ok(());
        }
        self.interpreter()
            .process(&mut st.ctx, self.driver.tables.save)?;
        st.context_saved = true;
        Ok(())
    }

    /// Restore the saved context.
    ///
    /// With context loss checking enabled the live registers are compared
    /// with the context first. If they still match, the device kept its state
    /// and nothing is written.
    pub(crate) fn restore_locked(&self, st: &mut DeviceRuntimeState<'a>) -> Result<(), ErrorCode> {
        let tables = &self.driver.tables;

        if self.driver.flags.check_context_loss {
            if !self.interpreter().compare(&st.ctx, tables.context_check)? {
                return Ok(());
            }
            st.context_loss_cnt = st.context_loss_cnt.saturating_add(1);
            debug!(
                "{}: context lost ({} times), restoring",
                self.name(),
                st.context_loss_cnt
            );
        }

        self.interpreter().process(&mut st.ctx, tables.restore)?;
        self.callback(PmStage::Restore, self.ops.restore(self.regs, &mut st.ctx))
    }
}
