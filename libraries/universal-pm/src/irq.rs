// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Interrupt masking around suspend.
//!
//! Disabling interrupts races with the device's interrupt handler: an
//! interrupt may already be latched when the mask is written. When the driver
//! provides a pending check, the status register is consulted after masking
//! and the suspend is refused with `Busy` if an interrupt is in flight.

use log::debug;

use crate::device::{DeviceRuntimeState, UniversalDevice};
use crate::error_codes::ErrorCode;

impl<'a> UniversalDevice<'a> {
    pub(crate) fn disable_irq_locked(
        &self,
        st: &mut DeviceRuntimeState<'a>,
    ) -> Result<(), ErrorCode> {
        let table = self.driver.tables.irq_disable;
        if table.is_empty() {
            return Ok(());
        }

        let interp = self.interpreter();
        let masked = interp.process(&mut st.ctx, table);

        if let Some(check) = self.driver.irq_pending {
            // A pending interrupt wins over any failure of the table.
            match interp.read(check.offset) {
                Ok(status) if check.is_pending(status) => {
                    debug!("{}: interrupt pending ({:#x})", self.name(), status);
                    return Err(ErrorCode::Busy);
                }
                Ok(_) => {}
                Err(err) => return masked.and(Err(err)),
            }
        }
        masked
    }

    pub(crate) fn enable_irq_locked(
        &self,
        st: &mut DeviceRuntimeState<'a>,
    ) -> Result<(), ErrorCode> {
        self.interpreter()
            .process(&mut st.ctx, self.driver.tables.irq_enable)
    }
}
