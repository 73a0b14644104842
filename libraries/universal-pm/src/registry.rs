// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Lookup of bound devices for the PM framework.
//!
//! The framework only knows device ids. The registry maps an id to the
//! [`UniversalDevice`] bound to it and forwards the PM entry points. A device
//! that was never registered has no universal PM description, so requests
//! for it are logged and succeed without doing anything.
//!
//! The registry has a fixed number of slots and never allocates. Boards
//! create one and register devices as they are probed:
//!
//! ```rust,ignore
//! let registry: DeviceRegistry<'_, '_, 4> = DeviceRegistry::new();
//! registry.register(&uart_pm)?;
//! registry.register(&mmc_pm)?;
//! ```

use core::cell::Cell;

use log::error;

use crate::device::{DeviceId, UniversalDevice};
use crate::error_codes::{ConfigError, ErrorCode};

/// Up to `N` devices, addressed by [`DeviceId`].
pub struct DeviceRegistry<'r, 'a, const N: usize> {
    slots: [Cell<Option<&'r UniversalDevice<'a>>>; N],
}

impl<'r, 'a, const N: usize> DeviceRegistry<'r, 'a, N> {
    /// An empty registry.
    pub fn new() -> DeviceRegistry<'r, 'a, N> {
        DeviceRegistry {
            slots: core::array::from_fn(|_| Cell::new(None)),
        }
    }

    /// Add `device` in the first free slot.
    pub fn register(&self, device: &'r UniversalDevice<'a>) -> Result<(), ErrorCode> {
        let slot = self
            .slots
            .iter()
            .find(|slot| slot.get().is_none())
            .ok_or(ConfigError::RegistryFull)?;
        slot.set(Some(device));
        Ok(())
    }

    /// Remove the device with `id`, returning it if it was registered.
    pub fn unregister(&self, id: DeviceId) -> Option<&'r UniversalDevice<'a>> {
        self.slots
            .iter()
            .find(|slot| slot.get().is_some_and(|dev| dev.id() == id))
            .and_then(|slot| slot.take())
    }

    /// The device registered with `id`.
    pub fn find(&self, id: DeviceId) -> Option<&'r UniversalDevice<'a>> {
        self.devices().find(|dev| dev.id() == id)
    }

    /// The device registered under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&'r UniversalDevice<'a>> {
        self.devices().find(|dev| dev.name() == name)
    }

    /// Registered devices, in registration order.
    pub fn devices(&self) -> impl Iterator<Item = &'r UniversalDevice<'a>> + '_ {
        self.slots.iter().filter_map(|slot| slot.get())
    }

    /// [`UniversalDevice::runtime_suspend`] of the device with `id`.
    pub fn runtime_suspend(&self, id: DeviceId) -> Result<(), ErrorCode> {
        self.with_device(id, |dev| dev.runtime_suspend())
    }

    /// [`UniversalDevice::runtime_resume`] of the device with `id`.
    pub fn runtime_resume(&self, id: DeviceId) -> Result<(), ErrorCode> {
        self.with_device(id, |dev| dev.runtime_resume())
    }

    /// [`UniversalDevice::suspend`] of the device with `id`.
    pub fn suspend(&self, id: DeviceId) -> Result<(), ErrorCode> {
        self.with_device(id, |dev| dev.suspend())
    }

    /// [`UniversalDevice::resume`] of the device with `id`.
    pub fn resume(&self, id: DeviceId) -> Result<(), ErrorCode> {
        self.with_device(id, |dev| dev.resume())
    }

    /// System suspend of every device, in registration order.
    ///
    /// Stops at the first failure. Devices suspended before it are left
    /// suspended; the framework is expected to resume them.
    pub fn suspend_all(&self) -> Result<(), ErrorCode> {
        self.devices().try_for_each(|dev| dev.suspend())
    }

    /// System resume of every device, in reverse registration order.
    ///
    /// Every device is resumed even if an earlier one fails; the first
    /// failure is returned.
    pub fn resume_all(&self) -> Result<(), ErrorCode> {
        let mut result = Ok(());
        for slot in self.slots.iter().rev() {
            if let Some(dev) = slot.get() {
                if let Err(err) = dev.resume() {
                    error!("{}: resume failed: {:?}", dev.name(), err);
                    result = result.and(Err(err));
                }
            }
        }
        result
    }

    fn with_device<F>(&self, id: DeviceId, f: F) -> Result<(), ErrorCode>
    where
        F: FnOnce(&'r UniversalDevice<'a>) -> Result<(), ErrorCode>,
    {
        match self.find(id) {
            Some(dev) => f(dev),
            None => {
                error!("no universal PM device with id {}", id.0);
                Ok(())
            }
        }
    }
}

impl<const N: usize> Default for DeviceRegistry<'_, '_, N> {
    fn default() -> Self {
        DeviceRegistry::new()
    }
}
