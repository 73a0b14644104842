// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Per-device register context.
//!
//! The context is a fixed length array of `u32` slots that register tables
//! read into and write from. Its length `N` is set once, when the context is
//! populated from the driver's template, and never changes afterwards.
//!
//! The backing storage is handed in by the board so that the engine never
//! allocates. The template is copied, so every device instance mutates its
//! own slots while the template stays untouched.

use crate::error_codes::{ConfigError, ErrorCode};

/// The saved register values of one device instance.
pub struct RegisterContext<'a> {
    storage: &'a mut [u32],
    len: usize,
    populated: bool,
}

impl<'a> RegisterContext<'a> {
    /// Create an empty context backed by `storage`.
    pub fn new(storage: &'a mut [u32]) -> RegisterContext<'a> {
        RegisterContext {
            storage,
            len: 0,
            populated: false,
        }
    }

    /// Copy `template` into the context, fixing its length.
    ///
    /// This can only happen once for the lifetime of the context.
    pub fn populate(&mut self, template: &[u32]) -> Result<(), ErrorCode> {
        if self.populated {
            return Err(ConfigError::ContextExists.into());
        }
        let slots = self
            .storage
            .get_mut(..template.len())
            .ok_or(ConfigError::ContextStorage)?;
        slots.copy_from_slice(template);
        self.len = template.len();
        self.populated = true;
        Ok(())
    }

    /// Whether [`populate`](RegisterContext::populate) has succeeded.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Number of slots, zero until populated.
    pub fn len(&self) -> usize {
        self.len
    }

    /// The live context slots.
    pub fn values(&self) -> &[u32] {
        &self.storage[..self.len]
    }

    /// Read slot `index`.
    ///
    /// Tables are validated against the context length when the context is
    /// created, so an out of range index here means the device description
    /// was never validated. It is reported as a configuration error.
    pub fn get(&self, index: usize) -> Result<u32, ErrorCode> {
        self.values()
            .get(index)
            .copied()
            .ok_or(ErrorCode::ConfigurationError(ConfigError::IndexOutOfRange {
                index,
            }))
    }

    /// Overwrite slot `index`.
    pub fn set(&mut self, index: usize, value: u32) -> Result<(), ErrorCode> {
        let len = self.len;
        match self.storage[..len].get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ConfigError::IndexOutOfRange { index }.into()),
        }
    }
}

impl core::fmt::Debug for RegisterContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterContext")
            .field("values", &self.values())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populate_copies_template() {
        let template = [1, 2, 3];
        let mut storage = [0u32; 3];
        let mut ctx = RegisterContext::new(&mut storage);
        ctx.populate(&template).unwrap();

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.values(), &template);

        ctx.set(1, 0x20).unwrap();
        assert_eq!(ctx.values(), &[1, 0x20, 3]);
        assert_eq!(template, [1, 2, 3]);
    }

    #[test]
    fn storage_larger_than_template() {
        let mut storage = [0xffu32; 8];
        let mut ctx = RegisterContext::new(&mut storage);
        ctx.populate(&[7, 8]).unwrap();
        assert_eq!(ctx.values(), &[7, 8]);
        assert_eq!(
            ctx.get(2),
            Err(ErrorCode::ConfigurationError(ConfigError::IndexOutOfRange {
                index: 2
            }))
        );
        assert!(ctx.set(2, 0).is_err());
    }

    #[test]
    fn populate_once() {
        let mut storage = [0u32; 1];
        let mut ctx = RegisterContext::new(&mut storage);
        assert!(!ctx.is_populated());
        ctx.populate(&[5]).unwrap();
        assert_eq!(
            ctx.populate(&[6]),
            Err(ErrorCode::ConfigurationError(ConfigError::ContextExists))
        );
        assert_eq!(ctx.get(0), Ok(5));
    }

    #[test]
    fn template_too_large() {
        let mut storage = [0u32; 1];
        let mut ctx = RegisterContext::new(&mut storage);
        assert_eq!(
            ctx.populate(&[1, 2]),
            Err(ErrorCode::ConfigurationError(ConfigError::ContextStorage))
        );
        assert_eq!(ctx.len(), 0);
    }
}
