// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Compile-time configuration options for the PM engine.
//!
//! Boolean options are taken from Cargo features, but they are exposed as
//! fields of a `const` object so every code path is still type-checked when
//! the option is off. The compiler folds the constant and drops the dead
//! branch.
//!
//! Run-time, per device type configuration lives in
//! [`UniversalDriver`](crate::UniversalDriver) instead.

/// Data structure holding compile-time configuration options.
pub(crate) struct Config {
    /// Whether every register table step should be traced.
    ///
    /// If enabled, the interpreter emits a `trace!` record for each entry it
    /// executes, including the register offset and the value moved. This is
    /// very noisy and is meant for bringing up a new device description.
    pub(crate) trace_register_tables: bool,

    /// Whether context loss detection should log the mismatching register.
    ///
    /// If enabled, a detected context loss logs the first register whose live
    /// value differed from the saved context, together with both values.
    pub(crate) debug_context_loss: bool,
}

/// The unique instance of `Config`. This is the only place in the crate where
/// Cargo features are consulted.
pub(crate) const CONFIG: Config = Config {
    trace_register_tables: cfg!(feature = "trace_register_tables"),
    debug_context_loss: cfg!(feature = "debug_context_loss"),
};
