// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! The standard error codes used by the PM engine.

/// Standard errors returned by every PM operation.
///
/// `Busy` is the only error a caller is expected to retry: it means a
/// suspend was deferred because an interrupt was in flight. Every other error
/// is terminal for the attempt that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorCode {
    /// The register transport failed while accessing `offset`.
    RegisterAccessFailed {
        /// Byte offset of the register that could not be accessed.
        offset: u32,
    },
    /// An interrupt is pending, the suspend was aborted; retry later.
    Busy,
    /// A polled register did not settle before its deadline.
    Timeout {
        /// Byte offset of the register being polled.
        offset: u32,
    },
    /// The device description is malformed or incomplete.
    ConfigurationError(ConfigError),
    /// A device specific callback reported failure.
    CallbackFailed {
        /// Which callback failed.
        stage: PmStage,
    },
}

/// Reasons a device description is rejected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigError {
    /// A table entry or condition references a context slot past the end of
    /// the register context.
    IndexOutOfRange {
        /// The offending context index.
        index: usize,
    },
    /// A feature flag claims support but the table it needs is empty.
    MissingTable(TableKind),
    /// A table entry combines options that make no sense together, for
    /// example a poll on a read or an augmented write without an augment.
    InvalidEntry(TableKind),
    /// The storage handed to the device cannot hold the context template.
    ContextStorage,
    /// `create_reg_context` was called a second time for the same device.
    ContextExists,
    /// A table polls a register but the device has no timer.
    NoTimer,
    /// The device has more DMA channels than the paused mask can track.
    TooManyChannels,
    /// A pending interrupt check was configured for a device without IRQs.
    PendingCheckWithoutIrq,
    /// The device registry has no free slot.
    RegistryFull,
    /// A condition tree nests deeper than
    /// [`MAX_CONDITION_DEPTH`](crate::condition::MAX_CONDITION_DEPTH), or
    /// refers back to itself.
    ConditionTooDeep,
}

/// The register tables of a device type, used to report which table is
/// broken.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TableKind {
    /// Captures the context before suspend.
    Save,
    /// Re-reads the registers checked for context loss.
    ContextCheck,
    /// Writes the context back after resume.
    Restore,
    /// Masks the device's interrupts.
    IrqDisable,
    /// Unmasks the device's interrupts.
    IrqEnable,
    /// Quiesces the device before its clocks stop.
    ClockDisable,
    /// Reprograms the device once its clocks run again.
    ClockEnable,
    /// Arms the wake-up sources.
    Wakeup,
}

/// The device specific callbacks the orchestrator can invoke.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PmStage {
    /// [`PmCallbacks::first_resume`](crate::PmCallbacks::first_resume).
    FirstResume,
    /// [`PmCallbacks::runtime_suspend`](crate::PmCallbacks::runtime_suspend).
    RuntimeSuspend,
    /// [`PmCallbacks::runtime_resume`](crate::PmCallbacks::runtime_resume).
    RuntimeResume,
    /// [`PmCallbacks::restore`](crate::PmCallbacks::restore).
    Restore,
    /// [`PmCallbacks::suspend`](crate::PmCallbacks::suspend).
    Suspend,
    /// [`PmCallbacks::resume`](crate::PmCallbacks::resume).
    Resume,
}

impl ErrorCode {
    /// Whether the caller should retry the operation later.
    pub fn is_retryable(&self) -> bool {
        *self == ErrorCode::Busy
    }
}

impl From<ConfigError> for ErrorCode {
    fn from(err: ConfigError) -> ErrorCode {
        ErrorCode::ConfigurationError(err)
    }
}

/// Conversion to the negative errno convention used by PM framework
/// callbacks.
impl From<ErrorCode> for isize {
    fn from(err: ErrorCode) -> isize {
        match err {
            ErrorCode::RegisterAccessFailed { .. } => -5, // EIO
            ErrorCode::Busy => -16,                       // EBUSY
            ErrorCode::Timeout { .. } => -110,            // ETIMEDOUT
            ErrorCode::ConfigurationError(_) => -22,      // EINVAL
            ErrorCode::CallbackFailed { .. } => -14,      // EFAULT
        }
    }
}

/// Flatten a PM result into the framework's integer return convention.
pub fn into_errno(result: Result<(), ErrorCode>) -> isize {
    match result {
        Ok(()) => 0,
        Err(e) => isize::from(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_busy_is_retryable() {
        assert!(ErrorCode::Busy.is_retryable());
        assert!(!ErrorCode::Timeout { offset: 4 }.is_retryable());
        assert!(!ErrorCode::RegisterAccessFailed { offset: 0 }.is_retryable());
    }

    #[test]
    fn errno_mapping() {
        assert_eq!(into_errno(Ok(())), 0);
        assert_eq!(into_errno(Err(ErrorCode::Busy)), -16);
        assert_eq!(
            into_errno(Err(ConfigError::IndexOutOfRange { index: 3 }.into())),
            -22
        );
        assert_eq!(
            isize::from(ErrorCode::CallbackFailed {
                stage: PmStage::Restore
            }),
            -14
        );
    }
}
