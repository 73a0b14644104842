// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Interfaces to the collaborators the PM engine drives but does not own.
//!
//! Clock and DMA channel acquisition, pin multiplexing and timekeeping all
//! belong to the platform. The engine only calls the operations below, in a
//! fixed order relative to its register tables.

/// Generic operations that clock-like things are expected to support.
pub trait ClockInterface {
    /// Whether the clock is currently running.
    fn is_enabled(&self) -> bool;
    /// Ungate the clock.
    fn enable(&self);
    /// Gate the clock.
    fn disable(&self);
}

/// Helper struct for devices that expect clocks, but have no clock control.
pub struct NoClockControl {}

impl ClockInterface for NoClockControl {
    fn is_enabled(&self) -> bool {
        true
    }
    fn enable(&self) {}
    fn disable(&self) {}
}

/// A DMA channel owned by a device.
///
/// Channels are paused, never terminated, across a suspend so that in-flight
/// transfers continue once the device resumes.
pub trait DmaChannel {
    /// Whether the channel has outstanding work.
    fn is_active(&self) -> bool;

    /// Pause the channel, keeping its descriptors.
    fn pause(&self);

    /// Resume a previously paused channel.
    fn resume(&self);
}

/// Symbolic pin states a pin controller knows how to apply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PinState {
    /// Normal operation.
    Default,
    /// Lowest power, the device is suspended.
    Sleep,
    /// The device is idle but may be woken quickly.
    Idle,
}

/// The PM actions that can trigger a pin state change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PmAction {
    /// Runtime or system suspend.
    Suspend,
    /// Runtime or system resume.
    Resume,
    /// The device went idle without suspending.
    Idle,
    /// Suspend after the autosuspend delay expired.
    Autosuspend,
}

/// Pin multiplexing controller.
pub trait PinControl {
    /// Apply `state` to the pins of the device.
    ///
    /// Failures are reported but the PM engine treats pin selection as best
    /// effort and never aborts a transition because of it.
    fn select_state(&self, state: PinState) -> Result<(), ()>;
}

/// A free running, wrapping counter.
pub trait Time {
    /// Returns the current time in hardware clock units.
    fn now(&self) -> u32;

    /// Returns the frequency of the counter in Hz.
    fn frequency(&self) -> u32;

    /// Convert microseconds into counter ticks, saturating at `u32::MAX`.
    fn ticks_from_us(&self, us: u32) -> u32 {
        let ticks = (us as u64 * self.frequency() as u64) / 1_000_000;
        if ticks > u32::MAX as u64 {
            u32::MAX
        } else {
            ticks as u32
        }
    }

    /// Convert milliseconds into counter ticks, saturating at `u32::MAX`.
    fn ticks_from_ms(&self, ms: u32) -> u32 {
        let ticks = (ms as u64 * self.frequency() as u64) / 1_000;
        if ticks > u32::MAX as u64 {
            u32::MAX
        } else {
            ticks as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Khz32;

    impl Time for Khz32 {
        fn now(&self) -> u32 {
            0
        }

        fn frequency(&self) -> u32 {
            32768
        }
    }

    #[test]
    fn tick_conversion() {
        let t = Khz32;
        assert_eq!(t.ticks_from_ms(1000), 32768);
        assert_eq!(t.ticks_from_us(1_000_000), 32768);
        assert_eq!(t.ticks_from_us(10), 0);
        assert_eq!(t.ticks_from_ms(u32::MAX), u32::MAX);
    }

    #[test]
    fn no_clock_control_is_always_on() {
        let clock = NoClockControl {};
        clock.disable();
        assert!(clock.is_enabled());
    }
}
