// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Register table entries.
//!
//! A register table is a plain `&[RegEntry]`, executed front to back by the
//! [`interpreter`](crate::interpreter). Entries are `Copy` and built with
//! `const fn` constructors so vendors can declare tables as `static` arrays
//! shared by every device of a type:
//!
//! ```rust
//! use universal_pm::table::{BitOp, RegEntry};
//!
//! static SAVE: [RegEntry; 3] = [
//!     RegEntry::read(0x00, 0),
//!     RegEntry::read(0x04, 1),
//!     RegEntry::flush_read(0x08),
//! ];
//!
//! static RESTORE: [RegEntry; 2] = [
//!     RegEntry::write(0x00, 0),
//!     RegEntry::rmw(0x04, 1, BitOp::Or).with_poll(0x1, 0x1, 100),
//! ];
//! ```

use crate::error_codes::{ConfigError, TableKind};

/// Bitwise combinator used by read-modify-write and augmented writes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BitOp {
    /// `a | b`
    Or,
    /// `a & b`
    And,
}

impl BitOp {
    /// Combine `a` and `b`.
    pub const fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            BitOp::Or => a | b,
            BitOp::And => a & b,
        }
    }

    /// The value `v` for which `apply(a, v) == a`.
    pub const fn identity(self) -> u32 {
        match self {
            BitOp::Or => 0,
            BitOp::And => u32::MAX,
        }
    }
}

/// The operation performed by a single table entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RegOp {
    /// Read the register into the context slot.
    Read,
    /// Read the register and drop the value. Forces completion of earlier
    /// posted writes without touching the context.
    FlushRead,
    /// Write the context slot to the register.
    Write,
    /// Write the context slot, then issue a flushing read.
    WriteThenRead,
    /// Read the register, combine it with the context slot and write back.
    ReadModifyWrite(BitOp),
    /// Combine the context slot with the entry's [`Augment`] and write.
    WriteAugmented(BitOp),
}

impl RegOp {
    /// Whether this operation writes the register.
    pub const fn writes(self) -> bool {
        !matches!(self, RegOp::Read | RegOp::FlushRead)
    }
}

/// The second operand of an augmented write.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Augment {
    /// No operand. Only valid on entries that are not augmented writes.
    None,
    /// A constant.
    Static(u32),
    /// `ctx[left] op ctx[right]`.
    Combine {
        /// Left context slot.
        left: usize,
        /// How the two slots are combined.
        op: BitOp,
        /// Right context slot.
        right: usize,
    },
}

/// Wait for a register to settle after a write.
///
/// The register is re-read until `value & mask == expected` or `timeout_us`
/// microseconds have passed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Poll {
    /// Bits of the register that are compared.
    pub mask: u32,
    /// Value the masked bits must reach.
    pub expected: u32,
    /// Deadline, measured from the write.
    pub timeout_us: u32,
}

/// One step of a register table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegEntry {
    /// What the step does.
    pub op: RegOp,
    /// Byte offset of the register.
    pub offset: u32,
    /// Context slot used as source or sink. Ignored by `FlushRead`.
    pub ctx_index: usize,
    /// Second operand of a `WriteAugmented` entry.
    pub augment: Augment,
    /// Settle condition checked after a writing step.
    pub poll: Option<Poll>,
}

impl RegEntry {
    /// An entry with no augment and no poll.
    pub const fn new(op: RegOp, offset: u32, ctx_index: usize) -> RegEntry {
        RegEntry {
            op,
            offset,
            ctx_index,
            augment: Augment::None,
            poll: None,
        }
    }

    /// Read `offset` into slot `ctx_index`.
    pub const fn read(offset: u32, ctx_index: usize) -> RegEntry {
        RegEntry::new(RegOp::Read, offset, ctx_index)
    }

    /// Read `offset` and drop the value.
    pub const fn flush_read(offset: u32) -> RegEntry {
        RegEntry::new(RegOp::FlushRead, offset, 0)
    }

    /// Write slot `ctx_index` to `offset`.
    pub const fn write(offset: u32, ctx_index: usize) -> RegEntry {
        RegEntry::new(RegOp::Write, offset, ctx_index)
    }

    /// Write slot `ctx_index` to `offset`, then read it back.
    pub const fn write_then_read(offset: u32, ctx_index: usize) -> RegEntry {
        RegEntry::new(RegOp::WriteThenRead, offset, ctx_index)
    }

    /// Read `offset`, `op` it with slot `ctx_index`, write the result.
    pub const fn rmw(offset: u32, ctx_index: usize, op: BitOp) -> RegEntry {
        RegEntry::new(RegOp::ReadModifyWrite(op), offset, ctx_index)
    }

    /// Write slot `ctx_index` combined with `augment` to `offset`.
    pub const fn write_augmented(
        offset: u32,
        ctx_index: usize,
        op: BitOp,
        augment: Augment,
    ) -> RegEntry {
        RegEntry {
            op: RegOp::WriteAugmented(op),
            offset,
            ctx_index,
            augment,
            poll: None,
        }
    }

    /// Poll the register after the write until `value & mask == expected`.
    pub const fn with_poll(mut self, mask: u32, expected: u32, timeout_us: u32) -> RegEntry {
        self.poll = Some(Poll {
            mask,
            expected,
            timeout_us,
        });
        self
    }

    /// Poll until the register reads back exactly `expected`.
    pub const fn with_timeout(self, expected: u32, timeout_us: u32) -> RegEntry {
        self.with_poll(u32::MAX, expected, timeout_us)
    }

    /// Check that the entry is self consistent and only references slots of a
    /// context with `ctx_len` values.
    pub fn validate(&self, kind: TableKind, ctx_len: usize) -> Result<(), ConfigError> {
        if self.op != RegOp::FlushRead && self.ctx_index >= ctx_len {
            return Err(ConfigError::IndexOutOfRange {
                index: self.ctx_index,
            });
        }

        match (self.op, self.augment) {
            (RegOp::WriteAugmented(_), Augment::None) => {
                return Err(ConfigError::InvalidEntry(kind));
            }
            (RegOp::WriteAugmented(_), Augment::Combine { left, right, .. }) => {
                if left >= ctx_len {
                    return Err(ConfigError::IndexOutOfRange { index: left });
                }
                if right >= ctx_len {
                    return Err(ConfigError::IndexOutOfRange { index: right });
                }
            }
            (RegOp::WriteAugmented(_), Augment::Static(_)) => {}
            (_, Augment::None) => {}
            _ => return Err(ConfigError::InvalidEntry(kind)),
        }

        if self.poll.is_some() && !self.op.writes() {
            return Err(ConfigError::InvalidEntry(kind));
        }
        Ok(())
    }
}

/// Validate every entry of `table`.
pub fn validate_table(
    table: &[RegEntry],
    kind: TableKind,
    ctx_len: usize,
) -> Result<(), ConfigError> {
    table
        .iter()
        .try_for_each(|entry| entry.validate(kind, ctx_len))
}

/// Whether any entry of `table` polls and therefore needs a timer.
pub fn table_polls(table: &[RegEntry]) -> bool {
    table.iter().any(|entry| entry.poll.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_ops() {
        assert_eq!(BitOp::Or.apply(0x02, 0x11), 0x13);
        assert_eq!(BitOp::And.apply(0xf3, 0x1f), 0x13);
    }

    #[test]
    fn constructors() {
        let e = RegEntry::rmw(0x20, 3, BitOp::And).with_timeout(0x7, 50);
        assert_eq!(e.op, RegOp::ReadModifyWrite(BitOp::And));
        assert_eq!(e.offset, 0x20);
        assert_eq!(e.ctx_index, 3);
        assert_eq!(
            e.poll,
            Some(Poll {
                mask: u32::MAX,
                expected: 0x7,
                timeout_us: 50
            })
        );
        assert!(e.op.writes());
        assert!(!RegEntry::flush_read(0).op.writes());
    }

    #[test]
    fn index_validation() {
        assert_eq!(
            RegEntry::read(0, 2).validate(TableKind::Save, 2),
            Err(ConfigError::IndexOutOfRange { index: 2 })
        );
        assert_eq!(RegEntry::read(0, 1).validate(TableKind::Save, 2), Ok(()));
        // Flushing reads have no context slot.
        assert_eq!(
            RegEntry::flush_read(0).validate(TableKind::Save, 0),
            Ok(())
        );

        let aug = RegEntry::write_augmented(
            0,
            0,
            BitOp::Or,
            Augment::Combine {
                left: 1,
                op: BitOp::Or,
                right: 4,
            },
        );
        assert_eq!(
            aug.validate(TableKind::Restore, 3),
            Err(ConfigError::IndexOutOfRange { index: 4 })
        );
    }

    #[test]
    fn shape_validation() {
        let no_augment = RegEntry::new(RegOp::WriteAugmented(BitOp::Or), 0, 0);
        assert_eq!(
            no_augment.validate(TableKind::Restore, 1),
            Err(ConfigError::InvalidEntry(TableKind::Restore))
        );

        let mut stray = RegEntry::write(0, 0);
        stray.augment = Augment::Static(1);
        assert_eq!(
            stray.validate(TableKind::Restore, 1),
            Err(ConfigError::InvalidEntry(TableKind::Restore))
        );

        let polled_read = RegEntry::read(0, 0).with_timeout(1, 10);
        assert_eq!(
            polled_read.validate(TableKind::Save, 1),
            Err(ConfigError::InvalidEntry(TableKind::Save))
        );

        let table = [RegEntry::write(0, 0), RegEntry::write(4, 0).with_timeout(0, 1)];
        assert_eq!(validate_table(&table, TableKind::Restore, 1), Ok(()));
        assert!(table_polls(&table));
        assert!(!table_polls(&table[..1]));
    }
}
