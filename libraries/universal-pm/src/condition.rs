// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Conditions over the register context and conditional pin selection.
//!
//! Register tables never branch. The only place a device description may
//! make a decision is when choosing the pin state for a PM action, and that
//! decision is expressed as a small immutable expression tree. The tree is
//! built from `&'static` (or otherwise borrowed) nodes so it can live in the
//! driver descriptor next to the tables.
//!
//! ```rust
//! use universal_pm::condition::{Condition, Operand, PinSelect};
//! use universal_pm::hil::PinState;
//!
//! // Use the idle pin state while the mode bits in slot 2 are clear.
//! static MODE_CLEAR: Condition = Condition::BitAnd(Operand::Ctx(2), Operand::Const(0x3));
//! static IDLE_IF_CLEAR: Condition = Condition::Not(&MODE_CLEAR);
//! static SUSPEND_PINS: PinSelect = PinSelect::Choose {
//!     cond: &IDLE_IF_CLEAR,
//!     then: PinState::Idle,
//!     otherwise: PinState::Sleep,
//! };
//! ```

use crate::context::RegisterContext;
use crate::error_codes::{ConfigError, ErrorCode};
use crate::hil::{PinState, PmAction};

/// A leaf of a condition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand {
    /// The value of a context slot.
    Ctx(usize),
    /// A literal value.
    Const(u32),
}

impl Operand {
    fn value(self, ctx: &RegisterContext) -> Result<u32, ErrorCode> {
        match self {
            Operand::Ctx(index) => ctx.get(index),
            Operand::Const(value) => Ok(value),
        }
    }

    fn validate(self, ctx_len: usize) -> Result<(), ConfigError> {
        match self {
            Operand::Ctx(index) if index >= ctx_len => Err(ConfigError::IndexOutOfRange { index }),
            _ => Ok(()),
        }
    }
}

/// A boolean expression over the register context.
#[derive(Clone, Copy, Debug)]
pub enum Condition<'a> {
    /// True if the operand is non-zero.
    Value(Operand),
    /// `a < b`
    Lt(Operand, Operand),
    /// `a > b`
    Gt(Operand, Operand),
    /// `a <= b`
    LtEq(Operand, Operand),
    /// `a >= b`
    GtEq(Operand, Operand),
    /// `a == b`
    Eq(Operand, Operand),
    /// True if `a & b` is non-zero.
    BitAnd(Operand, Operand),
    /// True if `a | b` is non-zero.
    BitOr(Operand, Operand),
    /// Both conditions hold.
    And(&'a Condition<'a>, &'a Condition<'a>),
    /// At least one condition holds.
    Or(&'a Condition<'a>, &'a Condition<'a>),
    /// Negation.
    Not(&'a Condition<'a>),
}

/// Deepest nesting of `And`, `Or` and `Not` a condition tree may use.
///
/// Nodes are borrowed, so a `static` node can refer to itself. The limit
/// turns such a cycle into a configuration error.
pub const MAX_CONDITION_DEPTH: usize = 16;

impl Condition<'_> {
    /// Evaluate the condition against the current context.
    ///
    /// `And` and `Or` short circuit.
    pub fn eval(&self, ctx: &RegisterContext) -> Result<bool, ErrorCode> {
        self.eval_at(ctx, 0)
    }

    fn eval_at(&self, ctx: &RegisterContext, depth: usize) -> Result<bool, ErrorCode> {
        let cmp = |a: &Operand, b: &Operand, f: fn(u32, u32) -> bool| -> Result<bool, ErrorCode> {
            Ok(f(a.value(ctx)?, b.value(ctx)?))
        };
        if depth > MAX_CONDITION_DEPTH {
            return Err(ConfigError::ConditionTooDeep.into());
        }

        match self {
            Condition::Value(a) => Ok(a.value(ctx)? != 0),
            Condition::Lt(a, b) => cmp(a, b, |x, y| x < y),
            Condition::Gt(a, b) => cmp(a, b, |x, y| x > y),
            Condition::LtEq(a, b) => cmp(a, b, |x, y| x <= y),
            Condition::GtEq(a, b) => cmp(a, b, |x, y| x >= y),
            Condition::Eq(a, b) => cmp(a, b, |x, y| x == y),
            Condition::BitAnd(a, b) => cmp(a, b, |x, y| x & y != 0),
            Condition::BitOr(a, b) => cmp(a, b, |x, y| x | y != 0),
            Condition::And(l, r) => Ok(l.eval_at(ctx, depth + 1)? && r.eval_at(ctx, depth + 1)?),
            Condition::Or(l, r) => Ok(l.eval_at(ctx, depth + 1)? || r.eval_at(ctx, depth + 1)?),
            Condition::Not(c) => Ok(!c.eval_at(ctx, depth + 1)?),
        }
    }

    /// Check every context slot referenced by the tree, and the depth of the
    /// tree.
    pub fn validate(&self, ctx_len: usize) -> Result<(), ConfigError> {
        self.validate_at(ctx_len, 0)
    }

    fn validate_at(&self, ctx_len: usize, depth: usize) -> Result<(), ConfigError> {
        if depth > MAX_CONDITION_DEPTH {
            return Err(ConfigError::ConditionTooDeep);
        }

        match self {
            Condition::Value(a) => a.validate(ctx_len),
            Condition::Lt(a, b)
            | Condition::Gt(a, b)
            | Condition::LtEq(a, b)
            | Condition::GtEq(a, b)
            | Condition::Eq(a, b)
            | Condition::BitAnd(a, b)
            | Condition::BitOr(a, b) => {
                a.validate(ctx_len)?;
                b.validate(ctx_len)
            }
            Condition::And(l, r) | Condition::Or(l, r) => {
                l.validate_at(ctx_len, depth + 1)?;
                r.validate_at(ctx_len, depth + 1)
            }
            Condition::Not(c) => c.validate_at(ctx_len, depth + 1),
        }
    }
}

/// How the pin state for one PM action is chosen.
#[derive(Clone, Copy, Debug)]
pub enum PinSelect<'a> {
    /// Leave the pins alone.
    Unchanged,
    /// Always apply this state.
    State(PinState),
    /// Apply `then` if `cond` holds, `otherwise` if not.
    Choose {
        /// Evaluated against the context at the time of the action.
        cond: &'a Condition<'a>,
        /// State applied when `cond` holds.
        then: PinState,
        /// State applied when it does not.
        otherwise: PinState,
    },
}

impl PinSelect<'_> {
    /// The pin state to apply, or `None` to leave the pins alone.
    pub fn resolve(&self, ctx: &RegisterContext) -> Result<Option<PinState>, ErrorCode> {
        match self {
            PinSelect::Unchanged => Ok(None),
            PinSelect::State(state) => Ok(Some(*state)),
            PinSelect::Choose {
                cond,
                then,
                otherwise,
            } => {
                if cond.eval(ctx)? {
                    Ok(Some(*then))
                } else {
                    Ok(Some(*otherwise))
                }
            }
        }
    }

    fn validate(&self, ctx_len: usize) -> Result<(), ConfigError> {
        match self {
            PinSelect::Choose { cond, .. } => cond.validate(ctx_len),
            _ => Ok(()),
        }
    }
}

/// Mapping from PM action to pin state for a device type.
#[derive(Clone, Copy, Debug)]
pub struct PinStateMap<'a> {
    /// [`PmAction::Suspend`]
    pub suspend: PinSelect<'a>,
    /// [`PmAction::Resume`]
    pub resume: PinSelect<'a>,
    /// [`PmAction::Idle`]
    pub idle: PinSelect<'a>,
    /// [`PmAction::Autosuspend`]
    pub autosuspend: PinSelect<'a>,
}

impl<'a> PinStateMap<'a> {
    /// Sleep pins when suspended, default pins when running, idle pins when
    /// idle.
    pub const fn standard() -> PinStateMap<'a> {
        PinStateMap {
            suspend: PinSelect::State(PinState::Sleep),
            resume: PinSelect::State(PinState::Default),
            idle: PinSelect::State(PinState::Idle),
            autosuspend: PinSelect::State(PinState::Sleep),
        }
    }

    /// Never touch the pins.
    pub const fn unchanged() -> PinStateMap<'a> {
        PinStateMap {
            suspend: PinSelect::Unchanged,
            resume: PinSelect::Unchanged,
            idle: PinSelect::Unchanged,
            autosuspend: PinSelect::Unchanged,
        }
    }

    /// The selection for `action`.
    pub fn get(&self, action: PmAction) -> &PinSelect<'a> {
        match action {
            PmAction::Suspend => &self.suspend,
            PmAction::Resume => &self.resume,
            PmAction::Idle => &self.idle,
            PmAction::Autosuspend => &self.autosuspend,
        }
    }

    /// Validate every selection against a context of `ctx_len` slots.
    pub fn validate(&self, ctx_len: usize) -> Result<(), ConfigError> {
        self.suspend.validate(ctx_len)?;
        self.resume.validate(ctx_len)?;
        self.idle.validate(ctx_len)?;
        self.autosuspend.validate(ctx_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_ctx<F: FnOnce(&RegisterContext)>(values: &[u32], f: F) {
        let mut storage = [0u32; 8];
        let mut ctx = RegisterContext::new(&mut storage);
        ctx.populate(values).unwrap();
        f(&ctx);
    }

    #[test]
    fn comparisons() {
        with_ctx(&[3, 5, 0], |ctx| {
            let (a, b) = (Operand::Ctx(0), Operand::Ctx(1));
            assert_eq!(Condition::Lt(a, b).eval(ctx), Ok(true));
            assert_eq!(Condition::Gt(a, b).eval(ctx), Ok(false));
            assert_eq!(Condition::LtEq(a, Operand::Const(3)).eval(ctx), Ok(true));
            assert_eq!(Condition::GtEq(a, Operand::Const(4)).eval(ctx), Ok(false));
            assert_eq!(Condition::Eq(b, Operand::Const(5)).eval(ctx), Ok(true));
            assert_eq!(Condition::BitAnd(a, Operand::Const(4)).eval(ctx), Ok(false));
            assert_eq!(Condition::BitOr(Operand::Ctx(2), a).eval(ctx), Ok(true));
            assert_eq!(Condition::Value(Operand::Ctx(2)).eval(ctx), Ok(false));
        });
    }

    #[test]
    fn combinators() {
        let t = Condition::Value(Operand::Const(1));
        let f = Condition::Value(Operand::Const(0));
        let and = Condition::And(&t, &f);
        let or = Condition::Or(&f, &t);
        let not_and = Condition::Not(&and);
        with_ctx(&[], |ctx| {
            assert_eq!(and.eval(ctx), Ok(false));
            assert_eq!(or.eval(ctx), Ok(true));
            assert_eq!(not_and.eval(ctx), Ok(true));
        });
    }

    #[test]
    fn short_circuit_skips_bad_slot() {
        let f = Condition::Value(Operand::Const(0));
        let bad = Condition::Value(Operand::Ctx(7));
        let and = Condition::And(&f, &bad);
        with_ctx(&[1], |ctx| {
            assert_eq!(and.eval(ctx), Ok(false));
            assert_eq!(
                bad.eval(ctx),
                Err(ErrorCode::ConfigurationError(ConfigError::IndexOutOfRange {
                    index: 7
                }))
            );
        });
        assert_eq!(
            and.validate(1),
            Err(ConfigError::IndexOutOfRange { index: 7 })
        );
    }

    static SELF_LOOP: Condition = Condition::Not(&SELF_LOOP);

    #[test]
    fn cyclic_tree_is_rejected() {
        assert_eq!(SELF_LOOP.validate(4), Err(ConfigError::ConditionTooDeep));
        with_ctx(&[0], |ctx| {
            assert_eq!(
                SELF_LOOP.eval(ctx),
                Err(ErrorCode::ConfigurationError(ConfigError::ConditionTooDeep))
            );
        });

        let leaf = Condition::Value(Operand::Const(1));
        wrap_in_not(MAX_CONDITION_DEPTH, &leaf, &mut |c| {
            assert_eq!(c.validate(1), Ok(()));
        });
        wrap_in_not(MAX_CONDITION_DEPTH + 1, &leaf, &mut |c| {
            assert_eq!(c.validate(1), Err(ConfigError::ConditionTooDeep));
        });
    }

    fn wrap_in_not(levels: usize, inner: &Condition, f: &mut dyn FnMut(&Condition)) {
        if levels == 0 {
            f(inner);
        } else {
            wrap_in_not(levels - 1, &Condition::Not(inner), f);
        }
    }

    #[test]
    fn pin_select() {
        let busy = Condition::Eq(Operand::Ctx(0), Operand::Const(1));
        let map = PinStateMap {
            idle: PinSelect::Choose {
                cond: &busy,
                then: PinState::Default,
                otherwise: PinState::Idle,
            },
            ..PinStateMap::standard()
        };
        assert_eq!(map.validate(1), Ok(()));
        assert!(map.validate(0).is_err());

        with_ctx(&[1], |ctx| {
            assert_eq!(map.get(PmAction::Idle).resolve(ctx), Ok(Some(PinState::Default)));
            assert_eq!(map.get(PmAction::Suspend).resolve(ctx), Ok(Some(PinState::Sleep)));
        });
        with_ctx(&[0], |ctx| {
            assert_eq!(map.get(PmAction::Idle).resolve(ctx), Ok(Some(PinState::Idle)));
        });
        with_ctx(&[0], |ctx| {
            assert_eq!(
                PinStateMap::unchanged().get(PmAction::Resume).resolve(ctx),
                Ok(None)
            );
        });
    }
}
