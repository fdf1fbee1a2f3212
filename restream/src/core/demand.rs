//! Demand accounting between a consumer and its connection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// How many more items a consumer is willing to accept.
///
/// Demand is additive: every request on a connection increases the
/// outstanding total, and every delivered item consumes one unit of a
/// finite demand. Additions that overflow `usize` saturate to
/// [`Demand::Unbounded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Demand {
    /// The consumer accepts any number of items.
    Unbounded,
    /// The consumer accepts at most this many items.
    Max(usize),
}

impl Default for Demand {
    fn default() -> Self {
        Self::Max(0)
    }
}

impl Demand {
    /// No demand at all.
    pub const NONE: Self = Self::Max(0);

    /// Returns a demand of zero items.
    #[must_use]
    pub const fn none() -> Self {
        Self::NONE
    }

    /// Returns an unbounded demand.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self::Unbounded
    }

    /// Returns a demand of at most `n` items.
    #[must_use]
    pub const fn max(n: usize) -> Self {
        Self::Max(n)
    }

    /// Returns true if no further items may be delivered.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::Max(0))
    }

    /// Returns true for an unbounded demand.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// Returns the finite limit, or `None` when unbounded.
    #[must_use]
    pub const fn max_value(&self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Max(n) => Some(*n),
        }
    }

    /// Consumes one unit of demand for a delivered item.
    ///
    /// Finite demand never goes below zero; unbounded demand is unchanged.
    #[must_use]
    pub const fn decrement(self) -> Self {
        match self {
            Self::Unbounded => Self::Unbounded,
            Self::Max(n) => Self::Max(n.saturating_sub(1)),
        }
    }
}

impl Add for Demand {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Max(a), Self::Max(b)) => a.checked_add(b).map_or(Self::Unbounded, Self::Max),
            _ => Self::Unbounded,
        }
    }
}

impl AddAssign for Demand {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl From<usize> for Demand {
    fn from(n: usize) -> Self {
        Self::Max(n)
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Max(n) => write!(f, "{n}"),
        }
    }
}
