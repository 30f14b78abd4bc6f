#![forbid(unsafe_code)]

//! Stable arena identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DockModelError;

/// Stable identifier for nodes in the dock arena.
///
/// `0` is reserved/invalid so IDs are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Lowest valid node ID.
    pub const MIN: Self = Self(1);

    /// Create a new node ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, DockModelError> {
        if raw == 0 {
            return Err(DockModelError::ZeroId);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, DockModelError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(DockModelError::IdOverflow { current: self.0 });
        };
        Self::new(next)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable identifier for floating dock windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u64);

impl WindowId {
    pub const MIN: Self = Self(1);

    pub fn new(raw: u64) -> Result<Self, DockModelError> {
        if raw == 0 {
            return Err(DockModelError::ZeroId);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn checked_next(self) -> Result<Self, DockModelError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(DockModelError::IdOverflow { current: self.0 });
        };
        Self::new(next)
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(NodeId::new(0), Err(DockModelError::ZeroId));
        assert_eq!(WindowId::new(0), Err(DockModelError::ZeroId));
    }

    #[test]
    fn next_overflows_cleanly() {
        let last = NodeId::new(u64::MAX).expect("non-zero");
        assert_eq!(
            last.checked_next(),
            Err(DockModelError::IdOverflow { current: u64::MAX })
        );
        assert_eq!(NodeId::MIN.checked_next().map(NodeId::get), Ok(2));
    }
}
