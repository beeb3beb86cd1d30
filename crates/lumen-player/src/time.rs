// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message timestamps.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A `(sec, nsec)` timestamp.
///
/// Equality, ordering and hashing all operate on the total nanosecond value,
/// so `{ sec: 1, nsec: 1_000_000_000 }` and `{ sec: 2, nsec: 0 }` are the same
/// instant. ROS 2 headers spell the second field `nanosec`; both spellings
/// deserialize.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Time {
    pub sec: u32,
    #[serde(alias = "nanosec")]
    pub nsec: u32,
}

impl Time {
    /// Create a new timestamp.
    pub const fn new(sec: u32, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// Build a timestamp from total nanoseconds (saturates at `u32::MAX` seconds).
    pub fn from_nanos(nanos: u64) -> Self {
        let sec = (nanos / NANOS_PER_SEC).min(u64::from(u32::MAX)) as u32;
        Self {
            sec,
            nsec: (nanos % NANOS_PER_SEC) as u32,
        }
    }

    /// Total nanoseconds.
    pub fn as_nanos(&self) -> u64 {
        u64::from(self.sec) * NANOS_PER_SEC + u64::from(self.nsec)
    }

    /// Carry any nanosecond overflow into the seconds field.
    pub fn normalized(self) -> Self {
        Self::from_nanos(self.as_nanos())
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.as_nanos() == other.as_nanos()
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_nanos().cmp(&other.as_nanos())
    }
}

impl Hash for Time {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_nanos().hash(state);
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let normalized = self.normalized();
        write!(f, "{}.{:09}", normalized.sec, normalized.nsec)
    }
}
