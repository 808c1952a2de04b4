/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * This file is part of the Spirc kernel compiler.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// A SPIR-V result identifier.
///
/// Every type, constant, variable, label and computed value in the emitted
/// module is named by exactly one `ResultId`. Ids are minted only by
/// [`IdAllocator`]; everything else stores a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultId(pub u32);

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// The single source of result ids for one compilation run.
///
/// Ids start at 1 and increase by one per call, in emission order. The final
/// bound (one past the highest issued id) goes into the module header.
#[derive(Debug)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator { next: 1 }
    }

    /// Mint the next id.
    pub fn next(&mut self) -> ResultId {
        let id = ResultId(self.next);
        self.next += 1;
        id
    }

    /// One past the highest id issued so far.
    pub fn bound(&self) -> u32 {
        self.next
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_increase_by_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next(), ResultId(1));
        assert_eq!(ids.next(), ResultId(2));
        assert_eq!(ids.next(), ResultId(3));
    }

    #[test]
    fn test_bound_is_one_past_highest() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.bound(), 1);
        for expected in 1..=100u32 {
            let id = ids.next();
            assert_eq!(id.0, expected);
            assert_eq!(ids.bound(), expected + 1);
        }
    }

    #[test]
    fn test_display_uses_percent_prefix() {
        assert_eq!(ResultId(42).to_string(), "%42");
    }
}
