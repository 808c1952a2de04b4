/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * This file is part of the Spirc kernel compiler.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

use crate::ids::{IdAllocator, ResultId};
use crate::types::TypeToken;
use std::collections::HashMap;

/// Dedup key for one literal constant: its type plus the exact bit pattern
/// at the declared width (integers keep the literal's sign extension,
/// floats their IEEE bits). Patterns narrower than 64 bits occupy the low
/// bits of the `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstKey {
    pub ty: TypeToken,
    pub bits: u64,
}

/// Deduplicating pool of literal constants.
///
/// Two requests with structurally equal (type, bit pattern) return the same
/// id; constants are emitted once, in first-use order.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<(ConstKey, ResultId)>,
    dedup: HashMap<ConstKey, ResultId>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a literal, minting an id only on first use.
    pub fn intern(&mut self, ty: TypeToken, bits: u64, ids: &mut IdAllocator) -> ResultId {
        let key = ConstKey { ty, bits };
        if let Some(&id) = self.dedup.get(&key) {
            return id;
        }
        let id = ids.next();
        self.entries.push((key, id));
        self.dedup.insert(key, id);
        id
    }

    /// Constants with their ids, in first-use order.
    pub fn iter(&self) -> impl Iterator<Item = (ConstKey, ResultId)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
