//! Identity allocation for client-minted entities.
//!
//! Every entity created on a device receives its permanent identifier
//! immediately, before the server ever sees it. Client and server draw from
//! the same random high-entropy scheme (UUID v4), so the two id spaces never
//! need coordination and collisions are cryptographically negligible.

use crate::EntityId;
use std::cell::Cell;
use uuid::Uuid;

/// Allocates stable, globally-unique entity identifiers.
///
/// The default allocator is random. A sequential mode exists so tests and
/// benchmarks produce the same ids on every run.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    mode: Mode,
}

#[derive(Debug, Clone)]
enum Mode {
    Random,
    Sequential { prefix: String, next: Cell<u64> },
}

impl IdAllocator {
    /// Create a random (UUID v4) allocator.
    pub fn new() -> Self {
        Self { mode: Mode::Random }
    }

    /// Create a deterministic allocator producing `{prefix}-1`, `{prefix}-2`, ...
    pub fn sequential(prefix: impl Into<String>) -> Self {
        Self {
            mode: Mode::Sequential {
                prefix: prefix.into(),
                next: Cell::new(1),
            },
        }
    }

    /// Mint a fresh identifier.
    pub fn new_id(&self) -> EntityId {
        match &self.mode {
            Mode::Random => Uuid::new_v4().to_string(),
            Mode::Sequential { prefix, next } => {
                let n = next.get();
                next.set(n + 1);
                format!("{prefix}-{n}")
            }
        }
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
    use std::collections::HashSet;

    #[test]
    fn random_ids_are_unique() {
        let ids = IdAllocator::new();
        let minted: HashSet<_> = (0..1000).map(|_| ids.new_id()).collect();
        assert_eq!(minted.len(), 1000);
    }

    #[test]
    fn random_ids_parse_as_uuid() {
        let ids = IdAllocator::new();
        let id = ids.new_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn sequential_ids_are_deterministic() {
        let a = IdAllocator::sequential("row");
        let b = IdAllocator::sequential("row");

        let from_a: Vec<_> = (0..3).map(|_| a.new_id()).collect();
        let from_b: Vec<_> = (0..3).map(|_| b.new_id()).collect();

        assert_eq!(from_a, vec!["row-1", "row-2", "row-3"]);
        assert_eq!(from_a, from_b);
    }

    #[test]
    fn cloned_sequential_allocator_continues_independently() {
        let a = IdAllocator::sequential("row");
        assert_eq!(a.new_id(), "row-1");

        let b = a.clone();
        assert_eq!(a.new_id(), "row-2");
        assert_eq!(b.new_id(), "row-2");
    }
}
