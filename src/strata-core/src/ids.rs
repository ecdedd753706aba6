//! Identifier allocation for plan nodes and columns.
//!
//! Ids are drawn from an allocator owned by a single compilation, so two
//! concurrent compilations never observe each other's counters and trace
//! output is reproducible.

use serde::{Deserialize, Serialize};

/// Plan node identifier.
pub type PlanId = u64;

/// Column identifier, unique within one compilation.
pub type ColumnId = u64;

/// Per-compilation counters for plan node and column ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next_plan_id: PlanId,
    next_column_id: ColumnId,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Create an allocator whose first plan and column ids are both 1.
    pub const fn new() -> Self {
        Self {
            next_plan_id: 1,
            next_column_id: 1,
        }
    }

    /// Allocate a fresh plan node id.
    pub fn alloc_plan_id(&mut self) -> PlanId {
        let id = self.next_plan_id;
        self.next_plan_id += 1;
        id
    }

    /// Allocate a fresh column id.
    pub fn alloc_column_id(&mut self) -> ColumnId {
        let id = self.next_column_id;
        self.next_column_id += 1;
        id
    }

    /// The id the next call to `alloc_plan_id` will return.
    pub const fn peek_plan_id(&self) -> PlanId {
        self.next_plan_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.alloc_plan_id(), 1);
        assert_eq!(ids.alloc_plan_id(), 2);
        assert_eq!(ids.alloc_column_id(), 1);
        assert_eq!(ids.peek_plan_id(), 3);
    }

    #[test]
    fn test_allocators_do_not_share_state() {
        let mut a = IdAllocator::new();
        let mut b = IdAllocator::new();
        a.alloc_plan_id();
        a.alloc_plan_id();
        assert_eq!(b.alloc_plan_id(), 1);
    }
}
