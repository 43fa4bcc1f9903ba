//! Status-partitioned ordering shared by backlog items and sprint tasks.
//!
//! Within one project every status forms a partition whose `order` values are
//! exactly `0..len`. [`plan_move`] computes the minimal set of records to
//! rewrite when one record moves; the store layer persists that set in one
//! transaction. [`Board`] applies the same plan to an in-memory copy so a
//! client can show a move before the store confirms it.

use serde::Serialize;

use crate::error::{EngageError, Result};
use crate::types::ItemStatus;

/// A record that occupies a slot on the board.
pub trait Ordered: Clone {
    fn key(&self) -> &str;
    fn status(&self) -> ItemStatus;
    fn order(&self) -> u32;
    fn set_position(&mut self, status: ItemStatus, order: u32);
}

/// Records of one status, in board order. Ties on `order` (only possible in
/// corrupted data) fall back to key order so results are deterministic.
pub fn sorted_column<T: Ordered>(items: &[T], status: ItemStatus) -> Vec<T> {
    let mut column: Vec<T> = items
        .iter()
        .filter(|i| i.status() == status)
        .cloned()
        .collect();
    column.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.key().cmp(b.key())));
    column
}

/// Plan moving `moving` to `destination` at `index`.
///
/// `items` is the full set of records of the project (it may include
/// `moving` itself). `index` is a position in the destination column after
/// `moving` has been taken out of it, so it must lie in `0..=len`.
///
/// Returns every record whose status or order changes, with the new values
/// applied. Moving a record onto its own slot returns an empty plan.
pub fn plan_move<T: Ordered>(
    items: &[T],
    moving: &T,
    destination: ItemStatus,
    index: usize,
) -> Result<Vec<T>> {
    let source = moving.status();
    let remaining: Vec<T> = sorted_column(items, source)
        .into_iter()
        .filter(|i| i.key() != moving.key())
        .collect();

    let mut changed = Vec::new();
    let mut column = if destination == source {
        remaining
    } else {
        changed.extend(renumber(remaining, source));
        sorted_column(items, destination)
    };

    if index > column.len() {
        return Err(EngageError::InvalidArgument(format!(
            "destination index {index} is out of range for '{}' ({} items)",
            destination.label(),
            column.len()
        )));
    }
    column.insert(index, moving.clone());
    changed.extend(renumber(column, destination));

    tracing::debug!(
        key = moving.key(),
        from = %source,
        to = %destination,
        index,
        writes = changed.len(),
        "planned move"
    );
    Ok(changed)
}

/// Renumber a column that lost members so it is dense again.
/// Returns only the records whose order changed.
pub fn compact_column<T: Ordered>(items: &[T], status: ItemStatus) -> Vec<T> {
    renumber(sorted_column(items, status), status)
}

/// Renumber every column. Used after bulk removals.
pub fn compact_all<T: Ordered>(items: &[T]) -> Vec<T> {
    ItemStatus::all()
        .iter()
        .flat_map(|s| compact_column(items, *s))
        .collect()
}

fn renumber<T: Ordered>(column: Vec<T>, status: ItemStatus) -> Vec<T> {
    column
        .into_iter()
        .enumerate()
        .filter_map(|(pos, mut item)| {
            let pos = pos as u32;
            if item.order() == pos && item.status() == status {
                None
            } else {
                item.set_position(status, pos);
                Some(item)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Density check
// ---------------------------------------------------------------------------

/// A column whose orders are not exactly `0..len`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DensityViolation {
    pub status: ItemStatus,
    pub orders: Vec<u32>,
}

pub fn check_dense<T: Ordered>(items: &[T]) -> Vec<DensityViolation> {
    ItemStatus::all()
        .iter()
        .filter_map(|&status| {
            let mut orders: Vec<u32> = items
                .iter()
                .filter(|i| i.status() == status)
                .map(|i| i.order())
                .collect();
            orders.sort_unstable();
            let dense = orders.iter().enumerate().all(|(i, o)| *o == i as u32);
            (!dense).then_some(DensityViolation { status, orders })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Column<T> {
    pub status: ItemStatus,
    pub label: &'static str,
    pub items: Vec<T>,
}

/// In-memory mirror of one project's board: six columns in status order.
#[derive(Debug, Clone, Serialize)]
pub struct Board<T> {
    pub columns: Vec<Column<T>>,
}

impl<T: Ordered> Board<T> {
    pub fn from_items(items: &[T]) -> Self {
        let columns = ItemStatus::all()
            .iter()
            .map(|&status| Column {
                status,
                label: status.label(),
                items: sorted_column(items, status),
            })
            .collect();
        Self { columns }
    }

    pub fn column(&self, status: ItemStatus) -> &[T] {
        &self.columns[status.index()].items
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.columns.iter().flat_map(|c| c.items.iter())
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(|c| c.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a move locally (optimistic update). On error the board is
    /// unchanged; if the store later rejects the move, reload the board.
    pub fn apply_move(&mut self, key: &str, destination: ItemStatus, index: usize) -> Result<()> {
        let mut all: Vec<T> = self.items().cloned().collect();
        let moving = all
            .iter()
            .find(|i| i.key() == key)
            .cloned()
            .ok_or_else(|| EngageError::ItemNotFound(key.to_string()))?;
        for updated in plan_move(&all, &moving, destination, index)? {
            if let Some(slot) = all.iter_mut().find(|i| i.key() == updated.key()) {
                *slot = updated;
            }
        }
        *self = Board::from_items(&all);
        Ok(())
    }

    pub fn check_dense(&self) -> Vec<DensityViolation> {
        let all: Vec<T> = self.items().cloned().collect();
        check_dense(&all)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
