//! Row/column contract between the catalog and whatever tree view displays it.
//!
//! Handles are opaque [`ItemId`]s. `None` as a parent addresses the invisible
//! root, whose only child is the "all notebooks" item.

use serde::{Deserialize, Serialize};

/// Opaque, stable handle for a tree item. Never reused once allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Name,
    Synchronizable,
    Dirty,
    Default,
    LastUsed,
    Published,
    Favorited,
    FromLinkedNotebook,
    NoteCount,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Name,
        Column::Synchronizable,
        Column::Dirty,
        Column::Default,
        Column::LastUsed,
        Column::Published,
        Column::Favorited,
        Column::FromLinkedNotebook,
        Column::NoteCount,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Column> {
        Self::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Display,
    Edit,
    ToolTip,
    AccessibleText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Bool(bool),
    Count(u32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFlags {
    pub selectable: bool,
    pub editable: bool,
    pub drag_enabled: bool,
    pub drop_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Read side of the view contract.
pub trait TreeAccessor {
    fn row_count(&self, parent: Option<ItemId>) -> usize;

    fn column_count(&self) -> usize {
        Column::ALL.len()
    }

    fn child_handle(&self, parent: Option<ItemId>, row: usize) -> Option<ItemId>;

    /// `None` both for top-level items and for handles that no longer resolve.
    fn parent_handle(&self, item: ItemId) -> Option<ItemId>;

    fn row_of(&self, item: ItemId) -> Option<usize>;

    fn data(&self, item: ItemId, column: Column, role: Role) -> Option<CellValue>;

    fn flags(&self, item: ItemId, column: Column) -> ItemFlags;
}

/// Change notifications. Every structural mutation is bracketed by a
/// `begin_*`/`end_*` pair; rows are inclusive.
pub trait ModelObserver: Send {
    fn begin_insert_rows(&mut self, _parent: Option<ItemId>, _first: usize, _last: usize) {}
    fn end_insert_rows(&mut self) {}
    fn begin_remove_rows(&mut self, _parent: Option<ItemId>, _first: usize, _last: usize) {}
    fn end_remove_rows(&mut self) {}
    fn layout_about_to_change(&mut self) {}
    fn layout_changed(&mut self) {}
    fn data_changed(&mut self, _item: ItemId, _first: Column, _last: Column) {}
    fn all_notebooks_listed(&mut self) {}
}

pub struct NoopObserver;

impl ModelObserver for NoopObserver {}
