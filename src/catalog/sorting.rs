use std::cmp::Ordering;

use crate::catalog::store::EntityStore;
use crate::catalog::tree::{NodeId, NodeKind};
use crate::notebook::validation::fold_name;
use crate::view::{Column, SortOrder};

/// Tie-break groups, compared before names and never reversed.
const GROUP_ALL_NOTEBOOKS: u8 = 0;
const GROUP_OWN: u8 = 1;
const GROUP_LINKED: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    group: u8,
    name: String,
}

impl SortKey {
    pub fn for_node(kind: &NodeKind, store: &EntityStore) -> SortKey {
        match kind {
            NodeKind::InvisibleRoot | NodeKind::AllNotebooksRoot => SortKey {
                group: GROUP_ALL_NOTEBOOKS,
                name: String::new(),
            },
            NodeKind::LinkedNotebookRoot { username, guid } => SortKey {
                group: GROUP_LINKED,
                name: fold_name(if username.is_empty() { guid } else { username }),
            },
            NodeKind::Stack { name, .. } => SortKey {
                group: GROUP_OWN,
                name: fold_name(name),
            },
            NodeKind::Notebook { local_id } => SortKey {
                group: GROUP_OWN,
                name: store.get(local_id).map(|r| fold_name(&r.name)).unwrap_or_default(),
            },
        }
    }
}

/// What a sort request turned out to require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortChange {
    /// Column other than name; accepted and ignored.
    Ignored,
    Unchanged,
    /// Same column, opposite order.
    Reversed,
}

#[derive(Debug, Clone)]
pub struct SortingPolicy {
    column: Column,
    order: SortOrder,
}

impl Default for SortingPolicy {
    fn default() -> Self {
        Self {
            column: Column::Name,
            order: SortOrder::Ascending,
        }
    }
}

impl SortingPolicy {
    pub fn new(order: SortOrder) -> Self {
        Self {
            column: Column::Name,
            order,
        }
    }

    pub fn column(&self) -> Column {
        self.column
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn compare(&self, a: &SortKey, b: &SortKey) -> Ordering {
        match a.group.cmp(&b.group) {
            Ordering::Equal => {}
            other => return other,
        }
        let by_name = a.name.cmp(&b.name);
        match self.order {
            SortOrder::Ascending => by_name,
            SortOrder::Descending => by_name.reverse(),
        }
    }

    /// Row at which `candidate` goes among already sorted `siblings`; after
    /// any equal keys. Keys are computed lazily, O(log n) of them.
    pub fn insertion_row<F>(&self, siblings: &[NodeId], candidate: &SortKey, key_of: F) -> usize
    where
        F: Fn(NodeId) -> SortKey,
    {
        siblings.partition_point(|sibling| self.compare(&key_of(*sibling), candidate) != Ordering::Greater)
    }

    pub fn request(&mut self, column: Column, order: SortOrder) -> SortChange {
        if column != Column::Name {
            log::debug!("[SortingPolicy] Ignoring sort by {:?}", column);
            return SortChange::Ignored;
        }
        if order == self.order {
            return SortChange::Unchanged;
        }
        self.order = order;
        SortChange::Reversed
    }

    /// Stable full sort of `(node, key)` pairs.
    pub fn sorted(&self, mut entries: Vec<(NodeId, SortKey)>) -> Vec<NodeId> {
        entries.sort_by(|(_, a), (_, b)| self.compare(a, b));
        entries.into_iter().map(|(id, _)| id).collect()
    }

    /// Order flip: reverse each tie-break group in place instead of
    /// re-sorting, so groups stay where they are.
    pub fn reversed_within_groups(entries: Vec<(NodeId, SortKey)>) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(entries.len());
        let mut run: Vec<NodeId> = Vec::new();
        let mut run_group = None;
        for (id, key) in entries {
            if run_group != Some(key.group) {
                out.extend(run.drain(..).rev());
                run_group = Some(key.group);
            }
            run.push(id);
        }
        out.extend(run.drain(..).rev());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tree::Tree;

    fn key(group: u8, name: &str) -> SortKey {
        SortKey {
            group,
            name: fold_name(name),
        }
    }

    #[test]
    fn test_root_first_and_own_before_linked() {
        let policy = SortingPolicy::default();
        assert_eq!(policy.compare(&key(GROUP_ALL_NOTEBOOKS, "z"), &key(GROUP_OWN, "a")), Ordering::Less);
        assert_eq!(policy.compare(&key(GROUP_LINKED, "a"), &key(GROUP_OWN, "z")), Ordering::Greater);
    }

    #[test]
    fn test_descending_keeps_group_tie_breaks() {
        let policy = SortingPolicy::new(SortOrder::Descending);
        assert_eq!(policy.compare(&key(GROUP_OWN, "a"), &key(GROUP_OWN, "b")), Ordering::Greater);
        assert_eq!(policy.compare(&key(GROUP_LINKED, "z"), &key(GROUP_OWN, "a")), Ordering::Greater);
        assert_eq!(policy.compare(&key(GROUP_ALL_NOTEBOOKS, ""), &key(GROUP_OWN, "a")), Ordering::Less);
    }

    #[test]
    fn test_case_insensitive() {
        let policy = SortingPolicy::default();
        assert_eq!(policy.compare(&key(GROUP_OWN, "apple"), &key(GROUP_OWN, "Banana")), Ordering::Less);
        assert_eq!(policy.compare(&key(GROUP_OWN, "work"), &key(GROUP_OWN, "WORK")), Ordering::Equal);
    }

    #[test]
    fn test_insertion_row_binary_search() {
        let mut tree = Tree::new();
        let names = ["alpha", "charlie", "echo"];
        let ids: Vec<NodeId> = names
            .iter()
            .map(|n| tree.create(NodeKind::Stack { name: n.to_string(), linked_notebook_guid: None }))
            .collect();
        let store = EntityStore::new();
        let policy = SortingPolicy::default();
        let key_of = |id: NodeId| {
            tree.kind(id)
                .map(|kind| SortKey::for_node(kind, &store))
                .unwrap_or_else(|| key(GROUP_OWN, ""))
        };

        assert_eq!(policy.insertion_row(&ids, &key(GROUP_OWN, "Bravo"), key_of), 1);
        assert_eq!(policy.insertion_row(&ids, &key(GROUP_OWN, "aaa"), key_of), 0);
        assert_eq!(policy.insertion_row(&ids, &key(GROUP_OWN, "zulu"), key_of), 3);
        assert_eq!(policy.insertion_row(&ids, &key(GROUP_OWN, "CHARLIE"), key_of), 2, "after equal keys");
        assert_eq!(policy.insertion_row(&ids, &key(GROUP_LINKED, "a"), key_of), 3);
    }

    #[test]
    fn test_request_only_honors_name_column() {
        let mut policy = SortingPolicy::default();
        assert_eq!(policy.request(Column::NoteCount, SortOrder::Descending), SortChange::Ignored);
        assert_eq!(policy.order(), SortOrder::Ascending);
        assert_eq!(policy.request(Column::Name, SortOrder::Ascending), SortChange::Unchanged);
        assert_eq!(policy.request(Column::Name, SortOrder::Descending), SortChange::Reversed);
        assert_eq!(policy.order(), SortOrder::Descending);
    }

    #[test]
    fn test_reverse_within_groups() {
        let mut tree = Tree::new();
        let a = tree.create(NodeKind::InvisibleRoot);
        let b = tree.create(NodeKind::InvisibleRoot);
        let c = tree.create(NodeKind::InvisibleRoot);
        let d = tree.create(NodeKind::InvisibleRoot);
        let entries = vec![
            (a, key(GROUP_OWN, "a")),
            (b, key(GROUP_OWN, "b")),
            (c, key(GROUP_LINKED, "c")),
            (d, key(GROUP_LINKED, "d")),
        ];
        assert_eq!(SortingPolicy::reversed_within_groups(entries), vec![b, a, d, c]);
    }
}
