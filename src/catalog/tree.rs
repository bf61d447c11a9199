use crate::catalog::identity::ItemKey;

/// Index of a node in the [`Tree`] arena. Internal to the catalog; views
/// address items through [`crate::view::ItemId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    InvisibleRoot,
    AllNotebooksRoot,
    LinkedNotebookRoot {
        username: String,
        guid: String,
    },
    Stack {
        name: String,
        linked_notebook_guid: Option<String>,
    },
    /// The record itself lives in the entity store under this id.
    Notebook {
        local_id: String,
    },
}

impl NodeKind {
    /// Identity key for the node, `None` for the invisible root.
    pub fn item_key(&self) -> Option<ItemKey> {
        match self {
            NodeKind::InvisibleRoot => None,
            NodeKind::AllNotebooksRoot => Some(ItemKey::AllNotebooksRoot),
            NodeKind::LinkedNotebookRoot { guid, .. } => Some(ItemKey::LinkedNotebook(guid.clone())),
            NodeKind::Stack { name, linked_notebook_guid } => Some(ItemKey::Stack {
                name: name.clone(),
                linked_notebook_guid: linked_notebook_guid.clone(),
            }),
            NodeKind::Notebook { local_id } => Some(ItemKey::Notebook(local_id.clone())),
        }
    }
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed tree. Parent/child links are indices; a destroyed node's slot
/// goes on a free list and is handed out again by [`Tree::create`].
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node {
                kind: NodeKind::InvisibleRoot,
                parent: None,
                children: Vec::new(),
            })],
            free: Vec::new(),
        }
    }

    pub fn invisible_root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Allocate a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Number of arena slots, live or free.
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Free a detached node without children. Returns its kind.
    pub fn destroy(&mut self, id: NodeId) -> Option<NodeKind> {
        let node = self.node(id)?;
        if node.parent.is_some() || !node.children.is_empty() || id == self.invisible_root() {
            log::error!("[Tree] Refusing to destroy attached or non-empty node {:?}", id);
            return None;
        }
        let kind = self.nodes.get_mut(id.0).and_then(Option::take).map(|n| n.kind);
        if kind.is_some() {
            self.free.push(id.0);
        }
        kind
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        self.node_mut(id).map(|n| &mut n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_at(&self, parent: NodeId, row: usize) -> Option<NodeId> {
        self.children(parent).get(row).copied()
    }

    pub fn row_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Row of a node under its own parent.
    pub fn row(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.row_of_child(parent, id)
    }

    /// Attach a detached node at `row` (clamped to the child count).
    pub fn insert_child(&mut self, parent: NodeId, row: usize, child: NodeId) -> bool {
        if !self.contains(parent) || parent == child {
            return false;
        }
        match self.node(child) {
            Some(node) if node.parent.is_none() => {}
            _ => {
                log::error!("[Tree] Can't insert {:?}: missing or already attached", child);
                return false;
            }
        }
        if let Some(node) = self.node_mut(parent) {
            let row = row.min(node.children.len());
            node.children.insert(row, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        true
    }

    /// Detach the child at `row`. The node stays alive; ownership passes to
    /// the caller.
    pub fn remove_child(&mut self, parent: NodeId, row: usize) -> Option<NodeId> {
        let node = self.node_mut(parent)?;
        if row >= node.children.len() {
            return None;
        }
        let child = node.children.remove(row);
        if let Some(child_node) = self.node_mut(child) {
            child_node.parent = None;
        }
        Some(child)
    }

    /// Replace the child order of `parent` with a permutation of itself.
    pub(crate) fn reorder_children(&mut self, parent: NodeId, order: Vec<NodeId>) {
        if let Some(node) = self.node_mut(parent) {
            if node.children.len() == order.len() {
                node.children = order;
            } else {
                log::error!("[Tree] Reorder of {:?} is not a permutation", parent);
            }
        }
    }

    /// Depth-first list of `id` and all of its descendants, parents first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }
}
