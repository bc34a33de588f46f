//! Dispatch nodes and tree traversal.
//!
//! A [`DispatchNode`] owns a list of leaf [`Registration`]s and a list of
//! child nodes. Nodes are shared as `Arc<DispatchNode>`: the addon that
//! created a node keeps one handle, the parent it is attached to keeps
//! another. The parent link is a `Weak` back-reference used only to detach
//! a node from its old parent when it is re-attached elsewhere.
//!
//! # Visibility
//!
//! Disabling a node does not remove it from the tree. [`flatten`] still
//! returns it (inspection view) while [`flatten_active`] skips it together
//! with its whole subtree (dispatch and statistics view).

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DispatchError, DispatchResult};
use crate::registration::Registration;
use crate::stats::StatRecord;

/// Unique identity of a dispatch node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which of the two root trees a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Holds commands.
    Command,
    /// Holds event handlers.
    Event,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Event => f.write_str("event"),
        }
    }
}

/// Who a node belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeOwner {
    /// Runtime-owned (the two roots, ad-hoc helper nodes).
    BuiltIn,
    /// Owned by the named addon.
    Addon(String),
}

impl NodeOwner {
    /// Owner for an addon node.
    #[must_use]
    pub fn addon(name: impl Into<String>) -> Self {
        Self::Addon(name.into())
    }

    /// The owning addon's name, if any.
    #[must_use]
    pub fn addon_name(&self) -> Option<&str> {
        match self {
            Self::BuiltIn => None,
            Self::Addon(name) => Some(name),
        }
    }
}

impl fmt::Display for NodeOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuiltIn => f.write_str("Built-in"),
            Self::Addon(name) => f.write_str(name),
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| {
        warn!("DispatchNode read lock poisoned, recovering");
        e.into_inner()
    })
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| {
        warn!("DispatchNode write lock poisoned, recovering");
        e.into_inner()
    })
}

/// A composable holder of leaf registrations and child nodes.
pub struct DispatchNode {
    id: NodeId,
    kind: NodeKind,
    owner: NodeOwner,
    enabled: AtomicBool,
    registrations: RwLock<Vec<Arc<Registration>>>,
    children: RwLock<Vec<Arc<DispatchNode>>>,
    parent: RwLock<Weak<DispatchNode>>,
}

impl DispatchNode {
    /// Create an enabled, detached node.
    #[must_use]
    pub fn new(kind: NodeKind, owner: NodeOwner) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::new(),
            kind,
            owner,
            enabled: AtomicBool::new(true),
            registrations: RwLock::new(Vec::new()),
            children: RwLock::new(Vec::new()),
            parent: RwLock::new(Weak::new()),
        })
    }

    /// Create a built-in root node.
    #[must_use]
    pub fn root(kind: NodeKind) -> Arc<Self> {
        Self::new(kind, NodeOwner::BuiltIn)
    }

    /// Node identity.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Command or event node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Owner of this node.
    #[must_use]
    pub fn owner(&self) -> &NodeOwner {
        &self.owner
    }

    /// Whether this node participates in dispatch and statistics.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn this node on. Children keep their own flags.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Turn this node off. The subtree stays attached.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Current parent, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<DispatchNode>> {
        read(&self.parent).upgrade()
    }

    /// Whether `self` appears on the parent chain of `node`.
    #[must_use]
    pub fn is_ancestor_of(&self, node: &DispatchNode) -> bool {
        let mut seen = HashSet::new();
        let mut current = node.parent();
        while let Some(parent) = current {
            if parent.id == self.id {
                return true;
            }
            if !seen.insert(parent.id) {
                break;
            }
            current = parent.parent();
        }
        false
    }

    /// Attach `child` directly under this node.
    ///
    /// A child that already has a parent is removed from that parent first.
    /// Including a node that is already a direct child is a no-op.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::KindMismatch`] if the kinds differ.
    /// - [`DispatchError::WouldCycle`] if `child` is this node or one of its
    ///   ancestors.
    pub fn include(self: &Arc<Self>, child: &Arc<DispatchNode>) -> DispatchResult<()> {
        if self.kind != child.kind {
            return Err(DispatchError::KindMismatch {
                parent: self.kind,
                child: child.kind,
            });
        }
        if child.id == self.id || child.is_ancestor_of(self) {
            return Err(DispatchError::WouldCycle {
                parent: self.id,
                child: child.id,
            });
        }

        if let Some(previous) = child.parent() {
            if previous.id == self.id {
                return Ok(());
            }
            previous.remove_child(child.id);
            debug!(node = %child.id, from = %previous.id, "Detached node from previous parent");
        }

        write(&self.children).push(Arc::clone(child));
        *write(&child.parent) = Arc::downgrade(self);
        debug!(node = %child.id, parent = %self.id, owner = %child.owner, "Included node");
        Ok(())
    }

    /// Detach `child` from this node.
    ///
    /// Returns `false` when `child` is not a direct child; nothing changes
    /// in that case.
    pub fn exclude(&self, child: &DispatchNode) -> bool {
        if !self.remove_child(child.id) {
            debug!(node = %child.id, parent = %self.id, "Node is not a direct child, nothing to exclude");
            return false;
        }
        let mut parent = write(&child.parent);
        if parent.upgrade().is_some_and(|p| p.id == self.id) {
            *parent = Weak::new();
        }
        debug!(node = %child.id, parent = %self.id, owner = %child.owner, "Excluded node");
        true
    }

    fn remove_child(&self, id: NodeId) -> bool {
        let mut children = write(&self.children);
        let before = children.len();
        children.retain(|c| c.id != id);
        children.len() != before
    }

    /// Snapshot of the direct children.
    #[must_use]
    pub fn children(&self) -> Vec<Arc<DispatchNode>> {
        read(&self.children).clone()
    }

    /// Whether `child` is currently a direct child.
    #[must_use]
    pub fn contains(&self, child: &DispatchNode) -> bool {
        read(&self.children).iter().any(|c| c.id == child.id)
    }

    /// Add a leaf registration, returning the shared handle.
    pub fn register(&self, registration: Registration) -> Arc<Registration> {
        let registration = Arc::new(registration);
        write(&self.registrations).push(Arc::clone(&registration));
        registration
    }

    /// Snapshot of this node's leaf registrations, in registration order.
    #[must_use]
    pub fn registrations(&self) -> Vec<Arc<Registration>> {
        read(&self.registrations).clone()
    }

    /// Look up a leaf by its body.
    #[must_use]
    pub fn find(&self, body: &str) -> Option<Arc<Registration>> {
        read(&self.registrations)
            .iter()
            .find(|r| r.body() == body)
            .cloned()
    }

    /// Per-leaf statistics for this node only, every leaf included.
    #[must_use]
    pub fn statistics(&self) -> Vec<StatRecord> {
        read(&self.registrations)
            .iter()
            .map(|r| StatRecord::new(Arc::clone(r)))
            .collect()
    }

    /// Sum of this node's own leaf counters. Children are not included.
    #[must_use]
    pub fn total_call_count(&self) -> u64 {
        read(&self.registrations)
            .iter()
            .map(|r| r.call_count())
            .fold(0, u64::saturating_add)
    }
}

impl fmt::Debug for DispatchNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("owner", &self.owner)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// Every node reachable from `root`, `root` first, breadth-first.
///
/// Disabled nodes are included. Each node appears once even if a
/// concurrent re-attachment makes it reachable twice during the walk.
#[must_use]
pub fn flatten(root: &Arc<DispatchNode>) -> Vec<Arc<DispatchNode>> {
    walk(root, false)
}

/// Like [`flatten`] but stops at disabled nodes, omitting their subtrees.
#[must_use]
pub fn flatten_active(root: &Arc<DispatchNode>) -> Vec<Arc<DispatchNode>> {
    walk(root, true)
}

fn walk(root: &Arc<DispatchNode>, active_only: bool) -> Vec<Arc<DispatchNode>> {
    let mut visited = HashSet::new();
    let mut nodes = Vec::new();
    let mut queue = VecDeque::from([Arc::clone(root)]);

    while let Some(node) = queue.pop_front() {
        if active_only && !node.is_enabled() {
            continue;
        }
        if !visited.insert(node.id) {
            continue;
        }
        queue.extend(node.children());
        nodes.push(node);
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(owner: &str) -> Arc<DispatchNode> {
        DispatchNode::new(NodeKind::Command, NodeOwner::addon(owner))
    }

    fn ids(nodes: &[Arc<DispatchNode>]) -> Vec<NodeId> {
        nodes.iter().map(|n| n.id()).collect()
    }

    #[test]
    fn include_and_exclude_direct_child() {
        let root = DispatchNode::root(NodeKind::Command);
        let a = cmd("a");

        root.include(&a).unwrap();
        assert!(root.contains(&a));
        assert_eq!(a.parent().unwrap().id(), root.id());

        assert!(root.exclude(&a));
        assert!(!root.contains(&a));
        assert!(a.parent().is_none());
    }

    #[test]
    fn exclude_of_non_child_is_reported_noop() {
        let root = DispatchNode::root(NodeKind::Command);
        let a = cmd("a");
        assert!(!root.exclude(&a));
        assert!(root.children().is_empty());
    }

    #[test]
    fn reinclude_moves_node_to_new_parent() {
        let root = DispatchNode::root(NodeKind::Command);
        let a = cmd("a");
        let b = cmd("b");
        let c = cmd("c");
        root.include(&a).unwrap();
        root.include(&b).unwrap();
        a.include(&c).unwrap();

        b.include(&c).unwrap();

        assert!(!a.contains(&c));
        assert!(b.contains(&c));
        assert_eq!(c.parent().unwrap().id(), b.id());
    }

    #[test]
    fn including_same_child_twice_is_noop() {
        let root = DispatchNode::root(NodeKind::Command);
        let a = cmd("a");
        root.include(&a).unwrap();
        root.include(&a).unwrap();
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn ancestor_reinclusion_is_rejected() {
        let root = DispatchNode::root(NodeKind::Command);
        let a = cmd("a");
        let b = cmd("b");
        root.include(&a).unwrap();
        a.include(&b).unwrap();

        assert!(matches!(b.include(&a), Err(DispatchError::WouldCycle { .. })));
        assert!(matches!(b.include(&root), Err(DispatchError::WouldCycle { .. })));
        assert!(matches!(a.include(&a), Err(DispatchError::WouldCycle { .. })));

        // Tree unchanged.
        assert_eq!(ids(&flatten(&root)), vec![root.id(), a.id(), b.id()]);
    }

    #[test]
    fn kinds_do_not_mix() {
        let root = DispatchNode::root(NodeKind::Command);
        let events = DispatchNode::new(NodeKind::Event, NodeOwner::BuiltIn);
        assert!(matches!(
            root.include(&events),
            Err(DispatchError::KindMismatch { .. })
        ));
    }

    #[test]
    fn flatten_is_breadth_first_without_duplicates() {
        let root = DispatchNode::root(NodeKind::Command);
        let a = cmd("a");
        let b = cmd("b");
        let a1 = cmd("a1");
        let b1 = cmd("b1");
        root.include(&a).unwrap();
        root.include(&b).unwrap();
        a.include(&a1).unwrap();
        b.include(&b1).unwrap();

        let flat = flatten(&root);
        assert_eq!(
            ids(&flat),
            vec![root.id(), a.id(), b.id(), a1.id(), b1.id()]
        );
        let unique: HashSet<_> = ids(&flat).into_iter().collect();
        assert_eq!(unique.len(), flat.len());
    }

    #[test]
    fn arbitrary_include_exclude_sequences_keep_flatten_unique() {
        let root = DispatchNode::root(NodeKind::Command);
        let nodes: Vec<_> = (0..6).map(|i| cmd(&format!("n{i}"))).collect();
        let mut all = vec![Arc::clone(&root)];
        all.extend(nodes.iter().cloned());

        // Deterministic pseudo-random walk over include/exclude pairs,
        // including attempts to re-include ancestors.
        let mut seed: u32 = 7;
        for _ in 0..200 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let p = (seed >> 8) as usize % all.len();
            let c = (seed >> 16) as usize % all.len();
            if seed % 3 == 0 {
                let _ = all[p].exclude(&all[c]);
            } else {
                let _ = all[p].include(&all[c]);
            }

            let flat = flatten(&root);
            let unique: HashSet<_> = ids(&flat).into_iter().collect();
            assert_eq!(unique.len(), flat.len());
            for node in &all {
                let parents = all.iter().filter(|p| p.contains(node)).count();
                assert!(parents <= 1, "node has {parents} parents");
            }
        }
    }

    #[test]
    fn disabled_node_is_visible_but_not_active() {
        let root = DispatchNode::root(NodeKind::Command);
        let a = cmd("a");
        let a1 = cmd("a1");
        root.include(&a).unwrap();
        a.include(&a1).unwrap();

        a.disable();
        assert_eq!(flatten(&root).len(), 3);
        assert_eq!(ids(&flatten_active(&root)), vec![root.id()]);

        a.enable();
        a1.disable();
        assert_eq!(ids(&flatten_active(&root)), vec![root.id(), a.id()]);
    }

    #[test]
    fn flatten_active_during_concurrent_exclude_has_no_duplicates() {
        let root = DispatchNode::root(NodeKind::Command);
        let left = cmd("left");
        let right = cmd("right");
        let moving = cmd("moving");
        let leaf = cmd("leaf");
        root.include(&left).unwrap();
        root.include(&right).unwrap();
        moving.include(&leaf).unwrap();
        left.include(&moving).unwrap();
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                let moves = [(&left, &right), (&right, &left)];
                for (from, to) in moves.iter().cycle().take(2000) {
                    from.exclude(&moving);
                    to.include(&moving).unwrap();
                }
                done.store(true, Ordering::SeqCst);
            });

            while !done.load(Ordering::SeqCst) {
                let flat = flatten_active(&root);
                let unique: HashSet<NodeId> = flat.iter().map(|n| n.id()).collect();
                assert_eq!(unique.len(), flat.len());
                assert!(flat.len() <= 5);
            }
        });

        assert_eq!(flatten_active(&root).len(), 5);
    }

    #[test]
    fn owner_display() {
        assert_eq!(NodeOwner::BuiltIn.to_string(), "Built-in");
        assert_eq!(NodeOwner::addon("weather").to_string(), "weather");
        assert_eq!(NodeOwner::addon("weather").addon_name(), Some("weather"));
    }
}
