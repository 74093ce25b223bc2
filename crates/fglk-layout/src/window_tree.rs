//! Window split tree with Glk layout semantics.
//!
//! Nodes live in a `BTreeMap` keyed by [`WindowId`]. Ids are handed out in
//! increasing order and never reused, so map order is creation order and
//! doubles as the iteration order the VM sees.
//!
//! Ownership runs strictly top-down: a pair lists its two children, and
//! every upward or sideways reference (`parent`, the pair's key window) is a
//! plain id looked up in the table.

use std::collections::BTreeMap;

use fglk_core::codes::{Direction, Division, WinMethod, WindowType};
use fglk_core::error::GlkError;
use fglk_core::geometry::WindowBox;
use fglk_core::metrics::ContentMetrics;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stable identifier for windows; doubles as the renderer's display key.
///
/// `0` is reserved so ids are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u32);

impl WindowId {
    /// Lowest valid window id.
    pub const MIN: Self = Self(1);

    /// Create a window id, rejecting 0.
    pub fn new(raw: u32) -> Result<Self, GlkError> {
        if raw == 0 {
            return Err(GlkError::InvalidWindow { op: "window_id" });
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Return the next id, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, GlkError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(GlkError::TreeCorrupted {
                detail: format!("window id overflow after {}", self.0),
            });
        };
        Self::new(next)
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::MIN
    }
}

/// Content-bearing window kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
    Blank,
    TextBuffer,
    TextGrid,
}

impl LeafKind {
    #[must_use]
    pub const fn window_type(self) -> WindowType {
        match self {
            Self::Blank => WindowType::Blank,
            Self::TextBuffer => WindowType::TextBuffer,
            Self::TextGrid => WindowType::TextGrid,
        }
    }
}

/// Split metadata of a pair window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairSplit {
    /// The window that was split.
    pub child1: WindowId,
    /// The window created by the split.
    pub child2: WindowId,
    /// Leaf whose natural size drives a fixed split; cleared when it closes.
    pub key: Option<WindowId>,
    /// Set when `key` was closed and geometry above this pair is stale.
    pub key_damage: bool,
    pub direction: Direction,
    pub division: Division,
    pub size: u32,
}

impl PairSplit {
    /// Left/Right splits divide the horizontal axis.
    #[must_use]
    pub const fn vertical(&self) -> bool {
        self.direction.is_vertical()
    }

    /// Left/Above place `child2` before `child1`.
    #[must_use]
    pub const fn backward(&self) -> bool {
        self.direction.is_backward()
    }

    /// `(direction | division)` as the VM encodes it.
    #[must_use]
    pub const fn method(&self) -> u32 {
        WinMethod::new(self.direction, self.division).0
    }
}

/// Payload of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Leaf { kind: LeafKind },
    Pair(PairSplit),
}

/// One window in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowNode {
    pub id: WindowId,
    pub rock: u32,
    pub parent: Option<WindowId>,
    /// Box assigned by the most recent layout pass.
    pub bbox: WindowBox,
    pub kind: NodeKind,
}

impl WindowNode {
    #[must_use]
    pub const fn window_type(&self) -> WindowType {
        match self.kind {
            NodeKind::Leaf { kind } => kind.window_type(),
            NodeKind::Pair(_) => WindowType::Pair,
        }
    }

    #[must_use]
    pub const fn leaf_kind(&self) -> Option<LeafKind> {
        match self.kind {
            NodeKind::Leaf { kind } => Some(kind),
            NodeKind::Pair(_) => None,
        }
    }

    #[must_use]
    pub const fn split(&self) -> Option<&PairSplit> {
        match &self.kind {
            NodeKind::Pair(split) => Some(split),
            NodeKind::Leaf { .. } => None,
        }
    }
}

/// A leaf and the box it was just given.
///
/// Layout passes return one of these per leaf they touch so the caller can
/// resize per-window state (grid line buffers) to match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafPlacement {
    pub id: WindowId,
    pub kind: LeafKind,
    pub bbox: WindowBox,
}

/// Result of [`WindowTree::open`].
#[derive(Debug, Clone, PartialEq)]
pub struct Opened {
    pub window: WindowId,
    /// Pair synthesized by the split, absent for the first window.
    pub pair: Option<WindowId>,
    pub placements: Vec<LeafPlacement>,
}

/// Result of [`WindowTree::close`].
#[derive(Debug, Clone, PartialEq)]
pub struct Closed {
    /// Every window removed, children before parents.
    pub removed: Vec<WindowId>,
    pub placements: Vec<LeafPlacement>,
}

/// The window collection and its layout state.
#[derive(Debug, Clone, Default)]
pub struct WindowTree {
    root: Option<WindowId>,
    next_id: WindowId,
    nodes: BTreeMap<WindowId, WindowNode>,
    geometry_changed: bool,
}

impl WindowTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn root(&self) -> Option<WindowId> {
        self.root
    }

    #[must_use]
    pub fn get(&self, id: WindowId) -> Option<&WindowNode> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: WindowId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All windows, pairs included, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &WindowNode> {
        self.nodes.values()
    }

    /// The window created after `prev`, or the first window for `None`.
    #[must_use]
    pub fn next_after(&self, prev: Option<WindowId>) -> Option<&WindowNode> {
        match prev {
            None => self.nodes.values().next(),
            Some(prev) => self
                .nodes
                .range(prev..)
                .find(|(id, _)| **id != prev)
                .map(|(_, node)| node),
        }
    }

    /// Whether a layout pass ran since the flag was last taken.
    #[must_use]
    pub const fn geometry_changed(&self) -> bool {
        self.geometry_changed
    }

    /// Read and clear the structure-changed flag.
    pub fn take_geometry_changed(&mut self) -> bool {
        std::mem::take(&mut self.geometry_changed)
    }

    fn node(&self, id: WindowId, op: &'static str) -> Result<&WindowNode, GlkError> {
        self.nodes.get(&id).ok_or(GlkError::InvalidWindow { op })
    }

    fn node_mut(&mut self, id: WindowId, op: &'static str) -> Result<&mut WindowNode, GlkError> {
        self.nodes.get_mut(&id).ok_or(GlkError::InvalidWindow { op })
    }

    fn allocate_id(&mut self) -> Result<WindowId, GlkError> {
        let id = self.next_id;
        self.next_id = id.checked_next()?;
        Ok(id)
    }

    /// Open a leaf window, splitting `split` if the tree is non-empty.
    ///
    /// The first window must be opened without a split target and fills the
    /// content box. Later windows must name an existing window to split and
    /// a method whose direction is valid and whose division is fixed or
    /// proportional.
    pub fn open(
        &mut self,
        split: Option<WindowId>,
        method: u32,
        size: u32,
        kind: LeafKind,
        rock: u32,
        metrics: &ContentMetrics,
    ) -> Result<Opened, GlkError> {
        const OP: &str = "window_open";

        let Some(split) = split else {
            if self.root.is_some() {
                return Err(GlkError::SplitTarget {
                    op: OP,
                    expected: true,
                });
            }
            let window = self.allocate_id()?;
            self.insert_leaf(window, kind, rock, None);
            self.root = Some(window);
            let placements = self.rearrange(window, metrics.content_box(), metrics)?;
            debug!(window = window.get(), ?kind, "opened root window");
            return Ok(Opened {
                window,
                pair: None,
                placements,
            });
        };

        if self.root.is_none() {
            return Err(GlkError::SplitTarget {
                op: OP,
                expected: false,
            });
        }
        let target = self.node(split, OP)?;
        let old_parent = target.parent;
        let old_box = target.bbox;

        let method = WinMethod(method);
        let Some(direction) = method.direction() else {
            return Err(GlkError::InvalidDirection {
                op: OP,
                method: method.0,
            });
        };
        let division = method.division();
        if !matches!(division, Division::Fixed | Division::Proportional) {
            return Err(GlkError::InvalidDivision {
                op: OP,
                method: method.0,
            });
        }

        let window = self.allocate_id()?;
        let pair = self.allocate_id()?;
        self.insert_leaf(window, kind, rock, Some(pair));
        self.nodes.insert(
            pair,
            WindowNode {
                id: pair,
                rock: 0,
                parent: old_parent,
                bbox: old_box,
                kind: NodeKind::Pair(PairSplit {
                    child1: split,
                    child2: window,
                    key: Some(window),
                    key_damage: false,
                    direction,
                    division,
                    size,
                }),
            },
        );

        match old_parent {
            Some(parent) => self.replace_child(parent, split, pair)?,
            None => self.root = Some(pair),
        }
        self.node_mut(split, OP)?.parent = Some(pair);

        let placements = self.rearrange(pair, old_box, metrics)?;
        debug!(
            window = window.get(),
            pair = pair.get(),
            split = split.get(),
            ?direction,
            ?division,
            size,
            "split window"
        );
        Ok(Opened {
            window,
            pair: Some(pair),
            placements,
        })
    }

    fn insert_leaf(&mut self, id: WindowId, kind: LeafKind, rock: u32, parent: Option<WindowId>) {
        self.nodes.insert(
            id,
            WindowNode {
                id,
                rock,
                parent,
                bbox: WindowBox::default(),
                kind: NodeKind::Leaf { kind },
            },
        );
    }

    fn replace_child(
        &mut self,
        parent_id: WindowId,
        old_child: WindowId,
        new_child: WindowId,
    ) -> Result<(), GlkError> {
        let parent = self
            .nodes
            .get_mut(&parent_id)
            .ok_or_else(|| corrupted(format!("missing parent {}", parent_id.0)))?;
        let NodeKind::Pair(split) = &mut parent.kind else {
            return Err(corrupted(format!("parent {} is not a pair", parent_id.0)));
        };
        if split.child1 == old_child {
            split.child1 = new_child;
        } else if split.child2 == old_child {
            split.child2 = new_child;
        } else {
            return Err(corrupted(format!(
                "pair {} does not list child {}",
                parent_id.0, old_child.0
            )));
        }
        Ok(())
    }

    /// Close a window and everything below it.
    ///
    /// Closing the root empties the tree. Otherwise the window's pair is
    /// removed too, its sibling takes the pair's slot, and either the
    /// sibling is laid out in the pair's old box or, if the close damaged
    /// some ancestor's key window, the whole tree is laid out again.
    pub fn close(&mut self, win: WindowId, metrics: &ContentMetrics) -> Result<Closed, GlkError> {
        const OP: &str = "window_close";

        let node = self.node(win, OP)?;
        let Some(pair_id) = node.parent else {
            self.root = None;
            let removed = self.close_recursive(win, true);
            self.geometry_changed = true;
            debug!(window = win.get(), removed = removed.len(), "closed root window");
            return Ok(Closed {
                removed,
                placements: Vec::new(),
            });
        };

        let pair = self
            .nodes
            .get(&pair_id)
            .ok_or_else(|| corrupted(format!("missing parent {}", pair_id.0)))?;
        let Some(split) = pair.split() else {
            return Err(corrupted(format!("parent {} is not a pair", pair_id.0)));
        };
        let sibling = if split.child1 == win {
            split.child2
        } else if split.child2 == win {
            split.child1
        } else {
            return Err(corrupted(format!(
                "pair {} does not list child {}",
                pair_id.0, win.0
            )));
        };
        let pair_box = pair.bbox;
        let grandparent = pair.parent;

        match grandparent {
            Some(grandparent) => self.replace_child(grandparent, pair_id, sibling)?,
            None => self.root = Some(sibling),
        }
        self.node_mut(sibling, OP)?.parent = grandparent;

        let mut removed = self.close_recursive(win, true);
        removed.extend(self.close_recursive(pair_id, false));

        let mut damaged = false;
        let mut cursor = Some(sibling);
        while let Some(id) = cursor {
            let Some(node) = self.nodes.get_mut(&id) else {
                break;
            };
            if let NodeKind::Pair(split) = &mut node.kind
                && split.key_damage
            {
                split.key_damage = false;
                damaged = true;
            }
            cursor = node.parent;
        }

        let placements = if damaged {
            let root = self
                .root
                .ok_or_else(|| corrupted("tree lost its root during close".to_string()))?;
            self.rearrange(root, metrics.content_box(), metrics)?
        } else {
            self.rearrange(sibling, pair_box, metrics)?
        };
        debug!(
            window = win.get(),
            sibling = sibling.get(),
            removed = removed.len(),
            damaged,
            "closed window"
        );
        Ok(Closed {
            removed,
            placements,
        })
    }

    /// Remove `id` (and, for a pair with `recurse`, its subtree).
    ///
    /// Any ancestor pair keyed on `id` loses its key and is marked damaged.
    fn close_recursive(&mut self, id: WindowId, recurse: bool) -> Vec<WindowId> {
        let mut cursor = self.nodes.get(&id).and_then(|node| node.parent);
        while let Some(ancestor) = cursor {
            let Some(node) = self.nodes.get_mut(&ancestor) else {
                break;
            };
            if let NodeKind::Pair(split) = &mut node.kind
                && split.key == Some(id)
            {
                split.key = None;
                split.key_damage = true;
            }
            cursor = node.parent;
        }

        let mut removed = Vec::new();
        if recurse
            && let Some(NodeKind::Pair(split)) = self.nodes.get(&id).map(|node| node.kind)
        {
            removed.extend(self.close_recursive(split.child1, true));
            removed.extend(self.close_recursive(split.child2, true));
        }
        if self.nodes.remove(&id).is_some() {
            removed.push(id);
        }
        removed
    }

    /// Lay out `win` and its subtree in `bbox`.
    pub fn rearrange(
        &mut self,
        win: WindowId,
        bbox: WindowBox,
        metrics: &ContentMetrics,
    ) -> Result<Vec<LeafPlacement>, GlkError> {
        let mut placements = Vec::new();
        self.rearrange_node(win, bbox, metrics, &mut placements)?;
        Ok(placements)
    }

    fn rearrange_node(
        &mut self,
        win: WindowId,
        bbox: WindowBox,
        metrics: &ContentMetrics,
        placements: &mut Vec<LeafPlacement>,
    ) -> Result<(), GlkError> {
        self.geometry_changed = true;
        let node = self.node_mut(win, "window_rearrange")?;
        node.bbox = bbox;
        let split = match node.kind {
            NodeKind::Leaf { kind } => {
                placements.push(LeafPlacement {
                    id: win,
                    kind,
                    bbox,
                });
                return Ok(());
            }
            NodeKind::Pair(split) => split,
        };

        let vertical = split.vertical();
        let (min, max) = bbox.span(vertical);
        let split_width = if vertical {
            metrics.inspacingx
        } else {
            metrics.inspacingy
        };
        let diff = max - min;

        let mut offset = match split.division {
            Division::Proportional => (diff * f64::from(split.size) / 100.0).floor(),
            Division::Fixed => {
                let key_kind = split
                    .key
                    .and_then(|key| self.nodes.get(&key))
                    .and_then(WindowNode::leaf_kind);
                let size = f64::from(split.size);
                let natural = match (key_kind, vertical) {
                    (Some(LeafKind::TextBuffer), true) => {
                        size * metrics.buffercharwidth + metrics.buffermarginx
                    }
                    (Some(LeafKind::TextBuffer), false) => {
                        size * metrics.buffercharheight + metrics.buffermarginy
                    }
                    (Some(LeafKind::TextGrid), true) => {
                        size * metrics.gridcharwidth + metrics.gridmarginx
                    }
                    (Some(LeafKind::TextGrid), false) => {
                        size * metrics.gridcharheight + metrics.gridmarginy
                    }
                    _ => 0.0,
                };
                natural.ceil()
            }
            Division::Other(_) => (diff / 2.0).floor(),
        };

        offset = if split.backward() {
            min + offset
        } else {
            max - offset - split_width
        };
        if min >= max {
            offset = min;
        } else {
            offset = offset.max(min).min(max - split_width);
        }

        let box1 = bbox.with_span(vertical, min, offset);
        let box2 = bbox.with_span(vertical, offset + split_width, max);
        let (first, second) = if split.backward() {
            (split.child2, split.child1)
        } else {
            (split.child1, split.child2)
        };
        self.rearrange_node(first, box1, metrics, placements)?;
        self.rearrange_node(second, box2, metrics, placements)
    }

    /// Change a pair's split method, size and key window, then lay it out.
    ///
    /// `key` of `None` keeps the current key. The split may flip between
    /// Left/Right or Above/Below but not change orientation.
    pub fn set_arrangement(
        &mut self,
        pair: WindowId,
        method: u32,
        size: u32,
        key: Option<WindowId>,
        metrics: &ContentMetrics,
    ) -> Result<Vec<LeafPlacement>, GlkError> {
        const OP: &str = "window_set_arrangement";

        let node = self.node(pair, OP)?;
        let Some(current) = node.split().copied() else {
            return Err(GlkError::NotPairWindow { op: OP });
        };
        let bbox = node.bbox;

        if let Some(key) = key {
            if self.node(key, OP)?.split().is_some() {
                return Err(GlkError::KeyWindowIsPair);
            }
            if !self.is_ancestor(pair, key) {
                return Err(GlkError::KeyWindowNotDescendant);
            }
        }

        let method = WinMethod(method);
        let Some(direction) = method.direction() else {
            return Err(GlkError::InvalidDirection {
                op: OP,
                method: method.0,
            });
        };
        if direction.is_vertical() != current.vertical() {
            return Err(GlkError::SplitOrientationChange);
        }

        let key = key.or(current.key);
        let division = method.division();
        let key_is_blank = key
            .and_then(|key| self.nodes.get(&key))
            .and_then(WindowNode::leaf_kind)
            == Some(LeafKind::Blank);
        if key_is_blank && division == Division::Fixed {
            return Err(GlkError::BlankFixedSize);
        }

        let node = self.node_mut(pair, OP)?;
        if let NodeKind::Pair(split) = &mut node.kind {
            if direction.is_backward() != split.backward() {
                std::mem::swap(&mut split.child1, &mut split.child2);
            }
            split.direction = direction;
            split.division = division;
            split.key = key;
            split.size = size;
        }
        self.rearrange(pair, bbox, metrics)
    }

    /// `(method, size, key)` of a pair window.
    pub fn arrangement(&self, pair: WindowId) -> Result<(u32, u32, Option<WindowId>), GlkError> {
        const OP: &str = "window_get_arrangement";
        let Some(split) = self.node(pair, OP)?.split() else {
            return Err(GlkError::NotPairWindow { op: OP });
        };
        Ok((split.method(), split.size, split.key))
    }

    /// Whether `ancestor` is `node` or lies on its parent chain.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: WindowId, node: WindowId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    pub fn parent(&self, win: WindowId) -> Result<Option<WindowId>, GlkError> {
        Ok(self.node(win, "window_get_parent")?.parent)
    }

    /// The other child of `win`'s parent; `None` for the root.
    pub fn sibling(&self, win: WindowId) -> Result<Option<WindowId>, GlkError> {
        const OP: &str = "window_get_sibling";
        let Some(parent) = self.node(win, OP)?.parent else {
            return Ok(None);
        };
        let split = self
            .node(parent, OP)?
            .split()
            .ok_or_else(|| corrupted(format!("parent {} is not a pair", parent.0)))?;
        Ok(Some(if split.child1 == win {
            split.child2
        } else {
            split.child1
        }))
    }

    /// Character-cell size of a leaf; `(0, 0)` for pair and blank windows.
    pub fn size_in_chars(
        &self,
        win: WindowId,
        metrics: &ContentMetrics,
    ) -> Result<(u32, u32), GlkError> {
        let node = self.node(win, "window_get_size")?;
        Ok(match node.leaf_kind() {
            Some(LeafKind::TextGrid) => metrics.grid_size(&node.bbox),
            Some(LeafKind::TextBuffer) => metrics.buffer_size(&node.bbox),
            Some(LeafKind::Blank) | None => (0, 0),
        })
    }

    /// Check the structural invariants: one root, two live children per
    /// pair, and parent links that agree with child lists.
    pub fn validate(&self) -> Result<(), GlkError> {
        let Some(root) = self.root else {
            if self.nodes.is_empty() {
                return Ok(());
            }
            return Err(corrupted(format!("{} windows but no root", self.nodes.len())));
        };
        let root_node = self
            .nodes
            .get(&root)
            .ok_or_else(|| corrupted(format!("root {} missing", root.0)))?;
        if root_node.parent.is_some() {
            return Err(corrupted(format!("root {} has a parent", root.0)));
        }

        let mut reached = 0usize;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            reached += 1;
            if reached > self.nodes.len() {
                return Err(corrupted("cycle in window tree".to_string()));
            }
            let node = self
                .nodes
                .get(&id)
                .ok_or_else(|| corrupted(format!("window {} missing", id.0)))?;
            let Some(split) = node.split() else {
                continue;
            };
            if split.child1 == split.child2 {
                return Err(corrupted(format!("pair {} lists one child twice", id.0)));
            }
            for child in [split.child1, split.child2] {
                let child_node = self
                    .nodes
                    .get(&child)
                    .ok_or_else(|| corrupted(format!("pair {} child {} missing", id.0, child.0)))?;
                if child_node.parent != Some(id) {
                    return Err(corrupted(format!(
                        "window {} parent mismatch under pair {}",
                        child.0, id.0
                    )));
                }
                stack.push(child);
            }
            if let Some(key) = split.key
                && !self.is_ancestor(id, key)
            {
                return Err(corrupted(format!("pair {} key {} outside subtree", id.0, key.0)));
            }
        }
        if reached != self.nodes.len() {
            return Err(corrupted(format!(
                "{} windows unreachable from root",
                self.nodes.len() - reached
            )));
        }
        Ok(())
    }
}

fn corrupted(detail: String) -> GlkError {
    GlkError::TreeCorrupted { detail }
}
