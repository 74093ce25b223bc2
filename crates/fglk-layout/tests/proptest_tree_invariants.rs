//! Property tests for window tree structure and layout.
//!
//! Random open/close sequences must keep the tree well formed, and layout
//! must be a pure function of the tree and the box it is given.

use fglk_core::codes::{Direction, Division, WinMethod};
use fglk_core::geometry::WindowBox;
use fglk_core::metrics::ContentMetrics;
use fglk_layout::{LeafKind, NodeKind, WindowTree};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Open {
        target: usize,
        direction: Direction,
        fixed: bool,
        size: u32,
        kind: LeafKind,
    },
    Close {
        target: usize,
    },
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Left),
        Just(Direction::Right),
        Just(Direction::Above),
        Just(Direction::Below),
    ]
}

fn leaf_kind() -> impl Strategy<Value = LeafKind> {
    prop_oneof![
        Just(LeafKind::Blank),
        Just(LeafKind::TextBuffer),
        Just(LeafKind::TextGrid),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<usize>(), direction(), any::<bool>(), 0u32..120, leaf_kind()).prop_map(
            |(target, direction, fixed, size, kind)| Op::Open {
                target,
                direction,
                fixed,
                size,
                kind,
            }
        ),
        1 => any::<usize>().prop_map(|target| Op::Close { target }),
    ]
}

fn metrics() -> impl Strategy<Value = ContentMetrics> {
    (100.0f64..1600.0, 100.0f64..1200.0, 0.0f64..12.0, 4.0f64..20.0).prop_map(
        |(width, height, spacing, cell)| ContentMetrics {
            inspacingx: spacing,
            inspacingy: spacing,
            gridcharwidth: cell,
            gridcharheight: cell * 2.0,
            buffercharwidth: cell,
            buffercharheight: cell * 2.0,
            ..ContentMetrics::with_size(width, height)
        },
    )
}

fn apply(tree: &mut WindowTree, op: &Op, m: &ContentMetrics) {
    let ids: Vec<_> = tree.iter().map(|node| node.id).collect();
    match *op {
        Op::Open {
            target,
            direction,
            fixed,
            size,
            kind,
        } => {
            let split = if ids.is_empty() {
                None
            } else {
                Some(ids[target % ids.len()])
            };
            let division = if fixed {
                Division::Fixed
            } else {
                Division::Proportional
            };
            let size = if fixed { size % 12 } else { size.min(100) };
            tree.open(split, WinMethod::new(direction, division).0, size, kind, 0, m)
                .expect("open with valid arguments succeeds");
        }
        Op::Close { target } => {
            if ids.is_empty() {
                return;
            }
            tree.close(ids[target % ids.len()], m)
                .expect("close of a live window succeeds");
        }
    }
}

fn leaf_boxes(tree: &WindowTree) -> Vec<(u32, WindowBox)> {
    tree.iter()
        .filter(|node| node.leaf_kind().is_some())
        .map(|node| (node.id.get(), node.bbox))
        .collect()
}

// ── structure ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn random_sequences_keep_tree_valid(
        ops in proptest::collection::vec(op(), 1..40),
        m in metrics(),
    ) {
        let mut tree = WindowTree::new();
        for op in &ops {
            apply(&mut tree, op, &m);
            prop_assert!(tree.validate().is_ok(), "invalid after {:?}: {:?}", op, tree.validate());

            let roots = tree.iter().filter(|node| node.parent.is_none()).count();
            prop_assert!(roots <= 1);
            prop_assert_eq!(roots == 1, tree.root().is_some());

            for node in tree.iter() {
                if let NodeKind::Pair(split) = node.kind {
                    prop_assert!(tree.contains(split.child1));
                    prop_assert!(tree.contains(split.child2));
                }
            }
        }
    }

    #[test]
    fn pair_count_is_leaf_count_minus_one(
        ops in proptest::collection::vec(op(), 1..40),
        m in metrics(),
    ) {
        let mut tree = WindowTree::new();
        for op in &ops {
            apply(&mut tree, op, &m);
        }
        let leaves = tree.iter().filter(|n| n.leaf_kind().is_some()).count();
        let pairs = tree.len() - leaves;
        prop_assert_eq!(pairs + usize::from(leaves > 0), leaves);
    }
}

// ── layout ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rearrange_is_idempotent(
        ops in proptest::collection::vec(op(), 1..30),
        m in metrics(),
    ) {
        let mut tree = WindowTree::new();
        for op in &ops {
            apply(&mut tree, op, &m);
        }
        let Some(root) = tree.root() else {
            return Ok(());
        };
        tree.rearrange(root, m.content_box(), &m).expect("layout");
        let first = leaf_boxes(&tree);
        tree.rearrange(root, m.content_box(), &m).expect("layout");
        prop_assert_eq!(first, leaf_boxes(&tree));
    }

    #[test]
    fn leaves_stay_inside_content_box(
        ops in proptest::collection::vec(op(), 1..30),
        m in metrics(),
    ) {
        // Separators wider than a collapsed span push boxes past their
        // parent, so containment only holds without them.
        let m = ContentMetrics { inspacingx: 0.0, inspacingy: 0.0, ..m };
        let mut tree = WindowTree::new();
        for op in &ops {
            apply(&mut tree, op, &m);
        }
        let outer = m.content_box();
        for (id, bbox) in leaf_boxes(&tree) {
            prop_assert!(bbox.left >= outer.left && bbox.top >= outer.top, "window {id}: {bbox:?}");
            prop_assert!(bbox.right <= outer.right && bbox.bottom <= outer.bottom, "window {id}: {bbox:?}");
        }
    }

    #[test]
    fn proportional_split_conserves_span(
        size in 0u32..=100,
        direction in direction(),
        m in metrics(),
    ) {
        let mut tree = WindowTree::new();
        let root = tree.open(None, 0, 0, LeafKind::TextBuffer, 0, &m).expect("root").window;
        let new = tree
            .open(
                Some(root),
                WinMethod::new(direction, Division::Proportional).0,
                size,
                LeafKind::TextBuffer,
                0,
                &m,
            )
            .expect("split")
            .window;
        let a = tree.get(root).expect("root").bbox;
        let b = tree.get(new).expect("new").bbox;
        let (total, gap, sum) = if direction.is_vertical() {
            (m.content_box().width(), m.inspacingx, a.width() + b.width())
        } else {
            (m.content_box().height(), m.inspacingy, a.height() + b.height())
        };
        prop_assert!((sum - (total - gap)).abs() < 1e-6);
        prop_assert!(a.width() >= 0.0 && a.height() >= 0.0);
        prop_assert!(b.width() >= 0.0 && b.height() >= 0.0);
    }
}
