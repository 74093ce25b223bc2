#![forbid(unsafe_code)]

//! Window tree for the fglk engine.
//!
//! Leaf windows (blank, text buffer, text grid) hang off pair windows that
//! split their box between two children. The tree owns nothing but ids and
//! geometry; window content and streams live in `fglk-runtime`, keyed by
//! the same [`WindowId`].

pub mod window_tree;

pub use window_tree::{
    Closed, LeafKind, LeafPlacement, NodeKind, Opened, PairSplit, WindowId, WindowNode,
    WindowTree,
};
