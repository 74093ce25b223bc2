#![forbid(unsafe_code)]

//! Geometric primitives.

use serde::{Deserialize, Serialize};

/// A layout rectangle in renderer pixels.
///
/// Edges are stored rather than an origin and size so that splitting a box
/// along either axis is a matter of moving one edge. Coordinates are `f64`
/// because the renderer reports fractional character cells.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowBox {
    /// Left edge (inclusive).
    pub left: f64,
    /// Top edge (inclusive).
    pub top: f64,
    /// Right edge (exclusive).
    pub right: f64,
    /// Bottom edge (exclusive).
    pub bottom: f64,
}

impl WindowBox {
    /// Create a new box from its four edges.
    #[inline]
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a box anchored at the origin with the given size.
    #[inline]
    pub const fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Horizontal extent (may be negative for a degenerate box).
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Vertical extent (may be negative for a degenerate box).
    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Whether the box encloses no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Span along one axis: `(left, right)` when `vertical`, else `(top, bottom)`.
    ///
    /// A vertical split line divides the box into left and right halves, so
    /// its offset lives on the horizontal axis.
    #[inline]
    pub fn span(&self, vertical: bool) -> (f64, f64) {
        if vertical {
            (self.left, self.right)
        } else {
            (self.top, self.bottom)
        }
    }

    /// Copy of this box with the split axis narrowed to `[min, max]`.
    #[inline]
    pub fn with_span(&self, vertical: bool, min: f64, max: f64) -> Self {
        if vertical {
            Self::new(min, self.top, max, self.bottom)
        } else {
            Self::new(self.left, min, self.right, max)
        }
    }
}
