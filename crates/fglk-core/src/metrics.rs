#![forbid(unsafe_code)]

//! Renderer-supplied content metrics.
//!
//! The renderer measures its fonts and chrome and reports the result in the
//! `init` event and again on every `arrange`. Everything the engine knows
//! about pixels comes from here.

use serde::{Deserialize, Serialize};

use crate::geometry::WindowBox;

/// Pixel measurements of the display surface and its character cells.
///
/// Field names follow the wire format. Missing fields fall back to
/// [`ContentMetrics::default`], which describes a 1×1 cell with no spacing,
/// so a bare `{width, height}` object lays windows out in character units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentMetrics {
    /// Full display width.
    pub width: f64,
    /// Full display height.
    pub height: f64,
    /// Horizontal gap between the display edge and the root window.
    pub outspacingx: f64,
    /// Vertical gap between the display edge and the root window.
    pub outspacingy: f64,
    /// Width of the separator between side-by-side windows.
    pub inspacingx: f64,
    /// Height of the separator between stacked windows.
    pub inspacingy: f64,
    pub gridcharwidth: f64,
    pub gridcharheight: f64,
    pub gridmarginx: f64,
    pub gridmarginy: f64,
    pub buffercharwidth: f64,
    pub buffercharheight: f64,
    pub buffermarginx: f64,
    pub buffermarginy: f64,
}

impl Default for ContentMetrics {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            outspacingx: 0.0,
            outspacingy: 0.0,
            inspacingx: 0.0,
            inspacingy: 0.0,
            gridcharwidth: 1.0,
            gridcharheight: 1.0,
            gridmarginx: 0.0,
            gridmarginy: 0.0,
            buffercharwidth: 1.0,
            buffercharheight: 1.0,
            buffermarginx: 0.0,
            buffermarginy: 0.0,
        }
    }
}

impl ContentMetrics {
    /// Metrics for a `width`×`height` surface with default cells and no spacing.
    #[must_use]
    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Box available to the root window.
    #[must_use]
    pub fn content_box(&self) -> WindowBox {
        WindowBox::new(
            self.outspacingx,
            self.outspacingy,
            self.width - self.outspacingx,
            self.height - self.outspacingy,
        )
    }

    /// Column and row count of a text grid laid out in `bbox`.
    #[must_use]
    pub fn grid_size(&self, bbox: &WindowBox) -> (u32, u32) {
        (
            cells(bbox.width(), self.gridmarginx, self.gridcharwidth),
            cells(bbox.height(), self.gridmarginy, self.gridcharheight),
        )
    }

    /// Column and row count of a text buffer laid out in `bbox`.
    #[must_use]
    pub fn buffer_size(&self, bbox: &WindowBox) -> (u32, u32) {
        (
            cells(bbox.width(), self.buffermarginx, self.buffercharwidth),
            cells(bbox.height(), self.buffermarginy, self.buffercharheight),
        )
    }
}

/// `max(0, floor((extent - margin) / cell))`, saturating into `u32`.
fn cells(extent: f64, margin: f64, cell: f64) -> u32 {
    if cell <= 0.0 {
        return 0;
    }
    let count = ((extent - margin) / cell).floor();
    if count.is_nan() || count <= 0.0 {
        0
    } else if count >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        count as u32
    }
}
