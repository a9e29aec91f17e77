// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounding-box algebra and coordinate-system conversion.
//
// Two coordinate spaces meet in this crate: render space (origin top-left,
// y grows downward, what bitmaps and recognition engines report) and
// document space (origin bottom-left, y grows upward, what every emitted
// record uses). `BBox::flip_vertical` is the only bridge between them.

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, Result};

/// Axis-aligned rectangle `[x0, y0, x1, y1]` with `x0 < x1` and `y0 < y1`.
///
/// Serialises as a plain four-element array so emitted JSON carries no
/// engine-specific structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    /// Build a validated box. Rejects non-finite or degenerate edges.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self> {
        let bbox = Self { x0, y0, x1, y1 };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Build from an arbitrary-length slice as delivered by upstream records.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match values {
            [x0, y0, x1, y1] => Self::new(*x0, *y0, *x1, *y1),
            _ => Err(BlattwerkError::InvalidGeometry(format!(
                "expected 4 coordinates, got {}",
                values.len()
            ))),
        }
    }

    /// Check finiteness and strict edge ordering.
    pub fn validate(&self) -> Result<()> {
        let coords = [self.x0, self.y0, self.x1, self.y1];
        if coords.iter().any(|v| !v.is_finite()) {
            return Err(BlattwerkError::InvalidGeometry(format!(
                "non-finite coordinate in {:?}",
                coords
            )));
        }
        if self.x1 <= self.x0 || self.y1 <= self.y0 {
            return Err(BlattwerkError::InvalidGeometry(format!(
                "degenerate box {:?}",
                coords
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Centre point `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Not-disjoint on both axes. Touching edges do not count as overlap.
    pub fn intersects(&self, other: &BBox) -> bool {
        !(self.x1 <= other.x0
            || other.x1 <= self.x0
            || self.y1 <= other.y0
            || other.y1 <= self.y0)
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Mirror across the horizontal axis of a page of height `page_height`.
    ///
    /// Edges are swapped so `y0 < y1` still holds afterwards. Converts render
    /// space to document space (and back, given the same height).
    pub fn flip_vertical(&self, page_height: f64) -> BBox {
        BBox {
            x0: self.x0,
            y0: page_height - self.y1,
            x1: self.x1,
            y1: page_height - self.y0,
        }
    }

    /// Uniform scale, e.g. pixels to points via `1 / zoom`.
    pub fn scale(&self, factor: f64) -> BBox {
        BBox {
            x0: self.x0 * factor,
            y0: self.y0 * factor,
            x1: self.x1 * factor,
            y1: self.y1 * factor,
        }
    }

    /// Clip to `[0, width] x [0, height]`. Returns `None` when nothing is left.
    pub fn clamp_to(&self, width: f64, height: f64) -> Option<BBox> {
        let clipped = BBox {
            x0: self.x0.clamp(0.0, width),
            y0: self.y0.clamp(0.0, height),
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
        };
        clipped.validate().ok().map(|_| clipped)
    }

    /// Round every edge to `places` decimals.
    pub fn rounded(&self, places: u32) -> BBox {
        BBox {
            x0: round_to(self.x0, places),
            y0: round_to(self.y0, places),
            x1: round_to(self.x1, places),
            y1: round_to(self.y1, places),
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

impl From<BBox> for [f64; 4] {
    fn from(bbox: BBox) -> Self {
        bbox.to_array()
    }
}

impl TryFrom<[f64; 4]> for BBox {
    type Error = BlattwerkError;

    fn try_from(values: [f64; 4]) -> Result<Self> {
        Self::from_slice(&values)
    }
}

/// Page dimensions in the page's native unit (points or pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(BlattwerkError::Config(format!(
                "page geometry must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Page frame after a clockwise turn; quarter turns swap the sides.
    pub fn turned(&self, degrees: u32) -> PageSize {
        if degrees % 180 == 90 {
            PageSize {
                width: self.height,
                height: self.width,
            }
        } else {
            *self
        }
    }

    /// Whole-page rectangle.
    pub fn bbox(&self) -> BBox {
        BBox {
            x0: 0.0,
            y0: 0.0,
            x1: self.width,
            y1: self.height,
        }
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
