// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Visual artifact classification: signatures, stamps and logos from image
// region geometry alone. Rules are checked signature, stamp, logo; the first
// match wins.

use blattwerk_core::geometry::{BBox, PageSize, round_to};
use blattwerk_core::records::{ArtifactKind, ArtifactSource, LogEntry, VisualArtifact};
use blattwerk_core::types::RawRegion;
use tracing::{debug, warn};

/// Regions smaller than this share of the page are never classified.
pub const MIN_AREA_RATIO: f64 = 5e-4;

/// Page-relative shape of a region (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionShape {
    pub area_ratio: f64,
    pub aspect: f64,
    pub center_y: f64,
}

impl RegionShape {
    pub fn measure(bbox: &BBox, page: &PageSize) -> Self {
        let (_, cy) = bbox.center();
        Self {
            area_ratio: bbox.area() / page.area(),
            aspect: bbox.width() / bbox.height(),
            center_y: cy / page.height,
        }
    }
}

/// Classify a region. `None` when no rule applies.
pub fn classify(shape: RegionShape) -> Option<(ArtifactKind, f64)> {
    let RegionShape {
        area_ratio: area,
        aspect,
        center_y,
    } = shape;
    if area < MIN_AREA_RATIO {
        return None;
    }
    if center_y > 0.6 && aspect >= 2.5 && area < 0.1 {
        let conf = 0.55 + ((aspect - 2.5) * 0.1).min(0.4);
        return Some((ArtifactKind::Signature, conf.min(1.0)));
    }
    if (0.5..=1.5).contains(&aspect) && (0.003..=0.1).contains(&area) {
        let conf = 0.6 + (0.1 - (aspect - 1.0).abs()) * 1.2;
        return Some((ArtifactKind::Stamp, conf.min(1.0)));
    }
    if center_y < 0.25 && area <= 0.15 {
        let conf = 0.6 + (0.15 - area) * 1.5;
        return Some((ArtifactKind::Logo, conf.min(1.0)));
    }
    None
}

/// Classified artifacts for one page plus their log entries and warnings.
#[derive(Debug, Clone, Default)]
pub struct PageArtifacts {
    pub artifacts: Vec<VisualArtifact>,
    pub logs: Vec<LogEntry>,
    pub warnings: Vec<String>,
}

/// Classify every image region on a page. Region boxes are in render space
/// (top-left origin); emitted boxes are flipped to document space.
pub fn detect_artifacts(page: u32, size: &PageSize, regions: &[RawRegion]) -> PageArtifacts {
    let mut out = PageArtifacts::default();
    for region in regions {
        let bbox = match BBox::from_slice(&region.bbox) {
            Ok(bbox) => bbox,
            Err(err) => {
                warn!(page, error = %err, "Skipping image region with invalid bbox");
                out.warnings.push(format!("invalid_bbox:p{}:image_region", page));
                continue;
            }
        };
        let shape = RegionShape::measure(&bbox, size);
        let Some((kind, confidence)) = classify(shape) else {
            continue;
        };
        let confidence = round_to(confidence, 2);
        debug!(page, ?kind, confidence, "Visual artifact detected");
        out.logs.push(
            LogEntry::new("visual_artifact", "detected", Some(page))
                .with("kind", format!("{:?}", kind).to_lowercase())
                .with("conf", confidence),
        );
        out.artifacts.push(VisualArtifact {
            page,
            bbox: bbox.flip_vertical(size.height).rounded(2),
            kind,
            confidence,
            source: ArtifactSource::Image,
        });
    }
    out
}
