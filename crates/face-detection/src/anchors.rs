// RetinaFace / SCRFD anchor center generation
//
// The 3-stride detector predicts boxes and landmarks relative to anchor
// centers laid out on each feature map grid. This model has no per-anchor
// offset: the anchors of one cell share the cell's top-left corner as their
// center.
//
// Layout for a 640x640 input with 2 anchors per cell:
// - Stride 8:  80x80 grid = 12800 anchors
// - Stride 16: 40x40 grid = 3200 anchors
// - Stride 32: 20x20 grid = 800 anchors

use face_analysis_common::Point;
use std::collections::HashMap;

/// Feature map strides, finest first
pub const STRIDES: [usize; 3] = [8, 16, 32];

/// Anchors predicted per grid cell
pub const NUM_ANCHORS: usize = 2;

/// Generate anchor centers for one feature map in row-major order
///
/// For grid row `i` and column `j` the center `(j * stride, i * stride)` is
/// repeated `num_anchors` times.
#[must_use]
pub fn anchor_centers(height: usize, width: usize, stride: usize, num_anchors: usize) -> Vec<Point> {
    let mut centers = Vec::with_capacity(height * width * num_anchors);

    for i in 0..height {
        let cy = (i * stride) as f32;
        for j in 0..width {
            let cx = (j * stride) as f32;
            for _ in 0..num_anchors {
                centers.push(Point::new(cx, cy));
            }
        }
    }

    centers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AnchorKey {
    height: usize,
    width: usize,
    stride: usize,
    num_anchors: usize,
}

/// Read-through cache of anchor center tables
///
/// Keyed by the exact grid size, stride and anchor count, so a table is never
/// reused for a different input size.
#[derive(Debug, Default)]
pub struct AnchorCache {
    tables: HashMap<AnchorKey, Vec<Point>>,
}

impl AnchorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor centers for the given grid, generated on first use
    pub fn get_or_generate(
        &mut self,
        height: usize,
        width: usize,
        stride: usize,
        num_anchors: usize,
    ) -> &[Point] {
        let key = AnchorKey {
            height,
            width,
            stride,
            num_anchors,
        };
        self.tables
            .entry(key)
            .or_insert_with(|| anchor_centers(height, width, stride, num_anchors))
    }

    /// Number of cached tables
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
