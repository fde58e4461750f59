use image::{GrayImage, RgbImage};
use imageproc::point::Point;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{HierarchyError, Result, TrackerError};
use crate::hierarchy::ContourHierarchy;

/// A color frame in RGB channel order.
pub type Frame = RgbImage;

/// A single-channel image where 255 marks foreground and 0 background.
pub type Mask = GrayImage;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// A pixel in 8-bit HSV: hue in half-degrees `[0, 180)`, saturation and value in `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
}

impl Hsv {
    pub fn new(hue: u8, saturation: u8, value: u8) -> Self {
        Self { hue, saturation, value }
    }
}

/// Inclusive HSV bounds used to classify pixels as foreground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ColorRange {
    pub hue_min: f64,
    pub hue_max: f64,
    pub saturation_min: f64,
    pub saturation_max: f64,
    pub value_min: f64,
    pub value_max: f64,
}

impl Default for ColorRange {
    fn default() -> Self {
        // Tuned for the blue wand marker.
        Self {
            hue_min: 100.0,
            hue_max: 130.0,
            saturation_min: 0.0,
            saturation_max: 255.0,
            value_min: 88.45,
            value_max: 255.0,
        }
    }
}

impl ColorRange {
    /// True iff every channel lies within its bounds, both ends inclusive.
    pub fn contains(&self, hsv: Hsv) -> bool {
        let (h, s, v) = (hsv.hue as f64, hsv.saturation as f64, hsv.value as f64);
        (self.hue_min..=self.hue_max).contains(&h)
            && (self.saturation_min..=self.saturation_max).contains(&s)
            && (self.value_min..=self.value_max).contains(&v)
    }

    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("hue", self.hue_min, self.hue_max),
            ("saturation", self.saturation_min, self.saturation_max),
            ("value", self.value_min, self.value_max),
        ];
        for (name, min, max) in bounds {
            if !(min <= max) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} range is empty: [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }
}

/// Width and height of a filter kernel or structuring element, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KernelSize {
    pub width: u32,
    pub height: u32,
}

impl KernelSize {
    pub const fn square(side: u32) -> Self {
        Self { width: side, height: side }
    }
}

/// A rectangular structuring element anchored at `(width / 2, height / 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
}

impl StructuringElement {
    pub fn rect(size: KernelSize) -> Result<Self> {
        if size.width == 0 || size.height == 0 {
            return Err(TrackerError::InvalidConfig(format!(
                "structuring element must be non-empty, got {}x{}",
                size.width, size.height
            )));
        }
        Ok(Self { width: size.width, height: size.height })
    }

    pub(crate) const fn square(side: u32) -> Self {
        assert!(side > 0);
        Self { width: side, height: side }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Source offsets read along one axis of length `size`: `[-size/2, size-1-size/2]`.
    pub(crate) fn offsets(size: u32) -> (i64, i64) {
        let anchor = (size / 2) as i64;
        (-anchor, size as i64 - 1 - anchor)
    }
}

/// Whether a boundary encloses a foreground region or a hole inside one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderKind {
    Outer,
    Hole,
}

/// Inclusive pixel bounds of a contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x + 1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y + 1) as u32
    }

    pub fn center(&self) -> [f32; 2] {
        [
            (self.min_x + self.max_x) as f32 / 2.0,
            (self.min_y + self.max_y) as f32 / 2.0,
        ]
    }
}

/// One boundary trace, in boundary-following order. Straight runs are compressed
/// to their end points.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
    pub kind: BorderKind,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>, kind: BorderKind) -> Self {
        Self { points, kind }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let init = BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(self.points.iter().fold(init, |b, p| BoundingBox {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }
}

/// All contours found in one mask together with their topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourSet {
    pub contours: Vec<Contour>,
    pub hierarchy: ContourHierarchy,
}

impl ContourSet {
    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// Number of points across every contour at every level.
    pub fn total_points(&self) -> usize {
        self.contours.iter().map(Contour::len).sum()
    }

    /// Top-level contours in sibling-chain order.
    pub fn top_level(&self) -> Result<Vec<&Contour>> {
        if self.hierarchy.len() != self.contours.len() {
            return Err(HierarchyError::SizeMismatch {
                nodes: self.hierarchy.len(),
                contours: self.contours.len(),
            }
            .into());
        }
        let mut top = Vec::new();
        for idx in self.hierarchy.roots() {
            top.push(&self.contours[idx?]);
        }
        Ok(top)
    }
}
