use image::{Luma, Rgb};
use crate::{
    error::Result,
    traits::ColorSegmenter,
    types::{BACKGROUND, ColorRange, FOREGROUND, Frame, Hsv, Mask},
};

/// Convert an RGB pixel to 8-bit HSV.
///
/// Hue is stored in half-degrees so it fits a byte. The maximum channel decides
/// the hue sector, with red taking priority over green and green over blue.
pub fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> Hsv {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let degrees = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };

    let hue = (degrees / 2.0).round() as u32 % 180;
    Hsv::new(hue as u8, saturation.round() as u8, max as u8)
}

/// Marks pixels whose HSV triple falls inside a [`ColorRange`]
#[derive(Debug, Clone, Default)]
pub struct HsvRangeSegmenter {
    pub range: ColorRange,
}

impl HsvRangeSegmenter {
    pub fn new(range: ColorRange) -> Self {
        Self { range }
    }
}

impl ColorSegmenter for HsvRangeSegmenter {
    fn segment(&self, frame: &Frame) -> Result<Mask> {
        Ok(segment(frame, &self.range))
    }
}

/// Binary mask of the pixels of `frame` inside `range`.
pub fn segment(frame: &Frame, range: &ColorRange) -> Mask {
    let (width, height) = frame.dimensions();
    Mask::from_fn(width, height, |x, y| {
        if range.contains(rgb_to_hsv(*frame.get_pixel(x, y))) {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}
