use crate::{
    error::Result,
    traits::MaskFilter,
    types::{BACKGROUND, FOREGROUND, KernelSize, Mask, StructuringElement},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Erode,
    Dilate,
}

impl Operation {
    /// Whether a window holding `count` foreground pixels out of `window` sets the output.
    fn keeps(self, count: usize, window: usize) -> bool {
        match self {
            Self::Erode => count == window,
            Self::Dilate => count > 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Morphological erosion with a rectangular element.
///
/// Any non-zero pixel counts as foreground. Pixels outside the image are
/// ignored, so the border never erodes a region.
pub fn erode(mask: &Mask, element: StructuringElement) -> Mask {
    rank_filter(mask, element, Operation::Erode)
}

/// Morphological dilation with a rectangular element.
pub fn dilate(mask: &Mask, element: StructuringElement) -> Mask {
    rank_filter(mask, element, Operation::Dilate)
}

// A rectangle is separable: rows first, then columns.
fn rank_filter(mask: &Mask, element: StructuringElement, op: Operation) -> Mask {
    let rows = sweep(mask, element.width(), Axis::Horizontal, op);
    sweep(&rows, element.height(), Axis::Vertical, op)
}

/// One 1-D pass keeping a running foreground count per clipped window.
fn sweep(mask: &Mask, size: u32, axis: Axis, op: Operation) -> Mask {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let (lo, hi) = StructuringElement::offsets(size);
    let src = mask.as_raw();

    let mut out = Mask::new(width, height);
    let dst: &mut [u8] = &mut out;

    // (line count, line length, line start stride, element step)
    let (lines, len, stride, step) = match axis {
        Axis::Horizontal => (h, w, w, 1),
        Axis::Vertical => (w, h, 1, w),
    };
    let len = len as i64;

    for line in 0..lines {
        let base = line * stride;
        let index = move |t: i64| base + t as usize * step;
        let lit = |t: i64| src[index(t)] != BACKGROUND;

        let mut count = (0..=hi.min(len - 1)).filter(|&t| lit(t)).count();
        for pos in 0..len {
            let start = (pos + lo).max(0);
            let end = (pos + hi).min(len - 1);
            if op.keeps(count, (end - start + 1) as usize) {
                dst[index(pos)] = FOREGROUND;
            }

            if pos + lo >= 0 && lit(pos + lo) {
                count -= 1;
            }
            if pos + hi + 1 < len && lit(pos + hi + 1) {
                count += 1;
            }
        }
    }
    out
}

/// Repeated erosion followed by repeated dilation.
///
/// The default erodes twice with a 12x12 element, then dilates twice with a
/// 24x24 element. This is not a symmetric opening: regions that survive come
/// back larger than they started, and regions narrower than the total erosion
/// vanish for good.
#[derive(Debug, Clone)]
pub struct ErodeDilateFilter {
    pub erode_element: StructuringElement,
    pub erode_passes: u32,
    pub dilate_element: StructuringElement,
    pub dilate_passes: u32,
}

impl ErodeDilateFilter {
    pub fn new(
        erode_kernel: KernelSize,
        erode_passes: u32,
        dilate_kernel: KernelSize,
        dilate_passes: u32,
    ) -> Result<Self> {
        Ok(Self {
            erode_element: StructuringElement::rect(erode_kernel)?,
            erode_passes,
            dilate_element: StructuringElement::rect(dilate_kernel)?,
            dilate_passes,
        })
    }
}

impl Default for ErodeDilateFilter {
    fn default() -> Self {
        Self {
            erode_element: StructuringElement::square(12),
            erode_passes: 2,
            dilate_element: StructuringElement::square(24),
            dilate_passes: 2,
        }
    }
}

impl MaskFilter for ErodeDilateFilter {
    fn clean(&self, mask: &Mask) -> Result<Mask> {
        let mut out = mask.clone();
        for _ in 0..self.erode_passes {
            out = erode(&out, self.erode_element);
        }
        for _ in 0..self.dilate_passes {
            out = dilate(&out, self.dilate_element);
        }
        Ok(out)
    }
}
