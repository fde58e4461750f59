use imageproc::contours::BorderType;
use imageproc::point::Point;
use crate::{
    error::{HierarchyError, Result},
    hierarchy::ContourHierarchy,
    traits::ContourExtractor,
    types::{BorderKind, Contour, ContourSet, Mask},
};

/// Imageproc border following, reduced to a two-level hierarchy.
///
/// Outer boundaries are all top-level, including islands sitting inside a hole.
/// Each hole hangs off the nearest outer boundary that encloses it. Straight runs
/// of boundary pixels keep only their end points.
#[derive(Debug, Clone, Default)]
pub struct TwoLevelContourExtractor;

impl ContourExtractor for TwoLevelContourExtractor {
    fn extract(&self, mask: &Mask) -> Result<ContourSet> {
        let traced = imageproc::contours::find_contours::<i32>(&with_background_border(mask));
        if traced.is_empty() {
            return Ok(ContourSet::default());
        }

        let parents = traced
            .iter()
            .enumerate()
            .map(|(idx, contour)| match contour.border_type {
                BorderType::Outer => Ok(None),
                BorderType::Hole => enclosing_outer(&traced, idx).map(Some),
            })
            .collect::<std::result::Result<Vec<_>, HierarchyError>>()?;
        let hierarchy = ContourHierarchy::from_parents(&parents)?;

        let contours = traced
            .into_iter()
            .map(|contour| {
                let kind = match contour.border_type {
                    BorderType::Outer => BorderKind::Outer,
                    BorderType::Hole => BorderKind::Hole,
                };
                let points: Vec<Point<i32>> = contour
                    .points
                    .iter()
                    .map(|p| Point::new(p.x - 1, p.y - 1))
                    .collect();
                Contour::new(compress_chain(&points), kind)
            })
            .collect();

        Ok(ContourSet { contours, hierarchy })
    }
}

/// Copy of `mask` framed by a 1-pixel background border.
///
/// Border following only starts an outer boundary next to a background pixel,
/// so regions touching the image edge would otherwise be traced as holes.
/// Traced points lie on foreground pixels, so shifting them back by one stays
/// inside the original image.
fn with_background_border(mask: &Mask) -> Mask {
    let (width, height) = mask.dimensions();
    let mut framed = Mask::new(width + 2, height + 2);
    image::imageops::replace(&mut framed, mask, 1, 1);
    framed
}

/// Walk up the full tree until an outer boundary is found.
fn enclosing_outer(
    traced: &[imageproc::contours::Contour<i32>],
    hole: usize,
) -> std::result::Result<usize, HierarchyError> {
    let mut current = traced[hole].parent;
    // A well-formed tree is never deeper than the number of contours.
    for _ in 0..traced.len() {
        let Some(idx) = current else { break };
        let contour = traced.get(idx).ok_or(HierarchyError::DanglingLink {
            from: hole,
            to: idx,
            len: traced.len(),
        })?;
        if contour.border_type == BorderType::Outer {
            return Ok(idx);
        }
        current = contour.parent;
    }
    Err(HierarchyError::OrphanHole(hole))
}

/// Drop every point whose incoming and outgoing steps are identical.
///
/// The chain is closed, so the first and last points are compared cyclically.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n <= 2 {
        return points.to_vec();
    }
    let step = |from: Point<i32>, to: Point<i32>| (to.x - from.x, to.y - from.y);

    let kept: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    // A closed chain always turns somewhere; keep the start if it somehow does not.
    if kept.is_empty() {
        vec![points[0]]
    } else {
        kept
    }
}
