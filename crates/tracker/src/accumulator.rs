use imageproc::point::Point;
use serde::Serialize;

use crate::types::Contour;

/// Append-only record of every contour point seen during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedPointLog {
    points: Vec<Point<i32>>,
    frames: u64,
}

impl TrackedPointLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of frames that contributed, including frames with no contours.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn report(&self) -> PointReport {
        PointReport {
            frames: self.frames,
            points: self.points.iter().map(|p| [p.x, p.y]).collect(),
        }
    }
}

/// Serializable snapshot of a [`TrackedPointLog`].
#[derive(Debug, Clone, Serialize)]
pub struct PointReport {
    pub frames: u64,
    pub points: Vec<[i32; 2]>,
}

/// Copies contour points into the run's [`TrackedPointLog`].
#[derive(Debug, Default)]
pub struct PointAccumulator {
    log: TrackedPointLog,
}

impl PointAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every point of every contour, in discovery order, as one batch.
    pub fn record(&mut self, contours: &[Contour]) {
        let total: usize = contours.iter().map(Contour::len).sum();
        self.log.points.reserve(total);
        for contour in contours {
            self.log.points.extend_from_slice(&contour.points);
        }
        self.log.frames += 1;
    }

    pub fn log(&self) -> &TrackedPointLog {
        &self.log
    }

    pub fn into_log(self) -> TrackedPointLog {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BorderKind;

    #[test]
    fn test_record_preserves_order_across_levels() {
        let outer = Contour::new(vec![Point::new(1, 1), Point::new(5, 1)], BorderKind::Outer);
        let hole = Contour::new(vec![Point::new(2, 2)], BorderKind::Hole);

        let mut accumulator = PointAccumulator::new();
        accumulator.record(&[outer, hole]);
        accumulator.record(&[]);

        let log = accumulator.log();
        assert_eq!(log.len(), 3);
        assert_eq!(log.frames(), 2);
        assert_eq!(log.points()[2], Point::new(2, 2));
        assert_eq!(log.report().points, vec![[1, 1], [5, 1], [2, 2]]);
    }
}
