use image::Rgb;
use imageproc::drawing::draw_line_segment_mut;
use crate::{
    error::Result,
    traits::OverlayRenderer,
    types::{Contour, ContourSet, Frame},
};

/// Outlines top-level contours in a single color. Holes are not drawn.
#[derive(Debug, Clone)]
pub struct OutlineRenderer {
    pub color: Rgb<u8>,
}

impl Default for OutlineRenderer {
    fn default() -> Self {
        Self { color: Rgb([0, 0, 250]) }
    }
}

impl OutlineRenderer {
    pub fn new(color: Rgb<u8>) -> Self {
        Self { color }
    }
}

impl OverlayRenderer for OutlineRenderer {
    fn draw<'a>(&self, frame: &'a mut Frame, contours: &ContourSet) -> Result<&'a mut Frame> {
        // Resolve the whole sibling chain first so a broken hierarchy leaves the
        // frame untouched.
        let top_level = contours.top_level()?;
        for contour in top_level {
            draw_closed(frame, contour, self.color);
        }
        Ok(frame)
    }
}

fn draw_closed(frame: &mut Frame, contour: &Contour, color: Rgb<u8>) {
    let points = &contour.points;
    match points.as_slice() {
        [] => {}
        [only] => {
            let (width, height) = frame.dimensions();
            if only.x >= 0 && only.y >= 0 && (only.x as u32) < width && (only.y as u32) < height {
                frame.put_pixel(only.x as u32, only.y as u32, color);
            }
        }
        _ => {
            for (i, start) in points.iter().enumerate() {
                let end = points[(i + 1) % points.len()];
                draw_line_segment_mut(
                    frame,
                    (start.x as f32, start.y as f32),
                    (end.x as f32, end.y as f32),
                    color,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::ContourHierarchy;
    use crate::types::BorderKind;
    use imageproc::point::Point;

    fn square(x0: i32, y0: i32, x1: i32, y1: i32, kind: BorderKind) -> Contour {
        Contour::new(
            vec![Point::new(x0, y0), Point::new(x1, y0), Point::new(x1, y1), Point::new(x0, y1)],
            kind,
        )
    }

    #[test]
    fn test_draws_top_level_only() {
        let set = ContourSet {
            contours: vec![
                square(2, 2, 20, 20, BorderKind::Outer),
                square(8, 8, 14, 14, BorderKind::Hole),
                square(25, 25, 28, 28, BorderKind::Outer),
            ],
            hierarchy: ContourHierarchy::from_parents(&[None, Some(0), None]).unwrap(),
        };
        let renderer = OutlineRenderer::default();
        let mut frame = Frame::new(32, 32);
        renderer.draw(&mut frame, &set).unwrap();

        assert_eq!(*frame.get_pixel(2, 10), renderer.color);
        assert_eq!(*frame.get_pixel(20, 20), renderer.color);
        assert_eq!(*frame.get_pixel(28, 26), renderer.color);
        // hole outline is skipped
        assert_eq!(*frame.get_pixel(8, 10), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(11, 11), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_empty_set_leaves_frame() {
        let mut frame = Frame::from_pixel(8, 8, Rgb([9, 9, 9]));
        OutlineRenderer::default().draw(&mut frame, &ContourSet::default()).unwrap();
        assert!(frame.pixels().all(|p| *p == Rgb([9, 9, 9])));
    }

    #[test]
    fn test_mismatched_hierarchy_is_rejected() {
        let set = ContourSet {
            contours: vec![square(1, 1, 4, 4, BorderKind::Outer)],
            hierarchy: ContourHierarchy::empty(),
        };
        let mut frame = Frame::new(8, 8);
        assert!(OutlineRenderer::default().draw(&mut frame, &set).is_err());
        assert!(frame.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
