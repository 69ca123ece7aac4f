use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing both corners.
    pub fn from_points(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Edges are inclusive.
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }

    /// Union of all rectangles, or `None` when there are none.
    pub fn bounding<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc, rect| match acc {
            Some(bounds) => Some(rect.union(&bounds)),
            None => Some(*rect),
        })
    }
}

/// Half-open interval `[start, start + length)` on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: f64,
    pub length: f64,
}

impl Range {
    pub const fn from_length(start: f64, length: f64) -> Self {
        Self { start, length }
    }

    pub fn from_bounds(start: f64, end: f64) -> Self {
        Self::from_length(start.min(end), (end - start).abs())
    }

    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.start && value < self.end()
    }

    /// Overlap test. Ranges that only touch at an edge do not intersect.
    pub fn intersects(&self, other: &Range) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    pub fn intersection(&self, other: &Range) -> Option<Range> {
        if !self.intersects(other) {
            return None;
        }
        let start = self.start.max(other.start);
        Some(Range::from_length(start, self.end().min(other.end()) - start))
    }
}

#[cfg(feature = "egui")]
mod egui_conv {
    use super::{Point, Rect};

    impl From<Point> for egui::Pos2 {
        fn from(point: Point) -> Self {
            egui::pos2(point.x as f32, point.y as f32)
        }
    }

    impl From<egui::Pos2> for Point {
        fn from(pos: egui::Pos2) -> Self {
            Point::new(pos.x as f64, pos.y as f64)
        }
    }

    impl From<Rect> for egui::Rect {
        fn from(rect: Rect) -> Self {
            egui::Rect::from_min_size(
                egui::pos2(rect.x as f32, rect.y as f32),
                egui::vec2(rect.width as f32, rect.height as f32),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_normalizes_corners() {
        let rect = Rect::from_points(Point::new(30.0, 5.0), Point::new(10.0, 25.0));
        assert_eq!(rect, Rect::new(10.0, 5.0, 20.0, 20.0));
    }

    #[test]
    fn bounding_of_nothing_is_none() {
        assert_eq!(Rect::bounding(&[]), None);
        let rects = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(20.0, 5.0, 5.0, 30.0)];
        assert_eq!(Rect::bounding(&rects), Some(Rect::new(0.0, 0.0, 25.0, 35.0)));
    }

    #[test]
    fn touching_ranges_do_not_intersect() {
        let a = Range::from_length(0.0, 10.0);
        let b = Range::from_length(10.0, 5.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Range::from_length(9.5, 1.0)));
        assert_eq!(
            a.intersection(&Range::from_length(5.0, 10.0)),
            Some(Range::from_length(5.0, 5.0))
        );
    }

    #[test]
    fn contains_point_includes_edges() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains_point(Point::new(10.0, 10.0)));
        assert!(!rect.contains_point(Point::new(10.1, 5.0)));
    }
}
