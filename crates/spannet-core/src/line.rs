//! Straight line segments.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A segment between two points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Start point.
    pub from: DVec3,
    /// End point.
    pub to: DVec3,
}

impl Line {
    /// Create a segment.
    pub fn new(from: DVec3, to: DVec3) -> Self {
        Self { from, to }
    }

    /// Segment length.
    pub fn length(&self) -> f64 {
        self.from.distance(self.to)
    }

    /// Point halfway along the segment.
    pub fn midpoint(&self) -> DVec3 {
        self.point_at(0.5)
    }

    /// Point at normalised parameter `t` (0 = `from`, 1 = `to`).
    pub fn point_at(&self, t: f64) -> DVec3 {
        self.from.lerp(self.to, t)
    }

    /// Unit direction from `from` to `to`, if the segment is not degenerate.
    pub fn direction(&self) -> Option<DVec3> {
        (self.to - self.from).try_normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_measures() {
        let l = Line::new(DVec3::ZERO, DVec3::new(3.0, 4.0, 0.0));
        assert_eq!(l.length(), 5.0);
        assert_eq!(l.midpoint(), DVec3::new(1.5, 2.0, 0.0));
        assert_eq!(l.point_at(1.0), l.to);
        assert!(l.direction().is_some());
    }

    #[test]
    fn test_degenerate_direction() {
        let l = Line::new(DVec3::ONE, DVec3::ONE);
        assert!(l.direction().is_none());
    }
}
