use crate::scene::{SceneObject, Vector2};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector2,
    pub max: Vector2,
}

impl Aabb {
    pub fn new(min: Vector2, max: Vector2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vector2, half_width: f64, half_height: f64) -> Self {
        Self {
            min: Vector2::new(center.x - half_width, center.y - half_height),
            max: Vector2::new(center.x + half_width, center.y + half_height),
        }
    }

    /// Box around the object's rotated footprint: `size * scale`, centred on
    /// its position, rotated by `rotation` degrees.
    pub fn from_object(object: &SceneObject) -> Self {
        let width = (object.size.x * object.scale.x).abs();
        let height = (object.size.y * object.scale.y).abs();
        let (sin, cos) = object.rotation.to_radians().sin_cos();
        let (sin, cos) = (sin.abs(), cos.abs());
        let half_width = (cos * width + sin * height) / 2.0;
        let half_height = (sin * width + cos * height) / 2.0;
        Self::from_center(object.position, half_width, half_height)
    }

    /// Strict: boxes that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Vector2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vector2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Surface-area heuristic cost in 2D.
    pub fn perimeter(&self) -> f64 {
        2.0 * ((self.max.x - self.min.x) + (self.max.y - self.min.y))
    }
}
