//! Axis-aligned bounding boxes.

use glam::Vec3;

/// An axis-aligned box with `min <= max` component-wise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing every point, or `None` for no points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners; bit `i` of the index selects max on axis `i`.
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// The twelve edges as pairs of corners.
    pub fn edges(&self) -> [(Vec3, Vec3); 12] {
        let c = self.corners();
        let mut edges = [(Vec3::ZERO, Vec3::ZERO); 12];
        let mut n = 0;
        for a in 0..8usize {
            for axis in [1usize, 2, 4] {
                if a & axis == 0 {
                    edges[n] = (c[a], c[a | axis]);
                    n += 1;
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());

        let aabb = Aabb::from_points([
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-1.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 5.0),
        ])
        .unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 4.0, 5.0));
        assert_eq!(aabb.center(), Vec3::new(0.0, 1.0, 2.5));
    }

    #[test]
    fn test_edges_are_axis_aligned_and_unique() {
        let aabb = Aabb {
            min: Vec3::ZERO,
            max: Vec3::new(1.0, 2.0, 3.0),
        };
        let edges = aabb.edges();

        for (a, b) in edges {
            let d = b - a;
            let nonzero = [d.x, d.y, d.z].iter().filter(|c| **c != 0.0).count();
            assert_eq!(nonzero, 1, "edge {a:?} -> {b:?} is not axis aligned");
        }

        for i in 0..edges.len() {
            for j in (i + 1)..edges.len() {
                assert_ne!(edges[i], edges[j]);
            }
        }
    }
}
