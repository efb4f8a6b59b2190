//! Triangle file parsing and vertex generation.
//!
//! The input is whitespace-separated text: a triangle count `n` followed by
//! `9 * n` coordinates, three vertices per triangle.

use std::io::Read;
use std::path::Path;

use glam::Vec3;
use tracing::{debug, warn};

use trivis_core::{Error, Result};
use trivis_rhi::vertex::{TriangleVertex, WireframeVertex};
use trivis_scene::Aabb;

/// Palette slot used for triangles.
pub const TRIANGLE_COLOR: u32 = 0;
/// Palette slot used for the bounding box.
pub const BOUNDS_COLOR: u32 = 1;

pub type Triangle = [Vec3; 3];

/// Vertex data ready for upload.
#[derive(Debug, Default)]
pub struct TriangleScene {
    pub triangles: Vec<TriangleVertex>,
    pub wireframe: Vec<WireframeVertex>,
    pub bounds: Option<Aabb>,
}

/// Reads the whole input, from stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Parses a triangle count followed by nine coordinates per triangle.
///
/// Errors name the zero-based index of the offending token.
pub fn parse_triangles(text: &str) -> Result<Vec<Triangle>> {
    let mut tokens = text.split_whitespace().enumerate();

    let (_, count_token) = tokens
        .next()
        .ok_or_else(|| Error::Input("empty input, expected a triangle count".to_string()))?;
    let count: usize = count_token.parse().map_err(|_| {
        Error::Input(format!(
            "token 0: expected a triangle count, found {:?}",
            count_token
        ))
    })?;

    let total = count
        .checked_mul(9)
        .ok_or_else(|| Error::Input(format!("token 0: triangle count {} is too large", count)))?;

    let mut coordinates = Vec::with_capacity(total.min(1 << 20));
    for expected in 0..total {
        let (index, token) = tokens.next().ok_or_else(|| {
            Error::Input(format!(
                "token {}: expected {} coordinates for {} triangle(s), input ended after {}",
                expected + 1,
                total,
                count,
                expected
            ))
        })?;
        let value: f32 = token.parse().map_err(|_| {
            Error::Input(format!("token {}: expected a number, found {:?}", index, token))
        })?;
        if !value.is_finite() {
            return Err(Error::Input(format!(
                "token {}: coordinate {:?} is not finite",
                index, token
            )));
        }
        coordinates.push(value);
    }

    let trailing = tokens.count();
    if trailing > 0 {
        warn!("Ignoring {} token(s) after the last triangle", trailing);
    }

    let triangles: Vec<Triangle> = coordinates
        .chunks_exact(9)
        .map(|c| {
            [
                Vec3::new(c[0], c[1], c[2]),
                Vec3::new(c[3], c[4], c[5]),
                Vec3::new(c[6], c[7], c[8]),
            ]
        })
        .collect();

    debug!("Parsed {} triangle(s)", triangles.len());
    Ok(triangles)
}

/// Unit face normal by the right-hand rule; zero for degenerate faces.
pub fn face_normal(triangle: &Triangle) -> Vec3 {
    let [a, b, c] = *triangle;
    (b - a).cross(c - a).normalize_or_zero()
}

/// Line-list vertices for the twelve edges of `bounds`.
pub fn bounds_wireframe(bounds: &Aabb) -> Vec<WireframeVertex> {
    bounds
        .edges()
        .iter()
        .flat_map(|&(from, to)| {
            [
                WireframeVertex::new(from, BOUNDS_COLOR),
                WireframeVertex::new(to, BOUNDS_COLOR),
            ]
        })
        .collect()
}

/// Builds flat-shaded triangle vertices and, when `show_bounds` is set, the
/// bounding box wireframe.
pub fn build_scene(triangles: &[Triangle], show_bounds: bool) -> TriangleScene {
    let vertices = triangles
        .iter()
        .flat_map(|triangle| {
            let normal = face_normal(triangle);
            triangle.map(|position| TriangleVertex::new(position, normal, TRIANGLE_COLOR))
        })
        .collect();

    let bounds = Aabb::from_points(triangles.iter().flatten().copied());
    let wireframe = match (&bounds, show_bounds) {
        (Some(bounds), true) => bounds_wireframe(bounds),
        _ => Vec::new(),
    };

    TriangleScene {
        triangles: vertices,
        wireframe,
        bounds,
    }
}
