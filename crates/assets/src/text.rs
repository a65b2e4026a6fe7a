use crate::font::{GlyphContours, TypefaceFont};
use crate::{AssetError, MeshData};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use spade::handles::FixedVertexHandle;
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

/// Extrusion settings for 3D text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextParams {
    /// Glyph size in scene units per em.
    pub size: f32,
    /// Extrusion depth along +Z, excluding the bevel.
    pub depth: f32,
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            size: 0.5,
            depth: 0.2,
            curve_segments: 5,
            bevel_enabled: true,
            bevel_thickness: 0.03,
            bevel_size: 0.02,
            bevel_offset: 0.0,
            bevel_segments: 4,
        }
    }
}

/// A filled region: one outer contour (counter-clockwise) and its holes (clockwise).
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub outer: Vec<Vec2>,
    pub holes: Vec<Vec<Vec2>>,
}

impl Shape {
    fn contours(&self) -> impl Iterator<Item = &Vec<Vec2>> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    fn contains(&self, p: Vec2) -> bool {
        point_in_polygon(p, &self.outer) && !self.holes.iter().any(|h| point_in_polygon(p, h))
    }
}

/// One ring of the extrusion profile: contour offset and Z height.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ring {
    offset: f32,
    z: f32,
}

/// Build the extruded, bevelled mesh for `text`. The result is not centered.
pub fn text_mesh(font: &TypefaceFont, text: &str, params: &TextParams) -> Result<MeshData, AssetError> {
    let _span = tracing::debug_span!("text_mesh", text, glyphs = text.chars().count()).entered();
    let glyphs = font.layout(text, params.size, params.curve_segments)?;
    let rings = profile(params);
    let mut mesh = MeshData::default();

    for glyph in &glyphs {
        for shape in shapes_from_glyph(glyph) {
            extrude_shape(&mut mesh, &shape, &rings)?;
        }
    }

    tracing::debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "built text mesh"
    );
    Ok(mesh)
}

/// Group a glyph's contours into shapes. Contours nested at an even depth are
/// solids, odd depth are holes of the innermost enclosing solid.
pub fn shapes_from_glyph(glyph: &GlyphContours) -> Vec<Shape> {
    let contours: Vec<&Vec<Vec2>> = glyph
        .contours
        .iter()
        .filter(|c| signed_area(c).abs() > 1e-9)
        .collect();

    let depth: Vec<usize> = contours
        .iter()
        .enumerate()
        .map(|(i, c)| {
            contours
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && point_in_polygon(c[0], other))
                .count()
        })
        .collect();

    let mut shapes: Vec<Shape> = Vec::new();
    let mut shape_of_contour: HashMap<usize, usize> = HashMap::new();
    for (i, c) in contours.iter().enumerate() {
        if depth[i] % 2 == 0 {
            shape_of_contour.insert(i, shapes.len());
            shapes.push(Shape {
                outer: oriented(c, true),
                holes: Vec::new(),
            });
        }
    }

    for (i, c) in contours.iter().enumerate() {
        if depth[i] % 2 == 0 {
            continue;
        }
        let parent = contours
            .iter()
            .enumerate()
            .filter(|(j, other)| depth[*j] + 1 == depth[i] && point_in_polygon(c[0], other))
            .min_by(|(_, a), (_, b)| signed_area(a).abs().total_cmp(&signed_area(b).abs()))
            .and_then(|(j, _)| shape_of_contour.get(&j).copied());
        match parent {
            Some(s) => shapes[s].holes.push(oriented(c, false)),
            None => tracing::warn!(character = %glyph.character, "orphan hole contour dropped"),
        }
    }

    shapes
}

fn profile(params: &TextParams) -> Vec<Ring> {
    if !params.bevel_enabled || params.bevel_segments == 0 {
        return vec![
            Ring { offset: 0.0, z: 0.0 },
            Ring {
                offset: 0.0,
                z: params.depth,
            },
        ];
    }

    let segments = params.bevel_segments;
    let at = |t: u32| {
        let angle = t as f32 / segments as f32 * FRAC_PI_2;
        (
            params.bevel_size * angle.sin() + params.bevel_offset,
            params.bevel_thickness * angle.cos(),
        )
    };

    let mut rings = Vec::with_capacity(2 * (segments as usize + 1));
    for t in 0..=segments {
        let (offset, dz) = at(t);
        rings.push(Ring { offset, z: -dz });
    }
    for t in (0..=segments).rev() {
        let (offset, dz) = at(t);
        rings.push(Ring {
            offset,
            z: params.depth + dz,
        });
    }
    rings
}

fn extrude_shape(mesh: &mut MeshData, shape: &Shape, rings: &[Ring]) -> Result<(), AssetError> {
    let (Some(back), Some(front)) = (rings.first(), rings.last()) else {
        return Ok(());
    };

    let normals: Vec<Vec<Vec2>> = shape.contours().map(|c| vertex_normals(c)).collect();
    let offset_contour = |ci: usize, contour: &[Vec2], offset: f32| -> Vec<Vec2> {
        contour
            .iter()
            .zip(&normals[ci])
            .map(|(p, n)| *p + *n * offset)
            .collect()
    };

    // Caps
    let cap_shape = Shape {
        outer: offset_contour(0, &shape.outer, back.offset),
        holes: shape
            .holes
            .iter()
            .enumerate()
            .map(|(hi, h)| offset_contour(hi + 1, h, back.offset))
            .collect(),
    };
    let (cap_points, cap_triangles) = triangulate(&cap_shape)?;

    let front_base = mesh.positions.len() as u32;
    for p in &cap_points {
        mesh.push_vertex(p.extend(front.z), Vec3::Z);
    }
    for [a, b, c] in &cap_triangles {
        mesh.push_triangle(front_base + a, front_base + b, front_base + c);
    }

    let back_base = mesh.positions.len() as u32;
    for p in &cap_points {
        mesh.push_vertex(p.extend(back.z), Vec3::NEG_Z);
    }
    for [a, b, c] in &cap_triangles {
        mesh.push_triangle(back_base + a, back_base + c, back_base + b);
    }

    // Side walls and bevel
    for (ci, contour) in shape.contours().enumerate() {
        let levels: Vec<Vec<Vec3>> = rings
            .iter()
            .map(|r| {
                offset_contour(ci, contour, r.offset)
                    .into_iter()
                    .map(|p| p.extend(r.z))
                    .collect()
            })
            .collect();

        for pair in levels.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            let n = lower.len();
            for k in 0..n {
                let next = (k + 1) % n;
                let (a0, a1, b0, b1) = (lower[k], lower[next], upper[k], upper[next]);
                let normal = (a1 - a0).cross(b1 - a0).normalize_or_zero();
                let i0 = mesh.push_vertex(a0, normal);
                let i1 = mesh.push_vertex(a1, normal);
                let i2 = mesh.push_vertex(b1, normal);
                let i3 = mesh.push_vertex(b0, normal);
                mesh.push_triangle(i0, i1, i2);
                mesh.push_triangle(i0, i2, i3);
            }
        }
    }

    Ok(())
}

/// Constrained Delaunay triangulation of a shape's interior. Triangles are
/// returned counter-clockwise, indexing into the returned point list.
fn triangulate(shape: &Shape) -> Result<(Vec<Vec2>, Vec<[u32; 3]>), AssetError> {
    let mut cdt: ConstrainedDelaunayTriangulation<Point2<f64>> = ConstrainedDelaunayTriangulation::new();
    let mut points: Vec<Vec2> = Vec::new();
    let mut index_of: HashMap<FixedVertexHandle, u32> = HashMap::new();

    for contour in shape.contours() {
        let mut handles = Vec::with_capacity(contour.len());
        for p in contour {
            let handle = cdt
                .insert(Point2::new(p.x as f64, p.y as f64))
                .map_err(|e| AssetError::Triangulation(format!("{e:?}")))?;
            index_of.entry(handle).or_insert_with(|| {
                points.push(*p);
                (points.len() - 1) as u32
            });
            handles.push(handle);
        }
        for k in 0..handles.len() {
            let (from, to) = (handles[k], handles[(k + 1) % handles.len()]);
            if from == to {
                continue;
            }
            if cdt.can_add_constraint(from, to) {
                cdt.add_constraint(from, to);
            } else {
                tracing::trace!("skipping self-intersecting outline edge");
            }
        }
    }

    let mut triangles = Vec::new();
    for face in cdt.inner_faces() {
        let [v0, v1, v2] = face.vertices();
        let corners = [v0, v1, v2].map(|v| {
            let p = v.position();
            Vec2::new(p.x as f32, p.y as f32)
        });
        let centroid = (corners[0] + corners[1] + corners[2]) / 3.0;
        if !shape.contains(centroid) {
            continue;
        }
        let mut tri = [v0, v1, v2].map(|v| index_of[&v.fix()]);
        if (corners[1] - corners[0]).perp_dot(corners[2] - corners[0]) < 0.0 {
            tri.swap(1, 2);
        }
        triangles.push(tri);
    }

    Ok((points, triangles))
}

/// Per-vertex miter normals pointing away from the filled side. Assumes solids
/// run counter-clockwise and holes clockwise.
fn vertex_normals(contour: &[Vec2]) -> Vec<Vec2> {
    let n = contour.len();
    let edge_normal = |from: Vec2, to: Vec2| {
        let d = (to - from).normalize_or_zero();
        Vec2::new(d.y, -d.x)
    };
    (0..n)
        .map(|k| {
            let prev = contour[(k + n - 1) % n];
            let here = contour[k];
            let next = contour[(k + 1) % n];
            let n_in = edge_normal(prev, here);
            let n_out = edge_normal(here, next);
            let miter = (n_in + n_out).normalize_or_zero();
            if miter == Vec2::ZERO {
                return n_out;
            }
            miter / miter.dot(n_out).max(0.25)
        })
        .collect()
}

fn signed_area(contour: &[Vec2]) -> f32 {
    let n = contour.len();
    (0..n)
        .map(|k| contour[k].perp_dot(contour[(k + 1) % n]))
        .sum::<f32>()
        * 0.5
}

fn oriented(contour: &[Vec2], counter_clockwise: bool) -> Vec<Vec2> {
    let mut out = contour.to_vec();
    if (signed_area(&out) > 0.0) != counter_clockwise {
        out.reverse();
    }
    out
}

/// Even-odd point in polygon test.
fn point_in_polygon(p: Vec2, polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::TEST_FONT;

    fn flat() -> TextParams {
        TextParams {
            bevel_enabled: false,
            ..TextParams::default()
        }
    }

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x1, y0),
            Vec2::new(x1, y1),
            Vec2::new(x0, y1),
        ]
    }

    #[test]
    fn ring_glyph_has_one_hole() {
        let glyph = GlyphContours {
            character: 'O',
            contours: vec![square(0.0, 0.0, 4.0, 4.0), square(1.0, 1.0, 3.0, 3.0)],
        };
        let shapes = shapes_from_glyph(&glyph);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].holes.len(), 1);
        assert!(signed_area(&shapes[0].outer) > 0.0);
        assert!(signed_area(&shapes[0].holes[0]) < 0.0);
    }

    #[test]
    fn island_inside_hole_is_a_solid() {
        let glyph = GlyphContours {
            character: '@',
            contours: vec![
                square(0.0, 0.0, 10.0, 10.0),
                square(2.0, 2.0, 8.0, 8.0),
                square(4.0, 4.0, 6.0, 6.0),
            ],
        };
        let shapes = shapes_from_glyph(&glyph);
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes.iter().map(|s| s.holes.len()).sum::<usize>(), 1);
    }

    #[test]
    fn square_cap_triangulates_to_two_triangles() {
        let shape = Shape {
            outer: square(0.0, 0.0, 1.0, 1.0),
            holes: vec![],
        };
        let (points, triangles) = triangulate(&shape).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn cap_area_excludes_hole() {
        let shape = Shape {
            outer: square(0.0, 0.0, 4.0, 4.0),
            holes: vec![oriented(&square(1.0, 1.0, 3.0, 3.0), false)],
        };
        let (points, triangles) = triangulate(&shape).unwrap();
        let area: f32 = triangles
            .iter()
            .map(|[a, b, c]| {
                let (a, b, c) = (points[*a as usize], points[*b as usize], points[*c as usize]);
                (b - a).perp_dot(c - a) * 0.5
            })
            .sum();
        assert!((area - 12.0).abs() < 1e-4, "area was {area}");
    }

    #[test]
    fn flat_extrusion_spans_depth() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let mesh = text_mesh(&font, "I", &flat()).unwrap();
        let bounds = mesh.bounds().unwrap();
        assert!((bounds.min.z - 0.0).abs() < 1e-6);
        assert!((bounds.max.z - 0.2).abs() < 1e-6);
        // 2 caps * 2 triangles + 4 walls * 2 triangles
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn bevel_widens_and_thickens() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let params = TextParams::default();
        let mesh = text_mesh(&font, "I", &params).unwrap();
        let bounds = mesh.bounds().unwrap();
        assert!((bounds.min.z + params.bevel_thickness).abs() < 1e-5);
        assert!((bounds.max.z - (params.depth + params.bevel_thickness)).abs() < 1e-5);
        // The glyph is 0.15 wide at size 0.5; the bevel adds bevel_size per side.
        assert!((bounds.size().x - (0.15 + 2.0 * params.bevel_size)).abs() < 1e-4);
    }

    #[test]
    fn centered_text_is_symmetric() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let mut mesh = text_mesh(&font, "IOD", &TextParams::default()).unwrap();
        mesh.center();
        let bounds = mesh.bounds().unwrap();
        assert!(bounds.center().length() < 1e-5);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn cap_normals_face_outward() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let mesh = text_mesh(&font, "O", &flat()).unwrap();
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            if p[2] == 0.2 && n[2] != 0.0 {
                assert_eq!(n[2], 1.0);
            }
            if p[2] == 0.0 && n[2] != 0.0 {
                assert_eq!(n[2], -1.0);
            }
        }
    }

    #[test]
    fn point_in_polygon_basics() {
        let sq = square(0.0, 0.0, 1.0, 1.0);
        assert!(point_in_polygon(Vec2::new(0.5, 0.5), &sq));
        assert!(!point_in_polygon(Vec2::new(1.5, 0.5), &sq));
    }
}
