//! # Triangulation
//!
//! Converts quads and n-gons to triangles. Quads are split along their
//! shorter diagonal when convex; everything else goes through ear clipping
//! on the polygon projected to its dominant plane.

use crate::mesh::{Face, Mesh};
use glam::{DVec2, DVec3};
use robust::{orient2d, Coord};

/// Triangulates every face with more than three corners.
///
/// Returns the number of faces that were split.
pub fn triangulate(mesh: &mut Mesh) -> usize {
    if mesh.faces().iter().all(|f| f.len() <= 3) {
        return 0;
    }

    let mut split = 0;
    let mut faces = Vec::with_capacity(mesh.triangle_count());
    for face in mesh.faces() {
        if face.len() <= 3 {
            faces.push(face.clone());
        } else {
            faces.extend(triangulate_face(mesh, face));
            split += 1;
        }
    }
    mesh.set_faces(faces);
    split
}

/// Splits a single face into triangles sharing its attributes.
pub fn triangulate_face(mesh: &Mesh, face: &Face) -> Vec<Face> {
    let triangles = match face.len() {
        0..=2 => Vec::new(),
        3 => vec![[0, 1, 2]],
        4 => split_quad(mesh, face),
        _ => {
            let points = project(mesh, face);
            ear_clip(&points)
        }
    };

    triangles
        .into_iter()
        .map(|[a, b, c]| Face {
            corners: vec![face.corners[a], face.corners[b], face.corners[c]],
            material: face.material,
            smooth: face.smooth,
        })
        .collect()
}

fn split_quad(mesh: &Mesh, face: &Face) -> Vec<[usize; 3]> {
    let p: Vec<DVec3> = face.vertex_ids().map(|v| mesh.vertex(v)).collect();
    let normal = mesh.face_normal_raw(face);

    let facing = |a: usize, b: usize, c: usize| (p[b] - p[a]).cross(p[c] - p[a]).dot(normal) > 0.0;
    let diag_02 = facing(0, 1, 2) && facing(2, 3, 0);
    let diag_13 = facing(1, 2, 3) && facing(3, 0, 1);

    match (diag_02, diag_13) {
        (true, true) => {
            if p[0].distance_squared(p[2]) <= p[1].distance_squared(p[3]) {
                vec![[0, 1, 2], [2, 3, 0]]
            } else {
                vec![[1, 2, 3], [3, 0, 1]]
            }
        }
        (true, false) => vec![[0, 1, 2], [2, 3, 0]],
        (false, true) => vec![[1, 2, 3], [3, 0, 1]],
        (false, false) => vec![[0, 1, 2], [2, 3, 0]],
    }
}

/// Projects face corners onto the plane that drops the dominant normal axis,
/// keeping counter-clockwise orientation.
pub(crate) fn project(mesh: &Mesh, face: &Face) -> Vec<DVec2> {
    let n = mesh.face_normal_raw(face);
    let abs = n.abs();

    face.vertex_ids()
        .map(|v| {
            let p = mesh.vertex(v);
            if abs.z >= abs.x && abs.z >= abs.y {
                if n.z >= 0.0 {
                    DVec2::new(p.x, p.y)
                } else {
                    DVec2::new(p.y, p.x)
                }
            } else if abs.x >= abs.y {
                if n.x >= 0.0 {
                    DVec2::new(p.y, p.z)
                } else {
                    DVec2::new(p.z, p.y)
                }
            } else if n.y >= 0.0 {
                DVec2::new(p.z, p.x)
            } else {
                DVec2::new(p.x, p.z)
            }
        })
        .collect()
}

#[inline]
fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    orient2d(
        Coord { x: a.x, y: a.y },
        Coord { x: b.x, y: b.y },
        Coord { x: c.x, y: c.y },
    )
}

fn signed_area(points: &[DVec2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

/// Ear-clipping triangulation of a simple polygon.
///
/// Triangles are returned as index triples in the input winding order.
pub fn ear_clip(points: &[DVec2]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    // Work in a counter-clockwise frame so convexity is orient > 0.
    let pts: Vec<DVec2> = if signed_area(points) < 0.0 {
        points.iter().map(|p| DVec2::new(p.x, -p.y)).collect()
    } else {
        points.to_vec()
    };

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let a = remaining[(i + m - 1) % m];
            let b = remaining[i];
            let c = remaining[(i + 1) % m];
            is_ear(&pts, &remaining, a, b, c)
        });

        match ear {
            Some(i) => {
                let a = remaining[(i + m - 1) % m];
                let b = remaining[i];
                let c = remaining[(i + 1) % m];
                triangles.push([a, b, c]);
                remaining.remove(i);
            }
            None => {
                // Self-intersecting or fully degenerate: fan the rest.
                for i in 1..remaining.len() - 1 {
                    triangles.push([remaining[0], remaining[i], remaining[i + 1]]);
                }
                return triangles;
            }
        }
    }

    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}

fn is_ear(pts: &[DVec2], remaining: &[usize], a: usize, b: usize, c: usize) -> bool {
    let (pa, pb, pc) = (pts[a], pts[b], pts[c]);
    if orient(pa, pb, pc) <= 0.0 {
        return false;
    }

    remaining.iter().all(|&k| {
        if k == a || k == b || k == c {
            return true;
        }
        let p = pts[k];
        if p == pa || p == pb || p == pc {
            return true;
        }
        let inside = orient(pa, pb, p) >= 0.0 && orient(pb, pc, p) >= 0.0 && orient(pc, pa, p) >= 0.0;
        !inside
    })
}
