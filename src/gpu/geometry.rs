//! Mesh builders. All meshes are centred on the origin; planar shapes lie in
//! the XY plane facing +z.

use std::f32::consts::{PI, TAU};

use super::{MeshData, Primitive};

/// `width` x `height` plane, one cell.
pub fn quad(width: f32, height: f32) -> MeshData {
    plane_grid(width, height, 1, 1)
}

/// Plane subdivided into `cols` x `rows` cells, uv (0,0) bottom-left.
pub fn plane_grid(width: f32, height: f32, cols: u32, rows: u32) -> MeshData {
    let cols = cols.max(1);
    let rows = rows.max(1);
    let mut mesh = MeshData::default();
    for row in 0..=rows {
        let v = row as f32 / rows as f32;
        for col in 0..=cols {
            let u = col as f32 / cols as f32;
            mesh.positions.push([(u - 0.5) * width, (v - 0.5) * height, 0.0]);
            mesh.normals.push([0.0, 0.0, 1.0]);
            mesh.uvs.push([u, v]);
        }
    }
    let stride = cols + 1;
    for row in 0..rows {
        for col in 0..cols {
            let a = row * stride + col;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, b, d, a, d, c]);
        }
    }
    mesh
}

/// Filled disc as a triangle fan around a centre vertex.
pub fn circle(radius: f32, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let mut mesh = MeshData::default();
    mesh.positions.push([0.0, 0.0, 0.0]);
    mesh.normals.push([0.0, 0.0, 1.0]);
    mesh.uvs.push([0.5, 0.5]);
    for i in 0..=segments {
        let angle = i as f32 / segments as f32 * TAU;
        let (s, c) = angle.sin_cos();
        mesh.positions.push([c * radius, s * radius, 0.0]);
        mesh.normals.push([0.0, 0.0, 1.0]);
        mesh.uvs.push([(c + 1.0) * 0.5, (s + 1.0) * 0.5]);
    }
    for i in 1..=segments {
        mesh.indices.extend_from_slice(&[0, i, i + 1]);
    }
    mesh
}

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

/// Unit cube, flat-shaded faces.
pub fn unit_box() -> MeshData {
    // (normal, four corner indices counter-clockwise seen from outside)
    const FACES: [([f32; 3], [usize; 4]); 6] = [
        ([0.0, 0.0, 1.0], [4, 5, 6, 7]),
        ([0.0, 0.0, -1.0], [1, 0, 3, 2]),
        ([1.0, 0.0, 0.0], [5, 1, 2, 6]),
        ([-1.0, 0.0, 0.0], [0, 4, 7, 3]),
        ([0.0, 1.0, 0.0], [7, 6, 2, 3]),
        ([0.0, -1.0, 0.0], [0, 1, 5, 4]),
    ];
    let mut mesh = MeshData::default();
    for (normal, corners) in FACES {
        let base = mesh.positions.len() as u32;
        for (k, &corner) in corners.iter().enumerate() {
            mesh.positions.push(CUBE_CORNERS[corner]);
            mesh.normals.push(normal);
            mesh.uvs.push([(k == 1 || k == 2) as u8 as f32, (k >= 2) as u8 as f32]);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// The twelve edges of a unit cube, drawn as lines.
pub fn box_edges() -> MeshData {
    #[rustfmt::skip]
    const EDGES: [(u32, u32); 12] = [
        (0, 1), (1, 2), (2, 3), (3, 0),
        (4, 5), (5, 6), (6, 7), (7, 4),
        (0, 4), (1, 5), (2, 6), (3, 7),
    ];
    MeshData {
        positions: CUBE_CORNERS.to_vec(),
        normals: Vec::new(),
        uvs: Vec::new(),
        indices: EDGES.iter().flat_map(|&(a, b)| [a, b]).collect(),
        primitive: Some(Primitive::Lines),
    }
}

/// Cone along +y with its base centred at `-height / 2`.
pub fn cone(radius: f32, height: f32, radial: u32) -> MeshData {
    let radial = radial.max(3);
    let half = height * 0.5;
    let slant = (radius * radius + height * height).sqrt();
    let mut mesh = MeshData::default();
    for i in 0..radial {
        let a0 = i as f32 / radial as f32 * TAU;
        let a1 = (i + 1) as f32 / radial as f32 * TAU;
        let mid = (a0 + a1) * 0.5;
        let normal = [
            mid.cos() * height / slant,
            radius / slant,
            mid.sin() * height / slant,
        ];
        let base = mesh.positions.len() as u32;
        mesh.positions.extend_from_slice(&[
            [a0.cos() * radius, -half, a0.sin() * radius],
            [0.0, half, 0.0],
            [a1.cos() * radius, -half, a1.sin() * radius],
        ]);
        mesh.normals.extend_from_slice(&[normal; 3]);
        mesh.uvs.extend_from_slice(&[[0.0, 0.0], [0.5, 1.0], [1.0, 0.0]]);
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    // base cap
    let centre = mesh.positions.len() as u32;
    mesh.positions.push([0.0, -half, 0.0]);
    mesh.normals.push([0.0, -1.0, 0.0]);
    mesh.uvs.push([0.5, 0.5]);
    for i in 0..=radial {
        let a = i as f32 / radial as f32 * TAU;
        mesh.positions.push([a.cos() * radius, -half, a.sin() * radius]);
        mesh.normals.push([0.0, -1.0, 0.0]);
        mesh.uvs.push([(a.cos() + 1.0) * 0.5, (a.sin() + 1.0) * 0.5]);
    }
    for i in 0..radial {
        mesh.indices
            .extend_from_slice(&[centre, centre + 2 + i, centre + 1 + i]);
    }
    mesh
}

/// UV sphere.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);
    let mut mesh = MeshData::default();
    for y in 0..=hs {
        let v = y as f32 / hs as f32;
        let theta = v * PI;
        for x in 0..=ws {
            let u = x as f32 / ws as f32;
            let phi = u * TAU;
            let n = [-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin()];
            mesh.positions.push([n[0] * radius, n[1] * radius, n[2] * radius]);
            mesh.normals.push(n);
            mesh.uvs.push([u, 1.0 - v]);
        }
    }
    let stride = ws + 1;
    for y in 0..hs {
        for x in 0..ws {
            let a = y * stride + x;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            if y != 0 {
                mesh.indices.extend_from_slice(&[a, c, b]);
            }
            if y != hs - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

/// Torus in the XY plane.
pub fn torus(radius: f32, tube: f32, radial: u32, tubular: u32) -> MeshData {
    let radial = radial.max(3);
    let tubular = tubular.max(3);
    let mut mesh = MeshData::default();
    for j in 0..=radial {
        let v = j as f32 / radial as f32 * TAU;
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * TAU;
            let centre = [radius * u.cos(), radius * u.sin(), 0.0];
            let p = [
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            ];
            let n = [
                (p[0] - centre[0]) / tube,
                (p[1] - centre[1]) / tube,
                (p[2] - centre[2]) / tube,
            ];
            mesh.positions.push(p);
            mesh.normals.push(n);
            mesh.uvs.push([i as f32 / tubular as f32, j as f32 / radial as f32]);
        }
    }
    let stride = tubular + 1;
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = stride * j + i - 1;
            let b = stride * (j - 1) + i - 1;
            let c = stride * (j - 1) + i;
            let d = stride * j + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh
}

/// Unindexed point cloud.
pub fn points(positions: Vec<[f32; 3]>) -> MeshData {
    MeshData {
        positions,
        normals: Vec::new(),
        uvs: Vec::new(),
        indices: Vec::new(),
        primitive: Some(Primitive::Points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices_in_range(mesh: &MeshData) -> bool {
        mesh.indices
            .iter()
            .all(|&i| (i as usize) < mesh.positions.len())
    }

    #[test]
    fn builders_emit_valid_indices() {
        for mesh in [
            quad(2.0, 1.0),
            plane_grid(300.0, 300.0, 64, 64),
            circle(30.0, 64),
            unit_box(),
            box_edges(),
            cone(0.5, 1.5, 4),
            sphere(1.0, 32, 32),
            torus(0.4, 0.1, 8, 24),
        ] {
            assert!(indices_in_range(&mesh));
            let per_primitive = match mesh.primitive() {
                Primitive::Lines => 2,
                _ => 3,
            };
            assert_eq!(mesh.indices.len() % per_primitive, 0);
            assert!(mesh.normals.is_empty() || mesh.normals.len() == mesh.positions.len());
        }
    }

    #[test]
    fn grid_has_expected_cell_count() {
        let grid = plane_grid(300.0, 300.0, 64, 64);
        assert_eq!(grid.positions.len(), 65 * 65);
        assert_eq!(grid.indices.len(), 64 * 64 * 6);
    }
}
