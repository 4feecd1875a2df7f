use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use id_arena::{Arena, Id};
use itertools::iproduct;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Unit sphere; triangles wind counter-clockwise seen from outside.
    pub fn uv_sphere(name: impl Into<String>, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let vertices = iproduct!(0..=rings, 0..=segments)
            .map(|(ring, segment)| {
                let theta = ring as f32 / rings as f32 * PI;
                let phi = segment as f32 / segments as f32 * TAU;
                let position = Vec3::new(
                    theta.sin() * phi.cos(),
                    theta.cos(),
                    theta.sin() * phi.sin(),
                );
                Vertex {
                    position,
                    normal: position,
                }
            })
            .collect();

        let stride = segments + 1;
        let indices = iproduct!(0..rings, 0..segments)
            .flat_map(|(ring, segment)| {
                let a = ring * stride + segment;
                let b = a + stride;
                [a, a + 1, b, a + 1, b + 1, b]
            })
            .collect();

        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }

    /// Cube spanning [-1, 1] on every axis with flat face normals.
    pub fn cube(name: impl Into<String>) -> Self {
        // (normal, u, v) with u x v = normal.
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = vertices.len() as u32;
            for corner in [-u - v, u - v, u + v, -u + v] {
                vertices.push(Vertex {
                    position: normal + corner,
                    normal,
                });
            }
            indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }

    /// Radius of the smallest origin-centred sphere enclosing the mesh.
    pub fn bounding_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|vertex| vertex.position.length())
            .fold(0.0, f32::max)
    }
}

pub type MeshId = Id<MeshData>;

/// CPU-side mesh storage shared by every backend.
pub struct MeshLibrary {
    meshes: Arena<MeshData>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self {
            meshes: Arena::new(),
        }
    }

    pub fn add(&mut self, mesh: MeshData) -> MeshId {
        self.meshes.alloc(mesh)
    }

    pub fn get(&self, id: MeshId) -> Option<&MeshData> {
        self.meshes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshId, &MeshData)> {
        self.meshes.iter()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.len() == 0
    }
}
