//! Rendering seam between the worlds and the graphics driver.
//!
//! Worlds and the orchestrator only ever talk to [`Gpu`]. In the browser it
//! is backed by WebGL2 (`crate::wasm::webgl`); on the host and in tests by
//! [`headless::HeadlessGpu`], which validates and records calls instead of
//! rasterising them.
//!
//! Vertex attribute locations are fixed across all programs: 0 = position,
//! 1 = normal, 2 = uv, 3 and up = per-instance attributes.

pub mod geometry;
pub mod headless;

use crate::color::Rgb;
use crate::error::GpuError;

pub const ATTR_POSITION: u32 = 0;
pub const ATTR_NORMAL: u32 = 1;
pub const ATTR_UV: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// GLSL ES 3.00 sources for one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSource {
    pub label: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    Lines,
    Points,
}

/// Indexed geometry. `normals` and `uvs` may be empty; if present they must
/// match `positions` in length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub primitive: Option<Primitive>,
}

impl MeshData {
    pub fn primitive(&self) -> Primitive {
        self.primitive.unwrap_or(Primitive::Triangles)
    }

    pub fn element_count(&self) -> usize {
        if self.indices.is_empty() {
            self.positions.len()
        } else {
            self.indices.len()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceAttribute {
    pub location: u32,
    pub components: u32,
}

/// Interleaved per-instance float layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceLayout {
    pub attributes: &'static [InstanceAttribute],
}

impl InstanceLayout {
    /// Floats per instance.
    pub fn stride(&self) -> usize {
        self.attributes.iter().map(|a| a.components as usize).sum()
    }

    pub fn instance_count(&self, data: &[f32]) -> usize {
        match self.stride() {
            0 => 0,
            stride => data.len() / stride,
        }
    }
}

/// Instance transform as a column-major 4x4 matrix split over four vec4
/// attributes.
pub const MATRIX_INSTANCES: InstanceLayout = InstanceLayout {
    attributes: &[
        InstanceAttribute { location: 3, components: 4 },
        InstanceAttribute { location: 4, components: 4 },
        InstanceAttribute { location: 5, components: 4 },
        InstanceAttribute { location: 6, components: 4 },
    ],
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    F32(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Mat4([f32; 16]),
    /// Samples the color attachment of an off-screen target.
    Texture { target: TargetId, unit: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    Opaque,
    Alpha,
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    /// Test and write.
    ReadWrite,
    /// Test without writing; used by transparent layers.
    ReadOnly,
    Off,
}

#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub program: ProgramId,
    pub mesh: MeshId,
    pub uniforms: &'a [(&'static str, Uniform)],
    /// Instance count; `None` draws the mesh once without instancing.
    pub instances: Option<u32>,
    pub blend: Blend,
    pub depth: DepthMode,
}

impl<'a> DrawCall<'a> {
    pub fn new(program: ProgramId, mesh: MeshId, uniforms: &'a [(&'static str, Uniform)]) -> Self {
        Self {
            program,
            mesh,
            uniforms,
            instances: None,
            blend: Blend::Opaque,
            depth: DepthMode::ReadWrite,
        }
    }

    pub fn instanced(mut self, count: u32) -> Self {
        self.instances = Some(count);
        self
    }

    pub fn blend(mut self, blend: Blend) -> Self {
        self.blend = blend;
        self
    }

    pub fn depth(mut self, depth: DepthMode) -> Self {
        self.depth = depth;
        self
    }
}

/// Minimal driver surface the renderer needs.
pub trait Gpu {
    fn compile(&mut self, source: &ProgramSource) -> Result<ProgramId, GpuError>;

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshId, GpuError>;

    /// Replaces the per-instance buffer attached to `mesh`.
    fn upload_instances(
        &mut self,
        mesh: MeshId,
        layout: &InstanceLayout,
        data: &[f32],
    ) -> Result<(), GpuError>;

    /// Off-screen color + depth target.
    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId, GpuError>;

    /// Frees `target`. The handle is dead afterwards; deleting it twice is
    /// a no-op.
    fn delete_target(&mut self, target: TargetId);

    fn target_size(&self, target: TargetId) -> Option<(u32, u32)>;

    /// `None` binds the visible surface.
    fn bind_target(&mut self, target: Option<TargetId>);

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Clears color and depth of the bound target.
    fn clear(&mut self, color: Rgb, alpha: f32);

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), GpuError>;
}
