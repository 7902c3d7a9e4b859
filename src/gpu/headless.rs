//! Recording backend with no rasteriser.
//!
//! `HeadlessGpu` checks the same things a real driver would reject (missing
//! entry points, dangling handles, sampling the target being drawn into)
//! and keeps a log of what each frame did, so the orchestrator can be
//! exercised on the host.

use std::collections::HashSet;

use crate::color::Rgb;
use crate::error::GpuError;

use super::{
    DrawCall, Gpu, InstanceLayout, MeshData, MeshId, ProgramId, ProgramSource, TargetId, Uniform,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Bind(Option<TargetId>),
    Viewport(u32, u32),
    Clear { target: Option<TargetId>, color: Rgb },
    Instances { mesh: MeshId, data: Vec<f32> },
    Draw {
        target: Option<TargetId>,
        program: &'static str,
        uniforms: Vec<(&'static str, Uniform)>,
        instances: Option<u32>,
    },
}

#[derive(Debug, Clone)]
struct MeshRecord {
    elements: usize,
    instances: usize,
}

#[derive(Debug, Default)]
pub struct HeadlessGpu {
    programs: Vec<&'static str>,
    meshes: Vec<MeshRecord>,
    targets: Vec<Option<(u32, u32)>>,
    target_budget: Option<usize>,
    bound: Option<TargetId>,
    commands: Vec<Command>,
    broken: HashSet<&'static str>,
    compiled: Vec<&'static str>,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `compile` of the program labelled `label` fail, as
    /// a driver rejecting the shader would.
    pub fn break_program(&mut self, label: &'static str) {
        self.broken.insert(label);
    }

    /// Lets `budget` more render targets be allocated, then fails every
    /// later `create_target` until reset with `None`.
    pub fn set_target_budget(&mut self, budget: Option<usize>) {
        self.target_budget = budget;
    }

    /// Labels of every successfully compiled program, in order.
    pub fn compiled(&self) -> &[&'static str] {
        &self.compiled
    }

    /// Drains the commands recorded since the last call.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn instance_count(&self, mesh: MeshId) -> Option<usize> {
        self.meshes.get(mesh.0 as usize).map(|m| m.instances)
    }

    fn check_mesh(&self, mesh: MeshId) -> Result<&MeshRecord, GpuError> {
        self.meshes.get(mesh.0 as usize).ok_or(GpuError::UnknownHandle)
    }
}

fn check_stage(stage: &'static str, source: &str) -> Result<(), GpuError> {
    let trimmed = source.trim_start();
    if !trimmed.starts_with("#version 300 es") {
        return Err(GpuError::ShaderCompile {
            stage,
            log: "missing `#version 300 es` directive".to_owned(),
        });
    }
    if !source.contains("void main") {
        return Err(GpuError::ShaderCompile {
            stage,
            log: "no entry point".to_owned(),
        });
    }
    Ok(())
}

impl Gpu for HeadlessGpu {
    fn compile(&mut self, source: &ProgramSource) -> Result<ProgramId, GpuError> {
        check_stage("vertex", source.vertex)?;
        check_stage("fragment", source.fragment)?;
        if self.broken.contains(source.label) {
            return Err(GpuError::ProgramLink(format!(
                "{} rejected by driver",
                source.label
            )));
        }
        self.programs.push(source.label);
        self.compiled.push(source.label);
        Ok(ProgramId(self.programs.len() as u32 - 1))
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshId, GpuError> {
        let vertices = mesh.positions.len();
        if vertices == 0 {
            return Err(GpuError::Resource("empty mesh"));
        }
        if (!mesh.normals.is_empty() && mesh.normals.len() != vertices)
            || (!mesh.uvs.is_empty() && mesh.uvs.len() != vertices)
        {
            return Err(GpuError::Resource("mismatched vertex streams"));
        }
        if mesh.indices.iter().any(|&i| i as usize >= vertices) {
            return Err(GpuError::Resource("index out of range"));
        }
        self.meshes.push(MeshRecord {
            elements: mesh.element_count(),
            instances: 0,
        });
        Ok(MeshId(self.meshes.len() as u32 - 1))
    }

    fn upload_instances(
        &mut self,
        mesh: MeshId,
        layout: &InstanceLayout,
        data: &[f32],
    ) -> Result<(), GpuError> {
        let count = layout.instance_count(data);
        let record = self
            .meshes
            .get_mut(mesh.0 as usize)
            .ok_or(GpuError::UnknownHandle)?;
        record.instances = count;
        self.commands.push(Command::Instances {
            mesh,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId, GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::Resource("zero-sized render target"));
        }
        match self.target_budget.as_mut() {
            Some(0) => return Err(GpuError::Resource("render target storage")),
            Some(left) => *left -= 1,
            None => {}
        }
        self.targets.push(Some((width, height)));
        Ok(TargetId(self.targets.len() as u32 - 1))
    }

    fn delete_target(&mut self, target: TargetId) {
        if let Some(slot) = self.targets.get_mut(target.0 as usize) {
            *slot = None;
        }
        if self.bound == Some(target) {
            self.bound = None;
        }
    }

    fn target_size(&self, target: TargetId) -> Option<(u32, u32)> {
        self.targets.get(target.0 as usize).copied().flatten()
    }

    fn bind_target(&mut self, target: Option<TargetId>) {
        self.bound = target;
        self.commands.push(Command::Bind(target));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(Command::Viewport(width, height));
    }

    fn clear(&mut self, color: Rgb, _alpha: f32) {
        self.commands.push(Command::Clear {
            target: self.bound,
            color,
        });
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), GpuError> {
        let program = *self
            .programs
            .get(call.program.0 as usize)
            .ok_or(GpuError::UnknownHandle)?;
        let mesh = self.check_mesh(call.mesh)?;
        if mesh.elements == 0 {
            return Err(GpuError::Resource("mesh has no elements"));
        }
        for (_, uniform) in call.uniforms {
            if let Uniform::Texture { target, .. } = uniform {
                if self.target_size(*target).is_none() {
                    return Err(GpuError::UnknownHandle);
                }
                if self.bound == Some(*target) {
                    return Err(GpuError::Resource("feedback loop: sampling the bound target"));
                }
            }
        }
        self.commands.push(Command::Draw {
            target: self.bound,
            program,
            uniforms: call.uniforms.to_vec(),
            instances: call.instances,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::geometry;

    const OK: ProgramSource = ProgramSource {
        label: "ok",
        vertex: "#version 300 es\nvoid main() {}",
        fragment: "#version 300 es\nvoid main() {}",
    };

    #[test]
    fn rejects_sources_without_version() {
        let mut gpu = HeadlessGpu::new();
        let bad = ProgramSource {
            vertex: "void main() {}",
            ..OK
        };
        assert!(matches!(
            gpu.compile(&bad),
            Err(GpuError::ShaderCompile { stage: "vertex", .. })
        ));
        assert!(gpu.compile(&OK).is_ok());
    }

    #[test]
    fn target_budget_runs_out_and_deleted_targets_are_dead() {
        let mut gpu = HeadlessGpu::new();
        gpu.set_target_budget(Some(1));
        let target = gpu.create_target(8, 8).unwrap();
        assert!(gpu.create_target(8, 8).is_err());
        gpu.delete_target(target);
        assert_eq!(gpu.target_size(target), None);
        gpu.set_target_budget(None);
        assert!(gpu.create_target(8, 8).is_ok());
    }

    #[test]
    fn refuses_to_sample_bound_target() {
        let mut gpu = HeadlessGpu::new();
        let program = gpu.compile(&OK).unwrap();
        let mesh = gpu.upload_mesh(&geometry::quad(1.0, 1.0)).unwrap();
        let target = gpu.create_target(4, 4).unwrap();
        gpu.bind_target(Some(target));
        let uniforms = [("u_tex", Uniform::Texture { target, unit: 0 })];
        assert!(gpu.draw(&DrawCall::new(program, mesh, &uniforms)).is_err());
        gpu.bind_target(None);
        assert!(gpu.draw(&DrawCall::new(program, mesh, &uniforms)).is_ok());
    }
}
