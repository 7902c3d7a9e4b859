//! WebGL2 implementation of [`Gpu`].

use std::collections::HashMap;

use js_sys::{Float32Array, Uint32Array};
use web_sys::{
    WebGl2RenderingContext as GL, WebGlBuffer, WebGlFramebuffer, WebGlProgram,
    WebGlRenderbuffer, WebGlShader, WebGlTexture, WebGlUniformLocation, WebGlVertexArrayObject,
};

use crate::color::Rgb;
use crate::error::GpuError;
use crate::gpu::{
    Blend, DepthMode, DrawCall, Gpu, InstanceLayout, MeshData, MeshId, Primitive, ProgramId,
    ProgramSource, TargetId, Uniform, ATTR_NORMAL, ATTR_POSITION, ATTR_UV,
};

const FLOAT_BYTES: i32 = 4;

struct ProgramEntry {
    program: WebGlProgram,
    locations: HashMap<&'static str, Option<WebGlUniformLocation>>,
}

struct MeshEntry {
    vao: WebGlVertexArrayObject,
    mode: u32,
    count: i32,
    indexed: bool,
    instances: Option<WebGlBuffer>,
}

struct TargetEntry {
    framebuffer: WebGlFramebuffer,
    color: WebGlTexture,
    depth: WebGlRenderbuffer,
    width: u32,
    height: u32,
}

pub struct WebGl2Gpu {
    gl: GL,
    programs: Vec<ProgramEntry>,
    meshes: Vec<MeshEntry>,
    targets: Vec<Option<TargetEntry>>,
    bound: Option<TargetId>,
}

impl WebGl2Gpu {
    pub fn new(gl: GL) -> Self {
        gl.enable(GL::DEPTH_TEST);
        gl.depth_func(GL::LEQUAL);
        Self {
            gl,
            programs: Vec::new(),
            meshes: Vec::new(),
            targets: Vec::new(),
            bound: None,
        }
    }

    fn compile_stage(
        &self,
        stage: &'static str,
        kind: u32,
        source: &str,
    ) -> Result<WebGlShader, GpuError> {
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or(GpuError::Resource("shader object"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);
        let ok = self
            .gl
            .get_shader_parameter(&shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if ok {
            Ok(shader)
        } else {
            let log = self.gl.get_shader_info_log(&shader).unwrap_or_default();
            self.gl.delete_shader(Some(&shader));
            Err(GpuError::ShaderCompile { stage, log })
        }
    }

    fn upload_attribute(
        &self,
        location: u32,
        components: i32,
        data: &[f32],
    ) -> Result<(), GpuError> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or(GpuError::Resource("vertex buffer"))?;
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        self.gl.buffer_data_with_array_buffer_view(
            GL::ARRAY_BUFFER,
            &Float32Array::from(data),
            GL::STATIC_DRAW,
        );
        self.gl.enable_vertex_attrib_array(location);
        self.gl
            .vertex_attrib_pointer_with_i32(location, components, GL::FLOAT, false, 0, 0);
        Ok(())
    }

    fn allocate_target(&self, width: u32, height: u32) -> Result<TargetEntry, GpuError> {
        let gl = &self.gl;
        let color = gl.create_texture().ok_or(GpuError::Resource("target texture"))?;
        gl.bind_texture(GL::TEXTURE_2D, Some(&color));
        gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
            GL::TEXTURE_2D,
            0,
            GL::RGBA8 as i32,
            width as i32,
            height as i32,
            0,
            GL::RGBA,
            GL::UNSIGNED_BYTE,
            None,
        )
        .map_err(|_| GpuError::Resource("target texture storage"))?;
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MIN_FILTER, GL::LINEAR as i32);
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MAG_FILTER, GL::LINEAR as i32);
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_S, GL::CLAMP_TO_EDGE as i32);
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_T, GL::CLAMP_TO_EDGE as i32);
        gl.bind_texture(GL::TEXTURE_2D, None);

        let depth = gl
            .create_renderbuffer()
            .ok_or(GpuError::Resource("depth renderbuffer"))?;
        gl.bind_renderbuffer(GL::RENDERBUFFER, Some(&depth));
        gl.renderbuffer_storage(
            GL::RENDERBUFFER,
            GL::DEPTH_COMPONENT24,
            width as i32,
            height as i32,
        );
        gl.bind_renderbuffer(GL::RENDERBUFFER, None);

        let framebuffer = gl
            .create_framebuffer()
            .ok_or(GpuError::Resource("framebuffer"))?;
        gl.bind_framebuffer(GL::FRAMEBUFFER, Some(&framebuffer));
        gl.framebuffer_texture_2d(
            GL::FRAMEBUFFER,
            GL::COLOR_ATTACHMENT0,
            GL::TEXTURE_2D,
            Some(&color),
            0,
        );
        gl.framebuffer_renderbuffer(
            GL::FRAMEBUFFER,
            GL::DEPTH_ATTACHMENT,
            GL::RENDERBUFFER,
            Some(&depth),
        );
        let status = gl.check_framebuffer_status(GL::FRAMEBUFFER);
        self.rebind();
        if status != GL::FRAMEBUFFER_COMPLETE {
            gl.delete_framebuffer(Some(&framebuffer));
            gl.delete_texture(Some(&color));
            gl.delete_renderbuffer(Some(&depth));
            return Err(GpuError::IncompleteFramebuffer(status));
        }
        Ok(TargetEntry {
            framebuffer,
            color,
            depth,
            width,
            height,
        })
    }

    fn target(&self, target: TargetId) -> Option<&TargetEntry> {
        self.targets.get(target.0 as usize).and_then(Option::as_ref)
    }

    /// Restores whatever framebuffer the caller last bound.
    fn rebind(&self) {
        let framebuffer = self
            .bound
            .and_then(|t| self.target(t))
            .map(|t| &t.framebuffer);
        self.gl.bind_framebuffer(GL::FRAMEBUFFER, framebuffer);
    }

    fn apply_state(&self, blend: Blend, depth: DepthMode) {
        let gl = &self.gl;
        match blend {
            Blend::Opaque => gl.disable(GL::BLEND),
            Blend::Alpha => {
                gl.enable(GL::BLEND);
                gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
            }
            Blend::Additive => {
                gl.enable(GL::BLEND);
                gl.blend_func(GL::SRC_ALPHA, GL::ONE);
            }
        }
        match depth {
            DepthMode::ReadWrite => {
                gl.enable(GL::DEPTH_TEST);
                gl.depth_mask(true);
            }
            DepthMode::ReadOnly => {
                gl.enable(GL::DEPTH_TEST);
                gl.depth_mask(false);
            }
            DepthMode::Off => {
                gl.disable(GL::DEPTH_TEST);
                gl.depth_mask(false);
            }
        }
    }
}

impl Gpu for WebGl2Gpu {
    fn compile(&mut self, source: &ProgramSource) -> Result<ProgramId, GpuError> {
        let vertex = self.compile_stage("vertex", GL::VERTEX_SHADER, source.vertex)?;
        let fragment = self.compile_stage("fragment", GL::FRAGMENT_SHADER, source.fragment)?;
        let gl = &self.gl;
        let program = gl
            .create_program()
            .ok_or(GpuError::Resource("program object"))?;
        gl.attach_shader(&program, &vertex);
        gl.attach_shader(&program, &fragment);
        gl.link_program(&program);
        gl.delete_shader(Some(&vertex));
        gl.delete_shader(Some(&fragment));
        let linked = gl
            .get_program_parameter(&program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if !linked {
            let log = gl.get_program_info_log(&program).unwrap_or_default();
            gl.delete_program(Some(&program));
            return Err(GpuError::ProgramLink(format!("{}: {log}", source.label)));
        }
        log::debug!("compiled `{}`", source.label);
        self.programs.push(ProgramEntry {
            program,
            locations: HashMap::new(),
        });
        Ok(ProgramId(self.programs.len() as u32 - 1))
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshId, GpuError> {
        if mesh.positions.is_empty() {
            return Err(GpuError::Resource("empty mesh"));
        }
        let vao = self
            .gl
            .create_vertex_array()
            .ok_or(GpuError::Resource("vertex array"))?;
        self.gl.bind_vertex_array(Some(&vao));
        self.upload_attribute(ATTR_POSITION, 3, mesh.positions.as_flattened())?;
        if !mesh.normals.is_empty() {
            self.upload_attribute(ATTR_NORMAL, 3, mesh.normals.as_flattened())?;
        }
        if !mesh.uvs.is_empty() {
            self.upload_attribute(ATTR_UV, 2, mesh.uvs.as_flattened())?;
        }
        let indexed = !mesh.indices.is_empty();
        if indexed {
            let buffer = self
                .gl
                .create_buffer()
                .ok_or(GpuError::Resource("index buffer"))?;
            self.gl.bind_buffer(GL::ELEMENT_ARRAY_BUFFER, Some(&buffer));
            self.gl.buffer_data_with_array_buffer_view(
                GL::ELEMENT_ARRAY_BUFFER,
                &Uint32Array::from(mesh.indices.as_slice()),
                GL::STATIC_DRAW,
            );
        }
        self.gl.bind_vertex_array(None);
        let mode = match mesh.primitive() {
            Primitive::Triangles => GL::TRIANGLES,
            Primitive::Lines => GL::LINES,
            Primitive::Points => GL::POINTS,
        };
        self.meshes.push(MeshEntry {
            vao,
            mode,
            count: mesh.element_count() as i32,
            indexed,
            instances: None,
        });
        Ok(MeshId(self.meshes.len() as u32 - 1))
    }

    fn upload_instances(
        &mut self,
        mesh: MeshId,
        layout: &InstanceLayout,
        data: &[f32],
    ) -> Result<(), GpuError> {
        let gl = &self.gl;
        let entry = self
            .meshes
            .get_mut(mesh.0 as usize)
            .ok_or(GpuError::UnknownHandle)?;
        gl.bind_vertex_array(Some(&entry.vao));
        let fresh = entry.instances.is_none();
        if fresh {
            entry.instances = gl.create_buffer();
        }
        let buffer = entry
            .instances
            .as_ref()
            .ok_or(GpuError::Resource("instance buffer"))?;
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(buffer));
        gl.buffer_data_with_array_buffer_view(
            GL::ARRAY_BUFFER,
            &Float32Array::from(data),
            GL::DYNAMIC_DRAW,
        );
        if fresh {
            let stride = layout.stride() as i32 * FLOAT_BYTES;
            let mut offset = 0;
            for attribute in layout.attributes {
                gl.enable_vertex_attrib_array(attribute.location);
                gl.vertex_attrib_pointer_with_i32(
                    attribute.location,
                    attribute.components as i32,
                    GL::FLOAT,
                    false,
                    stride,
                    offset,
                );
                gl.vertex_attrib_divisor(attribute.location, 1);
                offset += attribute.components as i32 * FLOAT_BYTES;
            }
        }
        gl.bind_vertex_array(None);
        Ok(())
    }

    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId, GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::Resource("zero-sized render target"));
        }
        let target = self.allocate_target(width, height)?;
        self.targets.push(Some(target));
        Ok(TargetId(self.targets.len() as u32 - 1))
    }

    fn delete_target(&mut self, target: TargetId) {
        let Some(old) = self.targets.get_mut(target.0 as usize).and_then(Option::take) else {
            return;
        };
        self.gl.delete_framebuffer(Some(&old.framebuffer));
        self.gl.delete_texture(Some(&old.color));
        self.gl.delete_renderbuffer(Some(&old.depth));
        if self.bound == Some(target) {
            self.bound = None;
            self.rebind();
        }
    }

    fn target_size(&self, target: TargetId) -> Option<(u32, u32)> {
        self.target(target).map(|t| (t.width, t.height))
    }

    fn bind_target(&mut self, target: Option<TargetId>) {
        self.bound = target;
        self.rebind();
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    fn clear(&mut self, color: Rgb, alpha: f32) {
        self.gl.clear_color(color.r, color.g, color.b, alpha);
        self.gl.depth_mask(true);
        self.gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), GpuError> {
        for (_, uniform) in call.uniforms {
            if let Uniform::Texture { target, .. } = uniform {
                if self.bound == Some(*target) {
                    return Err(GpuError::Resource("feedback loop: sampling the bound target"));
                }
            }
        }
        let gl = &self.gl;
        let entry = self
            .programs
            .get_mut(call.program.0 as usize)
            .ok_or(GpuError::UnknownHandle)?;
        let mesh = self
            .meshes
            .get(call.mesh.0 as usize)
            .ok_or(GpuError::UnknownHandle)?;
        gl.use_program(Some(&entry.program));

        for &(name, uniform) in call.uniforms {
            let program = &entry.program;
            let location = entry
                .locations
                .entry(name)
                .or_insert_with(|| gl.get_uniform_location(program, name))
                .as_ref();
            match uniform {
                Uniform::F32(v) => gl.uniform1f(location, v),
                Uniform::Vec2(v) => gl.uniform2fv_with_f32_array(location, &v),
                Uniform::Vec3(v) => gl.uniform3fv_with_f32_array(location, &v),
                Uniform::Mat4(m) => gl.uniform_matrix4fv_with_f32_array(location, false, &m),
                Uniform::Texture { target, unit } => {
                    let texture = self
                        .targets
                        .get(target.0 as usize)
                        .and_then(Option::as_ref)
                        .ok_or(GpuError::UnknownHandle)?;
                    gl.active_texture(GL::TEXTURE0 + unit);
                    gl.bind_texture(GL::TEXTURE_2D, Some(&texture.color));
                    gl.uniform1i(location, unit as i32);
                }
            }
        }

        self.apply_state(call.blend, call.depth);
        let gl = &self.gl;
        gl.bind_vertex_array(Some(&mesh.vao));
        match (call.instances, mesh.indexed) {
            (Some(n), true) => gl.draw_elements_instanced_with_i32(
                mesh.mode,
                mesh.count,
                GL::UNSIGNED_INT,
                0,
                n as i32,
            ),
            (Some(n), false) => gl.draw_arrays_instanced(mesh.mode, 0, mesh.count, n as i32),
            (None, true) => gl.draw_elements_with_i32(mesh.mode, mesh.count, GL::UNSIGNED_INT, 0),
            (None, false) => gl.draw_arrays(mesh.mode, 0, mesh.count),
        }
        gl.bind_vertex_array(None);
        Ok(())
    }
}
