//! [`GraphicsBackend`] on top of wgpu.
//!
//! State changes and draws are buffered while the scene renderer runs and
//! replayed into render passes by [`WgpuBackend::finish_frame`]; every depth
//! clear starts a new pass.

pub mod depth_texture;
pub mod render_mesh;
pub mod uniforms;

use std::collections::HashMap;

use glam::{Mat4, Vec4};
use itertools::Itertools;
use log::{debug, warn};
use pollster::block_on;
use wgpu::{DepthBiasState, MultisampleState, PipelineCompilationOptions, StencilState};

use crate::error::BackendError;
use crate::rendering::{
    backend::{GraphicsBackend, LightState, Material},
    context::Viewport,
    mesh::{MeshId, MeshLibrary},
};

use depth_texture::DepthTexture;
use render_mesh::{RenderMesh, RENDER_MESH_VBL};
use uniforms::{DrawUniform, LightingState, MAX_GPU_LIGHTS};

const SCENE_SHADER: &str = include_str!("../../shaders/scene.wgsl");

const INITIAL_DRAW_CAPACITY: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
struct PipelineKey {
    depth_test: bool,
    blend: bool,
    wireframe: bool,
}

#[derive(Debug, Clone, Copy)]
enum FrameCommand {
    ClearDepth,
    Draw {
        mesh: MeshId,
        key: PipelineKey,
        viewport: Viewport,
        uniform_index: usize,
    },
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    supports_wireframe: bool,

    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    uniform_buffer: wgpu::Buffer,
    uniform_capacity: u64,
    bind_group: wgpu::BindGroup,

    meshes: HashMap<MeshId, RenderMesh>,

    key: PipelineKey,
    viewport: Viewport,
    projection: Mat4,
    lighting: LightingState,

    uniforms: Vec<DrawUniform>,
    commands: Vec<FrameCommand>,
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        viewport: Viewport,
    ) -> Self {
        let supports_wireframe = device.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        if !supports_wireframe {
            warn!("Adapter has no line polygon mode; wireframe draws will be filled");
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene shader"),
            source: wgpu::ShaderSource::Wgsl(SCENE_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(DrawUniform::SIZE),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let (uniform_buffer, bind_group) =
            Self::create_uniform_buffer(&device, &bind_group_layout, INITIAL_DRAW_CAPACITY);

        Self {
            device,
            queue,
            color_format,
            supports_wireframe,
            shader,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            uniform_buffer,
            uniform_capacity: INITIAL_DRAW_CAPACITY,
            bind_group,
            meshes: HashMap::new(),
            key: PipelineKey::default(),
            viewport,
            projection: Mat4::IDENTITY,
            lighting: LightingState::default(),
            uniforms: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn create_uniform_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw uniform buffer"),
            size: capacity * DrawUniform::STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_uniform_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(DrawUniform::SIZE),
                }),
            }],
        });

        (buffer, bind_group)
    }

    /// Uploads every mesh in `library` that is not on the device yet.
    pub fn upload_meshes(&mut self, library: &MeshLibrary) {
        for (id, mesh) in library.iter() {
            if self.meshes.contains_key(&id) {
                continue;
            }

            debug!(
                "Uploading mesh {} ({} vertices, {} indices)",
                mesh.name,
                mesh.vertices.len(),
                mesh.indices.len()
            );
            self.meshes.insert(id, RenderMesh::from_mesh(&self.device, mesh));
        }
    }

    /// Resets per-frame state. Call before the scene renderer runs.
    pub fn begin_frame(&mut self) {
        self.uniforms.clear();
        self.commands.clear();
        self.key = PipelineKey::default();
        self.projection = Mat4::IDENTITY;
        self.lighting = LightingState::default();
    }

    fn ensure_uniform_capacity(&mut self) {
        let needed = self.uniforms.len() as u64;
        if needed <= self.uniform_capacity {
            return;
        }

        let capacity = needed.next_power_of_two().max(INITIAL_DRAW_CAPACITY);
        debug!("Growing draw uniform buffer to {capacity} draws");
        let (buffer, bind_group) =
            Self::create_uniform_buffer(&self.device, &self.bind_group_layout, capacity);
        self.uniform_buffer = buffer;
        self.bind_group = bind_group;
        self.uniform_capacity = capacity;
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }

        let pipeline = self.create_pipeline(key);
        self.pipelines.insert(key, pipeline);
    }

    fn create_pipeline(&self, key: PipelineKey) -> wgpu::RenderPipeline {
        let label = format!(
            "Scene pipeline (depth: {}, blend: {}, wireframe: {})",
            key.depth_test, key.blend, key.wireframe
        );

        let blend = if key.blend {
            wgpu::BlendState::ALPHA_BLENDING
        } else {
            wgpu::BlendState::REPLACE
        };

        let polygon_mode = if key.wireframe && self.supports_wireframe {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        };

        let (depth_write_enabled, depth_compare) = if key.depth_test {
            (true, wgpu::CompareFunction::Less)
        } else {
            (false, wgpu::CompareFunction::Always)
        };

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[RENDER_MESH_VBL],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTexture::DEPTH_FORMAT,
                depth_write_enabled,
                depth_compare,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Replays the buffered frame into `color` and `depth` and submits it.
    pub fn finish_frame(
        &mut self,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        clear_color: wgpu::Color,
    ) -> Result<(), BackendError> {
        if cfg!(debug_assertions) {
            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        }

        self.ensure_uniform_capacity();

        let keys: Vec<PipelineKey> = self
            .commands
            .iter()
            .filter_map(|command| match command {
                FrameCommand::Draw { key, .. } => Some(*key),
                FrameCommand::ClearDepth => None,
            })
            .unique()
            .collect();
        for key in keys {
            self.ensure_pipeline(key);
        }

        let stride = DrawUniform::STRIDE as usize;
        let mut staging = vec![0u8; self.uniforms.len() * stride];
        for (chunk, uniform) in staging.chunks_exact_mut(stride).zip(&self.uniforms) {
            chunk[..DrawUniform::SIZE as usize].copy_from_slice(bytemuck::bytes_of(uniform));
        }
        if !staging.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &staging);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene encoder"),
            });

        let segments = self
            .commands
            .split(|command| matches!(command, FrameCommand::ClearDepth));

        for (index, segment) in segments.enumerate() {
            let color_load = if index == 0 {
                wgpu::LoadOp::Clear(clear_color)
            } else {
                wgpu::LoadOp::Load
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let mut current_key = None;
            let mut current_viewport = None;

            for command in segment {
                let FrameCommand::Draw {
                    mesh,
                    key,
                    viewport,
                    uniform_index,
                } = *command
                else {
                    continue;
                };

                if viewport.width == 0 || viewport.height == 0 {
                    continue;
                }

                // Checked when the draw was recorded.
                let Some(render_mesh) = self.meshes.get(&mesh) else {
                    continue;
                };

                if current_key != Some(key) {
                    if let Some(pipeline) = self.pipelines.get(&key) {
                        render_pass.set_pipeline(pipeline);
                    }
                    current_key = Some(key);
                }

                if current_viewport != Some(viewport) {
                    render_pass.set_viewport(
                        viewport.x as f32,
                        viewport.y as f32,
                        viewport.width as f32,
                        viewport.height as f32,
                        0.0,
                        1.0,
                    );
                    current_viewport = Some(viewport);
                }

                let offset = (uniform_index * stride) as wgpu::DynamicOffset;
                render_pass.set_bind_group(0, &self.bind_group, &[offset]);
                render_pass.set_vertex_buffer(0, render_mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(render_mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..render_mesh.num_indices, 0, 0..1);
            }
        }

        self.queue.submit([encoder.finish()]);

        if cfg!(debug_assertions) {
            if let Some(error) = block_on(self.device.pop_error_scope()) {
                return Err(BackendError::Device(error.to_string()));
            }
        }

        Ok(())
    }
}

impl GraphicsBackend for WgpuBackend {
    fn max_lights(&self) -> usize {
        MAX_GPU_LIGHTS
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<(), BackendError> {
        self.viewport = viewport;
        Ok(())
    }

    fn set_projection(&mut self, projection: Mat4) -> Result<(), BackendError> {
        self.projection = projection;
        Ok(())
    }

    fn set_ambient(&mut self, color: Vec4) -> Result<(), BackendError> {
        self.lighting.ambient = color;
        Ok(())
    }

    fn set_lighting(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.lighting.enabled = enabled;
        Ok(())
    }

    fn bind_light(&mut self, slot: usize, light: &LightState) -> Result<(), BackendError> {
        if slot >= MAX_GPU_LIGHTS {
            return Err(BackendError::LightSlot {
                slot,
                capacity: MAX_GPU_LIGHTS,
            });
        }
        self.lighting.bind(slot, light);
        Ok(())
    }

    fn disable_light(&mut self, slot: usize) -> Result<(), BackendError> {
        if slot >= MAX_GPU_LIGHTS {
            return Err(BackendError::LightSlot {
                slot,
                capacity: MAX_GPU_LIGHTS,
            });
        }
        self.lighting.disable(slot);
        Ok(())
    }

    fn clear_depth(&mut self) -> Result<(), BackendError> {
        self.commands.push(FrameCommand::ClearDepth);
        Ok(())
    }

    fn set_depth_test(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.key.depth_test = enabled;
        Ok(())
    }

    fn set_blending(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.key.blend = enabled;
        Ok(())
    }

    fn set_wireframe(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.key.wireframe = enabled;
        Ok(())
    }

    fn draw_mesh(
        &mut self,
        mesh: MeshId,
        model_view: Mat4,
        material: &Material,
    ) -> Result<(), BackendError> {
        if !self.meshes.contains_key(&mesh) {
            return Err(BackendError::UnknownMesh(mesh));
        }

        let uniform_index = self.uniforms.len();
        self.uniforms.push(DrawUniform::new(
            model_view,
            self.projection,
            material,
            &self.lighting,
        ));
        self.commands.push(FrameCommand::Draw {
            mesh,
            key: self.key,
            viewport: self.viewport,
            uniform_index,
        });

        Ok(())
    }
}
