use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use log::error;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::render::shadow::{self, ShadowAtlas, FRUSTUM_EDGES, SHADOW_FORMAT};
use crate::render::{shaders, CameraParams, MAX_LIGHTS};
use crate::scene::{light_pass_info, Drawable, Light, Material, Scene, ShadowFilter};
use crate::sequencer::{plan_frame, FramePass};

/// Runtime switches for the debug visualization pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugToggles {
    pub light_markers: bool,
    pub frustums: bool,
}

/// GPU renderer executing the sequencer's frame plan: one depth pass per
/// shadow-casting light into the shadow atlas, then the lit camera pass.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    forward_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    shadow_pass_bind_groups: Vec<wgpu::BindGroup>,
    atlas: ShadowAtlas,
    line_buffer: wgpu::Buffer,
    line_bind_group: wgpu::BindGroup,
    frustum_vertices: wgpu::Buffer,
    frustum_vertex_count: u32,
    marker_mesh: MeshBuffers,
    draws: Vec<DrawEntry>,
    lights: Vec<Light>,
    shadows_supported: bool,
}

struct DrawEntry {
    buffers: MeshBuffers,
    drawable: Drawable,
    material: Material,
}

impl Renderer {
    /// Initializes the GPU renderer for the provided window and scene.
    pub async fn new(window: Arc<Window>, scene: &Scene) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }
        if scene.lights.len() > MAX_LIGHTS {
            return Err(anyhow!(
                "scene has {} lights but the pipelines hold {MAX_LIGHTS}",
                scene.lights.len()
            ));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = unsafe { instance.create_surface(window.as_ref()) }?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        // The one capability this app cares about: without comparison
        // samplers there is no shadow mapping, only the lit pass.
        let shadows_supported = adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPARISON_SAMPLERS);
        if !shadows_supported {
            error!("adapter does not support comparison samplers; shadows disabled");
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| {
                    matches!(
                        mode,
                        wgpu::PresentMode::Mailbox | wgpu::PresentMode::Immediate
                    )
                })
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);
        let atlas = ShadowAtlas::new(
            &device,
            scene.shadow_config.resolution,
            scene.lights.len().max(1) as u32,
        );

        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("global-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            NonZeroU64::new(std::mem::size_of::<GlobalUniform>() as u64).unwrap(),
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            NonZeroU64::new(
                                (std::mem::size_of::<LightUniform>() * MAX_LIGHTS) as u64,
                            )
                            .unwrap(),
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(
                        NonZeroU64::new(std::mem::size_of::<ObjectConstants>() as u64).unwrap(),
                    ),
                },
                count: None,
            }],
        });

        let shadow_pass_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shadow-pass-bind-layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            NonZeroU64::new(std::mem::size_of::<ShadowPassUniform>() as u64)
                                .unwrap(),
                        ),
                    },
                    count: None,
                }],
            });

        let line_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("line-bind-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(
                        NonZeroU64::new(std::mem::size_of::<LineUniform>() as u64).unwrap(),
                    ),
                },
                count: None,
            }],
        });

        let forward_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("forward-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::FORWARD_SHADER.into()),
        });
        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SHADOW_SHADER.into()),
        });
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::LINE_SHADER.into()),
        });

        let forward_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("forward-pipeline-layout"),
                bind_group_layouts: &[&global_layout, &object_layout],
                push_constant_ranges: &[],
            });
        let shadow_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shadow-pipeline-layout"),
                bind_group_layouts: &[&shadow_pass_layout, &object_layout],
                push_constant_ranges: &[],
            });
        let line_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("line-pipeline-layout"),
                bind_group_layouts: &[&line_layout],
                push_constant_ranges: &[],
            });

        // Lit pass: cull back faces under clockwise front-face winding.
        let forward_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("forward-pipeline"),
            layout: Some(&forward_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &forward_shader,
                entry_point: "vs_main",
                buffers: &[mesh_vertex_layout()],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &forward_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        // Depth pre-pass: only the rear faces reach the shadow map, which
        // trims self-shadowing on closed meshes.
        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow-pipeline"),
            layout: Some(&shadow_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shadow_shader,
                entry_point: "vs_main",
                buffers: &[mesh_vertex_layout()],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(wgpu::Face::Front),
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SHADOW_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: None,
            multiview: None,
        });

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line-pipeline"),
            layout: Some(&line_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &line_shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (3 * std::mem::size_of::<f32>()) as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    }],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &line_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("global-uniform"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Lights never change after setup, so their uniforms are written
        // once here.
        let mut light_uniforms = [LightUniform::zeroed(); MAX_LIGHTS];
        for (slot, light) in light_uniforms.iter_mut().zip(scene.lights.iter()) {
            *slot = light_uniform(
                light,
                scene.shadow_config.resolution,
                scene.shadow_config.filter,
                shadows_supported,
            );
        }
        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("light-uniforms"),
            contents: bytemuck::cast_slice(&light_uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("global-bind-group"),
            layout: &global_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: global_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(atlas.array_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(atlas.sampler()),
                },
            ],
        });

        let shadow_pass_bind_groups = scene
            .lights
            .iter()
            .map(|light| {
                let uniform = ShadowPassUniform {
                    view_proj: shadow::light_view_proj(light).to_cols_array_2d(),
                };
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("shadow-pass-uniform"),
                    contents: bytes_of(&uniform),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("shadow-pass-bind-group"),
                    layout: &shadow_pass_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            })
            .collect();

        let line_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("line-uniform"),
            size: std::mem::size_of::<LineUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let line_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("line-bind-group"),
            layout: &line_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: line_buffer.as_entire_binding(),
            }],
        });

        let frustum_lines = frustum_line_vertices(&scene.lights);
        let frustum_vertex_count = (frustum_lines.len() / 3) as u32;
        let frustum_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frustum-lines"),
            contents: bytemuck::cast_slice(&frustum_lines),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let marker_mesh = MeshBuffers::from_mesh(
            &device,
            &crate::mesh::uv_sphere(1.0, 16, 12),
            "light-marker",
        );

        let draws = scene
            .drawables
            .iter()
            .map(|drawable| DrawEntry {
                buffers: MeshBuffers::from_mesh(
                    &device,
                    &scene.mesh_for(drawable.mesh),
                    "drawable",
                ),
                drawable: *drawable,
                material: scene.materials[drawable.material],
            })
            .collect();

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            forward_pipeline,
            shadow_pipeline,
            line_pipeline,
            global_buffer,
            global_bind_group,
            object_layout,
            shadow_pass_bind_groups,
            atlas,
            line_buffer,
            line_bind_group,
            frustum_vertices,
            frustum_vertex_count,
            marker_mesh,
            draws,
            lights: scene.lights.clone(),
            shadows_supported,
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn shadows_supported(&self) -> bool {
        self.shadows_supported
    }

    /// Advisory surfaced every frame instead of aborting when the backend
    /// cannot do shadow mapping.
    pub fn advisory(&self) -> Option<&'static str> {
        (!self.shadows_supported).then_some("shadows are not supported on this GPU")
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    pub fn aspect(&self) -> f32 {
        if self.size.height == 0 {
            1.0
        } else {
            self.size.width as f32 / self.size.height as f32
        }
    }

    /// Renders one frame: the sequencer's shadow passes, the camera pass,
    /// and the optional debug overlay.
    pub fn render(
        &mut self,
        camera: &CameraParams,
        elapsed: f32,
        debug: DebugToggles,
    ) -> Result<(), wgpu::SurfaceError> {
        let global = GlobalUniform {
            view_proj: camera.view_proj.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            counts: [self.lights.len() as u32, 0, 0, 0],
        };
        self.queue
            .write_buffer(&self.global_buffer, 0, bytes_of(&global));
        let line = LineUniform {
            view_proj: camera.view_proj.to_cols_array_2d(),
            color: [1.0, 0.9, 0.2, 1.0],
        };
        self.queue.write_buffer(&self.line_buffer, 0, bytes_of(&line));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        let object_binds: Vec<wgpu::BindGroup> = self
            .draws
            .iter()
            .map(|entry| self.object_bind_group(entry, elapsed))
            .collect();

        for pass in plan_frame(&light_pass_info(&self.lights, self.shadows_supported)) {
            match pass {
                FramePass::ShadowDepth { light, .. } => {
                    self.record_shadow_pass(&mut encoder, light, &object_binds);
                }
                FramePass::Camera => {
                    self.record_camera_pass(&mut encoder, &view, &object_binds, debug);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn object_bind_group(&self, entry: &DrawEntry, elapsed: f32) -> wgpu::BindGroup {
        let model = entry.drawable.model_matrix(elapsed);
        let constants = object_constants(model, &entry.material, false);
        self.bind_object(&constants)
    }

    fn bind_object(&self, constants: &ObjectConstants) -> wgpu::BindGroup {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object-uniform"),
                contents: bytes_of(constants),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object-bind-group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn record_shadow_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        light: usize,
        object_binds: &[wgpu::BindGroup],
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadow-depth-pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.atlas.layer_view(light),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            }),
        });
        pass.set_pipeline(&self.shadow_pipeline);
        pass.set_bind_group(0, &self.shadow_pass_bind_groups[light], &[]);
        for (entry, bind_group) in self.draws.iter().zip(object_binds) {
            pass.set_vertex_buffer(0, entry.buffers.vertex.slice(..));
            pass.set_index_buffer(entry.buffers.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_indexed(0..entry.buffers.index_count, 0, 0..1);
        }
    }

    fn record_camera_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        object_binds: &[wgpu::BindGroup],
        debug: DebugToggles,
    ) {
        let marker_binds: Vec<wgpu::BindGroup> = if debug.light_markers {
            self.lights
                .iter()
                .map(|light| {
                    let model =
                        Mat4::from_translation(light.position) * Mat4::from_scale(Vec3::splat(8.0));
                    let material = Material {
                        diffuse: light.diffuse,
                        ..Material::default()
                    };
                    self.bind_object(&object_constants(model, &material, true))
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("camera-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.0,
                        g: 0.0,
                        b: 0.0,
                        a: 1.0,
                    }),
                    store: true,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            }),
        });

        pass.set_pipeline(&self.forward_pipeline);
        pass.set_bind_group(0, &self.global_bind_group, &[]);
        for (entry, bind_group) in self.draws.iter().zip(object_binds) {
            pass.set_vertex_buffer(0, entry.buffers.vertex.slice(..));
            pass.set_index_buffer(entry.buffers.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_indexed(0..entry.buffers.index_count, 0, 0..1);
        }

        for bind_group in &marker_binds {
            pass.set_vertex_buffer(0, self.marker_mesh.vertex.slice(..));
            pass.set_index_buffer(self.marker_mesh.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_indexed(0..self.marker_mesh.index_count, 0, 0..1);
        }

        if debug.frustums && self.frustum_vertex_count > 0 {
            pass.set_pipeline(&self.line_pipeline);
            pass.set_bind_group(0, &self.line_bind_group, &[]);
            pass.set_vertex_buffer(0, self.frustum_vertices.slice(..));
            pass.draw(0..self.frustum_vertex_count, 0..1);
        }
    }
}

fn mesh_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: (3 * std::mem::size_of::<f32>()) as u64,
            shader_location: 1,
        },
    ];
    wgpu::VertexBufferLayout {
        array_stride: (6 * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

/// Line-list vertices for every light's shadow frustum wireframe.
fn frustum_line_vertices(lights: &[Light]) -> Vec<f32> {
    let mut vertices = Vec::new();
    for light in lights {
        let corners = shadow::frustum_corners(shadow::light_view_proj(light));
        for (a, b) in FRUSTUM_EDGES {
            for corner in [corners[a], corners[b]] {
                vertices.extend_from_slice(&[corner.x, corner.y, corner.z]);
            }
        }
    }
    vertices
}

fn object_constants(model: Mat4, material: &Material, unlit: bool) -> ObjectConstants {
    let normal = Mat3::from_mat4(model).inverse().transpose();
    ObjectConstants {
        model: model.to_cols_array_2d(),
        normal: mat3_to_3x4(normal),
        ambient: material.ambient.extend(1.0).into(),
        diffuse: material.diffuse.extend(1.0).into(),
        specular: material.specular.extend(material.shininess).into(),
        flags: [if unlit { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

fn filter_radius(filter: ShadowFilter) -> f32 {
    match filter {
        ShadowFilter::Hard => 0.0,
        ShadowFilter::Pcf => 1.0,
        ShadowFilter::PcfHigh => 2.0,
    }
}

fn light_uniform(
    light: &Light,
    resolution: u32,
    filter: ShadowFilter,
    shadows_supported: bool,
) -> LightUniform {
    let kind = match light.kind {
        crate::scene::LightKind::Directional => 0.0,
        crate::scene::LightKind::Spot { .. } => 1.0,
    };
    let (cutoff, concentration) = match light.kind {
        crate::scene::LightKind::Directional => (0.0, 0.0),
        crate::scene::LightKind::Spot {
            cone_deg,
            concentration,
        } => ((cone_deg.to_radians() / 2.0).cos(), concentration),
    };
    let direction = light.direction();
    let casts = light.should_render_shadow_depth_pass(shadows_supported);
    LightUniform {
        view_proj: shadow::light_view_proj(light).to_cols_array_2d(),
        position_kind: [light.position.x, light.position.y, light.position.z, kind],
        direction_cone: [direction.x, direction.y, direction.z, cutoff],
        diffuse: [light.diffuse.x, light.diffuse.y, light.diffuse.z, concentration],
        specular: light.specular.extend(1.0).into(),
        ambient: [
            light.ambient.x,
            light.ambient.y,
            light.ambient.z,
            if light.enabled { 1.0 } else { 0.0 },
        ],
        shadow_a: [
            light.shadow.bias,
            light.shadow.normal_bias,
            light.shadow.sample_radius,
            light.shadow.strength,
        ],
        shadow_b: [
            if casts { 1.0 } else { 0.0 },
            resolution as f32,
            filter_radius(filter),
            0.0,
        ],
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &crate::mesh::Mesh, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GlobalUniform {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    counts: [u32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LightUniform {
    view_proj: [[f32; 4]; 4],
    position_kind: [f32; 4],
    direction_cone: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    ambient: [f32; 4],
    shadow_a: [f32; 4],
    shadow_b: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ShadowPassUniform {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ObjectConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    flags: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LineUniform {
    view_proj: [[f32; 4]; 4],
    color: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use glam::Vec3;

    #[test]
    fn directional_uniform_has_kind_zero() {
        let light = Light::directional(Vec3::new(500.0, 500.0, 500.0), Vec3::ZERO);
        let uniform = light_uniform(&light, 1024, ShadowFilter::PcfHigh, true);
        assert_eq!(uniform.position_kind[3], 0.0);
        assert_eq!(uniform.shadow_b[0], 1.0);
        assert_eq!(uniform.shadow_b[1], 1024.0);
        assert_eq!(uniform.shadow_b[2], 2.0);
    }

    #[test]
    fn spot_uniform_encodes_the_cone_cutoff() {
        let light = Light::spot(Vec3::new(0.0, 100.0, 0.0), Vec3::ZERO, 60.0, 20.0);
        let uniform = light_uniform(&light, 512, ShadowFilter::Pcf, true);
        assert_eq!(uniform.position_kind[3], 1.0);
        assert!((uniform.direction_cone[3] - 30.0f32.to_radians().cos()).abs() < 1e-5);
        assert_eq!(uniform.diffuse[3], 20.0);
    }

    #[test]
    fn unsupported_shadows_clear_the_casts_flag() {
        let light = Light::directional(Vec3::ONE, Vec3::ZERO);
        let uniform = light_uniform(&light, 1024, ShadowFilter::Hard, false);
        assert_eq!(uniform.shadow_b[0], 0.0);
        assert_eq!(uniform.shadow_b[2], 0.0);
        // Strength is still carried for the shader even when unused.
        assert_eq!(uniform.shadow_a[3], 1.0);
    }

    #[test]
    fn frustum_lines_cover_all_lights() {
        let scene = Scene::spinning_cube();
        let vertices = frustum_line_vertices(&scene.lights);
        assert_eq!(vertices.len(), scene.lights.len() * 12 * 2 * 3);
    }

    #[test]
    fn unlit_marker_sets_the_flag() {
        let constants = object_constants(Mat4::IDENTITY, &Material::default(), true);
        assert_eq!(constants.flags[0], 1.0);
        let lit = object_constants(Mat4::IDENTITY, &Material::default(), false);
        assert_eq!(lit.flags[0], 0.0);
    }
}
