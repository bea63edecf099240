use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::encode::PixelAttributes;
use crate::types::{AdapterProfile, RendererConfig};

use super::context::GpuContext;
use super::pipeline::PointPipeline;
use super::uniforms::SortUniforms;

/// GPU resources for one armed image: immutable attribute buffers plus the
/// phase uniform that changes every frame.
pub(crate) struct GpuState {
    context: GpuContext,
    pipeline: PointPipeline,
    position_buffer: wgpu::Buffer,
    color_index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: SortUniforms,
    vertex_count: u32,
    background: wgpu::Color,
    multisample_target: Option<MultisampleTarget>,
    frames_rendered: u64,
}

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
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

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        attributes: &PixelAttributes,
        config: &RendererConfig,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(
            target,
            initial_size,
            config.antialiasing,
            config.color_space,
            config.gpu_power,
        )?;

        let vertex_count = attributes.vertex_count();
        let position_bytes: &[u8] = bytemuck::cast_slice(&attributes.positions);
        let color_index_bytes: &[u8] = bytemuck::cast_slice(&attributes.color_indices);
        let largest = position_bytes.len().max(color_index_bytes.len()) as u64;
        if largest > context.adapter_profile.max_buffer_size {
            anyhow::bail!(
                "image needs a {largest}-byte vertex buffer but the adapter allows at most {}",
                context.adapter_profile.max_buffer_size
            );
        }

        let position_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("position buffer"),
                contents: position_bytes,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let color_index_buffer =
            context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("color index buffer"),
                    contents: color_index_bytes,
                    usage: wgpu::BufferUsages::VERTEX,
                });

        let pipeline =
            PointPipeline::new(&context.device, context.surface_format, context.sample_count);

        let uniforms = SortUniforms::new(attributes.width, attributes.height);
        let uniform_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("sort uniform buffer"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("sort uniform bind group"),
                layout: &pipeline.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        let [r, g, b, a] = config.background;
        debug!(
            width = attributes.width,
            height = attributes.height,
            vertex_count,
            sample_count = context.sample_count,
            "uploaded pixel attribute buffers"
        );

        Ok(Self {
            context,
            pipeline,
            position_buffer,
            color_index_buffer,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            vertex_count,
            background: wgpu::Color { r, g, b, a },
            multisample_target,
            frames_rendered: 0,
        })
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn phase(&self) -> f32 {
        self.uniforms.phase
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        if self.context.sample_count > 1 {
            self.multisample_target = Some(MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            ));
        }
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    pub(crate) fn set_phase(&mut self, phase: f32) {
        if self.uniforms.set_phase(phase) {
            self.context.queue.write_buffer(
                &self.uniform_buffer,
                0,
                bytemuck::bytes_of(&self.uniforms),
            );
        }
    }

    pub(crate) fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });

        {
            let (attachment_view, resolve_target) =
                if let Some(msaa) = self.multisample_target.as_ref() {
                    (&msaa.view, Some(&view))
                } else {
                    (&view, None)
                };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("point pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            // Empty buffers cannot be sliced; an empty payload still clears the surface.
            if self.vertex_count > 0 {
                render_pass.set_pipeline(&self.pipeline.pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.position_buffer.slice(..));
                render_pass.set_vertex_buffer(1, self.color_index_buffer.slice(..));
                render_pass.draw(0..self.vertex_count, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        self.frames_rendered += 1;
        tracing::trace!(
            frame = self.frames_rendered,
            phase = self.uniforms.phase,
            "presented frame"
        );
        Ok(())
    }
}
