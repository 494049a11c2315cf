use anyhow::{Context, Result};
use tessel_gfx::device::{GraphicsDevice, ShaderStage, WgpuDevice};
use tessel_gfx::shader::{ShaderBlob, ShaderOptions};

const FULLSCREEN_WGSL: &str = include_str!("../shaders/fullscreen.wgsl");

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const TARGET_SIZE: u32 = 64;

/// Draws one fullscreen triangle into an offscreen texture using whatever
/// pixel shader and pixel-stage constant buffers are currently bound.
pub fn draw(gpu: &mut WgpuDevice, pixel_entry: &str) -> Result<()> {
    let vertex_blob = ShaderBlob::compile(
        "fullscreen.wgsl",
        FULLSCREEN_WGSL,
        &ShaderOptions::vertex(),
        gpu.shader_capabilities(),
    )
    .context("compiling fullscreen vertex shader")?;
    let vertex = gpu
        .create_shader(&vertex_blob)
        .context("creating fullscreen vertex shader")?;

    let result = match gpu.bind_shader(ShaderStage::Vertex, vertex) {
        Ok(()) => encode(gpu, vertex_blob.entry_point(), pixel_entry),
        Err(err) => Err(err.into()),
    };
    gpu.destroy_shader(vertex);
    result
}

fn encode(gpu: &WgpuDevice, vertex_entry: &str, pixel_entry: &str) -> Result<()> {
    let vs = gpu
        .bound_shader(ShaderStage::Vertex)
        .context("no vertex shader bound")?;
    let fs = gpu
        .bound_shader(ShaderStage::Pixel)
        .context("no pixel shader bound")?;

    let device = gpu.device();
    let bind_group_layout = gpu.constant_layout(ShaderStage::Pixel);
    let bind_group = gpu.create_bind_group(&bind_group_layout, ShaderStage::Pixel);

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("tessel offscreen pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("tessel offscreen pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: vs,
            entry_point: Some(vertex_entry),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: fs,
            entry_point: Some(pixel_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("tessel offscreen target"),
        size: wgpu::Extent3d {
            width: TARGET_SIZE,
            height: TARGET_SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("tessel offscreen encoder"),
    });
    {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessel offscreen pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(&pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }
    gpu.queue().submit(Some(encoder.finish()));

    log::info!("offscreen frame submitted ({TARGET_SIZE}x{TARGET_SIZE})");
    Ok(())
}
