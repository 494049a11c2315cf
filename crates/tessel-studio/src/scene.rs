use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use tessel_gfx::asset::{AssetRegistry, GraphicsAsset};
use tessel_gfx::buffer::ConstantBuffer;
use tessel_gfx::canvas::{Canvas2D, CanvasElement};
use tessel_gfx::device::{GfxError, GraphicsDevice};
use tessel_gfx::shader::PixelShader;

pub const SWATCH_WGSL: &str = include_str!("../shaders/swatch.wgsl");

/// Colors the swatch cycles through, one per rendered frame.
const PALETTE: [[f32; 4]; 3] = [
    [0.90, 0.30, 0.20, 1.0],
    [0.20, 0.70, 0.35, 1.0],
    [0.15, 0.40, 0.85, 1.0],
];

/// Payload of the swatch constant buffer (`Swatch` in `swatch.wgsl`).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SwatchUniform {
    pub color: [f32; 4],
}

/// Canvas element that fills the target with a flat color.
///
/// Shares the scene's constant buffer and pixel shader; each render uploads
/// the next palette color and binds both for the following draw.
struct Swatch {
    tint: Rc<RefCell<ConstantBuffer<SwatchUniform>>>,
    shader: Rc<RefCell<PixelShader>>,
    frame: usize,
}

impl CanvasElement for Swatch {
    fn resize(&mut self, _device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        self.frame = 0;
        Ok(())
    }

    fn render(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        let color = PALETTE[self.frame % PALETTE.len()];
        self.frame += 1;

        let mut tint = self.tint.borrow_mut();
        tint.update(device, &SwatchUniform { color })?;
        tint.bind_pixel_shader(device, 0)?;
        self.shader.borrow_mut().bind(device)
    }
}

/// Everything the studio draws, plus the registry that owns its lifecycle.
pub struct Scene {
    registry: AssetRegistry,
    canvas: Rc<RefCell<Canvas2D>>,
    shader: Rc<RefCell<PixelShader>>,
    // Held so the canvas' weak reference stays alive.
    _swatch: Rc<RefCell<Swatch>>,
}

impl Scene {
    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self, GfxError> {
        let tint = Rc::new(RefCell::new(ConstantBuffer::<SwatchUniform>::with_label(
            "swatch tint",
        )));
        tint.borrow_mut().init(device)?;

        let shader = Rc::new(RefCell::new(PixelShader::new()));
        shader
            .borrow_mut()
            .load_source(device, "swatch.wgsl", SWATCH_WGSL)?;

        let canvas = Rc::new(RefCell::new(Canvas2D::new()));
        canvas.borrow_mut().init(device)?;

        let swatch = Rc::new(RefCell::new(Swatch {
            tint: Rc::clone(&tint),
            shader: Rc::clone(&shader),
            frame: 0,
        }));
        canvas.borrow_mut().add_element(&swatch);

        let mut registry = AssetRegistry::new();
        registry.register(&tint);
        registry.register(&shader);
        registry.register(&canvas);

        log::info!("scene ready: {} assets registered", registry.len());

        Ok(Self {
            registry,
            canvas,
            shader,
            _swatch: swatch,
        })
    }

    pub fn render(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        self.canvas.borrow_mut().render(device)
    }

    pub fn resize(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        self.registry.resize_all(device)
    }

    /// Recreates every device object after the device was lost.
    pub fn recover(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        log::warn!("device lost, recreating {} assets", self.registry.len());
        self.registry.reset_all(device)
    }

    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        self.registry.release_all(device);
    }

    /// Fragment entry point of the loaded pixel shader.
    pub fn pixel_entry_point(&self) -> Option<String> {
        self.shader
            .borrow()
            .blob()
            .map(|blob| blob.entry_point().to_owned())
    }
}
