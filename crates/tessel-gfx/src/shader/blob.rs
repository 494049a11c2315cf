use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::device::{GfxError, ShaderStage};

/// Entry point + stage a shader is compiled for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderOptions {
    pub entry_point: String,
    pub stage: ShaderStage,
}

impl ShaderOptions {
    /// `fs_main` on the pixel stage.
    pub fn pixel() -> Self {
        Self {
            entry_point: "fs_main".into(),
            stage: ShaderStage::Pixel,
        }
    }

    pub fn vertex() -> Self {
        Self {
            entry_point: "vs_main".into(),
            stage: ShaderStage::Vertex,
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }
}

impl Default for ShaderOptions {
    fn default() -> Self {
        Self::pixel()
    }
}

/// Validated shader bytecode, ready for device object creation.
///
/// Cloning is cheap; the source text is shared.
#[derive(Debug, Clone)]
pub struct ShaderBlob {
    label: String,
    source: Arc<str>,
    entry_point: String,
    stage: ShaderStage,
    capabilities: naga::valid::Capabilities,
    source_hash: u64,
}

impl ShaderBlob {
    /// Parses and validates `source` against `capabilities`, then checks that
    /// the requested entry point exists for the requested stage.
    ///
    /// Pass [`GraphicsDevice::shader_capabilities`] of the target device so
    /// that device-side creation cannot reject the blob.
    ///
    /// [`GraphicsDevice::shader_capabilities`]: crate::device::GraphicsDevice::shader_capabilities
    pub fn compile(
        label: &str,
        source: &str,
        options: &ShaderOptions,
        capabilities: naga::valid::Capabilities,
    ) -> Result<Self, GfxError> {
        let compile_error = |message: String| GfxError::ShaderCompile {
            label: label.to_string(),
            message,
        };

        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| compile_error(e.emit_to_string(source)))?;

        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), capabilities)
            .validate(&module)
            .map_err(|e| compile_error(e.into_inner().to_string()))?;

        let stage = options.stage.naga();
        if !module
            .entry_points
            .iter()
            .any(|ep| ep.name == options.entry_point && ep.stage == stage)
        {
            return Err(compile_error(format!(
                "no {} entry point named `{}`",
                options.stage, options.entry_point
            )));
        }

        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);

        log::debug!("compiled {} shader `{label}`", options.stage);
        Ok(Self {
            label: label.to_string(),
            source: Arc::from(source),
            entry_point: options.entry_point.clone(),
            stage: options.stage,
            capabilities,
            source_hash: hasher.finish(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Capabilities the blob was validated against.
    pub fn capabilities(&self) -> naga::valid::Capabilities {
        self.capabilities
    }

    pub fn source_hash(&self) -> u64 {
        self.source_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use naga::valid::Capabilities;

    fn compile(
        label: &str,
        source: &str,
        options: &ShaderOptions,
    ) -> Result<ShaderBlob, GfxError> {
        ShaderBlob::compile(label, source, options, Capabilities::empty())
    }

    const F64_PIXEL: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            let x: f64 = 1.0lf;
            return vec4<f32>(f32(x), 0.0, 0.0, 1.0);
        }
    "#;

    const SOLID: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.0, 0.0, 1.0);
        }
    "#;

    #[test]
    fn compiles_fragment_entry_point() {
        let blob = compile("solid", SOLID, &ShaderOptions::pixel()).unwrap();
        assert_eq!(blob.stage(), ShaderStage::Pixel);
        assert_eq!(blob.entry_point(), "fs_main");
        assert_eq!(blob.label(), "solid");
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = compile("broken", "fn fs_main( {", &ShaderOptions::pixel())
            .unwrap_err();
        assert!(matches!(err, GfxError::ShaderCompile { ref label, .. } if label == "broken"));
    }

    #[test]
    fn type_error_fails_validation() {
        let src = r#"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return 1.0;
            }
        "#;
        assert!(compile("bad", src, &ShaderOptions::pixel()).is_err());
    }

    #[test]
    fn missing_entry_point_is_reported() {
        let opts = ShaderOptions::pixel().with_entry_point("pixelShaderMain");
        let err = compile("solid", SOLID, &opts).unwrap_err();
        assert!(err.to_string().contains("pixelShaderMain"));
    }

    #[test]
    fn wrong_stage_is_reported() {
        let opts = ShaderOptions::vertex().with_entry_point("fs_main");
        assert!(compile("solid", SOLID, &opts).is_err());
    }

    #[test]
    fn hash_tracks_source() {
        let a = compile("a", SOLID, &ShaderOptions::pixel()).unwrap();
        let b = compile("b", SOLID, &ShaderOptions::pixel()).unwrap();
        let other = SOLID.replace("1.0, 0.0", "0.0, 1.0");
        let c = compile("c", &other, &ShaderOptions::pixel()).unwrap();
        assert_eq!(a.source_hash(), b.source_hash());
        assert_ne!(a.source_hash(), c.source_hash());
    }

    #[test]
    fn f64_needs_the_float64_capability() {
        let err = compile("f64", F64_PIXEL, &ShaderOptions::pixel()).unwrap_err();
        assert!(matches!(err, GfxError::ShaderCompile { ref label, .. } if label == "f64"));

        let blob =
            ShaderBlob::compile("f64", F64_PIXEL, &ShaderOptions::pixel(), Capabilities::FLOAT64)
                .unwrap();
        assert_eq!(blob.capabilities(), Capabilities::FLOAT64);
    }

    #[test]
    fn capabilities_follow_device_features() {
        use crate::device::capabilities_for;

        assert_eq!(capabilities_for(wgpu::Features::empty()), Capabilities::empty());
        assert_eq!(
            capabilities_for(wgpu::Features::SHADER_F64),
            Capabilities::FLOAT64
        );
    }
}
