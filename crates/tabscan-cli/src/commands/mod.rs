//! CLI command implementations.

pub mod batch;
pub mod config;
pub mod format;
pub mod process;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use tabscan_core::{CollectingDiagnostics, Detection, Diagnostics, EngineKind, TabscanConfig};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabscan")
        .join("config.json")
}

/// Load configuration from `--config`, the default file, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TabscanConfig> {
    if let Some(path) = config_path {
        return TabscanConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e));
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        return Ok(TabscanConfig::from_file(&default_path)?);
    }

    Ok(TabscanConfig::default())
}

/// Where detections come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineChoice {
    /// Serialized output of an external engine.
    Reader(EngineKind),
    /// Run the built-in ONNX engine on an image.
    #[cfg(feature = "onnx")]
    Onnx,
}

impl EngineChoice {
    /// Whether the input file is the image itself.
    pub fn reads_image(&self) -> bool {
        match self {
            EngineChoice::Reader(_) => false,
            #[cfg(feature = "onnx")]
            EngineChoice::Onnx => true,
        }
    }
}

impl FromStr for EngineChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("onnx") {
            #[cfg(feature = "onnx")]
            return Ok(EngineChoice::Onnx);
            #[cfg(not(feature = "onnx"))]
            return Err("the onnx engine requires building with --features onnx".to_string());
        }

        s.parse::<EngineKind>()
            .map(EngineChoice::Reader)
            .map_err(|_| format!("unknown engine '{}' (expected paddle, easyocr or tesseract)", s))
    }
}

/// Read and normalize detections from `input`.
#[cfg_attr(not(feature = "onnx"), allow(unused_variables))]
pub fn load_detections(
    engine: EngineChoice,
    input: &Path,
    model_dir: Option<&Path>,
    diagnostics: &dyn Diagnostics,
) -> anyhow::Result<Vec<Detection>> {
    match engine {
        EngineChoice::Reader(kind) => {
            let payload = fs::read_to_string(input)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", input.display(), e))?;
            Ok(kind.detections(&payload, diagnostics)?)
        }
        #[cfg(feature = "onnx")]
        EngineChoice::Onnx => {
            let Some(model_dir) = model_dir else {
                anyhow::bail!("--model-dir is required for the onnx engine");
            };
            let engine = tabscan_core::engines::OnnxEngine::from_dir(model_dir)?;
            let image = image::open(input)?;
            let raws = engine.detect(&image)?;
            Ok(tabscan_core::normalize_all(raws, diagnostics))
        }
    }
}

/// Forward collected warnings to the log.
pub fn log_warnings(source: &Path, diagnostics: &CollectingDiagnostics) {
    for warning in diagnostics.warnings() {
        warn!("{}: {}", source.display(), warning);
    }
}
