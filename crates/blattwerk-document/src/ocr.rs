// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in recognizer backed by the pure-Rust `ocrs` engine (models run with
// `rten`). Only compiled with the `ocr` feature.
//
// The engine needs `text-detection.rten` and `text-recognition.rten`, by
// default from `$XDG_CACHE_HOME/ocrs` (where `ocrs-cli` downloads them).

use std::path::{Path, PathBuf};

use blattwerk_bridge::{Recognition, RecognizedToken, Recognizer};
use blattwerk_core::error::{BlattwerkError, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for OcrModels {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrModels {
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn exist(&self) -> bool {
        self.detection.exists() && self.recognition.exists()
    }

    fn load(path: &Path) -> Result<Model> {
        if !path.exists() {
            return Err(BlattwerkError::EngineUnavailable(format!(
                "model not found at {}; run `ocrs-cli` once to download it",
                path.display()
            )));
        }
        Model::load_file(path).map_err(|err| {
            BlattwerkError::Recognition(format!("failed to load model {}: {}", path.display(), err))
        })
    }
}

/// [`Recognizer`] over a loaded `ocrs` engine. Load once, share across pages.
pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    #[instrument(skip_all, fields(detection = %models.detection.display()))]
    pub fn new(models: &OcrModels) -> Result<Self> {
        let detection_model = OcrModels::load(&models.detection)?;
        let recognition_model = OcrModels::load(&models.recognition)?;
        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| BlattwerkError::Recognition(format!("failed to initialise engine: {}", err)))?;
        info!("ocrs engine ready");
        Ok(Self { engine })
    }
}

impl Recognizer for OcrsRecognizer {
    fn name(&self) -> &str {
        "ocrs"
    }

    /// `ocrs` reports no confidences and ignores the language hint.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage, _lang_hint: &str) -> Result<Recognition> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            BlattwerkError::Recognition(format!("bad image source ({}x{}): {}", width, height, err))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| BlattwerkError::Recognition(format!("preprocessing failed: {}", err)))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| BlattwerkError::Recognition(format!("recognition failed: {}", err)))?;

        let tokens = text
            .split_whitespace()
            .map(|word| RecognizedToken {
                text: word.to_string(),
                confidence: None,
            })
            .collect::<Vec<_>>();
        debug!(lines = text.lines().count(), tokens = tokens.len(), "ocrs recognition done");
        Ok(Recognition { text, tokens })
    }
}
