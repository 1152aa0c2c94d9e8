//! Conversion orchestrator.
//!
//! `Start -> Normalized -> Classified -> Binarized -> {ExternalAttempt | Skip}
//! -> Rendered -> Done`. A failed external attempt falls through to the
//! configured in-process renderer; every path ends in a [`ConversionResult`].

use crate::binarizer::BinaryBitmap;
use crate::classifier::{self, Classification};
use crate::error::ConvertError;
use crate::image_processor::{self, Geometry};
use crate::renderer::{Artifact, Renderer};
use crate::svg_generator::VectorDocument;
use crate::tracer::{self, ExternalTracer};
use crate::ConversionOptions;
use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const HIGH_QUALITY_MESSAGE: &str = "Success (High Quality)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Normalized,
    Classified,
    Binarized,
    ExternalAttempt,
    Skip,
    Rendered,
    Done,
}

/// Binarized image together with the geometry needed to place it.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub bitmap: BinaryBitmap,
    pub geometry: Geometry,
    pub classification: Classification,
}

/// A successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    /// Human-readable status line.
    pub message: String,
    /// Renderer that produced the output.
    pub renderer: &'static str,
    /// True when the external tracer was wanted but could not be used.
    pub degraded: bool,
    /// Why the external tracer was not used, if it wasn't.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub width: u32,
    pub height: u32,
    pub classification: Classification,
    pub foreground_pixels: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_count: Option<usize>,
    pub stages: Vec<Stage>,
    #[serde(skip)]
    pub document: Option<VectorDocument>,
    #[serde(skip)]
    pub markup: String,
}

pub type ConversionResult = Result<Conversion, ConvertError>;

/// Normalize, classify and binarize an image.
pub fn normalize_and_classify(image: &DynamicImage, options: &ConversionOptions) -> Result<Prepared, ConvertError> {
    options.validate()?;
    let normalized = image_processor::normalize(image, options)?;
    let (bitmap, classification) = classifier::classify(&normalized.image, options);
    debug!(
        width = bitmap.width,
        height = bitmap.height,
        foreground = bitmap.foreground_count(),
        ?classification,
        "binarized"
    );
    Ok(Prepared {
        bitmap,
        geometry: normalized.geometry,
        classification,
    })
}

/// Converts images with a fixed set of options and an optional external tracer.
///
/// The tracer is resolved by the caller (see [`Converter::detect`]) rather than
/// looked up during conversion, so a converter can be shared between threads
/// and tests can inject a fake tool.
#[derive(Debug, Clone)]
pub struct Converter {
    options: ConversionOptions,
    tracer: Option<ExternalTracer>,
}

impl Converter {
    /// A converter that only uses the in-process renderers.
    pub fn new(options: ConversionOptions) -> Self {
        Self { options, tracer: None }
    }

    pub fn with_tracer(mut self, tracer: Option<ExternalTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Probe `extra` candidates, then the built-in list, for a working tracer.
    ///
    /// Nothing is probed when the options disable the external tool.
    pub fn detect(options: ConversionOptions, extra: &[PathBuf]) -> Self {
        let tracer = if options.allow_external {
            let candidates = extra
                .iter()
                .cloned()
                .chain(tracer::CANDIDATES.iter().map(PathBuf::from));
            ExternalTracer::discover(candidates)
        } else {
            None
        };
        Self { options, tracer }
    }

    pub fn tracer(&self) -> Option<&ExternalTracer> {
        self.tracer.as_ref()
    }

    pub fn convert(&self, image: &DynamicImage) -> ConversionResult {
        let started = Instant::now();
        let mut stages = vec![Stage::Start];

        let prepared = normalize_and_classify(image, &self.options)?;
        stages.extend([Stage::Normalized, Stage::Classified, Stage::Binarized]);

        let (degraded, fallback_reason) = match (&self.tracer, self.options.allow_external) {
            (Some(tracer), true) => {
                stages.push(Stage::ExternalAttempt);
                let tracer = tracer.clone().with_smoothing(self.options.smooth_curves);
                match Renderer::External(tracer).render(&prepared.bitmap, &prepared.geometry) {
                    Ok(artifact) => {
                        stages.push(Stage::Done);
                        info!(elapsed_ms = started.elapsed().as_millis() as u64, "traced with external tool");
                        return Ok(self.finish(&prepared, artifact, "external", HIGH_QUALITY_MESSAGE.to_string(), false, None, stages));
                    }
                    Err(e) if e.is_recoverable() => {
                        warn!(error = %e, "external tracer failed, falling back");
                        (true, Some(e.to_string()))
                    }
                    Err(e) => return Err(e),
                }
            }
            (None, true) => {
                stages.push(Stage::Skip);
                warn!("external tracer unavailable, falling back");
                (true, Some(ConvertError::ToolUnavailable.to_string()))
            }
            (_, false) => {
                stages.push(Stage::Skip);
                (false, Some("external tracer disabled".to_string()))
            }
        };

        let renderer = Renderer::from(self.options.method);
        let artifact = renderer.render(&prepared.bitmap, &prepared.geometry)?;
        stages.extend([Stage::Rendered, Stage::Done]);

        let message = if degraded {
            format!("Success (fallback: {} renderer, reduced quality)", renderer.name())
        } else {
            format!("Success ({} renderer)", renderer.name())
        };
        info!(
            renderer = renderer.name(),
            degraded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rendered"
        );
        Ok(self.finish(&prepared, artifact, renderer.name(), message, degraded, fallback_reason, stages))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        prepared: &Prepared,
        artifact: Artifact,
        renderer: &'static str,
        message: String,
        degraded: bool,
        fallback_reason: Option<String>,
        stages: Vec<Stage>,
    ) -> Conversion {
        let (width, height) = prepared.geometry.output_size();
        let markup = artifact.to_svg_string();
        let document = match artifact {
            Artifact::Document(doc) => Some(doc),
            Artifact::Markup(_) => None,
        };
        Conversion {
            message,
            renderer,
            degraded,
            fallback_reason,
            width,
            height,
            classification: prepared.classification,
            foreground_pixels: prepared.bitmap.foreground_count(),
            shape_count: document.as_ref().map(|d| d.shapes.len()),
            stages,
            document,
            markup,
        }
    }

    pub fn convert_bytes(&self, bytes: &[u8]) -> ConversionResult {
        self.convert(&image_processor::decode(bytes)?)
    }

    /// Decode `input`, convert it and write the SVG to `output`.
    pub fn convert_file(&self, input: &Path, output: &Path) -> ConversionResult {
        let image = image_processor::load_image(input)?;
        let conversion = self.convert(&image)?;
        match &conversion.document {
            Some(doc) => doc.save(output)?,
            None => std::fs::write(output, &conversion.markup)?,
        }
        Ok(conversion)
    }
}
