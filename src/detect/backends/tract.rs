#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{HandObservation, Handedness, Point, LANDMARK_COUNT};
use crate::frame::Frame;

/// Side length of the square model input.
pub const MODEL_INPUT_SIZE: u32 = 224;

/// Tract-based hand landmark backend.
///
/// Expects a single-hand landmark model with an NHWC `[1, 224, 224, 3]` float
/// input in 0..1 and three outputs: 21 (x, y, z) landmarks in input pixels, a
/// hand presence score and a right-handedness score. The whole frame is resized
/// to the model input, so one hand filling a good part of the view works best.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    min_confidence: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = MODEL_INPUT_SIZE as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, size, size, 3)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            min_confidence: 0.7,
        })
    }

    /// Override the default minimum detection confidence.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let image = RgbImage::from_raw(frame.width, frame.height, frame.as_rgb().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", frame.width, frame.height))?;
        let resized = image::imageops::resize(
            &image,
            MODEL_INPUT_SIZE,
            MODEL_INPUT_SIZE,
            FilterType::Triangle,
        );

        let size = MODEL_INPUT_SIZE as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn scalar_output(outputs: &TVec<TValue>, index: usize, what: &str) -> Result<f32> {
        let output = outputs
            .get(index)
            .ok_or_else(|| anyhow!("model produced no {} output", what))?;
        let view = output
            .to_array_view::<f32>()
            .with_context(|| format!("{} output tensor was not f32", what))?;
        view.iter()
            .next()
            .copied()
            .ok_or_else(|| anyhow!("{} output was empty", what))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    /// Run one inference on a blank input so a broken model fails at startup.
    fn warm_up(&mut self) -> Result<()> {
        let size = MODEL_INPUT_SIZE as usize;
        let input = Tensor::zero::<f32>(&[1, size, size, 3]).context("allocate warm-up input")?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX warm-up inference failed")?;
        if outputs.len() < 3 {
            return Err(anyhow!(
                "hand landmark model must have 3 outputs, found {}",
                outputs.len()
            ));
        }
        Ok(())
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;

        let presence = Self::scalar_output(&outputs, 1, "presence")?;
        if !presence.is_finite() || presence < self.min_confidence {
            return Ok(Vec::new());
        }
        let right_score = Self::scalar_output(&outputs, 2, "handedness")?;
        let handedness = if right_score >= 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        };

        let coords = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no landmark output"))?
            .to_array_view::<f32>()
            .context("landmark output tensor was not f32")?;
        let coords: Vec<f32> = coords.iter().copied().collect();
        if coords.len() < LANDMARK_COUNT as usize * 3 {
            return Err(anyhow!(
                "expected {} landmark values, received {}",
                LANDMARK_COUNT as usize * 3,
                coords.len()
            ));
        }

        let sx = frame.width as f64 / MODEL_INPUT_SIZE as f64;
        let sy = frame.height as f64 / MODEL_INPUT_SIZE as f64;
        let mut hand = HandObservation::new(handedness, presence);
        for (id, xyz) in coords.chunks_exact(3).take(LANDMARK_COUNT as usize).enumerate() {
            hand.insert(id as u8, Point::new(xyz[0] as f64 * sx, xyz[1] as f64 * sy));
        }
        Ok(vec![hand])
    }
}
