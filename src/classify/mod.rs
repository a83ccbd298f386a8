//! Inference adapter: preprocess an upload, score it, threshold the score.
//!
//! The model itself is opaque: a scoring function reached through
//! [`Scorer`]. The portal only fixes the input contract (RGB tensor at a
//! configured shape, values scaled into [0,1]) and the decision rule
//! (score below the threshold is Defective, at or above is Healthy).

use crate::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub mod remote;

pub use remote::RemoteScorer;

pub const DEFAULT_INPUT_WIDTH: u32 = 256;
pub const DEFAULT_INPUT_HEIGHT: u32 = 256;
pub const DEFAULT_THRESHOLD: f32 = 0.5;

const CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Defective,
    Healthy,
}

impl Label {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Defective => "Defective",
            Self::Healthy => "Healthy",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model input shape; channels are fixed at RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub width: u32,
    pub height: u32,
}

impl InputShape {
    #[must_use]
    pub const fn len(self) -> usize {
        self.width as usize * self.height as usize * CHANNELS
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl Default for InputShape {
    fn default() -> Self {
        Self {
            width: DEFAULT_INPUT_WIDTH,
            height: DEFAULT_INPUT_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyStatus {
    /// Scoring endpoint is reachable.
    Ok,
    /// Scoring endpoint is unreachable or refusing requests.
    Error,
    /// Static scorer means no external dependency.
    Static,
}

impl DependencyStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Static => "static",
        }
    }

    #[must_use]
    pub const fn is_healthy(self) -> bool {
        !matches!(self, Self::Error)
    }
}

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score a preprocessed input tensor; higher means healthier.
    async fn score(&self, inputs: &[f32]) -> Result<f32, AppError>;

    /// Probe the backing dependency for `/health`. Scorers without an
    /// external dependency report [`DependencyStatus::Static`].
    async fn dependency_status(&self) -> DependencyStatus {
        DependencyStatus::Static
    }
}

#[derive(Clone)]
pub struct Classifier {
    scorer: Arc<dyn Scorer>,
    shape: InputShape,
    threshold: f32,
}

impl Classifier {
    #[must_use]
    pub fn new(scorer: Arc<dyn Scorer>, shape: InputShape, threshold: f32) -> Self {
        Self {
            scorer,
            shape,
            threshold,
        }
    }

    /// Decode and classify an uploaded image.
    ///
    /// # Errors
    /// [`AppError::InvalidImage`] when the bytes do not decode;
    /// [`AppError::ModelUnavailable`] when the scorer cannot be reached.
    pub async fn classify(&self, image_bytes: &[u8]) -> Result<Label, AppError> {
        let inputs = preprocess(image_bytes, self.shape)?;
        let score = self.scorer.score(&inputs).await?;
        debug!(score, threshold = self.threshold, "image scored");

        if score < self.threshold {
            Ok(Label::Defective)
        } else {
            Ok(Label::Healthy)
        }
    }

    pub async fn dependency_status(&self) -> DependencyStatus {
        self.scorer.dependency_status().await
    }
}

/// Decode, resize to the model input shape and scale into [0,1].
/// Output is row-major RGB, matching the shape the model was trained on.
fn preprocess(image_bytes: &[u8], shape: InputShape) -> Result<Vec<f32>, AppError> {
    let decoded = image::load_from_memory(image_bytes).map_err(|err| {
        debug!(error = %err, "upload failed to decode");
        AppError::InvalidImage
    })?;

    let resized = decoded.resize_exact(
        shape.width,
        shape.height,
        image::imageops::FilterType::Triangle,
    );

    Ok(resized
        .to_rgb8()
        .into_raw()
        .into_iter()
        .map(|value| f32::from(value) / 255.0)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScorer(f32);

    #[async_trait]
    impl Scorer for FixedScorer {
        async fn score(&self, _inputs: &[f32]) -> Result<f32, AppError> {
            Ok(self.0)
        }
    }

    fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png)
            .expect("png encode");
        buf.into_inner()
    }

    fn classifier(score: f32) -> Classifier {
        Classifier::new(
            Arc::new(FixedScorer(score)),
            InputShape {
                width: 8,
                height: 8,
            },
            DEFAULT_THRESHOLD,
        )
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let shape = InputShape {
            width: 8,
            height: 8,
        };
        let inputs = preprocess(&png_bytes(32, 16, [10, 200, 30]), shape).expect("preprocess");
        assert_eq!(inputs.len(), shape.len());
        assert!(inputs.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_preprocess_scales_solid_red_to_unit_channel() {
        let shape = InputShape {
            width: 4,
            height: 4,
        };
        let inputs = preprocess(&png_bytes(4, 4, [255, 0, 0]), shape).expect("preprocess");
        for pixel in inputs.chunks(3) {
            assert_eq!(pixel, [1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_preprocess_rejects_garbage_bytes() {
        let shape = InputShape::default();
        let result = preprocess(b"definitely not an image", shape);
        assert!(matches!(result, Err(AppError::InvalidImage)));
    }

    #[tokio::test]
    async fn test_score_below_threshold_is_defective() {
        let label = classifier(0.49)
            .classify(&png_bytes(8, 8, [0, 128, 0]))
            .await
            .expect("classify");
        assert_eq!(label, Label::Defective);
    }

    #[tokio::test]
    async fn test_score_at_threshold_is_healthy() {
        let label = classifier(0.5)
            .classify(&png_bytes(8, 8, [0, 128, 0]))
            .await
            .expect("classify");
        assert_eq!(label, Label::Healthy);
    }

    #[tokio::test]
    async fn test_classification_is_deterministic_for_same_bytes() {
        let classifier = classifier(0.83);
        let bytes = png_bytes(16, 16, [12, 180, 40]);

        let first = classifier.classify(&bytes).await.expect("first call");
        let second = classifier.classify(&bytes).await.expect("second call");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_upload_never_reaches_the_scorer() {
        struct PanicScorer;

        #[async_trait]
        impl Scorer for PanicScorer {
            async fn score(&self, _inputs: &[f32]) -> Result<f32, AppError> {
                panic!("scorer must not run for undecodable uploads");
            }
        }

        let classifier = Classifier::new(
            Arc::new(PanicScorer),
            InputShape::default(),
            DEFAULT_THRESHOLD,
        );
        let result = classifier.classify(b"not an image").await;
        assert!(matches!(result, Err(AppError::InvalidImage)));
    }

    #[test]
    fn test_label_wording() {
        assert_eq!(Label::Defective.as_str(), "Defective");
        assert_eq!(Label::Healthy.to_string(), "Healthy");
    }

    #[test]
    fn test_default_shape_matches_model_contract() {
        let shape = InputShape::default();
        assert_eq!((shape.width, shape.height), (256, 256));
        assert_eq!(shape.len(), 256 * 256 * 3);
        assert!(!shape.is_empty());
    }

    #[tokio::test]
    async fn test_fixed_scorer_reports_static_dependency() {
        let status = classifier(0.9).dependency_status().await;
        assert_eq!(status, DependencyStatus::Static);
        assert!(status.is_healthy());
    }
}
