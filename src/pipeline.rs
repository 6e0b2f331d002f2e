//! Ordered frame stages built from a [`PipelineConfig`].

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::imaging::{
    Augmenter, BilinearResizer, ImageAugmenter, ImageCodec, ImageDecoder, ImageResizer, ImageSize,
};
use crate::record::Record;
use crate::transforms::{augment_with, decode_images_with, resize_images_with, AugmentOptions};
use crate::tree::KeypathMatch;
use crate::utils::error::Result;

type BoxedDecoder = Box<dyn ImageDecoder + Send + Sync>;
type BoxedResizer = Box<dyn ImageResizer + Send + Sync>;
type BoxedAugmenter = Box<dyn ImageAugmenter + Send + Sync>;

/// Decode, resize and augment stages applied in that order.
///
/// Each stage is optional. [`FramePipeline::apply`] never mutates its input;
/// every stage returns a fresh record that shares untouched terminals with
/// the one before it.
pub struct FramePipeline {
    decode: Option<KeypathMatch>,
    resize: Option<(KeypathMatch, ImageSize)>,
    augment: Option<(KeypathMatch, AugmentOptions)>,
    decoder: BoxedDecoder,
    resizer: BoxedResizer,
    augmenter: BoxedAugmenter,
}

impl FramePipeline {
    /// Build the enabled stages with the default collaborators.
    ///
    /// Augmentation options are validated here, so a bad configuration
    /// fails before any record is processed.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        if config.is_empty() {
            warn!("pipeline configuration enables no stage; records pass through unchanged");
        }

        let augment = match &config.augment {
            Some(stage) => Some((stage.matcher(), stage.augment_options()?)),
            None => None,
        };
        let pipeline = Self {
            decode: config.decode.as_ref().map(|stage| stage.matcher()),
            resize: config.resize.as_ref().map(|stage| (stage.matcher(), stage.size)),
            augment,
            decoder: Box::new(ImageCodec::new()),
            resizer: Box::new(BilinearResizer::new()),
            augmenter: Box::new(Augmenter::new()),
        };

        info!("Frame pipeline: {}", pipeline.describe());
        Ok(pipeline)
    }

    pub fn with_decoder(mut self, decoder: impl ImageDecoder + Send + Sync + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn with_resizer(mut self, resizer: impl ImageResizer + Send + Sync + 'static) -> Self {
        self.resizer = Box::new(resizer);
        self
    }

    pub fn with_augmenter(mut self, augmenter: impl ImageAugmenter + Send + Sync + 'static) -> Self {
        self.augmenter = Box::new(augmenter);
        self
    }

    /// Run every enabled stage on `record`
    pub fn apply(&self, record: &Record) -> Result<Record> {
        let mut current = record.clone();

        if let Some(matcher) = &self.decode {
            current = decode_images_with(&current, matcher.clone(), self.decoder.as_ref())?;
            debug!("decode stage done");
        }
        if let Some((matcher, size)) = &self.resize {
            current = resize_images_with(&current, matcher.clone(), *size, self.resizer.as_ref())?;
            debug!("resize stage done");
        }
        if let Some((matcher, options)) = &self.augment {
            current = augment_with(&current, matcher, options, self.augmenter.as_ref())?;
            debug!("augment stage done");
        }

        Ok(current)
    }

    /// Names of the enabled stages, in execution order
    pub fn stages(&self) -> Vec<&'static str> {
        let mut stages = Vec::new();
        if self.decode.is_some() {
            stages.push("decode");
        }
        if self.resize.is_some() {
            stages.push("resize");
        }
        if self.augment.is_some() {
            stages.push("augment");
        }
        stages
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(matcher) = &self.decode {
            parts.push(format!("decode{:?}", matcher.patterns()));
        }
        if let Some((matcher, size)) = &self.resize {
            parts.push(format!(
                "resize{:?} to {}x{}",
                matcher.patterns(),
                size.height,
                size.width
            ));
        }
        if let Some((matcher, options)) = &self.augment {
            parts.push(format!(
                "augment{:?} ({} ops, traj_identical={})",
                matcher.patterns(),
                options.config.augment_order.len(),
                options.traj_identical
            ));
        }
        if parts.is_empty() {
            "no stages".to_string()
        } else {
            parts.join(" -> ")
        }
    }
}

impl fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePipeline")
            .field("stages", &self.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

    use super::*;
    use crate::config::{AugmentStageConfig, DecodeConfig, ResizeConfig};
    use crate::imaging::{AugmentConfig, AugmentSeed};
    use crate::record::{DType, Leaf, Tensor, TRAJ_INDEX_KEY};
    use crate::utils::error::FrameError;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128u8]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn trajectory_frame(traj_index: i64) -> Record {
        let bytes: Arc<[u8]> = png(24, 16).into();
        Record::new().with(TRAJ_INDEX_KEY, traj_index).with(
            "observation",
            Record::new()
                .with("image_0", Leaf::Bytes(bytes.clone()))
                .with("image_1", Leaf::Bytes(bytes))
                .with("state", Tensor::new(vec![3], vec![0.0f32, 1.0, 2.0]).unwrap()),
        )
    }

    #[test]
    fn test_standard_pipeline() {
        let pipeline = FramePipeline::from_config(&PipelineConfig::standard()).unwrap();
        assert_eq!(pipeline.stages(), vec!["decode", "resize", "augment"]);

        let input = trajectory_frame(3);
        let out = pipeline.apply(&input).unwrap();

        let image_0 = out.leaf_at("observation/image_0").unwrap();
        assert_eq!(image_0.dtype(), DType::Float32);
        assert_eq!(image_0.shape(), &[128, 128, 3]);
        assert_eq!(image_0, out.leaf_at("observation/image_1").unwrap());
        assert!(out
            .leaf_at("observation/state")
            .unwrap()
            .is_same(input.leaf_at("observation/state").unwrap()));
        assert_eq!(input, trajectory_frame(3));
    }

    #[test]
    fn test_same_trajectory_same_output() {
        let pipeline = FramePipeline::from_config(&PipelineConfig::standard()).unwrap();
        let a = pipeline.apply(&trajectory_frame(11)).unwrap();
        let b = pipeline.apply(&trajectory_frame(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_disabled_stages_are_skipped() {
        let config = PipelineConfig {
            decode: Some(DecodeConfig::default()),
            ..PipelineConfig::default()
        };
        let pipeline = FramePipeline::from_config(&config).unwrap();
        let out = pipeline.apply(&trajectory_frame(0)).unwrap();
        assert_eq!(out.leaf_at("observation/image_0").unwrap().dtype(), DType::Uint8);
        assert_eq!(out.leaf_at("observation/image_0").unwrap().shape(), &[16, 24, 3]);
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = FramePipeline::from_config(&PipelineConfig::default()).unwrap();
        assert!(pipeline.stages().is_empty());
        let input = trajectory_frame(1);
        assert_eq!(pipeline.apply(&input).unwrap(), input);
    }

    #[test]
    fn test_invalid_augment_config_fails_at_construction() {
        let mut options = AugmentConfig::default();
        options.random_hue = 2.0;
        let config = PipelineConfig {
            augment: Some(AugmentStageConfig {
                options,
                ..AugmentStageConfig::default()
            }),
            ..PipelineConfig::default()
        };
        let err = FramePipeline::from_config(&config).unwrap_err();
        assert!(matches!(err, FrameError::Config(_)));
    }

    #[test]
    fn test_missing_traj_index_fails() {
        let pipeline = FramePipeline::from_config(&PipelineConfig::standard()).unwrap();
        let observation = trajectory_frame(0).get("observation").cloned().unwrap();
        let record = Record::new().with("observation", observation);
        let err = pipeline.apply(&record).unwrap_err();
        assert!(matches!(err, FrameError::MissingKey(_)));
    }

    struct CountingAugmenter {
        calls: Arc<AtomicUsize>,
    }

    impl ImageAugmenter for CountingAugmenter {
        fn augment(&self, image: &Leaf, seed: Option<AugmentSeed>, _: &AugmentConfig) -> Result<Leaf> {
            assert_eq!(seed, Some([5, 5]));
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(image.clone())
        }
    }

    #[test]
    fn test_custom_augmenter_runs_after_resize() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = PipelineConfig {
            resize: Some(ResizeConfig {
                size: ImageSize::square(8),
                ..ResizeConfig::default()
            }),
            ..PipelineConfig::standard()
        };
        let pipeline = FramePipeline::from_config(&config)
            .unwrap()
            .with_augmenter(CountingAugmenter { calls: calls.clone() });

        let out = pipeline.apply(&trajectory_frame(5)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.leaf_at("observation/image_1").unwrap().shape(), &[8, 8, 3]);
    }
}
