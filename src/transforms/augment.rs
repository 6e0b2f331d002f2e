//! Augmentation of image terminals with per-trajectory seeding.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::imaging::{AugmentConfig, AugmentSeed, Augmenter, ImageAugmenter};
use crate::record::Record;
use crate::tree::{selective_tree_map, Matcher};
use crate::utils::error::Result;

/// How [`augment`] seeds the augmenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentOptions {
    /// Give every selected image of a record the seed derived from its
    /// `_traj_index`, so all frames of a trajectory get the same random draw
    pub traj_identical: bool,
    /// Options handed to the augmenter
    pub config: AugmentConfig,
}

impl Default for AugmentOptions {
    fn default() -> Self {
        Self {
            traj_identical: true,
            config: AugmentConfig::default(),
        }
    }
}

impl AugmentOptions {
    /// Validated options
    pub fn new(config: AugmentConfig, traj_identical: bool) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            traj_identical,
            config,
        })
    }
}

/// Seed pair for a record: both components are the trajectory index
pub fn trajectory_seed(record: &Record) -> Result<AugmentSeed> {
    let index = record.traj_index()?;
    Ok([index, index])
}

/// Augment every terminal selected by `matcher` with the default augmenter.
///
/// With `traj_identical` the record must carry `_traj_index`; its absence is
/// reported before any terminal is touched. Without it no seed is passed and
/// each terminal draws independent randomness.
pub fn augment<M>(record: &Record, matcher: &M, options: &AugmentOptions) -> Result<Record>
where
    M: Matcher + ?Sized,
{
    augment_with(record, matcher, options, &Augmenter::new())
}

/// [`augment`] with an explicit augmenter
pub fn augment_with<M, A>(
    record: &Record,
    matcher: &M,
    options: &AugmentOptions,
    augmenter: &A,
) -> Result<Record>
where
    M: Matcher + ?Sized,
    A: ImageAugmenter + ?Sized,
{
    let seed = if options.traj_identical {
        Some(trajectory_seed(record)?)
    } else {
        None
    };
    debug!(?seed, "augmenting record");

    selective_tree_map(record, matcher, |leaf| {
        augmenter.augment(leaf, seed, &options.config)
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::record::{Leaf, Tensor, TRAJ_INDEX_KEY};
    use crate::tree::{predicate, KeypathMatch};
    use crate::utils::error::FrameError;

    /// Records the seeds it is called with and tags the image with them
    #[derive(Default)]
    struct SeedRecorder {
        seeds: RefCell<Vec<Option<AugmentSeed>>>,
    }

    impl ImageAugmenter for SeedRecorder {
        fn augment(
            &self,
            image: &Leaf,
            seed: Option<AugmentSeed>,
            _config: &AugmentConfig,
        ) -> Result<Leaf> {
            self.seeds.borrow_mut().push(seed);
            let tag = seed.map_or(0.0, |s| s[0] as f32);
            let shape = image.shape().to_vec();
            let len: usize = shape.iter().product();
            Ok(Leaf::Float32(Tensor::new(shape, vec![tag; len])?))
        }
    }

    fn frame() -> Tensor<u8> {
        let data = (0..16 * 16 * 3).map(|i| (i * 7 % 256) as u8).collect();
        Tensor::new(vec![16, 16, 3], data).unwrap()
    }

    fn trajectory_record() -> Record {
        Record::new()
            .with(TRAJ_INDEX_KEY, 7i64)
            .with("image_0", frame())
            .with("image_1", frame())
            .with("action", Tensor::new(vec![2], vec![0.1f32, 0.2]).unwrap())
    }

    #[test]
    fn test_traj_identical_passes_duplicated_index() {
        let recorder = SeedRecorder::default();
        let out = augment_with(
            &trajectory_record(),
            &KeypathMatch::default(),
            &AugmentOptions::default(),
            &recorder,
        )
        .unwrap();

        assert_eq!(*recorder.seeds.borrow(), vec![Some([7, 7]), Some([7, 7])]);
        assert_eq!(out.leaf_at("image_0").unwrap(), out.leaf_at("image_1").unwrap());
        assert_eq!(out.leaf_at("action").unwrap().dtype(), crate::record::DType::Float32);
    }

    #[test]
    fn test_traj_identical_frames_get_same_augmentation() {
        let record = trajectory_record();
        let out = augment(&record, &KeypathMatch::default(), &AugmentOptions::default()).unwrap();
        assert_eq!(out.leaf_at("image_0").unwrap(), out.leaf_at("image_1").unwrap());
        assert_eq!(out.leaf_at(TRAJ_INDEX_KEY).unwrap().as_int().unwrap(), 7);

        let again = augment(&record, &KeypathMatch::default(), &AugmentOptions::default()).unwrap();
        assert_eq!(out, again);
    }

    #[test]
    fn test_independent_randomness_passes_no_seed() {
        let recorder = SeedRecorder::default();
        let options = AugmentOptions::new(AugmentConfig::default(), false).unwrap();
        let record = Record::new().with("image_0", frame()).with("image_1", frame());

        augment_with(&record, &KeypathMatch::default(), &options, &recorder).unwrap();
        assert_eq!(*recorder.seeds.borrow(), vec![None, None]);
    }

    #[test]
    fn test_independent_frames_can_diverge() {
        let options = AugmentOptions::new(AugmentConfig::default(), false).unwrap();
        let record = Record::new().with("image_0", frame()).with("image_1", frame());

        let diverged = (0..10).any(|_| {
            let out = augment(&record, &KeypathMatch::default(), &options).unwrap();
            out.leaf_at("image_0").unwrap() != out.leaf_at("image_1").unwrap()
        });
        assert!(diverged);
    }

    #[test]
    fn test_missing_traj_index_fails_without_output() {
        let recorder = SeedRecorder::default();
        let record = Record::new().with("image_0", frame());

        let err = augment_with(&record, &KeypathMatch::default(), &AugmentOptions::default(), &recorder)
            .unwrap_err();
        assert!(matches!(err, FrameError::MissingKey(ref k) if k == TRAJ_INDEX_KEY));
        assert!(recorder.seeds.borrow().is_empty());
    }

    #[test]
    fn test_accepts_predicate_matcher() {
        let recorder = SeedRecorder::default();
        let only_first = predicate(|keypath, _| keypath.ends_with("_0"));
        let out = augment_with(
            &trajectory_record(),
            &only_first,
            &AugmentOptions::default(),
            &recorder,
        )
        .unwrap();

        assert_eq!(recorder.seeds.borrow().len(), 1);
        assert_eq!(out.leaf_at("image_1").unwrap().dtype(), crate::record::DType::Uint8);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let mut config = AugmentConfig::default();
        config.random_saturation = (2.0, 1.0);
        assert!(AugmentOptions::new(config, true).is_err());
    }
}
