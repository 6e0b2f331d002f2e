//! Pipeline configuration loaded from TOML.
//!
//! ```toml
//! [decode]
//! match_keys = ["image", "depth"]
//!
//! [resize]
//! match_keys = ["image"]
//! size = { height = 128, width = 128 }
//!
//! [augment]
//! match_keys = ["image"]
//! traj_identical = true
//!
//! [augment.options]
//! augment_order = ["random_resized_crop", "random_brightness"]
//! random_brightness = 0.2
//! ```
//!
//! Omitted sections disable the corresponding stage.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::imaging::{AugmentConfig, ImageSize};
use crate::transforms::AugmentOptions;
use crate::tree::{KeypathMatch, DEFAULT_IMAGE_MATCH};
use crate::utils::error::{FrameError, Result, ResultExt};

fn default_match_keys() -> Vec<String> {
    vec![DEFAULT_IMAGE_MATCH.to_string()]
}

fn default_traj_identical() -> bool {
    true
}

/// Stages of a frame pipeline; `None` disables a stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub decode: Option<DecodeConfig>,
    pub resize: Option<ResizeConfig>,
    pub augment: Option<AugmentStageConfig>,
}

/// Decode stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecodeConfig {
    #[serde(default = "default_match_keys")]
    pub match_keys: Vec<String>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            match_keys: default_match_keys(),
        }
    }
}

/// Resize stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeConfig {
    #[serde(default = "default_match_keys")]
    pub match_keys: Vec<String>,
    #[serde(default)]
    pub size: ImageSize,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            match_keys: default_match_keys(),
            size: ImageSize::default(),
        }
    }
}

/// Augment stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AugmentStageConfig {
    #[serde(default = "default_match_keys")]
    pub match_keys: Vec<String>,
    /// Seed every image of a record from its trajectory index
    #[serde(default = "default_traj_identical")]
    pub traj_identical: bool,
    #[serde(default)]
    pub options: AugmentConfig,
}

impl Default for AugmentStageConfig {
    fn default() -> Self {
        Self {
            match_keys: default_match_keys(),
            traj_identical: true,
            options: AugmentConfig::default(),
        }
    }
}

impl DecodeConfig {
    pub fn matcher(&self) -> KeypathMatch {
        KeypathMatch::new(self.match_keys.iter().cloned())
    }
}

impl ResizeConfig {
    pub fn matcher(&self) -> KeypathMatch {
        KeypathMatch::new(self.match_keys.iter().cloned())
    }
}

impl AugmentStageConfig {
    pub fn matcher(&self) -> KeypathMatch {
        KeypathMatch::new(self.match_keys.iter().cloned())
    }

    /// Validated augmentation options for this stage
    pub fn augment_options(&self) -> Result<AugmentOptions> {
        AugmentOptions::new(self.options.clone(), self.traj_identical)
    }
}

impl PipelineConfig {
    /// All three stages with their defaults
    pub fn standard() -> Self {
        Self {
            decode: Some(DecodeConfig::default()),
            resize: Some(ResizeConfig::default()),
            augment: Some(AugmentStageConfig::default()),
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize pipeline config")
    }

    /// Check every enabled stage
    pub fn validate(&self) -> Result<()> {
        if let Some(decode) = &self.decode {
            check_match_keys("decode", &decode.match_keys)?;
        }
        if let Some(resize) = &self.resize {
            check_match_keys("resize", &resize.match_keys)?;
            if resize.size.height == 0 || resize.size.width == 0 {
                return Err(FrameError::Config(format!(
                    "resize.size must be non-zero, got {}x{}",
                    resize.size.height, resize.size.width
                )));
            }
        }
        if let Some(augment) = &self.augment {
            check_match_keys("augment", &augment.match_keys)?;
            augment.options.validate()?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.decode.is_none() && self.resize.is_none() && self.augment.is_none()
    }
}

fn check_match_keys(stage: &str, keys: &[String]) -> Result<()> {
    if keys.is_empty() {
        return Err(FrameError::Config(format!(
            "{stage}.match_keys must name at least one pattern"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::AugmentOp;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_disables_all_stages() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_section_defaults() {
        let config = PipelineConfig::from_toml_str("[decode]\n[resize]\n[augment]\n").unwrap();
        assert_eq!(config, PipelineConfig::standard());

        let resize = config.resize.unwrap();
        assert_eq!(resize.size, ImageSize::new(128, 128));
        assert_eq!(resize.match_keys, vec!["image".to_string()]);
        assert!(config.augment.unwrap().traj_identical);
    }

    #[test]
    fn test_full_document() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [decode]
            match_keys = ["image", "depth"]

            [resize]
            size = { height = 64, width = 96 }

            [augment]
            match_keys = ["image_primary"]
            traj_identical = false

            [augment.options]
            augment_order = ["random_flip_left_right", "random_brightness"]
            random_brightness = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(config.decode.unwrap().matcher().patterns(), &["image", "depth"]);
        assert_eq!(config.resize.unwrap().size, ImageSize::new(64, 96));

        let augment = config.augment.unwrap();
        let options = augment.augment_options().unwrap();
        assert!(!options.traj_identical);
        assert_eq!(
            options.config.augment_order,
            vec![AugmentOp::RandomFlipLeftRight, AugmentOp::RandomBrightness]
        );
        assert_eq!(options.config.random_brightness, 0.2);
        assert_eq!(options.config.random_hue, AugmentConfig::default().random_hue);
    }

    #[test]
    fn test_invalid_documents_rejected() {
        for doc in [
            "[resize]\nsize = { height = 0, width = 4 }",
            "[decode]\nmatch_keys = []",
            "[augment.options]\nrandom_contrast = [1.5, 0.5]",
            "[augment]\nunknown = 1",
            "[augment.options]\nrandom_brightnes = 0.9",
            "[augment.options.random_resized_crop]\nscale = [0.5, 1.0]\nratio = [1.0, 1.0]\nsize = 3",
            "[decode\n",
        ] {
            let err = PipelineConfig::from_toml_str(doc).unwrap_err();
            assert!(matches!(err, FrameError::Config(_)), "{doc}: {err}");
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[resize]\nsize = {{ height = 32, width = 32 }}").unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.resize.unwrap().size, ImageSize::square(32));
        assert!(config.decode.is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, FrameError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_invalid_file_names_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[resize]\nsize = {{ height = 0, width = 0 }}").unwrap();

        let err = PipelineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, FrameError::Config(_)));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PipelineConfig::standard();
        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }
}
