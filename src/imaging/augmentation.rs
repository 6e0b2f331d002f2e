//! Data Augmentation Module for trajectory frames
//!
//! Random pixel-space augmentations applied to `[H, W, C]` image terminals.
//! Every random draw comes from a `ChaCha8Rng`. When a seed pair is supplied
//! the generator is seeded from it, so two frames augmented with the same seed
//! (and of the same shape) receive exactly the same crop, flips and colour
//! jitter. Without a seed the generator is seeded from OS entropy.
//!
//! # Operations
//!
//! Applied in the order listed by [`AugmentConfig::augment_order`]:
//!
//! - `random_resized_crop`: crop a random area/aspect window, resize back
//! - `random_brightness`: add a uniform offset in `±max_delta * 255`
//! - `random_contrast`: scale each channel around its mean
//! - `random_saturation`: blend towards or away from the luminance
//! - `random_hue`: rotate the hue by a fraction of a full turn
//! - `random_flip_left_right` / `random_flip_up_down`: flip with p = 0.5
//!
//! Pixel values are kept in `[0, 255]` and the terminal dtype is preserved.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::imaging::buffer::{apply_hwc, PixelOp};
use crate::imaging::{AugmentSeed, ImageAugmenter};
use crate::record::{Leaf, Tensor};
use crate::utils::error::{FrameError, Result};

/// One augmentation operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentOp {
    RandomResizedCrop,
    RandomBrightness,
    RandomContrast,
    RandomSaturation,
    RandomHue,
    RandomFlipLeftRight,
    RandomFlipUpDown,
}

/// Parameters of `random_resized_crop`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomResizedCrop {
    /// Range of the crop area as a fraction of the image area
    pub scale: (f32, f32),
    /// Range of the crop aspect ratio (width / height)
    pub ratio: (f32, f32),
}

impl Default for RandomResizedCrop {
    fn default() -> Self {
        Self {
            scale: (0.8, 1.0),
            ratio: (0.9, 1.1),
        }
    }
}

/// Configuration for frame augmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AugmentConfig {
    /// Operations to apply, in order
    pub augment_order: Vec<AugmentOp>,
    /// Maximum brightness offset as a fraction of the full range
    pub random_brightness: f32,
    /// Contrast factor range
    pub random_contrast: (f32, f32),
    /// Saturation factor range
    pub random_saturation: (f32, f32),
    /// Maximum hue rotation as a fraction of a full turn, at most 0.5
    pub random_hue: f32,
    pub random_resized_crop: RandomResizedCrop,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            augment_order: vec![
                AugmentOp::RandomResizedCrop,
                AugmentOp::RandomBrightness,
                AugmentOp::RandomContrast,
                AugmentOp::RandomSaturation,
                AugmentOp::RandomHue,
            ],
            random_brightness: 0.1,
            random_contrast: (0.9, 1.1),
            random_saturation: (0.9, 1.1),
            random_hue: 0.05,
            random_resized_crop: RandomResizedCrop::default(),
        }
    }
}

impl AugmentConfig {
    /// Identity configuration (no operations)
    pub fn none() -> Self {
        Self {
            augment_order: Vec::new(),
            ..Self::default()
        }
    }

    /// Geometric-only preset: flips in both directions
    pub fn flips() -> Self {
        Self {
            augment_order: vec![AugmentOp::RandomFlipLeftRight, AugmentOp::RandomFlipUpDown],
            ..Self::default()
        }
    }

    /// Check every parameter range
    pub fn validate(&self) -> Result<()> {
        let crop = &self.random_resized_crop;
        check_range("random_resized_crop.scale", crop.scale)?;
        if crop.scale.0 <= 0.0 || crop.scale.1 > 1.0 {
            return Err(FrameError::Config(format!(
                "random_resized_crop.scale must lie in (0, 1], got {:?}",
                crop.scale
            )));
        }
        check_range("random_resized_crop.ratio", crop.ratio)?;
        if crop.ratio.0 <= 0.0 {
            return Err(FrameError::Config(format!(
                "random_resized_crop.ratio must be positive, got {:?}",
                crop.ratio
            )));
        }

        if !(self.random_brightness >= 0.0 && self.random_brightness <= 1.0) {
            return Err(FrameError::Config(format!(
                "random_brightness must lie in [0, 1], got {}",
                self.random_brightness
            )));
        }
        check_range("random_contrast", self.random_contrast)?;
        check_range("random_saturation", self.random_saturation)?;
        if self.random_contrast.0 < 0.0 || self.random_saturation.0 < 0.0 {
            return Err(FrameError::Config(
                "random_contrast and random_saturation factors must be non-negative".into(),
            ));
        }
        if !(self.random_hue >= 0.0 && self.random_hue <= 0.5) {
            return Err(FrameError::Config(format!(
                "random_hue must lie in [0, 0.5], got {}",
                self.random_hue
            )));
        }
        Ok(())
    }
}

fn check_range(name: &str, (lo, hi): (f32, f32)) -> Result<()> {
    if !(lo.is_finite() && hi.is_finite()) || lo > hi {
        return Err(FrameError::Config(format!(
            "{name} must be a finite range with low <= high, got ({lo}, {hi})"
        )));
    }
    Ok(())
}

/// Seed a generator from a seed pair
pub fn seeded_rng(seed: AugmentSeed) -> ChaCha8Rng {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&seed[0].to_le_bytes());
    bytes[8..16].copy_from_slice(&seed[1].to_le_bytes());
    ChaCha8Rng::from_seed(bytes)
}

/// Default augmenter: `augment_order` driven, `ChaCha8Rng` randomness
#[derive(Debug, Clone, Copy, Default)]
pub struct Augmenter;

impl Augmenter {
    pub fn new() -> Self {
        Self
    }

    /// Apply `config` to a float `[H, W, C]` buffer with values in `[0, 255]`
    pub fn augment_pixels(
        &self,
        image: &mut Pixels,
        config: &AugmentConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        for op in &config.augment_order {
            match op {
                AugmentOp::RandomResizedCrop => {
                    self.random_resized_crop(image, &config.random_resized_crop, rng)?
                }
                AugmentOp::RandomBrightness => {
                    let max = config.random_brightness;
                    let delta = rng.gen_range(-max..=max);
                    self.adjust_brightness(image, delta);
                }
                AugmentOp::RandomContrast => {
                    let (lo, hi) = config.random_contrast;
                    let factor = rng.gen_range(lo..=hi);
                    self.adjust_contrast(image, factor);
                }
                AugmentOp::RandomSaturation => {
                    let (lo, hi) = config.random_saturation;
                    let factor = rng.gen_range(lo..=hi);
                    self.adjust_saturation(image, factor)?;
                }
                AugmentOp::RandomHue => {
                    let max = config.random_hue;
                    let delta = rng.gen_range(-max..=max);
                    self.adjust_hue(image, delta)?;
                }
                AugmentOp::RandomFlipLeftRight => {
                    if rng.gen_bool(0.5) {
                        self.flip_left_right(image)?;
                    }
                }
                AugmentOp::RandomFlipUpDown => {
                    if rng.gen_bool(0.5) {
                        self.flip_up_down(image)?;
                    }
                }
            }
            image.clamp();
        }
        Ok(())
    }

    /// Crop a random window and resize it back to the original size
    fn random_resized_crop(
        &self,
        image: &mut Pixels,
        params: &RandomResizedCrop,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        let (h, w) = (image.height, image.width);
        let area = rng.gen_range(params.scale.0..=params.scale.1) * (h * w) as f32;
        let log_ratio = rng.gen_range(params.ratio.0.ln()..=params.ratio.1.ln());
        let ratio = log_ratio.exp();

        let crop_w = ((area * ratio).sqrt().round() as usize).clamp(1, w);
        let crop_h = ((area / ratio).sqrt().round() as usize).clamp(1, h);
        let x0 = rng.gen_range(0..=(w - crop_w));
        let y0 = rng.gen_range(0..=(h - crop_h));

        let op = PixelOp::CropResize {
            x: x0 as u32,
            y: y0 as u32,
            width: crop_w as u32,
            height: crop_h as u32,
        };
        image.apply(op)
    }

    /// Add `delta * 255` to every colour value
    fn adjust_brightness(&self, image: &mut Pixels, delta: f32) {
        let offset = delta * 255.0;
        image.for_each_color(|v| *v += offset);
    }

    /// Scale each colour channel around its mean
    fn adjust_contrast(&self, image: &mut Pixels, factor: f32) {
        let c = image.channels;
        let colors = image.color_channels();
        let count = (image.height * image.width).max(1) as f32;

        let mut means = vec![0.0f32; colors];
        for px in image.data.chunks(c) {
            for (mean, v) in means.iter_mut().zip(px) {
                *mean += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= count);

        for px in image.data.chunks_mut(c) {
            for (v, mean) in px.iter_mut().zip(&means) {
                *v = mean + factor * (*v - mean);
            }
        }
    }

    /// Interpolate between the luminance and the original colour
    fn adjust_saturation(&self, image: &mut Pixels, factor: f32) -> Result<()> {
        image.require_rgb("random_saturation")?;
        for px in image.data.chunks_mut(image.channels) {
            let gray = 0.299 * px[0] + 0.587 * px[1] + 0.114 * px[2];
            for v in &mut px[..3] {
                *v = gray + factor * (*v - gray);
            }
        }
        Ok(())
    }

    /// Rotate the hue by `delta` of a full turn
    fn adjust_hue(&self, image: &mut Pixels, delta: f32) -> Result<()> {
        image.require_rgb("random_hue")?;
        for px in image.data.chunks_mut(image.channels) {
            let (h, s, v) = rgb_to_hsv(px[0] / 255.0, px[1] / 255.0, px[2] / 255.0);
            let (r, g, b) = hsv_to_rgb((h + delta).rem_euclid(1.0), s, v);
            px[0] = r * 255.0;
            px[1] = g * 255.0;
            px[2] = b * 255.0;
        }
        Ok(())
    }

    fn flip_left_right(&self, image: &mut Pixels) -> Result<()> {
        image.apply(PixelOp::FlipHorizontal)
    }

    fn flip_up_down(&self, image: &mut Pixels) -> Result<()> {
        image.apply(PixelOp::FlipVertical)
    }
}

impl ImageAugmenter for Augmenter {
    fn augment(&self, image: &Leaf, seed: Option<AugmentSeed>, config: &AugmentConfig) -> Result<Leaf> {
        config.validate()?;
        let mut rng = match seed {
            Some(seed) => seeded_rng(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        match image {
            Leaf::Uint8(tensor) => {
                let mut pixels = Pixels::from_tensor(&tensor.map(f32::from))?;
                self.augment_pixels(&mut pixels, config, &mut rng)?;
                Ok(Leaf::Uint8(pixels.into_tensor()?.map(|v| v.round() as u8)))
            }
            Leaf::Float32(tensor) => {
                let mut pixels = Pixels::from_tensor(tensor)?;
                self.augment_pixels(&mut pixels, config, &mut rng)?;
                Ok(Leaf::Float32(pixels.into_tensor()?))
            }
            other => Err(FrameError::Augment(format!(
                "expected a uint8 or float32 image, found {}",
                other.dtype()
            ))),
        }
    }
}

/// Mutable float `[H, W, C]` working buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Pixels {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl Pixels {
    pub fn from_tensor(tensor: &Tensor<f32>) -> Result<Self> {
        let (height, width, channels) = tensor
            .hwc()
            .map_err(|e| FrameError::Augment(e.to_string()))?;
        if height == 0 || width == 0 || channels == 0 {
            return Err(FrameError::Augment(format!(
                "cannot augment an empty image of shape {:?}",
                tensor.shape()
            )));
        }
        Ok(Self {
            height,
            width,
            channels,
            data: tensor.to_vec(),
        })
    }

    pub fn into_tensor(self) -> Result<Tensor<f32>> {
        Tensor::new(vec![self.height, self.width, self.channels], self.data)
    }

    /// Channels that carry colour; a trailing alpha channel is left alone
    fn color_channels(&self) -> usize {
        match self.channels {
            2 | 4 => self.channels - 1,
            c => c,
        }
    }

    fn for_each_color<F: FnMut(&mut f32)>(&mut self, mut f: F) {
        let colors = self.color_channels();
        for px in self.data.chunks_mut(self.channels) {
            px[..colors].iter_mut().for_each(&mut f);
        }
    }

    fn require_rgb(&self, op: &str) -> Result<()> {
        if self.color_channels() != 3 {
            return Err(FrameError::Augment(format!(
                "{op} needs an RGB image, got {} channels",
                self.channels
            )));
        }
        Ok(())
    }

    /// Run a geometric `image::imageops` operation in place
    fn apply(&mut self, op: PixelOp) -> Result<()> {
        let data = std::mem::take(&mut self.data);
        self.data = apply_hwc(data, self.height, self.width, self.channels, op)
            .map_err(|e| FrameError::Augment(e.to_string()))?;
        Ok(())
    }

    fn clamp(&mut self) {
        self.data.iter_mut().for_each(|v| *v = v.clamp(0.0, 255.0));
    }
}

fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };
    (hue, saturation, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let sector = h * 6.0;
    let c = v * s;
    let x = c * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match sector as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (r + m, g + m, b + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image() -> Tensor<u8> {
        let mut data = Vec::with_capacity(16 * 16 * 3);
        for y in 0..16u8 {
            for x in 0..16u8 {
                data.extend([x * 16, y * 16, 128]);
            }
        }
        Tensor::new(vec![16, 16, 3], data).unwrap()
    }

    fn pixels(tensor: &Tensor<u8>) -> Pixels {
        Pixels::from_tensor(&tensor.map(f32::from)).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        AugmentConfig::default().validate().unwrap();
        AugmentConfig::none().validate().unwrap();
        AugmentConfig::flips().validate().unwrap();
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let mut config = AugmentConfig::default();
        config.random_contrast = (1.2, 0.8);
        assert!(matches!(config.validate(), Err(FrameError::Config(_))));

        let mut config = AugmentConfig::default();
        config.random_hue = 0.7;
        assert!(config.validate().is_err());

        let mut config = AugmentConfig::default();
        config.random_resized_crop.scale = (0.0, 1.0);
        assert!(config.validate().is_err());

        let mut config = AugmentConfig::default();
        config.random_brightness = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_seed_same_result() {
        let image = Leaf::Uint8(create_test_image());
        let config = AugmentConfig::default();
        let aug = Augmenter::new();

        let a = aug.augment(&image, Some([7, 7]), &config).unwrap();
        let b = aug.augment(&image, Some([7, 7]), &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), image.shape());
        assert_eq!(a.dtype(), image.dtype());
    }

    #[test]
    fn test_different_seeds_diverge() {
        let image = Leaf::Uint8(create_test_image());
        let config = AugmentConfig::default();
        let aug = Augmenter::new();

        let outputs: Vec<Leaf> = (0..8)
            .map(|i| aug.augment(&image, Some([i, i]), &config).unwrap())
            .collect();
        assert!(outputs.iter().any(|o| o != &outputs[0]));
    }

    #[test]
    fn test_identity_config_is_noop() {
        let image = Leaf::Uint8(create_test_image());
        let out = Augmenter::new()
            .augment(&image, None, &AugmentConfig::none())
            .unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_float_images_stay_float_and_in_range() {
        let image = Leaf::Float32(create_test_image().map(f32::from));
        let mut config = AugmentConfig::default();
        config.random_brightness = 0.5;
        let out = Augmenter::new().augment(&image, Some([1, 2]), &config).unwrap();

        let tensor = out.as_float32().unwrap();
        assert_eq!(tensor.shape(), &[16, 16, 3]);
        assert!(tensor.data().iter().all(|v| (0.0..=255.0).contains(v)));
    }

    #[test]
    fn test_rejects_non_images() {
        let aug = Augmenter::new();
        let config = AugmentConfig::default();
        assert!(matches!(
            aug.augment(&Leaf::Int(3), None, &config),
            Err(FrameError::Augment(_))
        ));
        let flat = Leaf::Uint8(Tensor::new(vec![4], vec![0; 4]).unwrap());
        assert!(aug.augment(&flat, None, &config).is_err());
    }

    #[test]
    fn test_saturation_needs_rgb() {
        let gray = Leaf::Uint8(Tensor::new(vec![2, 2, 1], vec![10; 4]).unwrap());
        let config = AugmentConfig {
            augment_order: vec![AugmentOp::RandomSaturation],
            ..AugmentConfig::default()
        };
        assert!(Augmenter::new().augment(&gray, Some([0, 0]), &config).is_err());
    }

    #[test]
    fn test_flips() {
        let aug = Augmenter::new();
        let tensor = Tensor::new(vec![2, 3, 1], vec![1u8, 2, 3, 4, 5, 6]).unwrap();

        let mut lr = pixels(&tensor);
        aug.flip_left_right(&mut lr).unwrap();
        assert_eq!(lr.data, vec![3.0, 2.0, 1.0, 6.0, 5.0, 4.0]);

        let mut ud = pixels(&tensor);
        aug.flip_up_down(&mut ud).unwrap();
        assert_eq!(ud.data, vec![4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_brightness_adjustment() {
        let aug = Augmenter::new();
        let image = create_test_image();

        let mut brighter = pixels(&image);
        aug.adjust_brightness(&mut brighter, 0.1);
        brighter.clamp();
        let mut darker = pixels(&image);
        aug.adjust_brightness(&mut darker, -0.1);
        darker.clamp();

        let orig = pixels(&image);
        let idx = (8 * 16 + 8) * 3;
        assert!(brighter.data[idx] > orig.data[idx]);
        assert!(darker.data[idx] < orig.data[idx]);
    }

    #[test]
    fn test_contrast_preserves_mean() {
        let aug = Augmenter::new();
        let mut image = pixels(&create_test_image());
        let mean_before: f32 = image.data.iter().step_by(3).sum::<f32>() / 256.0;
        aug.adjust_contrast(&mut image, 0.5);
        let mean_after: f32 = image.data.iter().step_by(3).sum::<f32>() / 256.0;
        assert!((mean_before - mean_after).abs() < 1e-2);
    }

    #[test]
    fn test_hue_round_trip() {
        let (h, s, v) = rgb_to_hsv(0.8, 0.2, 0.4);
        let (r, g, b) = hsv_to_rgb(h, s, v);
        assert!((r - 0.8).abs() < 1e-5 && (g - 0.2).abs() < 1e-5 && (b - 0.4).abs() < 1e-5);

        let aug = Augmenter::new();
        let mut image = pixels(&create_test_image());
        let before = image.clone();
        aug.adjust_hue(&mut image, 0.0).unwrap();
        for (a, b) in image.data.iter().zip(&before.data) {
            assert!((a - b).abs() < 1e-2);
        }
    }

    #[test]
    fn test_random_resized_crop_keeps_shape() {
        let aug = Augmenter::new();
        let mut image = pixels(&create_test_image());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let params = RandomResizedCrop {
            scale: (0.3, 0.5),
            ratio: (0.75, 1.33),
        };
        aug.random_resized_crop(&mut image, &params, &mut rng).unwrap();
        assert_eq!(image.data.len(), 16 * 16 * 3);
        assert!(image.data.iter().all(|v| (0.0..=255.0).contains(v)));
    }

    #[test]
    fn test_config_from_toml() {
        let config: AugmentConfig = toml::from_str(
            r#"
            augment_order = ["random_flip_left_right", "random_brightness"]
            random_brightness = 0.2

            [random_resized_crop]
            scale = [0.5, 1.0]
            ratio = [1.0, 1.0]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.augment_order,
            vec![AugmentOp::RandomFlipLeftRight, AugmentOp::RandomBrightness]
        );
        assert_eq!(config.random_brightness, 0.2);
        assert_eq!(config.random_resized_crop.scale, (0.5, 1.0));
        assert_eq!(config.random_contrast, AugmentConfig::default().random_contrast);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_rejects_unknown_options() {
        assert!(toml::from_str::<AugmentConfig>("random_brightnes = 0.9").is_err());
        assert!(toml::from_str::<AugmentConfig>(
            "[random_resized_crop]\nscale = [0.5, 1.0]\nratio = [1.0, 1.0]\nratios = [1.0, 2.0]"
        )
        .is_err());
    }
}
