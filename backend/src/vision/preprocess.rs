//! Turns a decoded image into the `[3, H, W]` input tensor of the freshness
//! classifier: resize, BGR to RGB, scale to `[0, 1]`, standardize per channel,
//! and lay the result out channel-first.

use image::imageops::{self, FilterType};
use ndarray::{Array3, Array4, Axis};
use serde::{Deserialize, Serialize};

use super::decode::{ColorOrder, DecodedImage};
use crate::config::ConfigError;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side length of the square model input.
    pub input_size: u32,
    pub filter: ResizeFilter,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            filter: ResizeFilter::default(),
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size == 0 {
            return Err(ConfigError::Invalid("preprocess.input_size must be greater than 0".into()));
        }
        for (c, (&m, &s)) in self.mean.iter().zip(&self.std).enumerate() {
            if !m.is_finite() || !s.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "preprocess mean/std at channel {c} must be finite"
                )));
            }
            if s <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "preprocess.std at channel {c} must be greater than 0, got {s}"
                )));
            }
        }
        Ok(())
    }

    /// Maps a standardized value of channel `c` back to the 0-255 scale.
    pub fn restore_intensity(&self, value: f32, c: usize) -> f32 {
        (value * self.std[c] + self.mean[c]) * 255.0
    }
}

pub fn preprocess(image: &DecodedImage, config: &PreprocessConfig) -> Array3<f32> {
    let size = config.input_size;
    let resized = imageops::resize(image.pixels(), size, size, config.filter.into());

    // Source byte index for output channels R, G, B.
    let source = match image.order() {
        ColorOrder::Bgr => [2, 1, 0],
        ColorOrder::Rgb => [0, 1, 2],
    };

    let side = size as usize;
    Array3::from_shape_fn((3, side, side), |(c, y, x)| {
        let px = resized.get_pixel(x as u32, y as u32);
        let value = f32::from(px[source[c]]) / 255.0;
        (value - config.mean[c]) / config.std[c]
    })
}

/// Adds the leading batch axis: `[3, H, W]` becomes `[1, 3, H, W]`.
pub fn batch(tensor: Array3<f32>) -> Array4<f32> {
    tensor.insert_axis(Axis(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::decode::decode;
    use crate::vision::test_support::solid_png;
    use image::{Rgb, RgbImage};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn output_shape_is_fixed_for_any_input_size() {
        let config = PreprocessConfig::default();
        for (w, h) in [(1, 1), (300, 300), (640, 97), (13, 1024)] {
            let image = decode(&solid_png(w, h, [90, 90, 90])).unwrap();
            assert_eq!(preprocess(&image, &config).shape(), &[3, 224, 224]);
        }
    }

    #[test]
    fn swaps_bgr_into_rgb_channels() {
        // Blue-only pixel in BGR byte order.
        let pixels = RgbImage::from_pixel(8, 8, Rgb([255, 0, 0]));
        let image = DecodedImage::new(pixels, ColorOrder::Bgr);
        let tensor = preprocess(&image, &PreprocessConfig::default());

        assert!(close(tensor[[0, 4, 4]], (0.0 - 0.485) / 0.229));
        assert!(close(tensor[[1, 4, 4]], (0.0 - 0.456) / 0.224));
        assert!(close(tensor[[2, 4, 4]], (1.0 - 0.406) / 0.225));
    }

    #[test]
    fn rgb_input_keeps_channel_order() {
        let pixels = RgbImage::from_pixel(8, 8, Rgb([255, 0, 0]));
        let image = DecodedImage::new(pixels, ColorOrder::Rgb);
        let tensor = preprocess(&image, &PreprocessConfig::default());

        assert!(close(tensor[[0, 0, 0]], (1.0 - 0.485) / 0.229));
        assert!(close(tensor[[2, 0, 0]], (0.0 - 0.406) / 0.225));
    }

    #[test]
    fn decoded_png_round_trips_to_original_colors() {
        let image = decode(&solid_png(32, 32, [200, 100, 50])).unwrap();
        let config = PreprocessConfig::default();
        let tensor = preprocess(&image, &config);

        assert!((config.restore_intensity(tensor[[0, 10, 10]], 0) - 200.0).abs() < 0.5);
        assert!((config.restore_intensity(tensor[[1, 10, 10]], 1) - 100.0).abs() < 0.5);
        assert!((config.restore_intensity(tensor[[2, 10, 10]], 2) - 50.0).abs() < 0.5);
    }

    #[test]
    fn batch_prepends_axis() {
        let batched = batch(Array3::<f32>::zeros((3, 224, 224)));
        assert_eq!(batched.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn validate_rejects_bad_std() {
        let config = PreprocessConfig {
            std: [0.2, 0.0, 0.2],
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(PreprocessConfig::default().validate().is_ok());
    }
}
