use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbImage};
use ndarray::{Array4, Axis};
use rayon::prelude::*;

use crate::error::ClassifierError;

pub const CHANNELS: usize = 3;

/// Memory order of the model input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TensorLayout {
    /// `[1, height, width, 3]`, the Keras export default.
    #[default]
    Nhwc,
    /// `[1, 3, height, width]`
    Nchw,
}

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub height: usize,
    pub width: usize,
    pub layout: TensorLayout,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self::square(224, TensorLayout::Nhwc)
    }
}

impl PreprocessConfig {
    pub fn square(size: usize, layout: TensorLayout) -> Self {
        Self {
            height: size,
            width: size,
            layout,
        }
    }

    pub fn input_shape(&self) -> [usize; 4] {
        match self.layout {
            TensorLayout::Nhwc => [1, self.height, self.width, CHANNELS],
            TensorLayout::Nchw => [1, CHANNELS, self.height, self.width],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Processor {
    pub config: PreprocessConfig,
}

impl Processor {
    /// Create a new instance of the Processor struct
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Decode, resize and scale an uploaded image into a single-image batch.
    pub fn preprocess(&self, bytes: &[u8]) -> Result<Array4<f32>, ClassifierError> {
        let image = image::load_from_memory(bytes)?;
        let resized = self.resize(&image)?;
        Ok(self.to_tensor(&resized))
    }

    /// Stretch the image to the configured resolution as 8-bit RGB.
    pub fn resize(&self, image: &DynamicImage) -> Result<RgbImage, ClassifierError> {
        let width = self.config.width as u32;
        let height = self.config.height as u32;
        let src = DynamicImage::ImageRgb8(image.to_rgb8());

        let mut dst_image = Image::new(width, height, PixelType::U8x3);
        let resize_options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
        let mut resizer = Resizer::new();
        resizer
            .resize(&src, &mut dst_image, &resize_options)
            .map_err(|e| ClassifierError::Preprocess(e.to_string()))?;

        RgbImage::from_raw(width, height, dst_image.buffer().to_vec()).ok_or_else(|| {
            ClassifierError::Preprocess("resized buffer does not match target size".to_string())
        })
    }

    /// Scale pixel intensities to [0, 1] and lay them out with a leading batch axis.
    pub fn to_tensor(&self, rgb: &RgbImage) -> Array4<f32> {
        let [_, d1, d2, d3] = self.config.input_shape();
        let mut tensor = Array4::<f32>::zeros((1, d1, d2, d3));

        match self.config.layout {
            TensorLayout::Nhwc => {
                tensor
                    .index_axis_mut(Axis(0), 0)
                    .axis_iter_mut(Axis(0))
                    .into_par_iter()
                    .enumerate()
                    .for_each(|(y, mut row)| {
                        for (x, mut px) in row.axis_iter_mut(Axis(0)).enumerate() {
                            let pixel = rgb.get_pixel(x as u32, y as u32);
                            for c in 0..CHANNELS {
                                px[c] = pixel[c] as f32 / 255.0;
                            }
                        }
                    });
            }
            TensorLayout::Nchw => {
                tensor
                    .index_axis_mut(Axis(0), 0)
                    .axis_iter_mut(Axis(0))
                    .into_par_iter()
                    .enumerate()
                    .for_each(|(c, mut plane)| {
                        for ((y, x), value) in plane.indexed_iter_mut() {
                            *value = rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
                        }
                    });
            }
        }
        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn resize_always_hits_target_resolution() {
        let processor = Processor::new(PreprocessConfig::default());
        for (w, h) in [(1, 1), (37, 512), (640, 480), (224, 224), (1000, 3)] {
            let img = DynamicImage::ImageRgb8(RgbImage::new(w, h));
            let resized = processor.resize(&img).unwrap();
            assert_eq!(resized.dimensions(), (224, 224), "input {w}x{h}");
        }
    }

    #[test]
    fn nhwc_tensor_has_batch_axis_and_unit_range() {
        let processor = Processor::new(PreprocessConfig::default());
        let tensor = processor.preprocess(&png_bytes(50, 80, [255, 0, 51])).unwrap();

        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((tensor[[0, 10, 10, 0]] - 1.0).abs() < 0.005);
        assert!(tensor[[0, 10, 10, 1]].abs() < 0.005);
        assert!((tensor[[0, 10, 10, 2]] - 0.2).abs() < 0.005);
    }

    #[test]
    fn nchw_tensor_puts_channels_first() {
        let processor = Processor::new(PreprocessConfig::square(64, TensorLayout::Nchw));
        let tensor = processor.preprocess(&png_bytes(10, 10, [0, 255, 0])).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert!(tensor[[0, 0, 5, 5]].abs() < 0.005);
        assert!((tensor[[0, 1, 5, 5]] - 1.0).abs() < 0.005);
    }

    #[test]
    fn grayscale_input_is_expanded_to_rgb() {
        let gray = image::GrayImage::from_pixel(30, 30, image::Luma([128]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();

        let processor = Processor::new(PreprocessConfig::square(16, TensorLayout::Nhwc));
        let tensor = processor.preprocess(&cursor.into_inner()).unwrap();
        assert_eq!(tensor.shape(), &[1, 16, 16, 3]);
        assert!((tensor[[0, 3, 3, 0]] - tensor[[0, 3, 3, 2]]).abs() < 1e-6);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let processor = Processor::new(PreprocessConfig::default());
        let err = processor.preprocess(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_)));
    }
}
