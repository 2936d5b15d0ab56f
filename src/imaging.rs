use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, Rgb, RgbImage, Rgba};

use crate::config::PipelineConfig;
use crate::error::ResolveError;

pub const STORED_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_width: 500,
            max_height: 1000,
            jpeg_quality: 85,
        }
    }
}

impl From<&PipelineConfig> for NormalizeOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_width: config.max_width,
            max_height: config.max_height,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    options: NormalizeOptions,
}

impl ImageNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    pub fn normalize(&self, raw: &[u8]) -> Result<NormalizedImage, ResolveError> {
        let (image, orientation) = decode(raw)?;

        let mut image = DynamicImage::ImageRgb8(flatten_onto_white(image));
        image.apply_orientation(orientation);
        let image = self.bound(image);

        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, self.options.jpeg_quality);
        image
            .write_with_encoder(encoder)
            .map_err(|err| ResolveError::ImageStorageFailed(err.to_string()))?;

        Ok(NormalizedImage {
            bytes,
            width: image.width(),
            height: image.height(),
        })
    }

    fn bound(&self, image: DynamicImage) -> DynamicImage {
        let NormalizeOptions {
            max_width,
            max_height,
            ..
        } = self.options;
        if image.width() <= max_width && image.height() <= max_height {
            return image;
        }
        image.resize(max_width, max_height, FilterType::Lanczos3)
    }
}

fn decode(raw: &[u8]) -> Result<(DynamicImage, Orientation), ResolveError> {
    let decode_err = |err: image::ImageError| ResolveError::ImageDecodeFailed(err.to_string());
    let reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|err| ResolveError::ImageDecodeFailed(err.to_string()))?;
    let mut decoder = reader.into_decoder().map_err(decode_err)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    Ok((image, orientation))
}

pub fn flatten_onto_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }
    let rgba = image.into_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = u32::from(a);
        let blend = |channel: u8| {
            ((u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}
