use image::RgbImage;

/// Byte order of the three interleaved channels of a [`DecodedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorOrder {
    Rgb,
    Bgr,
}

/// 8-bit, 3-channel pixel buffer.
///
/// The `image` crate's `Rgb<u8>` buffer is only used as an interleaved
/// container here; which byte is which channel is given by `order`.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
    order: ColorOrder,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("image buffer is empty")]
    Empty,
    #[error("image could not be decoded: {0}")]
    Malformed(String),
}

impl DecodedImage {
    pub fn new(pixels: RgbImage, order: ColorOrder) -> Self {
        Self { pixels, order }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn order(&self) -> ColorOrder {
        self.order
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Decodes an encoded image into a BGR buffer.
///
/// Any pixel format the codec yields (gray, alpha, 16-bit) is flattened to
/// 8-bit, 3-channel; alpha is dropped.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let image = image::load_from_memory(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let mut pixels = image.to_rgb8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(DecodeError::Malformed("image has zero area".into()));
    }

    for px in pixels.pixels_mut() {
        px.0.swap(0, 2);
    }

    Ok(DecodedImage::new(pixels, ColorOrder::Bgr))
}
