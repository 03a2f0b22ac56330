use crate::config::{ChannelOrder, ImageConfig};
use crate::error::ImageDecodeError;
use image::{ColorType, DynamicImage, ImageReader};
use ndarray::Array4;
use std::io::Cursor;

/// NHWC tensor with a leading batch dimension of 1.
pub type NormalizedTensor = Array4<f32>;

pub fn input_shape(size: u32) -> [usize; 4] {
    [1, size as usize, size as usize, 3]
}

/// Decodes JPEG/PNG bytes, refusing anything that is not a 3-channel image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ImageDecodeError> {
    if bytes.is_empty() {
        return Err(ImageDecodeError::Empty);
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageDecodeError::Decode(e.to_string()))?;
    let image = reader.decode()?;

    match image.color() {
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => Ok(image),
        other => Err(ImageDecodeError::UnsupportedChannels(format!(
            "{:?} ({} channels)",
            other,
            other.channel_count()
        ))),
    }
}

/// Resizes to `size`x`size` and scales intensities into [0, 1].
pub fn to_tensor(image: &DynamicImage, config: &ImageConfig) -> NormalizedTensor {
    let size = config.size;
    let resized = image.resize_exact(size, size, config.resize_filter.into());
    let rgb = resized.to_rgb8();

    let channels = match config.channel_order {
        ChannelOrder::Rgb => [0, 1, 2],
        ChannelOrder::Bgr => [2, 1, 0],
    };

    Array4::from_shape_fn(input_shape(size), |(_, y, x, c)| {
        rgb.get_pixel(x as u32, y as u32)[channels[c]] as f32 / 255.0
    })
}

pub fn preprocess(bytes: &[u8], config: &ImageConfig) -> Result<NormalizedTensor, ImageDecodeError> {
    let image = decode_image(bytes)?;
    log::debug!(
        "Decoded {}x{} image, resizing to {}",
        image.width(),
        image.height(),
        config.size
    );
    Ok(to_tensor(&image, config))
}
