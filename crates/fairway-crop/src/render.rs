//! Decoding, cropping, and re-encoding the picked image.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};
use crate::geometry::{CropRect, ImageSize};

/// Longest edge of a cropped output, in pixels.
pub const MAX_OUTPUT_EDGE: u32 = 2000;

/// JPEG quality used when re-encoding.
pub const JPEG_QUALITY: u8 = 92;

const DEFAULT_STEM: &str = "layout";
const STRIPPED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// A file picked by the user.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The encoded crop, ready to submit in place of the picked file.
#[derive(Debug, Clone)]
pub struct CroppedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Output format chosen from the picked file's MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Png,
    WebP,
    Jpeg,
}

impl OutputFormat {
    fn for_content_type(content_type: &str) -> Self {
        let lower = content_type.to_ascii_lowercase();
        if lower.contains("png") {
            Self::Png
        } else if lower.contains("webp") {
            Self::WebP
        } else {
            Self::Jpeg
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Jpeg => "image/jpeg",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Jpeg => "jpg",
        }
    }
}

/// Read the natural size of an encoded image without decoding pixels.
pub fn image_dimensions(bytes: &[u8]) -> Result<ImageSize> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()?;
    Ok(ImageSize::new(width, height))
}

/// Output name for a cropped file: the picked name minus a known image
/// extension, plus `_cropped.{ext}`.
pub fn cropped_file_name(original: &str, extension: &str) -> String {
    let stem = match original.rsplit_once('.') {
        Some((stem, ext))
            if STRIPPED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known)) =>
        {
            stem
        }
        _ => original,
    };
    let stem = if stem.is_empty() { DEFAULT_STEM } else { stem };
    format!("{stem}_cropped.{extension}")
}

/// Size after shrinking so the longest edge is at most [`MAX_OUTPUT_EDGE`].
pub fn output_size(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= MAX_OUTPUT_EDGE {
        return (width, height);
    }
    let factor = f64::from(MAX_OUTPUT_EDGE) / f64::from(longest);
    let scaled = |v: u32| ((f64::from(v) * factor).round() as u32).max(1);
    (scaled(width), scaled(height))
}

fn encode(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match format {
        OutputFormat::Png => image.write_to(&mut out, ImageFormat::Png)?,
        OutputFormat::WebP => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_to(&mut out, ImageFormat::WebP)?,
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
        }
    }
    Ok(out.into_inner())
}

/// Crop the picked image to `rect` and re-encode it.
///
/// The rectangle is clamped to the decoded image. Output keeps PNG and WebP
/// inputs in their format; everything else becomes JPEG.
pub fn extract_crop(file: &PickedFile, rect: CropRect) -> Result<CroppedFile> {
    if rect.is_empty() {
        return Err(Error::EmptyCrop);
    }

    let decoded = image::load_from_memory(&file.bytes)?;
    let left = rect.left.min(decoded.width().saturating_sub(1));
    let top = rect.top.min(decoded.height().saturating_sub(1));
    let width = rect.width.min(decoded.width() - left);
    let height = rect.height.min(decoded.height() - top);
    if width == 0 || height == 0 {
        return Err(Error::EmptyCrop);
    }

    let mut cropped = decoded.crop_imm(left, top, width, height);
    let (out_w, out_h) = output_size(width, height);
    if (out_w, out_h) != (width, height) {
        cropped = cropped.resize_exact(out_w, out_h, FilterType::Lanczos3);
    }

    let format = if file.content_type.to_ascii_lowercase().starts_with("image/") {
        OutputFormat::for_content_type(&file.content_type)
    } else {
        OutputFormat::Jpeg
    };

    Ok(CroppedFile {
        name: cropped_file_name(&file.name, format.extension()),
        content_type: format.content_type().to_string(),
        bytes: encode(&cropped, format)?,
        width: out_w,
        height: out_h,
    })
}
