//! Thumbnail image pipeline
//!
//! Decoder selection by file extension, aspect-preserving downscale, and
//! pluggable encoding of the result. Decode and encode are CPU-bound and
//! run on blocking worker threads, never on the coordinator.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::Context;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tempfile::NamedTempFile;

use super::Dimensions;

/// A way to encode a finished thumbnail.
pub trait ThumbEncoder: Send + Sync + 'static {
    /// File extension of the encoded output, dot included.
    fn extension(&self) -> &'static str;
    fn encode(&self, thumb: &DynamicImage, dst: &mut dyn Write) -> image::ImageResult<()>;
}

/// Encodes thumbnails as baseline JPEG.
pub struct JpegEncoder {
    pub quality: u8,
}

impl ThumbEncoder for JpegEncoder {
    fn extension(&self) -> &'static str {
        ".jpg"
    }

    fn encode(&self, thumb: &DynamicImage, dst: &mut dyn Write) -> image::ImageResult<()> {
        let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(dst, self.quality);
        // JPEG has no alpha channel
        enc.encode_image(&thumb.to_rgb8())
    }
}

/// Decoder for the given extension, or `None` if the format is not one we
/// thumbnail. Case-insensitive.
pub fn decode_format(ext: &str) -> Option<ImageFormat> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        "gif" => Some(ImageFormat::Gif),
        "tif" | "tiff" => Some(ImageFormat::Tiff),
        "webp" => Some(ImageFormat::WebP),
        "bmp" => Some(ImageFormat::Bmp),
        _ => None,
    }
}

/// Decoder for the file at `path`, keyed on its extension.
pub fn format_for(path: &Path) -> Option<ImageFormat> {
    path.extension().and_then(|e| e.to_str()).and_then(decode_format)
}

/// Whether the file at `path` can be thumbnailed.
pub fn format_supported(path: &Path) -> bool {
    format_for(path).is_some()
}

/// Target dimensions for scaling `(w_src, h_src)` into the `(w_dest,
/// h_dest)` bounding box: the longer edge reaches its limit, the shorter
/// edge scales in proportion. Integer arithmetic throughout.
pub fn bounded_dimensions(w_dest: u32, h_dest: u32, w_src: u32, h_src: u32) -> (u32, u32) {
    if w_src > h_src {
        let h = u64::from(h_src) * u64::from(w_dest) / u64::from(w_src);
        (w_dest, h as u32)
    } else {
        let w = u64::from(w_src) * u64::from(h_dest) / u64::from(h_src);
        (w as u32, h_dest)
    }
}

/// Scale `src` to fit within `dims`, bilinear. Images already inside the
/// box pass through untouched.
pub fn produce_thumbnail(src: DynamicImage, dims: Dimensions) -> DynamicImage {
    let (w_src, h_src) = (src.width(), src.height());
    if w_src <= dims.w && h_src <= dims.h {
        return src;
    }
    let (w, h) = bounded_dimensions(dims.w, dims.h, w_src, h_src);
    src.resize_exact(w.max(1), h.max(1), FilterType::Triangle)
}

/// Decode `src`, scale it into `dims`, and encode the result at `dest`,
/// returning the encoded byte size. The output is staged through a temp
/// file in the destination directory so a crash never leaves a partial
/// rendition under a valid name.
pub fn generate(
    src: &Path,
    dest: &Path,
    format: ImageFormat,
    dims: Dimensions,
    enc: &dyn ThumbEncoder,
) -> anyhow::Result<u64> {
    let reader = File::open(src).with_context(|| format!("opening {}", src.display()))?;
    let img = image::load(BufReader::new(reader), format)
        .with_context(|| format!("decoding {}", src.display()))?;
    let thumb = produce_thumbnail(img, dims);

    let dir = dest.parent().context("rendition path has no parent")?;
    let mut tmp = NamedTempFile::new_in(dir).context("creating rendition temp file")?;
    enc.encode(&thumb, tmp.as_file_mut())
        .with_context(|| format!("encoding {} rendition", dims))?;
    tmp.as_file_mut().flush().context("writing rendition")?;
    tmp.persist(dest)
        .with_context(|| format!("renaming rendition to {}", dest.display()))?;

    let meta = std::fs::metadata(dest).context("statting rendition")?;
    Ok(meta.len())
}
