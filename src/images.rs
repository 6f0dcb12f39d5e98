// Image directory listing and preview decoding

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb32FImage, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions shown in the annotator (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "ntf", "nitf"];

/// Satellite-imagery container extensions
const NITF_EXTENSIONS: &[&str] = &["ntf", "nitf"];

/// Errors from the preview decoder
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// Container format with no linked reader
    #[error("No reader available for {}", .0.display())]
    UnsupportedContainer(PathBuf),

    /// Decoder rejected the file
    #[error("Failed to decode {}: {}", .path.display(), .source)]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    /// Pixel buffer did not match the reported dimensions
    #[error("Pixel buffer size mismatch ({width}x{height})")]
    BufferSize { width: u32, height: u32 },
}

/// Directory beside `image_dir` (under its parent)
///
/// A bare relative name like `images` has an empty parent; that resolves to
/// the current directory.
pub fn sibling_dir(image_dir: &Path, name: &str) -> PathBuf {
    image_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(name)
}

/// True if the file name carries one of [`IMAGE_EXTENSIONS`]
pub fn is_supported_image(path: impl AsRef<Path>) -> bool {
    has_extension(path.as_ref(), IMAGE_EXTENSIONS)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        })
        .unwrap_or(false)
}

/// Supported image file names in `dir`, sorted by name
///
/// Both navigation and dataset preparation use this listing, so manifest
/// order matches what the user stepped through.
pub fn list_images(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read image directory {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 file name");
            continue;
        };
        if is_supported_image(&name) {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// Decode an image for display as 8-bit RGB
///
/// High-bit-depth and float rasters are max-normalized; NITF containers are
/// rejected.
pub fn open_rgb(path: &Path) -> Result<RgbImage, PreviewError> {
    if has_extension(path, NITF_EXTENSIONS) {
        return Err(PreviewError::UnsupportedContainer(path.to_path_buf()));
    }

    let img = image::open(path).map_err(|source| PreviewError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    to_display_rgb(&img)
}

/// Convert any decoded image to 8-bit RGB
pub fn to_display_rgb(img: &DynamicImage) -> Result<RgbImage, PreviewError> {
    match img {
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_)
        | DynamicImage::ImageRgb32F(_)
        | DynamicImage::ImageRgba32F(_) => max_normalize(&img.to_rgb32f()),
        _ => Ok(img.to_rgb8()),
    }
}

/// Scale every sample by `255 / max` and truncate to `u8`
///
/// An all-zero image stays black.
pub fn max_normalize(buffer: &Rgb32FImage) -> Result<RgbImage, PreviewError> {
    let max = buffer.as_raw().iter().copied().fold(0.0f32, f32::max);
    let (width, height) = buffer.dimensions();

    let data = buffer
        .as_raw()
        .iter()
        .map(|&v| {
            if max > 0.0 {
                (v / max * 255.0).clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect::<Vec<u8>>();

    RgbImage::from_raw(width, height, data).ok_or(PreviewError::BufferSize { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};
    use tempfile::TempDir;

    #[test]
    fn test_sibling_dir() {
        assert_eq!(
            sibling_dir(Path::new("/data/set1/images"), "annotations"),
            PathBuf::from("/data/set1/annotations")
        );
        assert_eq!(
            sibling_dir(Path::new("images"), "plm_data"),
            PathBuf::from("./plm_data")
        );
    }

    #[test]
    fn test_list_images_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt", "c.nitf", "d.jpeg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let names = list_images(dir.path()).unwrap();
        assert_eq!(names, vec!["a.PNG", "b.jpg", "c.nitf", "d.jpeg"]);
    }

    #[test]
    fn test_nitf_is_unsupported() {
        let err = open_rgb(Path::new("/tmp/scene.NTF")).unwrap_err();
        assert!(matches!(err, PreviewError::UnsupportedContainer(_)));
    }

    #[test]
    fn test_sixteen_bit_is_max_normalized() {
        let mut buf: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(2, 1);
        buf.put_pixel(0, 0, Luma([1000]));
        buf.put_pixel(1, 0, Luma([500]));

        let rgb = to_display_rgb(&DynamicImage::ImageLuma16(buf)).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0).0[0], 127);
    }

    #[test]
    fn test_black_image_stays_black() {
        let buf = Rgb32FImage::new(3, 3);
        let rgb = max_normalize(&buf).unwrap();
        assert!(rgb.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_open_rgb_reads_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.png");
        RgbImage::from_pixel(4, 2, Rgb([10, 20, 30])).save(&path).unwrap();

        let rgb = open_rgb(&path).unwrap();
        assert_eq!(rgb.dimensions(), (4, 2));
        assert_eq!(rgb.get_pixel(3, 1), &Rgb([10, 20, 30]));
    }
}
