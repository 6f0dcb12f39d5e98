// Per-image annotation files
//
// One JSON array per image, stored as `annotations/<image-stem>.json` next to
// the image directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::Annotation;
use crate::images::sibling_dir;

/// Name of the annotation directory beside the image directory
pub const ANNOTATIONS_DIR_NAME: &str = "annotations";

/// Reads and writes annotation files for one image directory
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    dir: PathBuf,
}

impl AnnotationStore {
    /// Store rooted at an explicit annotation directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store for images in `image_dir` (uses `<parent>/annotations`)
    pub fn for_image_dir(image_dir: &Path) -> Self {
        Self::new(sibling_dir(image_dir, ANNOTATIONS_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<stem>.json` for an image file name or path
    pub fn annotation_path(&self, image: impl AsRef<Path>) -> PathBuf {
        let stem = image
            .as_ref()
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        let mut file_name = stem;
        file_name.push(".json");
        self.dir.join(file_name)
    }

    /// True if an annotation file exists for this image (possibly empty)
    pub fn has_annotations(&self, image: impl AsRef<Path>) -> bool {
        self.annotation_path(image).is_file()
    }

    /// Load annotations for an image
    ///
    /// A missing file yields an empty list. Content is parsed as-is; malformed
    /// JSON is an error.
    pub fn load(&self, image: impl AsRef<Path>) -> Result<Vec<Annotation>> {
        let path = self.annotation_path(image);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let annotations: Vec<Annotation> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::debug!(path = %path.display(), count = annotations.len(), "Loaded annotations");
        Ok(annotations)
    }

    /// Save annotations for an image (atomic write)
    ///
    /// Overwrites unconditionally and creates the annotation directory if
    /// needed. An empty list still produces a file.
    pub fn save(&self, image: impl AsRef<Path>, annotations: &[Annotation]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {}", self.dir.display()))?;

        let path = self.annotation_path(image);
        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string(annotations).context("Failed to serialize annotations")?;

        fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write to {}", temp_path.display()))?;

        // Atomic rename
        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        tracing::debug!(path = %path.display(), count = annotations.len(), "Saved annotations");
        Ok(())
    }
}
