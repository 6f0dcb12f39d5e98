// Training dataset staging
//
// Turns an image directory plus its annotation files into the layout the
// trainer reads: `plm_data/images/*` and `plm_data/train.jsonl`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::annotations::{Annotation, AnnotationStore};
use crate::images::{self, sibling_dir};

/// Staging directory name (beside the image directory)
pub const STAGING_DIR_NAME: &str = "plm_data";
/// Manifest file name inside the staging directory
pub const MANIFEST_FILE_NAME: &str = "train.jsonl";
/// Copied images directory inside the staging directory
pub const STAGED_IMAGES_DIR_NAME: &str = "images";

/// Conversation speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Human,
    Assistant,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub from: Speaker,
    pub value: String,
}

/// One manifest line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub image: String,
    pub conversations: Vec<Turn>,
}

impl ManifestEntry {
    /// Question/answer pair for one annotated image
    pub fn new(image: impl Into<String>, question: &str, annotations: &[Annotation]) -> Self {
        Self {
            image: image.into(),
            conversations: vec![
                Turn {
                    from: Speaker::Human,
                    value: question.to_string(),
                },
                Turn {
                    from: Speaker::Assistant,
                    value: assistant_text(annotations),
                },
            ],
        }
    }
}

/// `"<label> at [x1, y1, x2, y2]\n"` for every annotation, concatenated
pub fn assistant_text(annotations: &[Annotation]) -> String {
    annotations
        .iter()
        .map(|ann| format!("{}\n", ann.describe()))
        .collect()
}

/// Result of [`prepare`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDataset {
    pub staging_dir: PathBuf,
    pub images_dir: PathBuf,
    pub manifest_path: PathBuf,
    /// Number of manifest lines written
    pub entries: usize,
}

/// `<parent of image_dir>/plm_data`
pub fn staging_dir_for(image_dir: &Path) -> PathBuf {
    sibling_dir(image_dir, STAGING_DIR_NAME)
}

/// Stage annotated images and write the manifest
///
/// Images are visited in sorted order, so re-running with unchanged inputs
/// rewrites an identical manifest. Images without an annotation file are
/// skipped. A failed copy aborts the whole preparation.
pub fn prepare(image_dir: &Path, question: &str) -> Result<PreparedDataset> {
    tracing::info!(dir = %image_dir.display(), "Preparing training data");

    let staging_dir = staging_dir_for(image_dir);
    let images_dir = staging_dir.join(STAGED_IMAGES_DIR_NAME);
    let manifest_path = staging_dir.join(MANIFEST_FILE_NAME);

    fs::create_dir_all(&images_dir)
        .with_context(|| format!("Failed to create directory {}", images_dir.display()))?;

    let store = AnnotationStore::for_image_dir(image_dir);
    let image_names = images::list_images(image_dir)?;

    let temp_path = manifest_path.with_extension("jsonl.tmp");
    let file = File::create(&temp_path)
        .with_context(|| format!("Failed to create {}", temp_path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut entries = 0;

    for name in &image_names {
        if !store.has_annotations(name) {
            tracing::debug!(image = %name, "No annotation file, skipping");
            continue;
        }

        let annotations = store.load(name)?;

        let source = image_dir.join(name);
        let destination = images_dir.join(name);
        fs::copy(&source, &destination).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                source.display(),
                destination.display()
            )
        })?;

        let entry = ManifestEntry::new(name.as_str(), question, &annotations);
        let json = serde_json::to_string(&entry).context("Failed to serialize manifest entry")?;
        writeln!(writer, "{}", json).context("Failed to write manifest entry")?;
        entries += 1;
    }

    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .and_then(|file| file.sync_all())
        .with_context(|| format!("Failed to flush {}", temp_path.display()))?;

    fs::rename(&temp_path, &manifest_path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            manifest_path.display()
        )
    })?;

    tracing::info!(
        entries = entries,
        manifest = %manifest_path.display(),
        "Training data preparation complete"
    );

    Ok(PreparedDataset {
        staging_dir,
        images_dir,
        manifest_path,
        entries,
    })
}

/// Read a manifest back (one entry per non-empty line)
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;

    let mut entries = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: ManifestEntry =
            serde_json::from_str(line).context("Failed to parse manifest entry")?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_text() {
        let anns = vec![
            Annotation::new(10, 10, 50, 50, "car"),
            Annotation::new(1, 2, 3, 4, "person"),
        ];
        assert_eq!(
            assistant_text(&anns),
            "car at [10, 10, 50, 50]\nperson at [1, 2, 3, 4]\n"
        );
        assert_eq!(assistant_text(&[]), "");
    }

    #[test]
    fn test_manifest_entry_shape() {
        let entry = ManifestEntry::new("a.jpg", "What?", &[Annotation::new(0, 0, 1, 1, "x")]);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"image":"a.jpg","conversations":[{"from":"human","value":"What?"},{"from":"assistant","value":"x at [0, 0, 1, 1]\n"}]}"#
        );
    }

    #[test]
    fn test_staging_dir_is_sibling() {
        assert_eq!(
            staging_dir_for(Path::new("/work/images")),
            PathBuf::from("/work/plm_data")
        );
    }
}
