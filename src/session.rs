// Annotation session - the state behind the annotator window
//
// Holds the image listing, the current position, and the in-memory
// annotation list for the current image. Annotations are saved when
// navigating away and reloaded when navigating back.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::annotations::{Annotation, AnnotationStore};
use crate::images;

/// Session over one image directory
#[derive(Debug)]
pub struct AnnotationSession {
    image_dir: PathBuf,
    images: Vec<String>,
    current: Option<usize>,
    annotations: Vec<Annotation>,
    store: AnnotationStore,
}

impl AnnotationSession {
    /// Open a directory and select its first image (if any)
    pub fn open(image_dir: impl Into<PathBuf>) -> Result<Self> {
        let image_dir = image_dir.into();
        let images = images::list_images(&image_dir)?;
        let store = AnnotationStore::for_image_dir(&image_dir);

        let mut session = Self {
            image_dir,
            images,
            current: None,
            annotations: Vec::new(),
            store,
        };

        if !session.images.is_empty() {
            session.select(0)?;
        }

        tracing::info!(
            dir = %session.image_dir.display(),
            images = session.images.len(),
            "Opened image directory"
        );
        Ok(session)
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// File name of the current image
    pub fn current_image(&self) -> Option<&str> {
        self.current.map(|i| self.images[i].as_str())
    }

    /// Full path of the current image
    pub fn current_image_path(&self) -> Option<PathBuf> {
        self.current_image().map(|name| self.image_dir.join(name))
    }

    /// Annotations for the current image (unsaved edits included)
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Append a box to the current image
    ///
    /// Returns false (and does nothing) when the label is blank or no image
    /// is selected.
    pub fn add_annotation(&mut self, x1: i64, y1: i64, x2: i64, y2: i64, label: &str) -> bool {
        if self.current.is_none() || label.trim().is_empty() {
            return false;
        }
        self.annotations.push(Annotation::new(x1, y1, x2, y2, label));
        true
    }

    /// Persist the current list
    pub fn save(&self) -> Result<()> {
        if let Some(name) = self.current_image() {
            self.store.save(name, &self.annotations)?;
        }
        Ok(())
    }

    /// Move to the next image; false at the end of the list
    pub fn next(&mut self) -> Result<bool> {
        match self.current {
            Some(i) if i + 1 < self.images.len() => {
                self.save()?;
                self.select(i + 1)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Move to the previous image; false at the start of the list
    pub fn prev(&mut self) -> Result<bool> {
        match self.current {
            Some(i) if i > 0 => {
                self.save()?;
                self.select(i - 1)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Jump to an image by file name
    pub fn goto(&mut self, name: &str) -> Result<()> {
        let Some(index) = self.images.iter().position(|n| n == name) else {
            bail!("Image not found in {}: {}", self.image_dir.display(), name);
        };
        if self.current == Some(index) {
            return Ok(());
        }
        self.save()?;
        self.select(index)
    }

    /// Listbox lines: `"<i>: <label> [x1, y1, x2, y2]"`
    pub fn entries(&self) -> Vec<String> {
        self.annotations
            .iter()
            .enumerate()
            .map(|(i, ann)| format!("{}: {}", i, ann))
            .collect()
    }

    fn select(&mut self, index: usize) -> Result<()> {
        let name = &self.images[index];
        self.annotations = self
            .store
            .load(name)
            .with_context(|| format!("Failed to load annotations for {}", name))?;
        self.current = Some(index);
        tracing::debug!(image = %name, count = self.annotations.len(), "Selected image");
        Ok(())
    }
}
