// Integration test: staging annotated images into a training dataset
//
// Covers the manifest contents, skipping unannotated images, and
// byte-identical reruns.

use anyhow::Result;
use boxtrain::annotations::{Annotation, AnnotationStore};
use boxtrain::session::AnnotationSession;
use boxtrain::training::dataset::{read_manifest, Speaker};
use boxtrain::training::prepare;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const QUESTION: &str = "What objects are in this image?";

fn image_dir(root: &TempDir, names: &[&str]) -> PathBuf {
    let dir = root.path().join("images");
    fs::create_dir_all(&dir).unwrap();
    for name in names {
        fs::write(dir.join(name), format!("pixels of {}", name)).unwrap();
    }
    dir
}

#[test]
fn test_only_annotated_images_are_staged() -> Result<()> {
    let root = TempDir::new()?;
    let images = image_dir(&root, &["a.jpg", "b.jpg"]);
    let store = AnnotationStore::for_image_dir(&images);
    store.save("a.jpg", &[Annotation::new(10, 10, 50, 50, "car")])?;

    let dataset = prepare(&images, QUESTION)?;

    assert_eq!(dataset.staging_dir, root.path().join("plm_data"));
    assert_eq!(dataset.entries, 1);

    let manifest = fs::read_to_string(&dataset.manifest_path)?;
    assert_eq!(manifest.lines().count(), 1);

    let entries = read_manifest(&dataset.manifest_path)?;
    assert_eq!(entries[0].image, "a.jpg");
    assert_eq!(entries[0].conversations.len(), 2);
    assert_eq!(entries[0].conversations[0].from, Speaker::Human);
    assert_eq!(entries[0].conversations[0].value, QUESTION);
    assert_eq!(entries[0].conversations[1].from, Speaker::Assistant);
    assert_eq!(entries[0].conversations[1].value, "car at [10, 10, 50, 50]\n");

    assert!(dataset.images_dir.join("a.jpg").is_file());
    assert!(!dataset.images_dir.join("b.jpg").exists());
    assert_eq!(
        fs::read(dataset.images_dir.join("a.jpg"))?,
        fs::read(images.join("a.jpg"))?
    );
    Ok(())
}

#[test]
fn test_every_manifest_image_was_copied() -> Result<()> {
    let root = TempDir::new()?;
    let images = image_dir(&root, &["c.png", "a.jpg", "b.jpeg", "d.jpg"]);
    let store = AnnotationStore::for_image_dir(&images);
    store.save("c.png", &[Annotation::new(0, 0, 5, 5, "sign")])?;
    store.save("a.jpg", &[])?;
    store.save(
        "b.jpeg",
        &[
            Annotation::new(1, 1, 2, 2, "cat"),
            Annotation::new(3, 3, 4, 4, "dog"),
        ],
    )?;

    let dataset = prepare(&images, QUESTION)?;
    let entries = read_manifest(&dataset.manifest_path)?;

    let names: Vec<&str> = entries.iter().map(|e| e.image.as_str()).collect();
    assert_eq!(names, ["a.jpg", "b.jpeg", "c.png"]);
    for entry in &entries {
        assert!(dataset.images_dir.join(&entry.image).is_file());
    }

    // An empty annotation file still yields an entry with empty assistant text
    assert_eq!(entries[0].conversations[1].value, "");
    assert_eq!(
        entries[1].conversations[1].value,
        "cat at [1, 1, 2, 2]\ndog at [3, 3, 4, 4]\n"
    );
    Ok(())
}

#[test]
fn test_rerun_is_byte_identical() -> Result<()> {
    let root = TempDir::new()?;
    let images = image_dir(&root, &["z.jpg", "m.jpg", "a.jpg"]);
    let store = AnnotationStore::for_image_dir(&images);
    for name in ["z.jpg", "m.jpg", "a.jpg"] {
        store.save(name, &[Annotation::new(1, 2, 3, 4, name)])?;
    }

    let first = prepare(&images, QUESTION)?;
    let first_bytes = fs::read(&first.manifest_path)?;
    let second = prepare(&images, QUESTION)?;
    let second_bytes = fs::read(&second.manifest_path)?;

    assert_eq!(first, second);
    assert_eq!(first_bytes, second_bytes);
    Ok(())
}

#[test]
fn test_session_annotations_flow_into_manifest() -> Result<()> {
    let root = TempDir::new()?;
    let images = image_dir(&root, &["a.jpg", "b.jpg"]);

    let mut session = AnnotationSession::open(&images)?;
    session.add_annotation(10, 10, 50, 50, "car");
    session.next()?;
    session.add_annotation(0, 0, 9, 9, "bike");
    session.prev()?;
    assert_eq!(session.annotations(), [Annotation::new(10, 10, 50, 50, "car")]);

    let dataset = prepare(&images, QUESTION)?;
    let entries = read_manifest(&dataset.manifest_path)?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].conversations[1].value, "bike at [0, 0, 9, 9]\n");
    Ok(())
}

#[test]
fn test_malformed_annotation_aborts_prepare() {
    let root = TempDir::new().unwrap();
    let images = image_dir(&root, &["a.jpg"]);
    let store = AnnotationStore::for_image_dir(&images);
    fs::create_dir_all(store.dir()).unwrap();
    fs::write(store.annotation_path("a.jpg"), "[{\"box\": [1, 2]}]").unwrap();

    assert!(prepare(&images, QUESTION).is_err());
}
