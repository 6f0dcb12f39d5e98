// Annotation records and their per-image persistence

mod store;

pub use store::{AnnotationStore, ANNOTATIONS_DIR_NAME};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A labeled, axis-aligned box in image pixel coordinates
///
/// Serialized as `{"box": [x1, y1, x2, y2], "label": "..."}`. Corner order is
/// whatever the pointer gesture produced; `x2 >= x1` is not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "box")]
    pub bbox: [i64; 4],
    pub label: String,
}

impl Annotation {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64, label: impl Into<String>) -> Self {
        Self {
            bbox: [x1, y1, x2, y2],
            label: label.into(),
        }
    }

    /// `[x1, y1, x2, y2]`
    pub fn box_text(&self) -> String {
        let [x1, y1, x2, y2] = self.bbox;
        format!("[{}, {}, {}, {}]", x1, y1, x2, y2)
    }

    /// One line of assistant text: `"<label> at [x1, y1, x2, y2]"`
    pub fn describe(&self) -> String {
        format!("{} at {}", self.label, self.box_text())
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label, self.box_text())
    }
}
