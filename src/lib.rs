// boxtrain - bounding-box annotation store and PLM fine-tuning launcher
// Library exports

pub mod annotations; // Per-image annotation files
pub mod config;
pub mod errors;
pub mod images; // Image listing and preview decoding
pub mod models; // Base checkpoint discovery
pub mod session; // Current image + in-memory annotations
pub mod training; // Dataset staging and trainer supervision
