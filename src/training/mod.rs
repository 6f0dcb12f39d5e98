// Training module - dataset staging, trainer config, registry patching and
// subprocess supervision

pub mod dataset;
pub mod events;
pub mod finetune;
pub mod launcher;
pub mod panel;
pub mod registry;
pub mod supervisor;

pub use dataset::{prepare, ManifestEntry, PreparedDataset};
pub use events::{channel, EventReceiver, EventSender, RunSummary, TrainingEvent, TrainingState};
pub use finetune::FinetuneConfig;
pub use launcher::TrainerInvocation;
pub use panel::TrainingPanel;
pub use registry::{RegistryEntry, RegistryPatch};
pub use supervisor::{launch_training, LaunchRequest};
