// Trainer command line
//
// `torchrun --nproc-per-node 1 -m apps.plm.train config=<path>`, run from the
// trainer repository root.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, PipeWriter};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::config::TrainingSettings;

/// Fully resolved trainer invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainerInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
}

impl TrainerInvocation {
    pub fn new(settings: &TrainingSettings, trainer_root: &Path, config_path: &Path) -> Self {
        let mut config_arg = OsString::from("config=");
        config_arg.push(config_path.as_os_str());

        Self {
            program: settings.launcher.clone(),
            args: vec![
                "--nproc-per-node".into(),
                settings.nproc_per_node.to_string().into(),
                "-m".into(),
                settings.train_module.clone().into(),
                config_arg,
            ],
            working_dir: trainer_root.to_path_buf(),
        }
    }

    /// Command writing stdout and stderr into the same pipe, so lines keep
    /// the order the trainer emitted them. The child is killed if the
    /// supervising future is dropped.
    pub fn command(&self, output: PipeWriter) -> io::Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(output.try_clone()?))
            .stderr(Stdio::from(output))
            .kill_on_drop(true);
        Ok(cmd)
    }
}

impl fmt::Display for TrainerInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_invocation() {
        let inv = TrainerInvocation::new(
            &TrainingSettings::default(),
            Path::new("/opt/perception_models"),
            Path::new("/work/plm_data/finetune_config.yaml"),
        );

        assert_eq!(inv.program, PathBuf::from("torchrun"));
        assert_eq!(inv.working_dir, PathBuf::from("/opt/perception_models"));
        assert_eq!(
            inv.to_string(),
            "torchrun --nproc-per-node 1 -m apps.plm.train config=/work/plm_data/finetune_config.yaml"
        );
    }

    #[test]
    fn test_command_uses_trainer_root() {
        let inv = TrainerInvocation::new(
            &TrainingSettings::default(),
            Path::new("/opt/perception_models"),
            Path::new("/work/finetune_config.yaml"),
        );
        let (_reader, writer) = io::pipe().unwrap();
        let cmd = inv.command(writer).unwrap();

        assert_eq!(
            cmd.as_std().get_current_dir(),
            Some(Path::new("/opt/perception_models"))
        );
        assert_eq!(cmd.as_std().get_args().count(), 5);
    }
}
