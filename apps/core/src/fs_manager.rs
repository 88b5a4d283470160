use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

/// Resolves the application's portable directory tree relative to the
/// executable, with a current-dir fallback when the executable path is
/// unavailable.
pub struct PortablePathManager;

impl PortablePathManager {
    /// Root directory of the application (where the executable lives).
    pub fn root_dir() -> PathBuf {
        #[cfg(debug_assertions)]
        {
            // In development the executable sits in target/debug at the
            // workspace root; point at apps/core instead.
            let mut path = std::env::current_exe().expect("Failed to get current exe");
            path.pop(); // remove exe name
            path.pop(); // remove debug
            path.pop(); // remove target

            let core_path = path.join("apps").join("core");
            if core_path.exists() {
                return core_path;
            }

            return path;
        }

        #[cfg(not(debug_assertions))]
        match std::env::current_exe() {
            Ok(mut path) => {
                path.pop();
                path
            }
            Err(e) => {
                error!(
                    "Failed to get current exe path: {}. Falling back to current_dir.",
                    e
                );
                std::env::current_dir().expect("Failed to get current directory")
            }
        }
    }

    /// Main data directory (./data).
    pub fn data_dir() -> PathBuf {
        Self::root_dir().join("data")
    }

    /// Model cache directory (./data/models) used as the hf-hub cache.
    pub fn models_dir() -> PathBuf {
        Self::data_dir().join("models")
    }

    /// Result files directory (./output).
    pub fn output_dir() -> PathBuf {
        Self::root_dir().join("output")
    }

    /// Log files directory (./logs).
    pub fn logs_dir() -> PathBuf {
        Self::root_dir().join("logs")
    }

    /// Creates the data, models, output and logs directories if missing.
    pub fn init() -> Result<(), std::io::Error> {
        for dir in [
            Self::data_dir(),
            Self::models_dir(),
            Self::output_dir(),
            Self::logs_dir(),
        ] {
            if !dir.exists() {
                info!("Creating directory: {:?}", dir);
                fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}
