//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use suspend_storage::{StateFile, DEFAULT_STATE_FILE_NAME};

use crate::error::CoreError;
use crate::Result;

const DEFAULT_APP_NAME: &str = "Suspend";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Private storage directory for this application
    pub data_dir: PathBuf,
    /// Name of the session snapshot inside `data_dir`
    pub state_file_name: String,
    /// Session key the root frame is registered under
    pub root_frame_key: String,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            state_file_name: DEFAULT_STATE_FILE_NAME.to_string(),
            root_frame_key: "AppFrame".to_string(),
        }
    }

    /// Configuration for a named application under the platform data directory
    pub fn for_app(app_name: &str) -> Self {
        Self::new(Self::app_data_dir(app_name))
    }

    pub fn app_data_dir(app_name: &str) -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join(app_name))
            .unwrap_or_else(|| PathBuf::from(format!(".{}", app_name.to_lowercase())))
    }

    pub fn state_file(&self) -> StateFile {
        StateFile::new(&self.data_dir, &self.state_file_name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.state_file_name.trim().is_empty() {
            return Err(CoreError::Config("state file name cannot be empty".to_string()));
        }
        if self.state_file_name.contains(['/', '\\']) {
            return Err(CoreError::Config(format!(
                "state file name must not contain a path separator: {}",
                self.state_file_name
            )));
        }
        if self.root_frame_key.trim().is_empty() {
            return Err(CoreError::Config("root frame key cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::for_app(DEFAULT_APP_NAME)
    }
}

// Local app data directory per platform
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
