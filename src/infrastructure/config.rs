use crate::domain::config::ConfigRecord;
use crate::domain::error::{ProvisionError, ProvisionResult};
use crate::domain::settings::ProvisionerSettings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Location of the device configuration file
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Store for `file_name` in the directory holding the running executable
    pub fn beside_executable(file_name: &str) -> ProvisionResult<Self> {
        let exe = std::env::current_exe().map_err(|e| ProvisionError::Config {
            message: format!("Could not determine executable location: {}", e),
        })?;
        let dir = exe.parent().ok_or_else(|| ProvisionError::Config {
            message: format!("Executable {} has no parent directory", exe.display()),
        })?;

        Ok(Self::new(dir.join(file_name)))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration record. A missing file is replaced by the
    /// default template and reported as `TemplateCreated`.
    pub fn load_record(&self) -> ProvisionResult<ConfigRecord> {
        if !self.config_path.exists() {
            info!("Config file {} missing, writing template", self.config_path.display());
            self.write_template()?;
            return Err(ProvisionError::TemplateCreated {
                path: self.config_path.clone(),
            });
        }

        let content = fs::read_to_string(&self.config_path).map_err(|e| ProvisionError::Config {
            message: format!("Failed to read config file {}: {}", self.config_path.display(), e),
        })?;

        ConfigRecord::from_json_str(&content).map_err(|e| match e {
            ProvisionError::Config { message } => ProvisionError::Config {
                message: format!("{}: {}", self.config_path.display(), message),
            },
            other => other,
        })
    }

    /// Write the default template, creating parent directories as needed
    pub fn write_template(&self) -> ProvisionResult<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ProvisionError::Config {
                    message: format!("Failed to create config directory: {}", e),
                })?;
            }
        }

        let content = ConfigRecord::template().to_pretty_json()?;
        fs::write(&self.config_path, content).map_err(|e| ProvisionError::Config {
            message: format!("Failed to write config file {}: {}", self.config_path.display(), e),
        })
    }
}

/// Tool settings loader
pub struct SettingsManager {
    global_settings_path: Option<PathBuf>,
}

impl SettingsManager {
    pub fn new() -> Self {
        Self {
            global_settings_path: Self::get_global_settings_path(),
        }
    }

    fn get_global_settings_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| {
            home.join(".config")
                .join("bitswitch-config")
                .join("settings.toml")
        })
    }

    /// Settings from `explicit` (which must exist), else from the global
    /// file if present, else defaults
    pub fn load(&self, explicit: Option<&Path>) -> ProvisionResult<ProvisionerSettings> {
        if let Some(path) = explicit {
            return self.load_from_path(path);
        }

        match &self.global_settings_path {
            Some(path) if path.exists() => self.load_from_path(path),
            _ => {
                debug!("No settings file, using defaults");
                Ok(ProvisionerSettings::default())
            }
        }
    }

    pub fn load_from_path(&self, path: &Path) -> ProvisionResult<ProvisionerSettings> {
        let content = fs::read_to_string(path).map_err(|e| ProvisionError::Config {
            message: format!("Failed to read settings file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| ProvisionError::Config {
            message: format!("Failed to parse settings file {}: {}", path.display(), e),
        })
    }
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{keys, PLACEHOLDER_DEVICE_STRING};
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_creates_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config_local.json");
        let store = ConfigStore::new(&path);

        let result = store.load_record();
        assert!(matches!(result, Err(ProvisionError::TemplateCreated { .. })));
        assert!(path.exists());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(PLACEHOLDER_DEVICE_STRING));

        // Second load reads the template back
        let record = store.load_record().unwrap();
        assert_eq!(record.get(keys::DEVICE_STRING), PLACEHOLDER_DEVICE_STRING);
    }

    #[test]
    fn test_template_written_into_new_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("device.json");
        ConfigStore::new(&path).write_template().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config_local.json");
        fs::write(&path, "{ \"config_ssid\": ").unwrap();

        match ConfigStore::new(&path).load_record() {
            Err(ProvisionError::Config { message }) => assert!(message.contains("config_local.json")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_settings_from_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        fs::write(&path, "[serial]\nbaud_rate = 9600\n").unwrap();

        let settings = SettingsManager::new().load(Some(&path)).unwrap();
        assert_eq!(settings.serial.baud_rate, 9600);
        assert!(settings.protocol.mode_detection);
    }

    #[test]
    fn test_missing_explicit_settings_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        let result = SettingsManager::new().load(Some(&path));
        assert!(matches!(result, Err(ProvisionError::Config { .. })));
    }
}
