use crate::core::protocol::DeviceFamily;
use crate::domain::config::{DeviceConfig, FluidComConfig, GlobalConfig};
use crate::domain::error::{FluidComError, FluidComResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> FluidComResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Manager over explicit paths, bypassing discovery.
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> FluidComResult<FluidComConfig> {
        // Start with default configuration
        let mut config = FluidComConfig::default();

        if self.global_config_path.exists() {
            let global_config = self.load_config_from_path(&self.global_config_path)?;
            config.global = global_config.global;
            config.devices.extend(global_config.devices);
        }

        // Project devices replace global ones with the same name
        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                let project_config = self.load_config_from_path(project_path)?;
                for device in project_config.devices {
                    config.devices.retain(|d| d.name != device.name);
                    config.devices.push(device);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> FluidComResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| FluidComError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("fluidcom").join("config.toml"))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(".fluidcom").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> FluidComResult<FluidComConfig> {
        let content = fs::read_to_string(path).map_err(|e| FluidComError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| FluidComError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &FluidComConfig) -> FluidComResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| FluidComError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| FluidComError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration
    pub fn init_project_config(&self, path: &Path) -> FluidComResult<PathBuf> {
        let config_dir = path.join(".fluidcom");
        let config_file = config_dir.join("config.toml");

        if config_file.exists() {
            return Err(FluidComError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| FluidComError::Config {
            message: format!("Failed to create .fluidcom directory: {}", e),
        })?;

        let default_config = FluidComConfig {
            global: GlobalConfig::default(),
            devices: vec![
                DeviceConfig {
                    name: "selector".to_string(),
                    description: "Example rotary selector valve".to_string(),
                    port: "/dev/ttyUSB0".to_string(),
                    baud_rate: Some(9600),
                    address: 0x31,
                    family: DeviceFamily::RotaryValve,
                    port_count: Some(10),
                    max_plunger_steps: None,
                },
                DeviceConfig {
                    name: "pump".to_string(),
                    description: "Example syringe pump with integrated valve".to_string(),
                    port: "/dev/ttyUSB1".to_string(),
                    baud_rate: None,
                    address: 0x31,
                    family: DeviceFamily::MultichannelSyringePump,
                    port_count: Some(9),
                    max_plunger_steps: Some(6000),
                },
            ],
        };

        self.save_config_to_path(&config_file, &default_config)?;

        Ok(config_file)
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}
