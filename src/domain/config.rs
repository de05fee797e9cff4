use crate::core::device::DeviceOptions;
use crate::core::protocol::{Address, DeviceFamily};
use crate::core::session::Timeouts;
use crate::domain::error::{FluidComError, FluidComResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// FluidCom configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FluidComConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Device configurations
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Deadline for link probes and busy checks
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,
    /// Deadline for any blocking reply wait
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_ms: u64,
    /// Sleep between link polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// A device on a serial port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name
    pub name: String,
    /// Device description
    #[serde(default)]
    pub description: String,
    /// Serial port path
    pub port: String,
    /// Fixed baud rate; probed when absent
    #[serde(default)]
    pub baud_rate: Option<u32>,
    /// Bus address (0-127)
    #[serde(default = "default_address")]
    pub address: u8,
    pub family: DeviceFamily,
    /// Number of valve ports
    #[serde(default)]
    pub port_count: Option<u16>,
    /// Full plunger travel in steps; family default when absent
    #[serde(default)]
    pub max_plunger_steps: Option<u16>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_query_timeout() -> u64 {
    250
}

fn default_reply_timeout() -> u64 {
    30_000
}

fn default_poll_interval() -> u64 {
    5
}

fn default_address() -> u8 {
    0x31
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            query_timeout_ms: default_query_timeout(),
            reply_timeout_ms: default_reply_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl GlobalConfig {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            query: Duration::from_millis(self.query_timeout_ms),
            reply: Duration::from_millis(self.reply_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

impl DeviceConfig {
    pub fn address(&self) -> FluidComResult<Address> {
        Address::new(self.address)
    }

    pub fn options(&self) -> DeviceOptions {
        let mut options = DeviceOptions::for_family(self.family);
        options.port_count = self.port_count;
        if let Some(steps) = self.max_plunger_steps {
            options.max_plunger_steps = steps;
        }
        options
    }
}

impl FluidComConfig {
    pub fn device(&self, name: &str) -> FluidComResult<&DeviceConfig> {
        self.devices
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| FluidComError::Config {
                message: format!("Device '{}' not found in configuration", name),
            })
    }

    /// Check values serde cannot: address range, timeouts, unique names.
    pub fn validate(&self) -> FluidComResult<()> {
        if self.global.query_timeout_ms == 0 || self.global.reply_timeout_ms == 0 {
            return Err(FluidComError::Config {
                message: "Timeouts must be greater than zero".to_string(),
            });
        }
        if self.global.poll_interval_ms == 0 {
            return Err(FluidComError::Config {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.global.query_timeout_ms > self.global.reply_timeout_ms {
            return Err(FluidComError::Config {
                message: "query_timeout_ms must not exceed reply_timeout_ms".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.name.as_str()) {
                return Err(FluidComError::Config {
                    message: format!("Duplicate device name '{}'", device.name),
                });
            }
            device.address().map_err(|e| FluidComError::Config {
                message: format!("Device '{}': {}", device.name, e),
            })?;
            if device.port_count == Some(0) {
                return Err(FluidComError::Config {
                    message: format!("Device '{}': port_count must be at least 1", device.name),
                });
            }
        }
        Ok(())
    }
}
