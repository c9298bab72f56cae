pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Prefix of the environment variables that fill unset config fields
pub const ENV_PREFIX: &str = "TENCENTCLOUD_CLOUD_CONTROLLER_MANAGER_";

/// Environment variable pointing directly at a config file
pub const CONFIG_PATH_ENV: &str = "LBSYNC_CONFIG_PATH";

const CONFIG_FILE_NAME: &str = "cloud.json";

/// Per-process cloud settings
///
/// Loaded once at startup and shared read-only afterwards. Every field is
/// required.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub region: String,
    pub vpc_id: String,
    #[serde(rename = "clb_name_prefix")]
    pub name_prefix: String,
    /// Tag key binding a load balancer to its owning Service uid
    pub tag_key: String,
    pub secret_id: String,
    pub secret_key: String,
    #[serde(rename = "cluster_route_table")]
    pub route_table: String,
}

impl fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudConfig")
            .field("region", &self.region)
            .field("vpc_id", &self.vpc_id)
            .field("name_prefix", &self.name_prefix)
            .field("tag_key", &self.tag_key)
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("route_table", &self.route_table)
            .finish()
    }
}

impl CloudConfig {
    /// Parse an optional JSON config blob, fill unset fields from the
    /// environment and validate the result.
    pub fn from_reader<R: Read>(reader: Option<R>) -> Result<Self> {
        let mut config = match reader {
            Some(mut reader) => {
                let mut content = String::new();
                reader.read_to_string(&mut content)?;
                if content.trim().is_empty() {
                    Self::default()
                } else {
                    serde_json::from_str(&content)?
                }
            }
            None => Self::default(),
        };

        config.fill_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from the resolved config file (see [`find_config_file`]), or from
    /// the environment alone when there is none.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match find_config_file(path) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading cloud config");
                Self::from_reader(Some(File::open(&path)?))
            }
            None => {
                tracing::debug!("no config file found, using environment only");
                Self::from_reader(None::<File>)
            }
        }
    }

    /// Fill every empty field from its environment variable
    pub fn fill_from_env(&mut self) {
        for (_, suffix, value) in self.fields_mut() {
            if value.is_empty() {
                if let Ok(from_env) = std::env::var(format!("{ENV_PREFIX}{suffix}")) {
                    *value = from_env;
                }
            }
        }
    }

    /// Fail closed on any field that is still blank
    pub fn validate(&self) -> Result<()> {
        for (field, suffix, value) in self.fields() {
            if value.trim().is_empty() {
                tracing::error!(field, "required cloud config field is empty");
                return Err(ConfigError::MissingField {
                    field,
                    env: format!("{ENV_PREFIX}{suffix}"),
                });
            }
        }
        Ok(())
    }

    fn fields(&self) -> [(&'static str, &'static str, &String); 7] {
        [
            ("region", "REGION", &self.region),
            ("vpc_id", "VPC_ID", &self.vpc_id),
            ("clb_name_prefix", "CLB_NAME_PREFIX", &self.name_prefix),
            ("tag_key", "CLB_TAG_KEY", &self.tag_key),
            ("secret_id", "SECRET_ID", &self.secret_id),
            ("secret_key", "SECRET_KEY", &self.secret_key),
            ("cluster_route_table", "CLUSTER_ROUTE_TABLE", &self.route_table),
        ]
    }

    fn fields_mut(&mut self) -> [(&'static str, &'static str, &mut String); 7] {
        [
            ("region", "REGION", &mut self.region),
            ("vpc_id", "VPC_ID", &mut self.vpc_id),
            ("clb_name_prefix", "CLB_NAME_PREFIX", &mut self.name_prefix),
            ("tag_key", "CLB_TAG_KEY", &mut self.tag_key),
            ("secret_id", "SECRET_ID", &mut self.secret_id),
            ("secret_key", "SECRET_KEY", &mut self.secret_key),
            (
                "cluster_route_table",
                "CLUSTER_ROUTE_TABLE",
                &mut self.route_table,
            ),
        ]
    }
}

/// lbsync directory under the user config dir
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("lbsync");
    Ok(config_dir)
}

/// Locate the config file
///
/// Search order:
/// 1. the explicitly given path
/// 2. environment variable `LBSYNC_CONFIG_PATH`
/// 3. `~/.config/lbsync/cloud.json`
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Some(path);
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join(CONFIG_FILE_NAME);
        if global_config.exists() {
            return Some(global_config);
        }
    }

    None
}
