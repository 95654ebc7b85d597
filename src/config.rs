use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::cifar::Split;
use crate::convert::{ConvertOptions, IndexOverflow};
use crate::error::ZooError;

pub const DEFAULT_CONFIG_FILE: &str = "zoo.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub zoo_dir: Option<String>,
    #[serde(default)]
    pub convert: Option<ConvertSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConvertSection {
    #[serde(default)]
    pub split: Option<Split>,
    #[serde(default)]
    pub noise_rate: Option<f64>,
    #[serde(default)]
    pub index_overflow: Option<IndexOverflow>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub jpeg_quality: Option<u8>,
    #[serde(default)]
    pub write_label_files: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub zoo_dir: Option<Utf8PathBuf>,
    pub convert: ConvertOptions,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `zoo.json` in the working directory when no path is
    /// given. Only an implicit config file may be absent.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ZooError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ZooError::ConfigRead(config_path.clone()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|err| ZooError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ZooError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let zoo_dir = config
            .zoo_dir
            .map(|dir| dir.trim().to_string())
            .filter(|dir| !dir.is_empty())
            .map(Utf8PathBuf::from);

        let defaults = ConvertOptions::default();
        let section = config.convert.unwrap_or_default();
        let convert = ConvertOptions {
            split: section.split.unwrap_or(defaults.split),
            noise_rate: section.noise_rate.unwrap_or(defaults.noise_rate),
            index_overflow: section.index_overflow.unwrap_or(defaults.index_overflow),
            seed: section.seed.or(defaults.seed),
            jpeg_quality: section.jpeg_quality.unwrap_or(defaults.jpeg_quality),
            write_label_files: section
                .write_label_files
                .unwrap_or(defaults.write_label_files),
        };
        convert.validate()?;

        Ok(ResolvedConfig {
            schema_version,
            zoo_dir,
            convert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.zoo_dir, None);
        assert_eq!(resolved.convert, ConvertOptions::default());
    }
}
