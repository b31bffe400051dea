use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 500;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("no config or data directory available")]
    NoProjectDirs,
}

/// Settings file contents. Every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub store_path: Option<PathBuf>,
    pub save_debounce_ms: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub mouse: Option<bool>,
}

/// Resolved settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_path: PathBuf,
    pub save_debounce: Duration,
    pub log_file: PathBuf,
    pub mouse: bool,
}

impl Config {
    /// Reads the config file (or the default one) and applies an optional
    /// store override from the command line.
    pub fn load(config_path: Option<&Path>, store_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("", "", "tasklanes");
        Config::load_from(
            config_path,
            store_override,
            dirs.as_ref().map(|d| (d.config_dir(), d.data_dir())),
        )
    }

    /// `dirs` is the (config, data) directory pair, when the platform has one.
    pub fn load_from(
        config_path: Option<&Path>,
        store_override: Option<PathBuf>,
        dirs: Option<(&Path, &Path)>,
    ) -> Result<Self, ConfigError> {
        let mut file = match (config_path, dirs) {
            // An explicitly named config file has to exist.
            (Some(path), _) => ConfigFile::read(path)?,
            (None, Some((config_dir, _))) => {
                let path = config_dir.join("config.yml");
                if path.exists() {
                    ConfigFile::read(&path)?
                } else {
                    ConfigFile::default()
                }
            }
            (None, None) => ConfigFile::default(),
        };
        if let Some(store) = store_override {
            file.store_path = Some(store);
        }
        Config::resolve(file, dirs.map(|(_, data)| data))
    }

    /// Without a data directory the store path must be given, and the log
    /// goes next to the store.
    pub fn resolve(file: ConfigFile, data_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let store_path = match (file.store_path, data_dir) {
            (Some(path), _) => path,
            (None, Some(dir)) => dir.join("prefs.yml"),
            (None, None) => return Err(ConfigError::NoProjectDirs),
        };
        let log_file = match (file.log_file, data_dir) {
            (Some(path), _) => path,
            (None, Some(dir)) => dir.join("tasklanes.log"),
            (None, None) => store_path.with_file_name("tasklanes.log"),
        };
        Ok(Config {
            store_path,
            save_debounce: Duration::from_millis(
                file.save_debounce_ms.unwrap_or(DEFAULT_SAVE_DEBOUNCE_MS),
            ),
            log_file,
            mouse: file.mouse.unwrap_or(true),
        })
    }
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ConfigFile::parse(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(data: &str) -> Result<Self, serde_yaml::Error> {
        if data.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_live_under_data_dir() {
        let config = Config::resolve(ConfigFile::default(), Some(Path::new("/data"))).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/data/prefs.yml"));
        assert_eq!(config.log_file, PathBuf::from("/data/tasklanes.log"));
        assert_eq!(config.save_debounce, Duration::from_millis(500));
        assert!(config.mouse);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = ConfigFile::parse("store_path: /tmp/board.yml\nsave_debounce_ms: 50\nmouse: false\n")
            .unwrap();
        let config = Config::resolve(file, Some(Path::new("/data"))).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/board.yml"));
        assert_eq!(config.save_debounce, Duration::from_millis(50));
        assert!(!config.mouse);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ConfigFile::parse("colour: red\n").is_err());
    }

    #[test]
    fn empty_file_is_default() {
        assert!(ConfigFile::parse("").unwrap().store_path.is_none());
    }

    #[test]
    fn explicit_paths_need_no_project_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, "save_debounce_ms: 20\n").unwrap();
        let store = dir.path().join("board.yml");
        let config = Config::load_from(Some(&config_path), Some(store.clone()), None).unwrap();
        assert_eq!(config.store_path, store);
        assert_eq!(config.log_file, dir.path().join("tasklanes.log"));
        assert_eq!(config.save_debounce, Duration::from_millis(20));
    }

    #[test]
    fn missing_dirs_without_store_is_an_error() {
        let result = Config::load_from(None, None, None);
        assert!(matches!(result, Err(ConfigError::NoProjectDirs)));
    }

    #[test]
    fn store_override_beats_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, "store_path: /tmp/from-file.yml\n").unwrap();
        let config = Config::load_from(
            Some(&config_path),
            Some(PathBuf::from("/tmp/override.yml")),
            Some((dir.path(), Path::new("/data"))),
        )
        .unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/override.yml"));
        assert_eq!(config.log_file, PathBuf::from("/data/tasklanes.log"));
    }
}
