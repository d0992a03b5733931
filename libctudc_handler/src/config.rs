use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ConfigError;

const CTUDC_DIR: &str = "ctudc";
const NEVOD_DIR: &str = "nevod";
const DECOR_ALL_FILE: &str = "decor.dat";
const DECOR_STRICT_FILE: &str = "decor_shsh.dat";
const CHAMBER_CONFIG_FILE: &str = "chambers.conf.new";

/// Structure representing the application configuration. Contains pathing and run information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one `run_NNNNN` directory per run
    pub ctudc_root: PathBuf,
    /// Directory receiving the analysis tables
    pub output_path: PathBuf,
    /// Chamber calibration used for every run instead of the run's own
    pub chamber_config: Option<PathBuf>,
    pub first_run_number: u32,
    pub last_run_number: u32,
    pub n_threads: i32,
    /// Drop CTUDC events without a NEVOD partner when merging
    pub require_nevod: bool,
}

impl Default for Config {
    /// Generate a new Config object. All fields will be empty/invalid
    fn default() -> Self {
        Self {
            ctudc_root: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            chamber_config: None,
            first_run_number: 0,
            last_run_number: 0,
            n_threads: 1,
            require_nevod: false,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration as YAML
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        std::fs::write(config_path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Check if a specific run exists by evaluating the existance of its CTUDC data
    pub fn does_run_exist(&self, run_number: u32) -> bool {
        self.ctudc_root
            .join(self.get_run_str(run_number))
            .join(CTUDC_DIR)
            .exists()
    }

    /// Get the path to a run directory
    pub fn get_run_directory(&self, run_number: u32) -> Result<PathBuf, ConfigError> {
        let run_dir = self.ctudc_root.join(self.get_run_str(run_number));
        if run_dir.exists() {
            Ok(run_dir)
        } else {
            Err(ConfigError::BadFilePath(run_dir))
        }
    }

    /// Get the path to the CTUDC .tds files of a run
    pub fn get_ctudc_directory(&self, run_number: u32) -> Result<PathBuf, ConfigError> {
        let ctudc_dir = self.get_run_directory(run_number)?.join(CTUDC_DIR);
        if ctudc_dir.exists() {
            Ok(ctudc_dir)
        } else {
            Err(ConfigError::BadFilePath(ctudc_dir))
        }
    }

    /// Get the path to the NEVOD directory of a run. NEVOD data is optional, so a
    /// missing directory is not an error.
    pub fn get_nevod_directory(&self, run_number: u32) -> Result<Option<PathBuf>, ConfigError> {
        let nevod_dir = self.get_run_directory(run_number)?.join(NEVOD_DIR);
        Ok(nevod_dir.exists().then_some(nevod_dir))
    }

    /// Get the paths to the full and the shower-shower DECOR track lists
    pub fn get_decor_paths(&self, run_number: u32) -> Result<(PathBuf, PathBuf), ConfigError> {
        let run_dir = self.get_run_directory(run_number)?;
        Ok((run_dir.join(DECOR_ALL_FILE), run_dir.join(DECOR_STRICT_FILE)))
    }

    /// Get the path to the correlated output file of a run
    pub fn get_ext_file_name(&self, run_number: u32) -> Result<PathBuf, ConfigError> {
        Ok(self
            .get_run_directory(run_number)?
            .join(format!("extctudc_{run_number:0>5}.tds")))
    }

    /// Get the path to the chamber calibration of a run
    pub fn get_chamber_config_path(&self, run_number: u32) -> Result<PathBuf, ConfigError> {
        let path = match &self.chamber_config {
            Some(path) => path.clone(),
            None => self.get_run_directory(run_number)?.join(CHAMBER_CONFIG_FILE),
        };
        if path.exists() {
            Ok(path)
        } else {
            Err(ConfigError::BadFilePath(path))
        }
    }

    /// Get the directory receiving the analysis tables of a run
    pub fn get_analysis_directory(&self, run_number: u32) -> Result<PathBuf, ConfigError> {
        if self.output_path.exists() {
            Ok(self.output_path.join(self.get_run_str(run_number)))
        } else {
            Err(ConfigError::BadFilePath(self.output_path.clone()))
        }
    }

    /// Construct the run string using the CTUDC DAQ format
    fn get_run_str(&self, run_number: u32) -> String {
        format!("run_{run_number:0>5}")
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }

    pub fn n_runs(&self) -> u32 {
        (self.last_run_number + 1).saturating_sub(self.first_run_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(name: &str) -> (PathBuf, Config) {
        let root = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("run_00042").join("ctudc")).unwrap();
        std::fs::create_dir_all(root.join("run_00043")).unwrap();
        let config = Config {
            ctudc_root: root.clone(),
            output_path: root.clone(),
            first_run_number: 42,
            last_run_number: 44,
            ..Default::default()
        };
        (root, config)
    }

    #[test]
    fn test_run_layout() {
        let (root, config) = layout("ctudc_handler_config_layout_test");
        let run_dir = root.join("run_00042");
        assert!(config.does_run_exist(42));
        assert!(!config.does_run_exist(43));
        assert!(!config.does_run_exist(44));
        assert_eq!(config.get_run_directory(42).unwrap(), run_dir);
        assert!(matches!(
            config.get_run_directory(44),
            Err(ConfigError::BadFilePath(_))
        ));
        assert_eq!(config.get_ctudc_directory(42).unwrap(), run_dir.join("ctudc"));
        assert!(config.get_ctudc_directory(43).is_err());
        assert_eq!(config.get_nevod_directory(42).unwrap(), None);
        assert_eq!(
            config.get_decor_paths(42).unwrap(),
            (run_dir.join("decor.dat"), run_dir.join("decor_shsh.dat"))
        );
        assert_eq!(
            config.get_ext_file_name(42).unwrap(),
            run_dir.join("extctudc_00042.tds")
        );
        assert_eq!(
            config.get_analysis_directory(42).unwrap(),
            root.join("run_00042")
        );
        assert_eq!(config.n_runs(), 3);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_chamber_config_override() {
        let (root, mut config) = layout("ctudc_handler_config_chamber_test");
        assert!(config.get_chamber_config_path(42).is_err());
        let run_config = root.join("run_00042").join("chambers.conf.new");
        std::fs::write(&run_config, "[]").unwrap();
        assert_eq!(config.get_chamber_config_path(42).unwrap(), run_config);

        let shared = root.join("shared.json");
        std::fs::write(&shared, "[]").unwrap();
        config.chamber_config = Some(shared.clone());
        assert_eq!(config.get_chamber_config_path(43).unwrap(), shared);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = std::env::temp_dir().join("ctudc_handler_config_yaml_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yml");
        assert!(matches!(
            Config::read_config_file(&path),
            Err(ConfigError::BadFilePath(_))
        ));
        let config = Config {
            chamber_config: Some(PathBuf::from("/data/chambers.json")),
            n_threads: 4,
            require_nevod: true,
            ..Default::default()
        };
        config.write_config_file(&path).unwrap();
        assert_eq!(Config::read_config_file(&path).unwrap(), config);

        std::fs::write(&path, "n_threads: [").unwrap();
        assert!(matches!(
            Config::read_config_file(&path),
            Err(ConfigError::ParsingError(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_thread_count() {
        let mut config = Config::default();
        assert!(config.is_n_threads_valid());
        config.n_threads = 0;
        assert!(!config.is_n_threads_valid());
    }
}
