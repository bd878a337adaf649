use rollcall_core::{DETECTOR_MODEL_FILE, RECOGNIZER_MODEL_FILE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "rollcall.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Runtime configuration: defaults, then an optional TOML file, then
/// `ROLLCALL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the data layout (TrainingImage/, StudentDetails/, ...).
    pub data_dir: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// A face matches when its distance is strictly below this.
    pub match_threshold: f32,
    /// Detector confidence during attendance.
    pub detection_threshold: f32,
    /// Detector confidence during registration; stricter so saved samples
    /// are clean faces.
    pub registration_threshold: f32,
    pub samples_per_student: usize,
    /// Pause between registration frames.
    pub sample_interval_ms: u64,
    /// Frames discarded when a capture starts (camera AGC/AE stabilization).
    pub warmup_frames: usize,
    /// Apply CLAHE to captured frames.
    pub enhance_contrast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            camera_device: "/dev/video0".to_string(),
            model_dir: default_model_dir(),
            match_threshold: 50.0,
            detection_threshold: 0.5,
            registration_threshold: 0.6,
            samples_per_student: 100,
            sample_interval_ms: 100,
            warmup_frames: 4,
            enhance_contrast: true,
        }
    }
}

impl Config {
    /// Load `path` (or `rollcall.toml` if it exists) over the defaults and
    /// apply environment overrides. An explicit path that cannot be read is
    /// an error; a missing default file is not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `ROLLCALL_*` variables. Values that do not parse
    /// are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ROLLCALL_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ROLLCALL_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        if let Some(v) = lookup("ROLLCALL_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        override_parsed(&lookup, "ROLLCALL_MATCH_THRESHOLD", &mut self.match_threshold);
        override_parsed(&lookup, "ROLLCALL_DETECTION_THRESHOLD", &mut self.detection_threshold);
        override_parsed(&lookup, "ROLLCALL_SAMPLES_PER_STUDENT", &mut self.samples_per_student);
        override_parsed(&lookup, "ROLLCALL_SAMPLE_INTERVAL_MS", &mut self.sample_interval_ms);
        override_parsed(&lookup, "ROLLCALL_WARMUP_FRAMES", &mut self.warmup_frames);
        if let Some(v) = lookup("ROLLCALL_ENHANCE_CONTRAST") {
            self.enhance_contrast = v != "0";
        }
    }

    /// Path to the SCRFD detection model.
    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(DETECTOR_MODEL_FILE)
    }

    /// Path to the ArcFace recognition model.
    pub fn recognizer_model_path(&self) -> PathBuf {
        self.model_dir.join(RECOGNIZER_MODEL_FILE)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// `$XDG_DATA_HOME/rollcall/models`, falling back to
/// `~/.local/share/rollcall/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
        .join("models")
}

fn override_parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    match lookup(key).map(|v| v.parse::<T>()) {
        Some(Ok(value)) => *slot = value,
        Some(Err(_)) => tracing::warn!(key, "ignoring unparsable override"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.camera_device, "/dev/video0");
        assert_eq!(config.match_threshold, 50.0);
        assert_eq!(config.samples_per_student, 100);
        assert_eq!(config.sample_interval(), Duration::from_millis(100));
        assert!(config.detector_model_path().ends_with("det_10g.onnx"));
        assert!(config.recognizer_model_path().ends_with("w600k_r50.onnx"));
    }

    #[test]
    fn test_file_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.toml");
        std::fs::write(&path, "data_dir = \"/srv/class\"\nmatch_threshold = 42.5\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/class"));
        assert_eq!(config.match_threshold, 42.5);
        assert_eq!(config.warmup_frames, 4);
    }

    #[test]
    fn test_bad_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.toml");
        std::fs::write(&path, "match_threshold = \"high\"\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load(Some(&dir.path().join("absent.toml"))),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("ROLLCALL_CAMERA_DEVICE", "/dev/video2"),
            ("ROLLCALL_MATCH_THRESHOLD", "35"),
            ("ROLLCALL_SAMPLES_PER_STUDENT", "many"),
            ("ROLLCALL_ENHANCE_CONTRAST", "0"),
        ]));
        assert_eq!(config.camera_device, "/dev/video2");
        assert_eq!(config.match_threshold, 35.0);
        assert_eq!(config.samples_per_student, 100);
        assert!(!config.enhance_contrast);
    }
}
