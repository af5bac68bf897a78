//! Bridge configuration
//!
//! Three tiers, later ones winning:
//! 1. TOML file (`neurograsp.toml` or `NEUROGRASP_CONFIG_PATH`)
//! 2. `NEUROGRASP_*` environment variables
//! 3. CLI arguments
//!
//! Every field has a default, so a missing default file is not an error.
//!
//! ```toml
//! [session]
//! profile = "Arm-1"
//!
//! [actuator]
//! port = "/dev/ttyACM0"
//! max_attempts = 10
//!
//! [sensitivity]
//! level = 5
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use neurograsp_core::protocol::{DeviceCommand, BAUD_RATE, READ_TIMEOUT_MS, RETRY_DELAY_MS};
use neurograsp_core::sensitivity::{SensitivityPlan, DEFAULT_SENSITIVITY, MAX_SENSITIVITY, MIN_SENSITIVITY};
use neurograsp_core::translator::{CommandTranslator, DEFAULT_TARGET_ACTION};
use neurograsp_core::types::PowerThreshold;

use crate::bridge::{ActuatorWorker, RetryPolicy};
use crate::threshold::{FileThreshold, DEFAULT_THRESHOLD_FILE};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "neurograsp.toml";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "NEUROGRASP_CONFIG_PATH";

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Explicitly named file does not exist
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// File could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for this schema
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete bridge configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Streaming session
    pub session: SessionConfig,
    /// Serial actuator
    pub actuator: ActuatorConfig,
    /// Event to command mapping
    pub translator: TranslatorConfig,
    /// Power threshold exchange
    pub threshold: ThresholdConfig,
    /// Sensitivity written to the profile
    pub sensitivity: SensitivityConfig,
}

/// Session settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Profile to load or create
    pub profile: String,
    /// Headset id; the source picks one when unset
    pub device: Option<String>,
}

/// Serial actuator settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// Serial port name
    pub port: Option<String>,
    /// Baud rate
    pub baud_rate: u32,
    /// Per-attempt echo timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Pause between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Writes per command; 0 retries until confirmed
    pub max_attempts: u32,
    /// Depth of the actuator queue
    pub queue_capacity: usize,
    /// Send the reset handshake right after opening the port
    pub reset_on_connect: bool,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: BAUD_RATE,
            read_timeout_ms: READ_TIMEOUT_MS,
            retry_delay_ms: RETRY_DELAY_MS,
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            queue_capacity: ActuatorWorker::DEFAULT_CAPACITY,
            reset_on_connect: true,
        }
    }
}

impl ActuatorConfig {
    /// Per-attempt echo timeout.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Retry policy for confirmed sends.
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = if self.max_attempts == 0 {
            RetryPolicy::unbounded()
        } else {
            RetryPolicy::attempts(self.max_attempts)
        };
        policy.with_backoff(Duration::from_millis(self.retry_delay_ms))
    }
}

/// Translator settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Action that triggers the actuator
    pub target_action: String,
    /// Character sent on trigger
    pub action_code: char,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            target_action: DEFAULT_TARGET_ACTION.to_string(),
            action_code: '1',
        }
    }
}

impl TranslatorConfig {
    /// Build the translator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the action code is not a
    /// printable ASCII character.
    pub fn translator(&self) -> ConfigResult<CommandTranslator> {
        let code = u8::try_from(self.action_code)
            .map_err(|_| ConfigError::Invalid(format!("action_code {:?} is not ASCII", self.action_code)))?;
        let command = DeviceCommand::echoed(code).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(CommandTranslator::new(self.target_action.clone(), command))
    }
}

/// Threshold exchange settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// File shared with the tuning tool
    pub path: PathBuf,
    /// Value used when the file is unavailable
    pub fallback: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_THRESHOLD_FILE),
            fallback: PowerThreshold::DEFAULT.value(),
        }
    }
}

impl ThresholdConfig {
    /// Build the file-backed threshold source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the fallback is outside [0, 1].
    pub fn source(&self) -> ConfigResult<FileThreshold> {
        let fallback = PowerThreshold::new(self.fallback)
            .ok_or_else(|| ConfigError::Invalid(format!("threshold fallback {} outside 0..=1", self.fallback)))?;
        Ok(FileThreshold::new(self.path.clone(), fallback))
    }
}

/// Sensitivity settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Level applied to every active action
    pub level: u8,
    /// Explicit per-action values; overrides `level` when set
    pub values: Option<Vec<i32>>,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_SENSITIVITY,
            values: None,
        }
    }
}

impl SensitivityConfig {
    /// Plan for the session controller.
    pub fn plan(&self) -> SensitivityPlan {
        match &self.values {
            Some(values) => SensitivityPlan::Explicit(values.clone()),
            None => SensitivityPlan::Uniform(self.level),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Find the configuration file.
///
/// Search order:
/// 1. `NEUROGRASP_CONFIG_PATH`
/// 2. `./neurograsp.toml`
///
/// Returns `Ok(None)` when no file exists at the default location.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if `NEUROGRASP_CONFIG_PATH` names a
/// missing file.
pub fn find_config_file() -> ConfigResult<Option<PathBuf>> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::FileNotFound(format!(
            "{} set by {} does not exist",
            path.display(),
            CONFIG_PATH_ENV
        )));
    }

    let local = env::current_dir()?.join(CONFIG_FILE_NAME);
    Ok(local.exists().then_some(local))
}

/// Load configuration with all overrides applied.
///
/// # Arguments
///
/// * `config_path` - Explicit file; searched for when `None`
/// * `cli_args` - CLI overrides keyed by field name
///
/// # Errors
///
/// Returns an error if a named file is missing, the TOML is invalid, or the
/// result fails [`validate`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BridgeConfig> {
    let config_file = match config_path {
        Some(path) if !path.exists() => {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file()?,
    };

    let mut config = match config_file {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            toml::from_str(&fs::read_to_string(&path)?)?
        }
        None => BridgeConfig::default(),
    };

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate(&config)?;
    Ok(config)
}

/// Apply environment variable overrides.
///
/// - `NEUROGRASP_PROFILE` -> `session.profile`
/// - `NEUROGRASP_DEVICE` -> `session.device`
/// - `NEUROGRASP_PORT` -> `actuator.port`
/// - `NEUROGRASP_BAUD_RATE` -> `actuator.baud_rate`
/// - `NEUROGRASP_TARGET_ACTION` -> `translator.target_action`
/// - `NEUROGRASP_THRESHOLD_FILE` -> `threshold.path`
/// - `NEUROGRASP_SENSITIVITY` -> `sensitivity.level`
pub fn apply_environment_overrides(config: &mut BridgeConfig) {
    if let Ok(value) = env::var("NEUROGRASP_PROFILE") {
        config.session.profile = value;
    }
    if let Ok(value) = env::var("NEUROGRASP_DEVICE") {
        config.session.device = Some(value);
    }
    if let Ok(value) = env::var("NEUROGRASP_PORT") {
        config.actuator.port = Some(value);
    }
    if let Ok(value) = env::var("NEUROGRASP_BAUD_RATE") {
        if let Ok(baud) = value.parse::<u32>() {
            config.actuator.baud_rate = baud;
        }
    }
    if let Ok(value) = env::var("NEUROGRASP_TARGET_ACTION") {
        config.translator.target_action = value;
    }
    if let Ok(value) = env::var("NEUROGRASP_THRESHOLD_FILE") {
        config.threshold.path = PathBuf::from(value);
    }
    if let Ok(value) = env::var("NEUROGRASP_SENSITIVITY") {
        if let Ok(level) = value.parse::<u8>() {
            config.sensitivity.level = level;
        }
    }
}

/// Apply CLI overrides.
///
/// Recognized keys: `profile`, `device`, `port`, `baud_rate`,
/// `target_action`, `threshold_file`.
pub fn apply_cli_overrides(config: &mut BridgeConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("profile") {
        config.session.profile.clone_from(value);
    }
    if let Some(value) = cli_args.get("device") {
        config.session.device = Some(value.clone());
    }
    if let Some(value) = cli_args.get("port") {
        config.actuator.port = Some(value.clone());
    }
    if let Some(value) = cli_args.get("baud_rate") {
        if let Ok(baud) = value.parse::<u32>() {
            config.actuator.baud_rate = baud;
        }
    }
    if let Some(value) = cli_args.get("target_action") {
        config.translator.target_action.clone_from(value);
    }
    if let Some(value) = cli_args.get("threshold_file") {
        config.threshold.path = PathBuf::from(value);
    }
}

/// Check values that would otherwise fail deep inside a session.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the first bad value.
pub fn validate(config: &BridgeConfig) -> ConfigResult<()> {
    if config.actuator.baud_rate == 0 {
        return Err(ConfigError::Invalid("actuator.baud_rate must be positive".into()));
    }
    if config.translator.target_action.is_empty() {
        return Err(ConfigError::Invalid("translator.target_action cannot be empty".into()));
    }

    config.translator.translator()?;
    config.threshold.source()?;

    let level = i32::from(config.sensitivity.level);
    if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&level) {
        return Err(ConfigError::Invalid(format!(
            "sensitivity.level {level} outside {MIN_SENSITIVITY}..={MAX_SENSITIVITY}"
        )));
    }
    if let Some(values) = &config.sensitivity.values {
        if let Some(bad) = values
            .iter()
            .find(|v| !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(v))
        {
            return Err(ConfigError::Invalid(format!(
                "sensitivity.values entry {bad} outside {MIN_SENSITIVITY}..={MAX_SENSITIVITY}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 7] = [
        "NEUROGRASP_PROFILE",
        "NEUROGRASP_DEVICE",
        "NEUROGRASP_PORT",
        "NEUROGRASP_BAUD_RATE",
        "NEUROGRASP_TARGET_ACTION",
        "NEUROGRASP_THRESHOLD_FILE",
        "NEUROGRASP_SENSITIVITY",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
        env::remove_var(CONFIG_PATH_ENV);
    }

    #[test]
    fn test_defaults_match_protocol() {
        let config = BridgeConfig::default();
        assert_eq!(config.actuator.baud_rate, 9600);
        assert_eq!(config.actuator.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.actuator.retry_policy(), RetryPolicy::attempts(10));
        assert_eq!(config.translator.target_action, "lift");
        assert_eq!(config.threshold.path, PathBuf::from(".current_threshold"));
        assert_eq!(config.sensitivity.plan(), SensitivityPlan::Uniform(5));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_attempts_is_unbounded() {
        let actuator = ActuatorConfig {
            max_attempts: 0,
            ..ActuatorConfig::default()
        };
        assert_eq!(actuator.retry_policy().max_attempts, None);
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let found = find_config_file();
        env::set_var(CONFIG_PATH_ENV, dir.path().join("missing.toml").to_str().unwrap());
        let missing = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(found.unwrap(), Some(config_path));
        assert!(matches!(missing, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_partial_file() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[session]").unwrap();
        writeln!(file, "profile = \"Arm-1\"").unwrap();
        writeln!(file, "[actuator]").unwrap();
        writeln!(file, "port = \"/dev/ttyACM0\"").unwrap();
        writeln!(file, "max_attempts = 3").unwrap();
        writeln!(file, "[sensitivity]").unwrap();
        writeln!(file, "values = [3, 7]").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.session.profile, "Arm-1");
        assert_eq!(config.actuator.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.actuator.max_attempts, 3);
        assert_eq!(config.actuator.baud_rate, 9600);
        assert_eq!(config.sensitivity.plan(), SensitivityPlan::Explicit(vec![3, 7]));
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[session]").unwrap();
        writeln!(file, "profile = \"file-profile\"").unwrap();
        writeln!(file, "[actuator]").unwrap();
        writeln!(file, "port = \"file-port\"").unwrap();

        env::set_var("NEUROGRASP_PROFILE", "env-profile");
        env::set_var("NEUROGRASP_PORT", "env-port");

        let mut cli_args = HashMap::new();
        cli_args.insert("port".to_string(), "cli-port".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args));
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.session.profile, "env-profile");
        assert_eq!(config.actuator.port.as_deref(), Some("cli-port"));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("nope.toml")), None);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[actuator\nport = 1").unwrap();
        assert!(matches!(
            load_config(Some(&config_path), None),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = BridgeConfig::default();
        config.sensitivity.level = 11;
        assert!(matches!(validate(&config), Err(ConfigError::Invalid(_))));

        let mut config = BridgeConfig::default();
        config.sensitivity.values = Some(vec![5, 0]);
        assert!(validate(&config).is_err());

        let mut config = BridgeConfig::default();
        config.threshold.fallback = 1.5;
        assert!(validate(&config).is_err());

        let mut config = BridgeConfig::default();
        config.translator.action_code = 'é';
        assert!(validate(&config).is_err());

        let mut config = BridgeConfig::default();
        config.actuator.baud_rate = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_translator_from_config() {
        let config = TranslatorConfig {
            target_action: "push".into(),
            action_code: '2',
        };
        let translator = config.translator().unwrap();
        assert_eq!(translator.target_action(), "push");
        assert_eq!(translator.command().encode(), [b'2']);
    }
}
