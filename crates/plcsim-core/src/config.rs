//! Configuration loading and typed config structures for the simulator.
//!
//! The canonical configuration lives in `plcsim-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure and provides a loader that reads and validates
//! the file.
//!
//! Structural errors (unknown `type` or `access` names, wrong scalar
//! shapes) are rejected by serde at parse time; semantic errors
//! (duplicate names, inverted bounds, unrepresentable initial values)
//! are rejected when the engine is constructed from the parsed config.
//! Either way the engine is never left partially configured.

use std::path::Path;

use serde::Deserialize;

use plcsim_types::{AccessType, CoercionError, DataType, RawValue};

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content (including unknown `type` or
    /// `access` enumerants).
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A tag's initial value cannot be represented in its declared type.
    #[error("tag {address}: initial value rejected: {source}")]
    InitialValue {
        /// The address of the offending tag.
        address: String,
        /// The underlying coercion error.
        source: CoercionError,
    },

    /// A tag config carries an explicit `address` that does not match
    /// the canonical `DB<block>.<name>` form.
    #[error("tag {name} in DB{db_number}: configured address {found} does not match {expected}")]
    AddressMismatch {
        /// The tag name.
        name: String,
        /// The owning block number.
        db_number: u16,
        /// The address the config supplied.
        found: String,
        /// The canonical address derived from block and name.
        expected: String,
    },

    /// Two tags in the same data block share a name.
    #[error("duplicate tag {name} in DB{db_number}")]
    DuplicateTag {
        /// The duplicated tag name.
        name: String,
        /// The owning block number.
        db_number: u16,
    },

    /// Two data blocks share a block number.
    #[error("duplicate data block DB{db_number}")]
    DuplicateBlock {
        /// The duplicated block number.
        db_number: u16,
    },

    /// Bounds were configured on a non-numeric tag.
    #[error("tag {address}: min/max bounds apply only to int and float tags")]
    BoundsNotNumeric {
        /// The address of the offending tag.
        address: String,
    },

    /// `min` exceeds `max`.
    #[error("tag {address}: min {min} exceeds max {max}")]
    InvertedBounds {
        /// The address of the offending tag.
        address: String,
        /// The configured lower bound.
        min: f64,
        /// The configured upper bound.
        max: f64,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulator configuration.
///
/// Mirrors the structure of `plcsim-config.yaml`. The `plc` and
/// `simulation` sections have sensible defaults; `data_blocks` defaults
/// to empty (use [`SimulatorConfig::demo`] for a runnable example).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulatorConfig {
    /// Controller identity and loop timing.
    #[serde(default)]
    pub plc: PlcConfig,

    /// Workspace-wide noise/drift tuning defaults.
    #[serde(default)]
    pub simulation: TuningConfig,

    /// The data blocks to construct, in declaration order.
    #[serde(default)]
    pub data_blocks: Vec<BlockConfig>,
}

impl SimulatorConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// A small runnable demo configuration: one motor block with a
    /// writable speed setpoint and a drifting temperature sensor, plus
    /// a status block covering the non-numeric types.
    ///
    /// Used by the engine binary when no config file is present, so a
    /// bare `plcsim-engine` invocation produces visible traffic.
    pub fn demo() -> Self {
        Self {
            plc: PlcConfig::default(),
            simulation: TuningConfig::default(),
            data_blocks: vec![
                BlockConfig {
                    db_number: 1,
                    name: "Motor".to_owned(),
                    tags: vec![
                        TagSpec {
                            name: "Speed".to_owned(),
                            address: None,
                            data_type: DataType::Int,
                            access: AccessType::ReadWrite,
                            unit: "rpm".to_owned(),
                            min: Some(0.0),
                            max: Some(3000.0),
                            initial: RawValue::Int(1500),
                            noise: None,
                            drift: None,
                            noise_std_pct: None,
                            drift_rate: None,
                        },
                        TagSpec {
                            name: "Temperature".to_owned(),
                            address: None,
                            data_type: DataType::Float,
                            access: AccessType::ReadOnly,
                            unit: "degC".to_owned(),
                            min: Some(0.0),
                            max: Some(150.0),
                            initial: RawValue::Float(75.0),
                            noise: None,
                            drift: None,
                            noise_std_pct: None,
                            drift_rate: None,
                        },
                    ],
                },
                BlockConfig {
                    db_number: 2,
                    name: "Status".to_owned(),
                    tags: vec![
                        TagSpec {
                            name: "Running".to_owned(),
                            address: None,
                            data_type: DataType::Bool,
                            access: AccessType::ReadWrite,
                            unit: String::new(),
                            min: None,
                            max: None,
                            initial: RawValue::Bool(true),
                            noise: None,
                            drift: None,
                            noise_std_pct: None,
                            drift_rate: None,
                        },
                        TagSpec {
                            name: "Mode".to_owned(),
                            address: None,
                            data_type: DataType::Byte,
                            access: AccessType::ReadWrite,
                            unit: String::new(),
                            min: None,
                            max: None,
                            initial: RawValue::Int(1),
                            noise: None,
                            drift: None,
                            noise_std_pct: None,
                            drift_rate: None,
                        },
                        TagSpec {
                            name: "Recipe".to_owned(),
                            address: None,
                            data_type: DataType::Text,
                            access: AccessType::ReadOnly,
                            unit: String::new(),
                            min: None,
                            max: None,
                            initial: RawValue::Text("default".to_owned()),
                            noise: None,
                            drift: None,
                            noise_std_pct: None,
                            drift_rate: None,
                        },
                    ],
                },
            ],
        }
    }
}

/// Controller identity and loop timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlcConfig {
    /// Controller identifier, used in logs and by the Publisher.
    #[serde(default = "default_plc_id")]
    pub id: String,

    /// Human-readable controller name.
    #[serde(default = "default_plc_name")]
    pub name: String,

    /// Real-time milliseconds between ticks.
    #[serde(default = "default_update_rate_ms")]
    pub update_rate_ms: u64,

    /// Random seed for reproducible noise and drift.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Optional tick limit; the run stops cleanly after this many
    /// ticks. Unset means run until a stop is requested.
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            id: default_plc_id(),
            name: default_plc_name(),
            update_rate_ms: default_update_rate_ms(),
            seed: default_seed(),
            max_ticks: None,
        }
    }
}

/// Workspace-wide noise/drift tuning defaults.
///
/// Individual tags can override both values via [`TagSpec`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TuningConfig {
    /// Read-noise standard deviation as a fraction of the current
    /// value (0.02 = 2%).
    #[serde(default = "default_noise_std_pct")]
    pub noise_std_pct: f64,

    /// Drift rate in value units per simulated second.
    #[serde(default = "default_drift_rate")]
    pub drift_rate: f64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            noise_std_pct: default_noise_std_pct(),
            drift_rate: default_drift_rate(),
        }
    }
}

/// Configuration for one data block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlockConfig {
    /// Block number, used in the `DB<n>.<name>` address prefix.
    pub db_number: u16,

    /// Human-readable block name.
    pub name: String,

    /// The tags this block owns, in declaration order.
    #[serde(default)]
    pub tags: Vec<TagSpec>,
}

/// Configuration record for one tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagSpec {
    /// Tag name, unique within its data block.
    pub name: String,

    /// Optional explicit address; when present it must equal the
    /// canonical `DB<block>.<name>` form (kept for config files that
    /// spell addresses out for readability).
    #[serde(default)]
    pub address: Option<String>,

    /// Declared value type.
    #[serde(rename = "type")]
    pub data_type: DataType,

    /// Access policy (defaults to read-only).
    #[serde(default)]
    pub access: AccessType,

    /// Display-only engineering unit.
    #[serde(default)]
    pub unit: String,

    /// Inclusive lower bound (int/float tags only).
    #[serde(default)]
    pub min: Option<f64>,

    /// Inclusive upper bound (int/float tags only).
    #[serde(default)]
    pub max: Option<f64>,

    /// Required initial value, coerced to the declared type.
    pub initial: RawValue,

    /// Per-tag override: enable/disable read noise.
    #[serde(default)]
    pub noise: Option<bool>,

    /// Per-tag override: enable/disable drift.
    #[serde(default)]
    pub drift: Option<bool>,

    /// Per-tag override of the noise standard deviation fraction.
    #[serde(default)]
    pub noise_std_pct: Option<f64>,

    /// Per-tag override of the drift rate (units per second).
    #[serde(default)]
    pub drift_rate: Option<f64>,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_plc_id() -> String {
    "plc-sim-01".to_owned()
}

fn default_plc_name() -> String {
    "S7-1200 Simulator".to_owned()
}

const fn default_update_rate_ms() -> u64 {
    1000
}

const fn default_seed() -> u64 {
    42
}

const fn default_noise_std_pct() -> f64 {
    0.02
}

const fn default_drift_rate() -> f64 {
    0.001
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulatorConfig::default();
        assert_eq!(config.plc.update_rate_ms, 1000);
        assert_eq!(config.plc.seed, 42);
        assert!(config.plc.max_ticks.is_none());
        assert!((config.simulation.noise_std_pct - 0.02).abs() < f64::EPSILON);
        assert!((config.simulation.drift_rate - 0.001).abs() < f64::EPSILON);
        assert!(config.data_blocks.is_empty());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
plc:
  id: plc-test-07
  name: "Test Controller"
  update_rate_ms: 250
  seed: 7

simulation:
  noise_std_pct: 0.05
  drift_rate: 0.01

data_blocks:
  - db_number: 1
    name: Motor
    tags:
      - name: Speed
        type: int
        access: RW
        unit: rpm
        min: 0
        max: 3000
        initial: 1500
      - name: Temperature
        type: float
        unit: degC
        min: 0
        max: 150
        initial: 75.0
        drift_rate: 0.002
  - db_number: 2
    name: Status
    tags:
      - name: Running
        type: bool
        initial: true
"#;
        let config = SimulatorConfig::parse(yaml).unwrap();

        assert_eq!(config.plc.id, "plc-test-07");
        assert_eq!(config.plc.update_rate_ms, 250);
        assert!((config.simulation.noise_std_pct - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.data_blocks.len(), 2);

        let motor = config.data_blocks.first().unwrap();
        assert_eq!(motor.db_number, 1);
        assert_eq!(motor.tags.len(), 2);

        let speed = motor.tags.first().unwrap();
        assert_eq!(speed.data_type, DataType::Int);
        assert_eq!(speed.access, AccessType::ReadWrite);
        assert_eq!(speed.initial, RawValue::Int(1500));

        let temperature = motor.tags.get(1).unwrap();
        assert_eq!(temperature.access, AccessType::ReadOnly);
        assert!((temperature.drift_rate.unwrap() - 0.002).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_minimal_yaml_uses_defaults() {
        let yaml = "plc:\n  seed: 9\n";
        let config = SimulatorConfig::parse(yaml).unwrap();
        assert_eq!(config.plc.seed, 9);
        assert_eq!(config.plc.update_rate_ms, 1000);
        assert!(config.data_blocks.is_empty());
    }

    #[test]
    fn unknown_data_type_is_rejected() {
        let yaml = r"
data_blocks:
  - db_number: 1
    name: Broken
    tags:
      - name: Balance
        type: currency
        initial: 100
";
        let result = SimulatorConfig::parse(yaml);
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn unknown_access_is_rejected() {
        let yaml = r"
data_blocks:
  - db_number: 1
    name: Broken
    tags:
      - name: Speed
        type: int
        access: ADMIN
        initial: 0
";
        let result = SimulatorConfig::parse(yaml);
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn demo_config_covers_all_types() {
        let demo = SimulatorConfig::demo();
        assert_eq!(demo.data_blocks.len(), 2);
        let types: Vec<DataType> = demo
            .data_blocks
            .iter()
            .flat_map(|block| block.tags.iter().map(|tag| tag.data_type))
            .collect();
        assert!(types.contains(&DataType::Int));
        assert!(types.contains(&DataType::Float));
        assert!(types.contains(&DataType::Bool));
        assert!(types.contains(&DataType::Byte));
        assert!(types.contains(&DataType::Text));
    }
}
