//! Declared data types, typed runtime values, and value coercion.
//!
//! A tag declares exactly one [`DataType`] at construction time and keeps
//! it for life. Every value that enters the tag -- the configured initial
//! value, an external write, a drift step -- is coerced to that declared
//! type before it is stored, so the stored [`TagValue`] always satisfies
//! the declared representation.
//!
//! # Coercion rules
//!
//! Coercion follows the reference controller behavior:
//!
//! - `int` is a 32-bit signed integer; floats **truncate** toward zero
//!   (never round) and out-of-range values are rejected.
//! - `float` is single-precision; wider inputs are narrowed.
//! - `byte` is masked into `0..=255` (`value mod 256`), not clamped.
//! - `bool` accepts booleans, nonzero numerics, and the literal strings
//!   `"true"` / `"false"` (case-insensitive).
//! - `string` accepts anything and stores its display form.

use serde::{Deserialize, Serialize};

/// The declared type of a tag's value, fixed at tag creation.
///
/// The serialized names match the configuration file vocabulary
/// (`bool`, `int`, `float`, `byte`, `string`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Boolean flag (e.g. a running bit).
    Bool,
    /// 32-bit signed integer (e.g. a speed setpoint).
    Int,
    /// Single-precision float (e.g. a temperature).
    Float,
    /// Unsigned byte in `0..=255` (e.g. a mode selector).
    Byte,
    /// Free-form text (e.g. a recipe name).
    #[serde(rename = "string")]
    Text,
}

impl DataType {
    /// Whether this type participates in noise and drift simulation.
    ///
    /// Only `int` and `float` tags are perturbed; `bool`, `byte`, and
    /// `string` tags hold their stored value exactly.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// Coerce an untyped scalar into this declared type.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError`] if the value cannot be represented in
    /// this type (unparseable text, out-of-range integer, non-finite
    /// float).
    pub fn coerce(self, raw: &RawValue) -> Result<TagValue, CoercionError> {
        match self {
            Self::Bool => coerce_bool(raw),
            Self::Int => coerce_int(raw),
            Self::Float => coerce_float(raw),
            Self::Byte => coerce_byte(raw),
            Self::Text => Ok(TagValue::Text(raw.to_string())),
        }
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Byte => "byte",
            Self::Text => "string",
        };
        write!(f, "{name}")
    }
}

/// Value quality as reported to the Publisher.
///
/// Mirrors the classic OPC quality flags. The simulator currently
/// reports `Good` for every sample; the other variants exist so the
/// wire shape is complete for downstream consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quality {
    /// The value is trustworthy.
    #[default]
    Good,
    /// The value is known to be wrong (e.g. sensor fault).
    Bad,
    /// The value may be stale or degraded.
    Uncertain,
}

/// An untyped scalar as it appears in configuration files and write
/// requests, before coercion to a tag's declared [`DataType`].
///
/// Deserialized untagged, so YAML `true`, `42`, `3.5`, and `"auto"`
/// all map naturally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A YAML/JSON boolean.
    Bool(bool),
    /// A YAML/JSON integer.
    Int(i64),
    /// A YAML/JSON float.
    Float(f64),
    /// A YAML/JSON string.
    Text(String),
}

impl core::fmt::Display for RawValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A typed runtime value, guaranteed to satisfy its [`DataType`]
/// representation.
///
/// The concrete representations match what the Publisher puts on the
/// wire: boolean, 32-bit signed integer, single-precision float,
/// `0..=255` byte, string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    /// A boolean value.
    Bool(bool),
    /// A 32-bit signed integer value.
    Int(i32),
    /// A single-precision float value.
    Float(f32),
    /// A byte value in `0..=255`.
    Byte(u8),
    /// A text value.
    Text(String),
}

impl TagValue {
    /// The declared type this value satisfies.
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Int(_) => DataType::Int,
            Self::Float(_) => DataType::Float,
            Self::Byte(_) => DataType::Byte,
            Self::Text(_) => DataType::Text,
        }
    }

    /// The value as an `f64`, for numeric simulation math.
    ///
    /// Returns `None` for `bool` and `string` values; `byte` widens
    /// losslessly so bounds math works uniformly.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Byte(b) => Some(f64::from(*b)),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }
}

impl core::fmt::Display for TagValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Byte(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Errors that can occur when coercing a value to a declared type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    /// The text value could not be parsed as the target type.
    #[error("cannot parse {value:?} as {target}")]
    Parse {
        /// The offending input, in display form.
        value: String,
        /// The declared type the value was coerced toward.
        target: DataType,
    },

    /// The numeric value is outside the representable range of the
    /// target type (or is not finite).
    #[error("{value} is out of range for {target}")]
    OutOfRange {
        /// The offending input, in display form.
        value: String,
        /// The declared type the value was coerced toward.
        target: DataType,
    },
}

/// Optional numeric clamp range for a tag.
///
/// Applies only to `int` and `float` tags; both drift steps and external
/// writes are clamped into `[min, max]` before being stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Inclusive lower bound, if any.
    pub min: Option<f64>,
    /// Inclusive upper bound, if any.
    pub max: Option<f64>,
}

impl Bounds {
    /// A bounds record with no limits set.
    pub const NONE: Self = Self {
        min: None,
        max: None,
    };

    /// Whether any limit is set.
    pub const fn is_set(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Clamp a value into `[min, max]`, ignoring unset limits.
    pub fn clamp(&self, value: f64) -> f64 {
        let mut clamped = value;
        if let Some(min) = self.min {
            clamped = clamped.max(min);
        }
        if let Some(max) = self.max {
            clamped = clamped.min(max);
        }
        clamped
    }
}

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

fn coerce_bool(raw: &RawValue) -> Result<TagValue, CoercionError> {
    match raw {
        RawValue::Bool(b) => Ok(TagValue::Bool(*b)),
        RawValue::Int(i) => Ok(TagValue::Bool(*i != 0)),
        RawValue::Float(v) => Ok(TagValue::Bool(v.abs() > 0.0)),
        RawValue::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(TagValue::Bool(true)),
            "false" => Ok(TagValue::Bool(false)),
            _ => Err(CoercionError::Parse {
                value: s.clone(),
                target: DataType::Bool,
            }),
        },
    }
}

fn coerce_int(raw: &RawValue) -> Result<TagValue, CoercionError> {
    match raw {
        RawValue::Bool(b) => Ok(TagValue::Int(i32::from(*b))),
        RawValue::Int(i) => i32::try_from(*i)
            .map(TagValue::Int)
            .map_err(|_err| CoercionError::OutOfRange {
                value: i.to_string(),
                target: DataType::Int,
            }),
        RawValue::Float(v) => float_to_i32(*v).map(TagValue::Int),
        RawValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|i| i32::try_from(i).ok())
            .map(TagValue::Int)
            .ok_or_else(|| CoercionError::Parse {
                value: s.clone(),
                target: DataType::Int,
            }),
    }
}

fn coerce_float(raw: &RawValue) -> Result<TagValue, CoercionError> {
    match raw {
        RawValue::Bool(b) => Ok(TagValue::Float(if *b { 1.0 } else { 0.0 })),
        RawValue::Int(i) => {
            // Single-precision narrowing is the defined representation
            // for float tags; large magnitudes lose precision by design.
            #[allow(clippy::cast_precision_loss)]
            let narrowed = *i as f32;
            Ok(TagValue::Float(narrowed))
        }
        RawValue::Float(v) => {
            if !v.is_finite() {
                return Err(CoercionError::OutOfRange {
                    value: v.to_string(),
                    target: DataType::Float,
                });
            }
            #[allow(clippy::cast_possible_truncation)]
            let narrowed = *v as f32;
            if narrowed.is_finite() {
                Ok(TagValue::Float(narrowed))
            } else {
                Err(CoercionError::OutOfRange {
                    value: v.to_string(),
                    target: DataType::Float,
                })
            }
        }
        RawValue::Text(s) => s
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .map(TagValue::Float)
            .ok_or_else(|| CoercionError::Parse {
                value: s.clone(),
                target: DataType::Float,
            }),
    }
}

fn coerce_byte(raw: &RawValue) -> Result<TagValue, CoercionError> {
    match raw {
        RawValue::Bool(b) => Ok(TagValue::Byte(u8::from(*b))),
        RawValue::Int(i) => Ok(TagValue::Byte(mask_byte(*i))),
        RawValue::Float(v) => {
            if !v.is_finite() {
                return Err(CoercionError::OutOfRange {
                    value: v.to_string(),
                    target: DataType::Byte,
                });
            }
            let truncated = v.trunc();
            if truncated < -9.0e18 || truncated > 9.0e18 {
                return Err(CoercionError::OutOfRange {
                    value: v.to_string(),
                    target: DataType::Byte,
                });
            }
            // Truncation toward zero, then masking, matches the
            // reference controller's `int(value) & 0xFF`.
            #[allow(clippy::cast_possible_truncation)]
            let wide = truncated as i64;
            Ok(TagValue::Byte(mask_byte(wide)))
        }
        RawValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(|i| TagValue::Byte(mask_byte(i)))
            .map_err(|_err| CoercionError::Parse {
                value: s.clone(),
                target: DataType::Byte,
            }),
    }
}

/// Mask a wide integer into the byte range, wrapping like the reference
/// controller's `value & 0xFF` (so `-1` becomes `255`).
fn mask_byte(value: i64) -> u8 {
    // rem_euclid keeps the result in 0..256 for any input sign.
    u8::try_from(value.rem_euclid(256)).unwrap_or(u8::MAX)
}

/// Truncate a float toward zero into the `i32` range.
fn float_to_i32(value: f64) -> Result<i32, CoercionError> {
    if !value.is_finite() {
        return Err(CoercionError::OutOfRange {
            value: value.to_string(),
            target: DataType::Int,
        });
    }
    let truncated = value.trunc();
    if truncated < f64::from(i32::MIN) || truncated > f64::from(i32::MAX) {
        return Err(CoercionError::OutOfRange {
            value: value.to_string(),
            target: DataType::Int,
        });
    }
    // Range-checked above; truncation toward zero is the defined
    // float->int conversion for int tags.
    #[allow(clippy::cast_possible_truncation)]
    Ok(truncated as i32)
}
