//! The tag model: value observation, external writes, and the per-tick
//! drift step.
//!
//! A [`Tag`] is one simulated process variable. It owns a typed stored
//! value (the "true" value) and exposes three operations with distinct
//! roles:
//!
//! - [`observe_value`] -- a **pure read** that perturbs numeric values
//!   with transient Gaussian noise (standard deviation 2% of the stored
//!   magnitude by default). The noise is never stored; observing the
//!   same stored value twice yields independently sampled results,
//!   which is deliberate -- it models a real sensor.
//! - [`apply_write`] -- an external write. Writes to read-only tags are
//!   a silent no-op reported as `applied: false`, never an error; the
//!   caller decides whether that matters.
//! - [`advance_simulation`] -- the drift step, applied once per tick to
//!   read-only numeric tags only. Writable tags are owned by external
//!   writers and never drift.
//!
//! Drift and writes both clamp into the configured bounds and re-coerce
//! to the declared type before storing, so the stored value always
//! satisfies the tag's representation invariant.
//!
//! The random source is injected by the caller so tests can seed a
//! deterministic generator; nothing here touches a process-wide RNG.
//!
//! [`observe_value`]: Tag::observe_value
//! [`apply_write`]: Tag::apply_write
//! [`advance_simulation`]: Tag::advance_simulation

use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use plcsim_types::{
    AccessType, Bounds, Quality, RawValue, TagAddress, TagDescriptor, TagSample, TagValue,
};

use crate::config::{ConfigError, TagSpec, TuningConfig};

/// Result of an external write attempt.
///
/// Writes to read-only tags are ignored rather than rejected; this
/// typed result keeps that behavior explicit so callers can surface it
/// (or not) as they see fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Whether the value was stored (`false` for read-only tags).
    pub applied: bool,
}

/// One simulated process variable.
///
/// Created from a [`TagSpec`] at engine start; lives for the process
/// lifetime. The stored value is mutated only by [`apply_write`] and
/// [`advance_simulation`].
///
/// [`apply_write`]: Tag::apply_write
/// [`advance_simulation`]: Tag::advance_simulation
#[derive(Debug, Clone)]
pub struct Tag {
    /// Tag name, unique within its data block.
    name: String,

    /// Globally unique address, derived from the block number and name.
    address: TagAddress,

    /// Declared value type, fixed at creation.
    data_type: plcsim_types::DataType,

    /// Access policy, fixed at creation.
    access: AccessType,

    /// Display-only engineering unit.
    unit: String,

    /// Optional clamp range (numeric tags only).
    bounds: Bounds,

    /// The true stored value.
    value: TagValue,

    /// Value quality reported with every sample.
    quality: Quality,

    /// Whether observations carry read noise.
    noise_enabled: bool,

    /// Noise standard deviation as a fraction of the stored magnitude.
    noise_std_pct: f64,

    /// Whether the drift step is applied.
    drift_enabled: bool,

    /// Drift rate in value units per simulated second.
    drift_rate: f64,

    /// When the tag was constructed.
    created_at: DateTime<Utc>,

    /// When the stored value last changed via an external write.
    updated_at: DateTime<Utc>,
}

impl Tag {
    /// Construct a tag from its configuration record.
    ///
    /// The initial value is coerced to the declared type; bounds are
    /// validated against the type; an explicit configured address must
    /// match the canonical `DB<block>.<name>` form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the initial value cannot be coerced,
    /// bounds are configured on a non-numeric tag, `min` exceeds `max`,
    /// or the configured address diverges from the canonical one.
    pub fn new(db_number: u16, spec: &TagSpec, tuning: &TuningConfig) -> Result<Self, ConfigError> {
        let address = TagAddress::new(db_number, &spec.name);

        if let Some(configured) = &spec.address {
            if configured != address.as_str() {
                return Err(ConfigError::AddressMismatch {
                    name: spec.name.clone(),
                    db_number,
                    found: configured.clone(),
                    expected: address.as_str().to_owned(),
                });
            }
        }

        let bounds = Bounds {
            min: spec.min,
            max: spec.max,
        };
        if bounds.is_set() && !spec.data_type.is_numeric() {
            return Err(ConfigError::BoundsNotNumeric {
                address: address.as_str().to_owned(),
            });
        }
        if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
            if min > max {
                return Err(ConfigError::InvertedBounds {
                    address: address.as_str().to_owned(),
                    min,
                    max,
                });
            }
        }

        let value =
            spec.data_type
                .coerce(&spec.initial)
                .map_err(|source| ConfigError::InitialValue {
                    address: address.as_str().to_owned(),
                    source,
                })?;

        let now = Utc::now();
        let tag = Self {
            name: spec.name.clone(),
            address,
            data_type: spec.data_type,
            access: spec.access,
            unit: spec.unit.clone(),
            bounds,
            value,
            quality: Quality::Good,
            noise_enabled: spec.noise.unwrap_or(true),
            noise_std_pct: spec.noise_std_pct.unwrap_or(tuning.noise_std_pct),
            drift_enabled: spec.drift.unwrap_or(true),
            drift_rate: spec.drift_rate.unwrap_or(tuning.drift_rate),
            created_at: now,
            updated_at: now,
        };
        debug!(address = %tag.address, value = %tag.value, "Created tag");
        Ok(tag)
    }

    /// The externally visible value for the current tick.
    ///
    /// Boolean, byte, and text tags return the stored value unchanged.
    /// Numeric tags are perturbed by Gaussian noise with standard
    /// deviation `noise_std_pct * |value|` (zero noise when the stored
    /// value is zero), clamped to bounds, and re-coerced to the
    /// declared type (int tags truncate, never round).
    ///
    /// This is a pure read: the stored value is never mutated, and two
    /// observations of the same stored value generally differ.
    pub fn observe_value<R: Rng + ?Sized>(&self, rng: &mut R) -> TagValue {
        if !self.data_type.is_numeric() || !self.noise_enabled {
            return self.value.clone();
        }
        let Some(base) = self.value.as_f64() else {
            return self.value.clone();
        };

        let std_dev = base.abs() * self.noise_std_pct;
        if std_dev <= 0.0 {
            return self.value.clone();
        }

        let noise = Normal::new(0.0, std_dev).map_or(0.0, |dist| dist.sample(rng));
        self.quantize(self.bounds.clamp(base + noise))
    }

    /// Observe the value and wrap it in the per-tick sample record
    /// handed to the Publisher.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TagSample {
        TagSample {
            address: self.address.clone(),
            value: self.observe_value(rng),
            quality: self.quality,
            timestamp: Utc::now(),
            unit: self.unit.clone(),
        }
    }

    /// Apply an external write.
    ///
    /// Read-only tags ignore the write and report `applied: false`.
    /// Writable tags coerce the value to the declared type, clamp it to
    /// bounds, store it, and bump the modification timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`plcsim_types::CoercionError`] if the value cannot be
    /// represented in the declared type; the stored value is untouched
    /// and the caller decides whether to surface or drop the failure.
    pub fn apply_write(
        &mut self,
        value: &RawValue,
    ) -> Result<WriteOutcome, plcsim_types::CoercionError> {
        if !self.access.is_writable() {
            debug!(address = %self.address, "Write ignored on read-only tag");
            return Ok(WriteOutcome { applied: false });
        }

        let coerced = self.data_type.coerce(value)?;
        let stored = match coerced.as_f64() {
            Some(numeric) if self.bounds.is_set() => self.quantize(self.bounds.clamp(numeric)),
            _ => coerced,
        };

        debug!(address = %self.address, value = %stored, "Tag written");
        self.value = stored;
        self.updated_at = Utc::now();
        Ok(WriteOutcome { applied: true })
    }

    /// Advance the simulated value by one tick of `dt_seconds`.
    ///
    /// No-op for writable tags (external writers own them), for tags
    /// with drift disabled, for non-numeric tags, and for zero-duration
    /// ticks. Otherwise the stored value moves by a uniform random
    /// amount in `[-drift_rate, +drift_rate]` scaled by `dt_seconds`,
    /// clamped to bounds and re-coerced to the declared type.
    pub fn advance_simulation<R: Rng + ?Sized>(&mut self, dt_seconds: f64, rng: &mut R) {
        if !self.drift_enabled
            || self.access.is_writable()
            || !self.data_type.is_numeric()
            || dt_seconds <= 0.0
        {
            return;
        }
        let Some(base) = self.value.as_f64() else {
            return;
        };

        let drift = rng.random_range(-self.drift_rate..=self.drift_rate) * dt_seconds;
        self.value = self.quantize(self.bounds.clamp(base + drift));
    }

    /// Static description for Publisher address-space construction.
    pub fn descriptor(&self) -> TagDescriptor {
        TagDescriptor {
            name: self.name.clone(),
            address: self.address.clone(),
            data_type: self.data_type,
            access: self.access,
            unit: self.unit.clone(),
        }
    }

    /// The tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The globally unique address.
    pub const fn address(&self) -> &TagAddress {
        &self.address
    }

    /// The declared value type.
    pub const fn data_type(&self) -> plcsim_types::DataType {
        self.data_type
    }

    /// The access policy.
    pub const fn access(&self) -> AccessType {
        self.access
    }

    /// The true stored value (tests and diagnostics; remote readers go
    /// through [`observe_value`](Self::observe_value)).
    pub const fn value(&self) -> &TagValue {
        &self.value
    }

    /// When the stored value last changed via an external write.
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// When the tag was constructed.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Enable or disable read noise (e.g. for deterministic test runs).
    pub const fn set_noise_enabled(&mut self, enabled: bool) {
        self.noise_enabled = enabled;
    }

    /// Enable or disable the drift step.
    pub const fn set_drift_enabled(&mut self, enabled: bool) {
        self.drift_enabled = enabled;
    }

    /// Re-coerce a post-clamp numeric value into the declared type,
    /// keeping the current value if the conversion somehow fails
    /// (only possible for unbounded tags pushed past the type range).
    fn quantize(&self, numeric: f64) -> TagValue {
        self.data_type
            .coerce(&RawValue::Float(numeric))
            .unwrap_or_else(|_err| self.value.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use plcsim_types::DataType;

    use super::*;

    fn spec(name: &str, data_type: DataType, access: AccessType, initial: RawValue) -> TagSpec {
        TagSpec {
            name: name.to_owned(),
            address: None,
            data_type,
            access,
            unit: String::new(),
            min: None,
            max: None,
            initial,
            noise: None,
            drift: None,
            noise_std_pct: None,
            drift_rate: None,
        }
    }

    fn temperature_spec() -> TagSpec {
        TagSpec {
            unit: "degC".to_owned(),
            min: Some(0.0),
            max: Some(150.0),
            ..spec(
                "Temperature",
                DataType::Float,
                AccessType::ReadOnly,
                RawValue::Float(75.0),
            )
        }
    }

    fn speed_spec() -> TagSpec {
        TagSpec {
            unit: "rpm".to_owned(),
            min: Some(0.0),
            max: Some(3000.0),
            ..spec(
                "Speed",
                DataType::Int,
                AccessType::ReadWrite,
                RawValue::Int(1500),
            )
        }
    }

    fn make(spec: &TagSpec) -> Tag {
        Tag::new(1, spec, &TuningConfig::default()).unwrap()
    }

    #[test]
    fn construction_derives_address() {
        let tag = make(&speed_spec());
        assert_eq!(tag.address().as_str(), "DB1.Speed");
        assert_eq!(tag.value(), &TagValue::Int(1500));
    }

    #[test]
    fn explicit_address_must_match() {
        let mut bad = speed_spec();
        bad.address = Some("DB2.Speed".to_owned());
        let result = Tag::new(1, &bad, &TuningConfig::default());
        assert!(matches!(result, Err(ConfigError::AddressMismatch { .. })));

        let mut good = speed_spec();
        good.address = Some("DB1.Speed".to_owned());
        assert!(Tag::new(1, &good, &TuningConfig::default()).is_ok());
    }

    #[test]
    fn unrepresentable_initial_value_is_rejected() {
        let bad = spec(
            "Speed",
            DataType::Int,
            AccessType::ReadWrite,
            RawValue::Text("fast".to_owned()),
        );
        let result = Tag::new(1, &bad, &TuningConfig::default());
        assert!(matches!(result, Err(ConfigError::InitialValue { .. })));
    }

    #[test]
    fn bounds_on_non_numeric_tag_are_rejected() {
        let mut bad = spec(
            "Running",
            DataType::Bool,
            AccessType::ReadOnly,
            RawValue::Bool(true),
        );
        bad.min = Some(0.0);
        let result = Tag::new(1, &bad, &TuningConfig::default());
        assert!(matches!(result, Err(ConfigError::BoundsNotNumeric { .. })));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let mut bad = temperature_spec();
        bad.min = Some(100.0);
        bad.max = Some(0.0);
        let result = Tag::new(1, &bad, &TuningConfig::default());
        assert!(matches!(result, Err(ConfigError::InvertedBounds { .. })));
    }

    #[test]
    fn observation_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tag = make(&temperature_spec());

        for _ in 0..500 {
            tag.advance_simulation(10.0, &mut rng);
            let observed = tag.observe_value(&mut rng);
            let TagValue::Float(v) = observed else {
                panic!("float tag observed non-float");
            };
            assert!((0.0..=150.0).contains(&f64::from(v)));
        }
    }

    #[test]
    fn observation_is_a_pure_read() {
        let mut rng = StdRng::seed_from_u64(3);
        let tag = make(&temperature_spec());
        let before = tag.value().clone();
        let _ = tag.observe_value(&mut rng);
        let _ = tag.observe_value(&mut rng);
        assert_eq!(tag.value(), &before);
    }

    #[test]
    fn noise_disabled_returns_exact_value() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut tag = make(&temperature_spec());
        tag.set_noise_enabled(false);
        assert_eq!(tag.observe_value(&mut rng), TagValue::Float(75.0));
    }

    #[test]
    fn zero_value_observes_without_noise() {
        let mut rng = StdRng::seed_from_u64(5);
        let zeroed = spec(
            "Offset",
            DataType::Float,
            AccessType::ReadOnly,
            RawValue::Float(0.0),
        );
        let tag = make(&zeroed);
        assert_eq!(tag.observe_value(&mut rng), TagValue::Float(0.0));
    }

    #[test]
    fn non_numeric_tags_observe_unchanged() {
        let mut rng = StdRng::seed_from_u64(13);
        let tag = make(&spec(
            "Recipe",
            DataType::Text,
            AccessType::ReadOnly,
            RawValue::Text("batch-a".to_owned()),
        ));
        assert_eq!(
            tag.observe_value(&mut rng),
            TagValue::Text("batch-a".to_owned())
        );
    }

    #[test]
    fn drift_is_noop_on_writable_tags() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut tag = make(&speed_spec());
        for _ in 0..100 {
            tag.advance_simulation(1000.0, &mut rng);
        }
        assert_eq!(tag.value(), &TagValue::Int(1500));
    }

    #[test]
    fn zero_duration_tick_changes_nothing() {
        let mut rng = StdRng::seed_from_u64(19);
        let mut tag = make(&temperature_spec());
        let before = tag.value().clone();
        tag.advance_simulation(0.0, &mut rng);
        assert_eq!(tag.value(), &before);
    }

    #[test]
    fn drift_is_bounded_by_rate_times_time() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut tag = make(&temperature_spec());

        // 1000 simulated seconds at 0.001 units/s: total movement is
        // bounded by 1.0 in absolute terms.
        for _ in 0..1000 {
            tag.advance_simulation(1.0, &mut rng);
        }
        let TagValue::Float(v) = tag.value() else {
            panic!("float tag stored non-float");
        };
        let delta = (f64::from(*v) - 75.0).abs();
        assert!(delta <= 1.0 + 1.0e-6, "drifted by {delta}");
        assert!((0.0..=150.0).contains(&f64::from(*v)));
    }

    #[test]
    fn write_to_read_only_tag_is_silent_noop() {
        let mut tag = make(&temperature_spec());
        let outcome = tag.apply_write(&RawValue::Float(120.0)).unwrap();
        assert!(!outcome.applied);
        assert_eq!(tag.value(), &TagValue::Float(75.0));
    }

    #[test]
    fn write_clamps_to_bounds() {
        let mut tag = make(&speed_spec());
        let outcome = tag.apply_write(&RawValue::Int(5000)).unwrap();
        assert!(outcome.applied);
        assert_eq!(tag.value(), &TagValue::Int(3000));

        let outcome = tag.apply_write(&RawValue::Int(-10)).unwrap();
        assert!(outcome.applied);
        assert_eq!(tag.value(), &TagValue::Int(0));
    }

    #[test]
    fn write_then_observe_round_trips_with_noise_disabled() {
        let mut rng = StdRng::seed_from_u64(29);
        let mut tag = make(&speed_spec());
        tag.set_noise_enabled(false);
        let outcome = tag.apply_write(&RawValue::Int(2200)).unwrap();
        assert!(outcome.applied);
        assert_eq!(tag.observe_value(&mut rng), TagValue::Int(2200));
    }

    #[test]
    fn write_coercion_failure_leaves_value_untouched() {
        let mut tag = make(&speed_spec());
        let result = tag.apply_write(&RawValue::Text("fast".to_owned()));
        assert!(result.is_err());
        assert_eq!(tag.value(), &TagValue::Int(1500));
    }

    #[test]
    fn write_bumps_modification_timestamp() {
        let mut tag = make(&speed_spec());
        let created = tag.updated_at();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let _ = tag.apply_write(&RawValue::Int(100)).unwrap();
        assert!(tag.updated_at() > created);
    }

    #[test]
    fn byte_write_masks_into_range() {
        let mut tag = make(&spec(
            "Mode",
            DataType::Byte,
            AccessType::ReadWrite,
            RawValue::Int(1),
        ));
        let outcome = tag.apply_write(&RawValue::Int(300)).unwrap();
        assert!(outcome.applied);
        assert_eq!(tag.value(), &TagValue::Byte(44));
    }

    #[test]
    fn descriptor_carries_identity_only() {
        let tag = make(&speed_spec());
        let descriptor = tag.descriptor();
        assert_eq!(descriptor.name, "Speed");
        assert_eq!(descriptor.address.as_str(), "DB1.Speed");
        assert_eq!(descriptor.data_type, DataType::Int);
        assert_eq!(descriptor.access, AccessType::ReadWrite);
        assert_eq!(descriptor.unit, "rpm");
    }
}
