//! Tag addresses, access policy, and the records exposed to the
//! Publisher.
//!
//! A [`TagAddress`] is the globally unique handle for a tag, formatted
//! `DB<block>.<name>` to mirror the controller's data-block addressing.
//! [`TagDescriptor`] is handed to the Publisher once at startup so it
//! can build its address space; [`TagSample`] is the per-tick payload
//! carrying the observed value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{Quality, TagValue};

/// Access policy for a tag, fixed at creation.
///
/// The serialized names match the configuration file vocabulary
/// (`RO`, `RW`); tags default to read-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessType {
    /// Read-only: external writes are silently ignored; the tag drifts
    /// like a sensor.
    #[default]
    #[serde(rename = "RO")]
    ReadOnly,
    /// Read-write: external writes are applied; the tag never drifts
    /// (external writers own it, like an actuator setpoint).
    #[serde(rename = "RW")]
    ReadWrite,
}

impl AccessType {
    /// Whether external writes are applied to the tag.
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Globally unique tag address, formatted `DB<block>.<name>`.
///
/// Constructed together with the tag so the address and the owning
/// block number can never diverge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagAddress(String);

impl TagAddress {
    /// Build the canonical address for a tag in a data block.
    pub fn new(db_number: u16, name: &str) -> Self {
        Self(format!("DB{db_number}.{name}"))
    }

    /// Wrap an externally supplied address string (e.g. from a remote
    /// write request) without validation; lookups decide whether it
    /// names a real tag.
    pub fn from_raw(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The tag name portion, if this address belongs to the given
    /// data block.
    pub fn tag_name_in(&self, db_number: u16) -> Option<&str> {
        let prefix = format!("DB{db_number}.");
        self.0.strip_prefix(&prefix)
    }
}

impl core::fmt::Display for TagAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of a tag, handed to the Publisher at startup so
/// it can construct its address space.
///
/// Deliberately carries no value and no simulation tuning: the
/// Publisher only needs identity, type, access, and display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDescriptor {
    /// Tag name, unique within its data block.
    pub name: String,
    /// Globally unique address (`DB<block>.<name>`).
    pub address: TagAddress,
    /// Declared value type.
    pub data_type: crate::value::DataType,
    /// Access policy.
    pub access: AccessType,
    /// Display-only engineering unit (empty when none).
    pub unit: String,
}

/// One observed value as published to the Publisher each tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagSample {
    /// The tag's address.
    pub address: TagAddress,
    /// The observed value (noise already applied for numeric tags).
    pub value: TagValue,
    /// Value quality flag.
    pub quality: Quality,
    /// Observation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Display-only engineering unit (empty when none).
    pub unit: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn address_format_matches_controller_convention() {
        let addr = TagAddress::new(1, "Speed");
        assert_eq!(addr.as_str(), "DB1.Speed");
        assert_eq!(addr.to_string(), "DB1.Speed");
    }

    #[test]
    fn tag_name_extraction_checks_block_prefix() {
        let addr = TagAddress::new(2, "Temperature");
        assert_eq!(addr.tag_name_in(2), Some("Temperature"));
        assert_eq!(addr.tag_name_in(1), None);
        assert_eq!(addr.tag_name_in(22), None);
    }

    #[test]
    fn access_defaults_to_read_only() {
        assert_eq!(AccessType::default(), AccessType::ReadOnly);
        assert!(!AccessType::ReadOnly.is_writable());
        assert!(AccessType::ReadWrite.is_writable());
    }

    #[test]
    fn access_deserializes_config_names() {
        let access: AccessType = serde_json::from_str("\"RW\"").unwrap();
        assert_eq!(access, AccessType::ReadWrite);
        let bad: Result<AccessType, _> = serde_json::from_str("\"ADMIN\"");
        assert!(bad.is_err());
    }
}
