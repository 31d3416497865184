//! Data blocks: named, numbered tag collections.
//!
//! A [`DataBlock`] mirrors the controller notion of a numbered data
//! block (`DB1`, `DB2`, ...). It owns its tags keyed by name and is the
//! unit the engine iterates when ticking and sampling. Tag names are
//! unique within a block; the block number plus the name forms the
//! globally unique address.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{BlockConfig, ConfigError, TuningConfig};
use crate::tag::Tag;

/// A numbered collection of tags.
///
/// Iteration order is by tag name, so samples published per tick are
/// deterministic across runs.
#[derive(Debug, Clone)]
pub struct DataBlock {
    /// Block number (the `<n>` in the `DB<n>.<name>` address prefix).
    db_number: u16,

    /// Human-readable block name.
    name: String,

    /// The tags this block owns, keyed by tag name.
    tags: BTreeMap<String, Tag>,
}

impl DataBlock {
    /// Construct a block and all of its tags from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateTag`] if two tags share a name,
    /// or any tag-level construction error ([`ConfigError::InitialValue`]
    /// and friends).
    pub fn new(config: &BlockConfig, tuning: &TuningConfig) -> Result<Self, ConfigError> {
        let mut tags = BTreeMap::new();
        for spec in &config.tags {
            let tag = Tag::new(config.db_number, spec, tuning)?;
            if tags.insert(spec.name.clone(), tag).is_some() {
                return Err(ConfigError::DuplicateTag {
                    name: spec.name.clone(),
                    db_number: config.db_number,
                });
            }
        }
        debug!(
            db_number = config.db_number,
            name = %config.name,
            tag_count = tags.len(),
            "Created data block"
        );
        Ok(Self {
            db_number: config.db_number,
            name: config.name.clone(),
            tags,
        })
    }

    /// The block number.
    pub const fn db_number(&self) -> u16 {
        self.db_number
    }

    /// The human-readable block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of tags in the block.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Look up a tag by name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    /// Look up a tag by name for mutation.
    pub fn tag_mut(&mut self, name: &str) -> Option<&mut Tag> {
        self.tags.get_mut(name)
    }

    /// Iterate tags in name order.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    /// Descriptors for every tag in the block, in name order. Used by
    /// a Publisher building its address space one block at a time.
    pub fn descriptors(&self) -> Vec<plcsim_types::TagDescriptor> {
        self.tags.values().map(Tag::descriptor).collect()
    }

    /// Iterate tags in name order for mutation.
    pub fn tags_mut(&mut self) -> impl Iterator<Item = &mut Tag> {
        self.tags.values_mut()
    }
}
