//! The composition root: all data blocks, the seeded RNG, and the
//! diagnostic counters.
//!
//! A [`Plc`] is the whole simulated controller. It owns the blocks, a
//! single seeded [`StdRng`] that every noise and drift sample draws
//! from (so a fixed seed reproduces a run exactly), and the shared
//! [`SimulatorMetrics`] counters. All mutation goes through `&mut self`;
//! concurrent access is the caller's concern (the engine binary wraps
//! it in `Arc<tokio::sync::RwLock<_>>`).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use plcsim_types::{CoercionError, RawValue, TagAddress, TagDescriptor, TagSample};

use crate::block::DataBlock;
use crate::config::{ConfigError, SimulatorConfig};
use crate::metrics::SimulatorMetrics;
use crate::tag::{Tag, WriteOutcome};

/// Errors from reading a tag.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// No tag exists at the given address.
    #[error("no tag at address {address}")]
    NotFound {
        /// The address that was requested.
        address: TagAddress,
    },
}

/// Errors from an external write.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// No tag exists at the given address.
    #[error("no tag at address {address}")]
    NotFound {
        /// The address that was requested.
        address: TagAddress,
    },

    /// The value cannot be represented in the tag's declared type.
    #[error("write to {address} rejected: {source}")]
    Value {
        /// The address that was written.
        address: TagAddress,
        /// The underlying coercion error.
        source: CoercionError,
    },
}

/// Point-in-time diagnostics: static structure counts plus the live
/// counter snapshot. Cheap to build, never blocks the tick loop for
/// more than a brief read lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct EngineStatus {
    /// Number of configured data blocks.
    pub total_blocks: usize,
    /// Total number of tags across all blocks.
    pub total_tags: usize,
    /// The live counters.
    pub metrics: crate::metrics::MetricsSnapshot,
}

/// The simulated controller: identity, data blocks, RNG, counters.
#[derive(Debug)]
pub struct Plc {
    /// Controller identifier, used in logs and by the Publisher.
    id: String,

    /// Human-readable controller name.
    name: String,

    /// Real-time interval between ticks.
    update_interval: Duration,

    /// Optional tick limit for bounded runs.
    max_ticks: Option<u64>,

    /// The data blocks, keyed by block number.
    blocks: BTreeMap<u16, DataBlock>,

    /// The single random source for all noise and drift draws.
    rng: StdRng,

    /// Shared diagnostic counters.
    metrics: Arc<SimulatorMetrics>,
}

impl Plc {
    /// Build the controller from configuration.
    ///
    /// The RNG is seeded from `plc.seed`, so two controllers built from
    /// the same config produce identical noise and drift sequences.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateBlock`] if two blocks share a
    /// number, or any block- or tag-level construction error. Nothing
    /// is partially constructed on failure.
    pub fn new(config: &SimulatorConfig) -> Result<Self, ConfigError> {
        let mut blocks = BTreeMap::new();
        for block_config in &config.data_blocks {
            let block = DataBlock::new(block_config, &config.simulation)?;
            if blocks.insert(block_config.db_number, block).is_some() {
                return Err(ConfigError::DuplicateBlock {
                    db_number: block_config.db_number,
                });
            }
        }

        let plc = Self {
            id: config.plc.id.clone(),
            name: config.plc.name.clone(),
            update_interval: Duration::from_millis(config.plc.update_rate_ms),
            max_ticks: config.plc.max_ticks,
            blocks,
            rng: StdRng::seed_from_u64(config.plc.seed),
            metrics: Arc::new(SimulatorMetrics::default()),
        };
        info!(
            id = %plc.id,
            name = %plc.name,
            blocks = plc.blocks.len(),
            tags = plc.tag_count(),
            seed = config.plc.seed,
            "Constructed controller"
        );
        Ok(plc)
    }

    /// The controller identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The human-readable controller name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured real-time interval between ticks.
    pub const fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// The configured tick limit for bounded runs, if any.
    pub const fn max_ticks(&self) -> Option<u64> {
        self.max_ticks
    }

    /// A clone of the shared diagnostic counters.
    pub fn metrics(&self) -> Arc<SimulatorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Structure counts plus the live counter snapshot.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            total_blocks: self.blocks.len(),
            total_tags: self.tag_count(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Total number of tags across all blocks.
    pub fn tag_count(&self) -> usize {
        self.blocks
            .values()
            .map(DataBlock::tag_count)
            .fold(0, usize::saturating_add)
    }

    /// Look up a data block by number.
    pub fn block(&self, db_number: u16) -> Option<&DataBlock> {
        self.blocks.get(&db_number)
    }

    /// Iterate blocks in number order.
    pub fn blocks(&self) -> impl Iterator<Item = &DataBlock> {
        self.blocks.values()
    }

    /// Descriptors for every tag, ordered by block number then tag
    /// name. Handed to the Publisher once at startup.
    pub fn descriptors(&self) -> Vec<TagDescriptor> {
        self.blocks
            .values()
            .flat_map(|block| block.tags().map(Tag::descriptor))
            .collect()
    }

    /// Observe a single tag by address.
    ///
    /// Draws from the controller RNG, so interleaving ad-hoc reads with
    /// ticking changes the noise sequence (as a real sensor would).
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::NotFound`] if no tag exists at the address.
    pub fn read(&mut self, address: &TagAddress) -> Result<TagSample, ReadError> {
        let Some(tag) = find_tag(&self.blocks, address) else {
            return Err(ReadError::NotFound {
                address: address.clone(),
            });
        };
        let sample = tag.sample(&mut self.rng);
        self.metrics.record_reads(1);
        Ok(sample)
    }

    /// Apply an external write to the tag at the given address.
    ///
    /// Writes to read-only tags succeed with `applied: false` and leave
    /// the value untouched. Applied writes are visible to the next
    /// observation.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::NotFound`] for an unknown address, or
    /// [`WriteError::Value`] if the value cannot be coerced to the
    /// tag's type. Failed writes never change any tag.
    pub fn write(
        &mut self,
        address: &TagAddress,
        value: &RawValue,
    ) -> Result<WriteOutcome, WriteError> {
        let Some(tag) = find_tag_mut(&mut self.blocks, address) else {
            self.metrics.record_write_rejected();
            warn!(address = %address, "Write to unknown address rejected");
            return Err(WriteError::NotFound {
                address: address.clone(),
            });
        };

        match tag.apply_write(value) {
            Ok(outcome) => {
                if outcome.applied {
                    self.metrics.record_write_applied();
                } else {
                    self.metrics.record_write_ignored();
                }
                Ok(outcome)
            }
            Err(source) => {
                self.metrics.record_write_rejected();
                warn!(address = %address, error = %source, "Write rejected");
                Err(WriteError::Value {
                    address: address.clone(),
                    source,
                })
            }
        }
    }

    /// Advance the simulation by `dt_seconds` and observe every tag.
    ///
    /// Drift is applied first, then each tag is sampled, so the
    /// published values reflect the post-drift state. Samples are
    /// ordered by block number then tag name.
    pub fn tick(&mut self, dt_seconds: f64) -> Vec<TagSample> {
        let rng = &mut self.rng;
        for block in self.blocks.values_mut() {
            for tag in block.tags_mut() {
                tag.advance_simulation(dt_seconds, rng);
            }
        }

        let samples: Vec<TagSample> = self
            .blocks
            .values()
            .flat_map(|block| block.tags())
            .map(|tag| tag.sample(rng))
            .collect();

        self.metrics.record_tick();
        self.metrics
            .record_reads(u64::try_from(samples.len()).unwrap_or(u64::MAX));
        debug!(dt_seconds, samples = samples.len(), "Tick complete");
        samples
    }
}

fn find_tag<'a>(blocks: &'a BTreeMap<u16, DataBlock>, address: &TagAddress) -> Option<&'a Tag> {
    blocks
        .iter()
        .find_map(|(db_number, block)| address.tag_name_in(*db_number).and_then(|n| block.tag(n)))
}

fn find_tag_mut<'a>(
    blocks: &'a mut BTreeMap<u16, DataBlock>,
    address: &TagAddress,
) -> Option<&'a mut Tag> {
    blocks.iter_mut().find_map(|(db_number, block)| {
        address
            .tag_name_in(*db_number)
            .and_then(|n| block.tag_mut(n))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use plcsim_types::{DataType, Quality, TagValue};

    use crate::config::BlockConfig;

    use super::*;

    fn demo_plc() -> Plc {
        Plc::new(&SimulatorConfig::demo()).unwrap()
    }

    #[test]
    fn construction_from_demo_config() {
        let plc = demo_plc();
        assert_eq!(plc.id(), "plc-sim-01");
        assert_eq!(plc.tag_count(), 5);
        assert_eq!(plc.update_interval(), Duration::from_millis(1000));
        assert!(plc.block(1).is_some());
        assert!(plc.block(3).is_none());
    }

    #[test]
    fn duplicate_block_numbers_are_rejected() {
        let mut config = SimulatorConfig::demo();
        config.data_blocks.push(BlockConfig {
            db_number: 1,
            name: "Shadow".to_owned(),
            tags: Vec::new(),
        });
        let result = Plc::new(&config);
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateBlock { db_number: 1 })
        ));
    }

    #[test]
    fn descriptors_cover_every_tag_in_order() {
        let plc = demo_plc();
        let addresses: Vec<String> = plc
            .descriptors()
            .iter()
            .map(|d| d.address.as_str().to_owned())
            .collect();
        assert_eq!(
            addresses,
            vec![
                "DB1.Speed",
                "DB1.Temperature",
                "DB2.Mode",
                "DB2.Recipe",
                "DB2.Running",
            ]
        );
    }

    #[test]
    fn read_unknown_address_is_an_error() {
        let mut plc = demo_plc();
        let result = plc.read(&TagAddress::from_raw("DB9.Nothing"));
        assert!(matches!(result, Err(ReadError::NotFound { .. })));
    }

    #[test]
    fn read_returns_good_quality_sample() {
        let mut plc = demo_plc();
        let sample = plc.read(&TagAddress::new(1, "Temperature")).unwrap();
        assert_eq!(sample.quality, Quality::Good);
        assert_eq!(sample.unit, "degC");
        assert_eq!(plc.metrics().snapshot().reads, 1);
    }

    #[test]
    fn write_flows_update_the_counters() {
        let mut plc = demo_plc();

        let applied = plc
            .write(&TagAddress::new(1, "Speed"), &RawValue::Int(2000))
            .unwrap();
        assert!(applied.applied);

        let ignored = plc
            .write(&TagAddress::new(1, "Temperature"), &RawValue::Float(10.0))
            .unwrap();
        assert!(!ignored.applied);

        let rejected = plc.write(
            &TagAddress::new(1, "Speed"),
            &RawValue::Text("fast".to_owned()),
        );
        assert!(matches!(rejected, Err(WriteError::Value { .. })));

        let missing = plc.write(&TagAddress::from_raw("DB9.Nothing"), &RawValue::Int(0));
        assert!(matches!(missing, Err(WriteError::NotFound { .. })));

        let snapshot = plc.metrics().snapshot();
        assert_eq!(snapshot.writes_applied, 1);
        assert_eq!(snapshot.writes_ignored, 1);
        assert_eq!(snapshot.writes_rejected, 2);
    }

    #[test]
    fn write_clamps_and_is_visible_to_next_read() {
        let mut plc = demo_plc();
        let speed = TagAddress::new(1, "Speed");
        plc.write(&speed, &RawValue::Int(5000)).unwrap();

        let stored = plc.block(1).unwrap().tag("Speed").unwrap().value().clone();
        assert_eq!(stored, TagValue::Int(3000));
    }

    #[test]
    fn status_combines_structure_and_counters() {
        let mut plc = demo_plc();
        let _ = plc.tick(1.0);
        plc.write(&TagAddress::new(1, "Speed"), &RawValue::Int(100))
            .unwrap();

        let status = plc.status();
        assert_eq!(status.total_blocks, 2);
        assert_eq!(status.total_tags, 5);
        assert_eq!(status.metrics.ticks, 1);
        assert_eq!(status.metrics.writes_applied, 1);
    }

    #[test]
    fn tick_publishes_one_sample_per_tag() {
        let mut plc = demo_plc();
        let samples = plc.tick(1.0);
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|s| s.quality == Quality::Good));

        let snapshot = plc.metrics().snapshot();
        assert_eq!(snapshot.ticks, 1);
        assert_eq!(snapshot.reads, 5);
    }

    #[test]
    fn identical_seeds_reproduce_the_run() {
        let mut a = demo_plc();
        let mut b = demo_plc();
        for _ in 0..20 {
            let sa = a.tick(1.0);
            let sb = b.tick(1.0);
            let va: Vec<&TagValue> = sa.iter().map(|s| &s.value).collect();
            let vb: Vec<&TagValue> = sb.iter().map(|s| &s.value).collect();
            assert_eq!(va, vb);
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = demo_plc();
        let mut config = SimulatorConfig::demo();
        config.plc.seed = 1234;
        let mut b = Plc::new(&config).unwrap();

        let temp = |samples: &[TagSample]| {
            samples
                .iter()
                .find(|s| s.address.as_str() == "DB1.Temperature")
                .map(|s| s.value.clone())
                .unwrap()
        };
        let sa = temp(&a.tick(1.0));
        let sb = temp(&b.tick(1.0));
        assert_ne!(sa, sb);
    }

    #[test]
    fn text_tags_pass_through_the_tick_untouched() {
        let mut plc = demo_plc();
        for _ in 0..10 {
            let samples = plc.tick(1.0);
            let recipe = samples
                .iter()
                .find(|s| s.address.as_str() == "DB2.Recipe")
                .unwrap();
            assert_eq!(recipe.value, TagValue::Text("default".to_owned()));
        }
    }

    #[test]
    fn demo_mode_tag_is_a_byte() {
        let plc = demo_plc();
        let mode = plc.block(2).unwrap().tag("Mode").unwrap();
        assert_eq!(mode.data_type(), DataType::Byte);
        assert_eq!(mode.value(), &TagValue::Byte(1));
    }
}
