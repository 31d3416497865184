//! Tag simulation engine for the PLC data-plane simulator.
//!
//! This crate owns the data model and the tick loop that make a set of
//! configured process variables ("tags") behave like a live controller:
//! read-only tags drift slowly like sensors, every numeric observation
//! carries transient Gaussian noise, and external writes land on
//! writable tags between ticks.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `plcsim-config.yaml` into
//!   strongly-typed structs.
//! - [`tag`] -- The tag model: value observation, external writes, and
//!   the per-tick drift step.
//! - [`block`] -- Data blocks: named, numbered tag collections.
//! - [`plc`] -- The composition root owning all blocks, the seeded RNG,
//!   and the diagnostic counters.
//! - [`control`] -- The `Idle -> Running -> Stopping -> Stopped` run
//!   state machine shared between the loop and the control plane.
//! - [`metrics`] -- Lock-free diagnostic counters and their snapshot.
//! - [`publisher`] -- The [`Publisher`] trait plus null and bounded
//!   channel implementations.
//! - [`runner`] -- The periodic tick loop driving the whole engine.
//!
//! [`Publisher`]: publisher::Publisher

pub mod block;
pub mod config;
pub mod control;
pub mod metrics;
pub mod plc;
pub mod publisher;
pub mod runner;
pub mod tag;
