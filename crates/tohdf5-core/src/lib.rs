//! Particle ingestion into per-type columnar containers.
//!
//! Three ingestion paths (sky catalogs, delimited tables, simulation
//! snapshots) share discovery, aggregation and the container writer.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;
