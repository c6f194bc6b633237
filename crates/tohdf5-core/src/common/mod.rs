pub mod config;
pub mod record;

pub use config::{
    CatalogColumns, CatalogConfig, ContainerConfig, ContainerFormat, CosmologyConfig,
    IngestConfig, MalformedPolicy, SimulationConfig, SpeciesNaming, TabularConfig,
};
pub use record::{
    Record, RecordError, RecordPayload, SequentialRecordReader, SequentialRecordWriter,
};
