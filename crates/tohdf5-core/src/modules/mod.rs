pub mod aggregate;
pub mod catalog;
pub mod container;
pub mod discovery;
pub mod pipeline;
pub mod simulation;
pub mod snapshot;
pub mod tabular;

pub use aggregate::{AppendOutcome, Aggregator, GroupingRule};
pub use catalog::{CatalogReader, CsvCatalogReader, SkyCatalog, ingest_catalogs};
pub use container::{ContainerWriter, MemoryContainer, commit_container, write_container};
pub use discovery::{Discovery, TypedPath, expand_patterns, list_directory};
pub use pipeline::IngestOutcome;
pub use simulation::{SimulationInput, ingest_simulation, ingest_snapshot_files};
pub use tabular::{ColumnMapping, ingest_tabular, read_tabular};
