//! Output container: the three write operations every backend provides, plus
//! the layout written on top of them.

#[cfg(feature = "hdf5")]
mod hdf5_backend;
mod memory;

#[cfg(feature = "hdf5")]
pub use hdf5_backend::Hdf5Container;
pub use memory::{MemoryContainer, MemoryDataset, MemoryGroup};

use crate::common::ContainerFormat;
use crate::domain::{
    BOX_SIZE_ATTRIBUTE, COORDINATES_DATASET, ContainerHeader, Group, HEADER_GROUP, IngestError,
    IngestResult, LUMINOSITY_DATASET, RADIUS_DATASET,
};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub type ContainerResult<T> = Result<T, ContainerError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Float(f64),
    Text(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("group '{0}' already exists")]
    DuplicateGroup(String),
    #[error("group '{0}' does not exist")]
    MissingGroup(String),
    #[error("dataset '{group}/{dataset}' already exists")]
    DuplicateDataset { group: String, dataset: String },
    #[error("dataset '{group}/{dataset}' has shape {shape:?} but {len} values were given")]
    ShapeMismatch {
        group: String,
        dataset: String,
        shape: [usize; 2],
        len: usize,
    },
    #[error("container backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContainerError {
    fn into_ingest_error(self, path: &Path) -> IngestError {
        let message = format!("failed to write container '{}': {}", path.display(), self);
        match self {
            Self::Io(_) | Self::Backend(_) => IngestError::io_system("IO.CONTAINER_WRITE", message),
            _ => IngestError::internal("SYS.CONTAINER_LAYOUT", message),
        }
    }
}

/// Hierarchical store with groups, attributes and 2-D real datasets.
pub trait ContainerWriter {
    fn create_group(&mut self, name: &str) -> ContainerResult<()>;

    fn set_group_attribute(
        &mut self,
        group: &str,
        name: &str,
        value: AttributeValue,
    ) -> ContainerResult<()>;

    /// `data` is row-major with `shape[0] * shape[1]` values.
    fn create_dataset(
        &mut self,
        group: &str,
        name: &str,
        shape: [usize; 2],
        data: &[f64],
    ) -> ContainerResult<()>;
}

pub(crate) fn check_shape(
    group: &str,
    dataset: &str,
    shape: [usize; 2],
    data: &[f64],
) -> ContainerResult<()> {
    if shape[0] * shape[1] != data.len() {
        return Err(ContainerError::ShapeMismatch {
            group: group.to_string(),
            dataset: dataset.to_string(),
            shape,
            len: data.len(),
        });
    }
    Ok(())
}

/// Writes the header and every group through `writer`.
pub fn write_container<W>(
    writer: &mut W,
    header: &ContainerHeader,
    groups: &[Group],
) -> ContainerResult<()>
where
    W: ContainerWriter + ?Sized,
{
    writer.create_group(HEADER_GROUP)?;
    writer.set_group_attribute(
        HEADER_GROUP,
        BOX_SIZE_ATTRIBUTE,
        AttributeValue::Float(header.box_size),
    )?;

    for group in groups {
        let name = group.name();
        info!(
            group = %name,
            key = %group.particle_type.key,
            particles = group.len(),
            "writing type"
        );
        writer.create_group(&name)?;
        if let Some(provenance) = &group.provenance {
            writer.set_group_attribute(
                &name,
                provenance.attribute,
                AttributeValue::Text(provenance.value.clone()),
            )?;
        }

        let flat: Vec<f64> = group.coordinates.iter().flatten().copied().collect();
        writer.create_dataset(&name, COORDINATES_DATASET, [group.len(), 3], &flat)?;
        if let Some(radius) = &group.radius {
            writer.create_dataset(&name, RADIUS_DATASET, [radius.len(), 1], radius)?;
        }
        if let Some(luminosity) = &group.luminosity {
            writer.create_dataset(&name, LUMINOSITY_DATASET, [luminosity.len(), 1], luminosity)?;
        }
    }
    Ok(())
}

/// Writes the container to `path` in one step.
///
/// Data goes to a temporary file next to `path` which is renamed over it only
/// after every group was written, so a failed run leaves no container behind.
pub fn commit_container(
    path: &Path,
    format: ContainerFormat,
    header: &ContainerHeader,
    groups: &[Group],
) -> IngestResult<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staging = tempfile::Builder::new()
        .prefix(".tohdf5-")
        .suffix(".partial")
        .tempfile_in(directory)
        .map_err(|source| ContainerError::Io(source).into_ingest_error(path))?;

    match format {
        ContainerFormat::Json => {
            let mut container = MemoryContainer::new();
            write_container(&mut container, header, groups)
                .map_err(|error| error.into_ingest_error(path))?;
            let encoded = serde_json::to_vec_pretty(&container).map_err(|source| {
                ContainerError::Backend(source.to_string()).into_ingest_error(path)
            })?;
            staging
                .write_all(&encoded)
                .and_then(|()| staging.flush())
                .map_err(|source| ContainerError::Io(source).into_ingest_error(path))?;
        }
        ContainerFormat::Hdf5 => write_hdf5(staging.path(), header, groups)
            .map_err(|error| error.into_ingest_error(path))?,
    }

    staging
        .persist(path)
        .map_err(|error| ContainerError::Io(error.error).into_ingest_error(path))?;
    info!(path = %path.display(), groups = groups.len(), "container committed");
    Ok(())
}

#[cfg(feature = "hdf5")]
fn write_hdf5(staging: &Path, header: &ContainerHeader, groups: &[Group]) -> ContainerResult<()> {
    let mut container = Hdf5Container::create(staging)?;
    write_container(&mut container, header, groups)?;
    container.close()
}

#[cfg(not(feature = "hdf5"))]
fn write_hdf5(
    _staging: &Path,
    _header: &ContainerHeader,
    _groups: &[Group],
) -> ContainerResult<()> {
    Err(ContainerError::Backend(
        "HDF5 output requires building with the `hdf5` feature".to_string(),
    ))
}
