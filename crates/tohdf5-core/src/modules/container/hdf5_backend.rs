use super::{AttributeValue, ContainerError, ContainerResult, ContainerWriter, check_shape};
use hdf5::types::VarLenUnicode;
use hdf5::{File, Group};
use std::path::Path;
use std::str::FromStr;

impl From<hdf5::Error> for ContainerError {
    fn from(error: hdf5::Error) -> Self {
        Self::Backend(error.to_string())
    }
}

/// HDF5 file backend. Groups are created at the file root.
pub struct Hdf5Container {
    file: File,
}

impl Hdf5Container {
    pub fn create(path: &Path) -> ContainerResult<Self> {
        Ok(Self {
            file: File::create(path)?,
        })
    }

    pub fn close(self) -> ContainerResult<()> {
        self.file.flush()?;
        Ok(())
    }

    fn group(&self, name: &str) -> ContainerResult<Group> {
        self.file
            .group(name)
            .map_err(|_| ContainerError::MissingGroup(name.to_string()))
    }
}

impl ContainerWriter for Hdf5Container {
    fn create_group(&mut self, name: &str) -> ContainerResult<()> {
        if self.file.link_exists(name) {
            return Err(ContainerError::DuplicateGroup(name.to_string()));
        }
        self.file.create_group(name)?;
        Ok(())
    }

    fn set_group_attribute(
        &mut self,
        group: &str,
        name: &str,
        value: AttributeValue,
    ) -> ContainerResult<()> {
        let target = self.group(group)?;
        match value {
            AttributeValue::Float(value) => {
                target.new_attr::<f64>().create(name)?.write_scalar(&value)?;
            }
            AttributeValue::Text(value) => {
                let value = VarLenUnicode::from_str(&value)
                    .map_err(|error| {
                        ContainerError::Backend(format!("invalid attribute text: {error}"))
                    })?;
                target
                    .new_attr::<VarLenUnicode>()
                    .create(name)?
                    .write_scalar(&value)?;
            }
        }
        Ok(())
    }

    fn create_dataset(
        &mut self,
        group: &str,
        name: &str,
        shape: [usize; 2],
        data: &[f64],
    ) -> ContainerResult<()> {
        let target = self.group(group)?;
        if target.link_exists(name) {
            return Err(ContainerError::DuplicateDataset {
                group: group.to_string(),
                dataset: name.to_string(),
            });
        }
        check_shape(group, name, shape, data)?;
        let dataset = target
            .new_dataset::<f64>()
            .shape((shape[0], shape[1]))
            .create(name)?;
        if !data.is_empty() {
            dataset.write_raw(data)?;
        }
        Ok(())
    }
}
