use super::{AttributeValue, ContainerError, ContainerResult, ContainerWriter, check_shape};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryDataset {
    pub shape: [usize; 2],
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MemoryGroup {
    pub attributes: IndexMap<String, AttributeValue>,
    pub datasets: IndexMap<String, MemoryDataset>,
}

/// Container held entirely in memory; serializes as nested JSON objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MemoryContainer {
    groups: IndexMap<String, MemoryGroup>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    pub fn group(&self, name: &str) -> Option<&MemoryGroup> {
        self.groups.get(name)
    }

    pub fn attribute(&self, group: &str, name: &str) -> Option<&AttributeValue> {
        self.group(group)?.attributes.get(name)
    }

    pub fn dataset(&self, group: &str, name: &str) -> Option<&MemoryDataset> {
        self.group(group)?.datasets.get(name)
    }

    fn group_mut(&mut self, name: &str) -> ContainerResult<&mut MemoryGroup> {
        self.groups
            .get_mut(name)
            .ok_or_else(|| ContainerError::MissingGroup(name.to_string()))
    }
}

impl ContainerWriter for MemoryContainer {
    fn create_group(&mut self, name: &str) -> ContainerResult<()> {
        if self.groups.contains_key(name) {
            return Err(ContainerError::DuplicateGroup(name.to_string()));
        }
        self.groups.insert(name.to_string(), MemoryGroup::default());
        Ok(())
    }

    fn set_group_attribute(
        &mut self,
        group: &str,
        name: &str,
        value: AttributeValue,
    ) -> ContainerResult<()> {
        self.group_mut(group)?
            .attributes
            .insert(name.to_string(), value);
        Ok(())
    }

    fn create_dataset(
        &mut self,
        group: &str,
        name: &str,
        shape: [usize; 2],
        data: &[f64],
    ) -> ContainerResult<()> {
        let target = self.group_mut(group)?;
        if target.datasets.contains_key(name) {
            return Err(ContainerError::DuplicateDataset {
                group: group.to_string(),
                dataset: name.to_string(),
            });
        }
        check_shape(group, name, shape, data)?;
        target.datasets.insert(
            name.to_string(),
            MemoryDataset {
                shape,
                data: data.to_vec(),
            },
        );
        Ok(())
    }
}
