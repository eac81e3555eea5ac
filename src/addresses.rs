use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::de::{DeserializeOwned, Error as DeError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::StimResult;

/// Where one sub-task's instruction body lands in the final stream.
/// `actual_line` is 1-based, `origin_addr` its 0-based twin; both are kept
/// in the sidecar because the hardware schema expects both spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAddress {
    pub actual_line: usize,
    pub origin_addr: usize,
    pub instruction_nums: usize,
}

/// Where one sub-task's data blocks land in the final stream, all 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAddress {
    #[serde(rename = "inputData_addr")]
    pub input_data_addr: usize,
    #[serde(rename = "weightData_addr")]
    pub weight_data_addr: usize,
    #[serde(rename = "outputData_addr")]
    pub output_data_addr: usize,
    pub weight_lines: usize,
    pub output_lines: usize,
}

/// Nested per-layer, per-task record map backing the JSON sidecars.
/// Keys serialize as `"<i>_layer"` / `"<j>_task"`; the task index is
/// global across the whole network, not per-layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressMap<T> {
    layers: BTreeMap<usize, BTreeMap<usize, T>>,
}

pub type TaskAddressMap = AddressMap<TaskAddress>;
pub type DataAddressMap = AddressMap<DataAddress>;

impl<T> Default for AddressMap<T> {
    fn default() -> Self {
        Self { layers: BTreeMap::new() }
    }
}

impl<T> AddressMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: usize, task: usize, record: T) {
        self.layers.entry(layer).or_default().insert(task, record);
    }

    pub fn get(&self, layer: usize, task: usize) -> Option<&T> {
        self.layers.get(&layer)?.get(&task)
    }

    /// Layers in ascending index order, each with its tasks in ascending
    /// global-index order.
    pub fn layers(&self) -> impl Iterator<Item = (usize, &BTreeMap<usize, T>)> {
        self.layers.iter().map(|(&layer, tasks)| (layer, tasks))
    }

    /// The record of the layer's lowest-indexed sub-task.
    pub fn first_task(&self, layer: usize) -> Option<&T> {
        self.layers.get(&layer)?.values().next()
    }

    pub fn total_tasks(&self) -> usize {
        self.layers.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<T: Serialize> AddressMap<T> {
    pub fn save(&self, path: &Path) -> StimResult<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl<T: DeserializeOwned> AddressMap<T> {
    pub fn load(path: &Path) -> StimResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

struct TaskEntries<'a, T>(&'a BTreeMap<usize, T>);

impl<T: Serialize> Serialize for TaskEntries<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (task, record) in self.0 {
            map.serialize_entry(&format!("{task}_task"), record)?;
        }
        map.end()
    }
}

impl<T: Serialize> Serialize for AddressMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.layers.len()))?;
        for (layer, tasks) in &self.layers {
            map.serialize_entry(&format!("{layer}_layer"), &TaskEntries(tasks))?;
        }
        map.end()
    }
}

fn parse_index(key: &str, suffix: &str) -> Option<usize> {
    key.strip_suffix(suffix)?.parse().ok()
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for AddressMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, BTreeMap<String, T>>::deserialize(deserializer)?;
        let mut layers: BTreeMap<usize, BTreeMap<usize, T>> = BTreeMap::new();
        for (layer_key, tasks) in raw {
            let layer = parse_index(&layer_key, "_layer")
                .ok_or_else(|| D::Error::custom(format!("bad layer key {layer_key:?}")))?;
            let mut parsed = BTreeMap::new();
            for (task_key, record) in tasks {
                let task = parse_index(&task_key, "_task")
                    .ok_or_else(|| D::Error::custom(format!("bad task key {task_key:?}")))?;
                parsed.insert(task, record);
            }
            layers.insert(layer, parsed);
        }
        Ok(Self { layers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_key_format_round_trips() {
        let mut map = TaskAddressMap::new();
        map.insert(1, 1, TaskAddress { actual_line: 1537, origin_addr: 1536, instruction_nums: 37 });
        map.insert(1, 2, TaskAddress { actual_line: 1793, origin_addr: 1792, instruction_nums: 12 });
        map.insert(2, 3, TaskAddress { actual_line: 2049, origin_addr: 2048, instruction_nums: 9 });

        let json = serde_json::to_string_pretty(&map).unwrap();
        assert!(json.contains("\"1_layer\""));
        assert!(json.contains("\"3_task\""));
        assert!(json.contains("\"origin_addr\": 1536"));

        let loaded: TaskAddressMap = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, map);
        assert_eq!(loaded.total_tasks(), 3);
        assert_eq!(loaded.first_task(2).unwrap().origin_addr, 2048);
    }

    #[test]
    fn data_record_uses_schema_spellings() {
        let record = DataAddress {
            input_data_addr: 1578,
            weight_data_addr: 1587,
            output_data_addr: 1604,
            weight_lines: 12,
            output_lines: 2,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"inputData_addr\":1578"));
        assert!(json.contains("\"weightData_addr\":1587"));
        assert!(json.contains("\"outputData_addr\":1604"));
        assert!(json.contains("\"weight_lines\":12"));
    }

    #[test]
    fn rejects_malformed_keys() {
        let err = serde_json::from_str::<TaskAddressMap>(r#"{"layer_one": {}}"#);
        assert!(err.is_err());
    }
}
