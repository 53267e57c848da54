use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MalformedManifestError;

/// Kubernetes manifest kept as an ordered document tree.
///
/// Fields the launcher does not know about are carried through untouched, so
/// templates may use any Job feature the cluster understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Value);

impl Manifest {
    pub fn new(value: Value) -> Self {
        Manifest(value)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str(&["metadata", "name"])
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get_str(&["metadata", "namespace"])
    }

    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.0, |value, key| value.get(*key))
    }

    pub fn get_mut(&mut self, path: &[&str]) -> Option<&mut Value> {
        path.iter()
            .try_fold(&mut self.0, |value, key| value.get_mut(*key))
    }

    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Returns the mapping at `path`, creating missing (or null) levels on the way.
    pub fn mapping_mut(
        &mut self,
        path: &[&str],
    ) -> Result<&mut Map<String, Value>, MalformedManifestError> {
        let mut current = &mut self.0;
        for (depth, key) in path.iter().enumerate() {
            let mapping = as_mapping_mut(current, &path[..depth])?;
            current = mapping.entry(key.to_string()).or_insert(Value::Null);
        }
        as_mapping_mut(current, path)
    }

    /// Sets `path` to `value`, overwriting whatever was there.
    pub fn set(&mut self, path: &[&str], value: Value) -> Result<(), MalformedManifestError> {
        match path.split_last() {
            Some((last, parent)) => {
                self.mapping_mut(parent)?.insert(last.to_string(), value);
            }
            None => self.0 = value,
        }
        Ok(())
    }
}

fn as_mapping_mut<'a>(
    value: &'a mut Value,
    path: &[&str],
) -> Result<&'a mut Map<String, Value>, MalformedManifestError> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value
        .as_object_mut()
        .ok_or_else(|| MalformedManifestError::NotAMapping(display_path(path)))
}

pub(crate) fn display_path(path: &[&str]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}
