//! Host resource table seen during the resource phase

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("invalid resource name '{0}', expected type/name")]
    InvalidName(String),
}

/// The part of the host's resource table the engine may extend
pub trait ResourceTable {
    /// Register a module resource and return its id in the host table.
    /// Registering the same name twice returns the same id.
    fn add_resource(&mut self, name: &str) -> Result<u32, ResourceError>;

    fn identifier(&self, name: &str) -> Option<u32>;
}

/// First id handed out for module resources
const MODULE_ID_BASE: u32 = 0x7e00_0000;

#[derive(Debug, Clone, Default)]
pub struct MemoryResourceTable {
    ids: BTreeMap<String, u32>,
}

impl MemoryResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl ResourceTable for MemoryResourceTable {
    fn add_resource(&mut self, name: &str) -> Result<u32, ResourceError> {
        match name.split_once('/') {
            Some((kind, entry)) if !kind.is_empty() && !entry.is_empty() => {}
            _ => return Err(ResourceError::InvalidName(name.to_string())),
        }
        if let Some(id) = self.ids.get(name) {
            return Ok(*id);
        }
        let id = MODULE_ID_BASE + self.ids.len() as u32;
        self.ids.insert(name.to_string(), id);
        Ok(id)
    }

    fn identifier(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable_per_name() {
        let mut table = MemoryResourceTable::new();
        let a = table.add_resource("drawable/ic_a").unwrap();
        let b = table.add_resource("drawable/ic_b").unwrap();
        assert_ne!(a, b);
        assert_eq!(table.add_resource("drawable/ic_a").unwrap(), a);
        assert_eq!(table.identifier("drawable/ic_b"), Some(b));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_rejects_bare_names() {
        let mut table = MemoryResourceTable::new();
        assert!(table.add_resource("ic_a").is_err());
        assert!(table.add_resource("drawable/").is_err());
    }
}
