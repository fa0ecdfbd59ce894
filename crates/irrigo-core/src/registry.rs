//! Valve registry: logical valve id → physical channel and display name.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::types::{PhysicalId, ValveId};

/// Registry shared between the controller, the device client and the
/// status synchroniser. The controller is the only writer.
pub type SharedRegistry = Arc<RwLock<ValveRegistry>>;

/// One row of the valve settings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveInfo {
    pub id: ValveId,
    /// Explicit physical mapping, if any.
    pub physical: Option<PhysicalId>,
    /// Explicit display name, if any.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValveRegistry {
    mapping: BTreeMap<ValveId, PhysicalId>,
    names: BTreeMap<ValveId, String>,
}

impl ValveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = ValveInfo>) -> Self {
        let mut registry = Self::new();
        for row in rows {
            if let Some(physical) = row.physical {
                registry.set_mapping(row.id, physical);
            }
            if let Some(name) = row.name {
                registry.set_name(row.id, name);
            }
        }
        registry
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Physical channel for `id`. Unmapped valves are addressed by their
    /// logical id so an unconfigured setup still works.
    pub fn resolve_physical(&self, id: ValveId) -> PhysicalId {
        self.mapping.get(&id).copied().unwrap_or(id)
    }

    pub fn display_name(&self, id: ValveId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Valve {id}"))
    }

    /// Reverse lookup used when parsing `status` replies.
    ///
    /// Duplicate physical mappings are allowed; the lowest logical id wins.
    pub fn logical_for(&self, physical: PhysicalId) -> Option<ValveId> {
        self.known_ids()
            .into_iter()
            .find(|id| self.resolve_physical(*id) == physical)
    }

    pub fn set_mapping(&mut self, id: ValveId, physical: PhysicalId) {
        self.mapping.insert(id, physical);
    }

    pub fn set_name(&mut self, id: ValveId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn contains(&self, id: ValveId) -> bool {
        self.mapping.contains_key(&id) || self.names.contains_key(&id)
    }

    /// Every valve with a mapping or a name, ascending.
    pub fn known_ids(&self) -> Vec<ValveId> {
        self.mapping
            .keys()
            .chain(self.names.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn rows(&self) -> Vec<ValveInfo> {
        self.known_ids()
            .into_iter()
            .map(|id| ValveInfo {
                id,
                physical: self.mapping.get(&id).copied(),
                name: self.names.get(&id).cloned(),
            })
            .collect()
    }
}
