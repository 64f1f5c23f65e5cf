use std::collections::{BTreeMap, HashMap};

use crate::model::{ControlId, KeyCode};
use crate::util::error::ConfigError;

/// Explicit two-way table between raw key codes and logical controls.
///
/// Built once from the button definitions; raw code = base code + control id.
#[derive(Debug, Clone, Default)]
pub struct ControlMap {
    labels: BTreeMap<ControlId, String>,
    by_code: HashMap<KeyCode, ControlId>,
    by_control: HashMap<ControlId, KeyCode>,
}

impl ControlMap {
    pub fn from_definitions(
        definitions: &BTreeMap<ControlId, String>,
        base_code: u32,
    ) -> Result<Self, ConfigError> {
        let mut map = Self {
            labels: definitions.clone(),
            ..Self::default()
        };
        for &id in definitions.keys() {
            let raw = base_code
                .checked_add(id.0)
                .ok_or(ConfigError::CodeOverflow {
                    base: base_code,
                    id,
                })?;
            map.by_code.insert(KeyCode(raw), id);
            map.by_control.insert(id, KeyCode(raw));
        }
        Ok(map)
    }

    pub fn control_for(&self, code: KeyCode) -> Option<ControlId> {
        self.by_code.get(&code).copied()
    }

    pub fn key_for(&self, id: ControlId) -> Option<KeyCode> {
        self.by_control.get(&id).copied()
    }

    pub fn label(&self, id: ControlId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: ControlId) -> bool {
        self.labels.contains_key(&id)
    }

    /// Raw codes of every defined control, in control order.
    pub fn key_codes(&self) -> Vec<KeyCode> {
        self.labels
            .keys()
            .filter_map(|id| self.key_for(*id))
            .collect()
    }

    pub fn controls(&self) -> impl Iterator<Item = (ControlId, &str)> {
        self.labels.iter().map(|(id, label)| (*id, label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
