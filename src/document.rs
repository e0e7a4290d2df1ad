//! # Remote Config Document
//!
//! Typed view of a Remote Config template. Only the parts this tool edits are
//! modelled; everything else rides along in `extra` maps so that a fetched
//! document serializes back without losing fields.

use crate::updates::UpdateRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The whole remote configuration of one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigDocument {
    /// Targeting rules. Opaque to this tool and never modified.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParameterSpec>,
    /// Server-assigned version metadata; read but never sent back.
    #[serde(default, skip_serializing)]
    pub version: Option<Value>,
    /// `parameterGroups` and any other top-level field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ParameterValue>,
    /// `conditionalValues`, `description`, `valueType`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_in_app_default: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParameterValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

impl RemoteConfigDocument {
    /// Insert-or-replace the default value of a single parameter. Other fields
    /// of an existing parameter are kept; a new parameter gets only a default.
    pub fn set_default_value(&mut self, name: &str, value: &str) {
        self.parameters
            .entry(name.to_string())
            .or_default()
            .default_value = Some(ParameterValue::literal(value));
    }

    /// Builds the document to write back: a copy of `self` with every
    /// parameter named in `updates` carrying its new default value.
    pub fn with_default_values(&self, updates: &UpdateRequest) -> RemoteConfigDocument {
        let mut update = RemoteConfigDocument {
            conditions: self.conditions.clone(),
            parameters: self.parameters.clone(),
            version: None,
            extra: self.extra.clone(),
        };
        for (name, value) in updates.iter() {
            update.set_default_value(name, value);
        }
        update
    }
}
