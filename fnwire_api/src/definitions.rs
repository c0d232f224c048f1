// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT

/// Developer-supplied configuration of one remotely-invocable function.
///
/// Only `id` and `name` are interpreted (for logging); every other key is
/// carried in `options` and handed to the dispatcher untouched.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl FunctionDefinition {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            options: serde_json::Map::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Add a pass-through option, e.g. `concurrency` or `retries`.
    pub fn with_option(mut self, key: &str, value: serde_json::Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }
}

/// One activation condition of a function, e.g. `{"event": "user/created"}`
/// or `{"cron": "0 2 * * *"}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TriggerDefinition(pub serde_json::Value);

impl TriggerDefinition {
    pub fn event(name: &str) -> Self {
        Self(serde_json::json!({ "event": name }))
    }

    pub fn cron(expression: &str) -> Self {
        Self(serde_json::json!({ "cron": expression }))
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Entries dropped while flattening trigger records: `null`, `false`,
    /// numeric zero and the empty string. Objects and arrays are always kept.
    pub fn is_falsy(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::Bool(b) => !b,
            serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
            serde_json::Value::String(s) => s.is_empty(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
        }
    }

    /// Serialization used as the deduplication key.
    ///
    /// Object keys are emitted in sorted order at every depth, so the key does
    /// not depend on insertion order (nor on serde_json's `preserve_order`).
    pub fn canonical_key(&self) -> String {
        let mut out = String::new();
        write_canonical(&self.0, &mut out);
        out
    }
}

impl From<serde_json::Value> for TriggerDefinition {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(key) {
                    write_canonical(inner, out);
                }
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Normalized trigger payload handed to the dispatcher.
///
/// The downstream SDK distinguishes a lone trigger from a list of one, so the
/// variant must follow the number of unique triggers exactly.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TriggerArgument {
    #[default]
    Absent,
    Single(TriggerDefinition),
    Many(Vec<TriggerDefinition>),
}

impl TriggerArgument {
    /// 0 triggers -> `Absent`, 1 -> `Single`, more -> `Many` in the given order.
    pub fn collapse(mut unique_triggers: Vec<TriggerDefinition>) -> Self {
        match unique_triggers.len() {
            0 => TriggerArgument::Absent,
            1 => TriggerArgument::Single(unique_triggers.remove(0)),
            _ => TriggerArgument::Many(unique_triggers),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, TriggerArgument::Absent)
    }

    pub fn len(&self) -> usize {
        match self {
            TriggerArgument::Absent => 0,
            TriggerArgument::Single(_) => 1,
            TriggerArgument::Many(triggers) => triggers.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> serde_json::Value {
        match self {
            TriggerArgument::Absent => serde_json::Value::Null,
            TriggerArgument::Single(trigger) => trigger.0.clone(),
            TriggerArgument::Many(triggers) => serde_json::Value::Array(triggers.iter().map(|t| t.0.clone()).collect()),
        }
    }
}

impl serde::Serialize for TriggerArgument {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TriggerArgument::Absent => serializer.serialize_none(),
            TriggerArgument::Single(trigger) => trigger.serialize(serializer),
            TriggerArgument::Many(triggers) => triggers.serialize(serializer),
        }
    }
}

impl std::fmt::Display for TriggerArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
