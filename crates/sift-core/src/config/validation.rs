//! Config validation - warns about unknown fields

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Validate config JSON and warn about unknown fields.
pub fn warn_unknown_fields(content: &str, config_name: &str) {
    for path in unknown_fields(content) {
        warn!("Unknown config field in {config_name}: {path}");
    }
}

/// Paths of unknown fields, e.g. `help.colour` or `plugins[1].exec`
#[must_use]
pub fn unknown_fields(content: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<Value>(content) else {
        return Vec::new();
    };

    find_unknown_keys(&value, &expected_config_keys(), "")
}

fn find_unknown_keys(value: &Value, expected: &ExpectedKeys, prefix: &str) -> Vec<String> {
    let mut unknowns = Vec::new();

    let Value::Object(obj) = value else {
        return unknowns;
    };

    for (key, child) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        if let Some(nested) = expected.nested.get(key.as_str()) {
            unknowns.extend(find_unknown_keys(child, nested, &path));
        } else if let Some(item) = expected.items.get(key.as_str()) {
            if let Value::Array(entries) = child {
                for (i, entry) in entries.iter().enumerate() {
                    unknowns.extend(find_unknown_keys(entry, item, &format!("{path}[{i}]")));
                }
            }
        } else if !expected.fields.contains(key.as_str()) {
            unknowns.push(path);
        }
    }

    unknowns
}

/// Expected keys for a config section.
/// `fields` are leaf fields, `nested` are nested objects and `items` are
/// arrays of objects, each with their own expected keys.
struct ExpectedKeys {
    fields: HashSet<&'static str>,
    nested: HashMap<&'static str, ExpectedKeys>,
    items: HashMap<&'static str, ExpectedKeys>,
}

impl ExpectedKeys {
    fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.iter().copied().collect(),
            nested: HashMap::new(),
            items: HashMap::new(),
        }
    }

    fn with_nested(mut self, key: &'static str, nested: ExpectedKeys) -> Self {
        self.nested.insert(key, nested);
        self
    }

    fn with_items(mut self, key: &'static str, item: ExpectedKeys) -> Self {
        self.items.insert(key, item);
        self
    }
}

fn expected_config_keys() -> ExpectedKeys {
    let help_keys = ExpectedKeys::new(&["showAll", "enableCompletion"]);

    let plugin_keys = ExpectedKeys::new(&[
        "command",
        "executable",
        "mode",
        "placement",
        "description",
        "hint",
        "icon",
        "delay",
    ]);

    ExpectedKeys::new(&["commandLeader", "visibleCommand", "typeAhead"])
        .with_nested("help", help_keys)
        .with_items("plugins", plugin_keys)
}
