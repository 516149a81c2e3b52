use serde_json::Value;

/// Top-level settings section owned by canopy.
pub const SETTINGS_NAMESPACE: &str = "canopy";

/// Notification that some settings changed, listing the dotted keys that differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigChange {
    pub sections: Vec<String>,
}

impl ConfigChange {
    pub fn new(sections: Vec<String>) -> Self {
        ConfigChange { sections }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// True when `section` itself, one of its children or one of its parents changed.
    pub fn affects(&self, section: &str) -> bool {
        self.sections.iter().any(|changed| {
            changed == section
                || is_child_of(changed, section)
                || is_child_of(section, changed)
        })
    }

    /// Computes the keys that differ between two settings documents.
    pub fn between(old: &Value, new: &Value) -> Self {
        let mut sections = Vec::new();
        diff_into(&mut sections, "", old, new);
        sections.sort();
        ConfigChange { sections }
    }
}

fn is_child_of(key: &str, parent: &str) -> bool {
    key.len() > parent.len() && key.starts_with(parent) && key.as_bytes()[parent.len()] == b'.'
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

fn diff_into(out: &mut Vec<String>, prefix: &str, old: &Value, new: &Value) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_value) in old_map {
                match new_map.get(key) {
                    Some(new_value) => diff_into(out, &join(prefix, key), old_value, new_value),
                    None => out.push(join(prefix, key)),
                }
            }
            for key in new_map.keys() {
                if !old_map.contains_key(key) {
                    out.push(join(prefix, key));
                }
            }
        }
        _ if old != new => out.push(prefix.to_owned()),
        _ => {}
    }
}
