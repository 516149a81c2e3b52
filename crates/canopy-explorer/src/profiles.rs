//! Pure operations on a persisted profile list.

use serde_json::Value;

use crate::error::{ExplorerError, Result};

/// Parses a stored profile list. A missing value is an empty list.
pub fn parse_profile_list(key: &str, raw: Option<&str>) -> Result<Vec<Value>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(profiles)) => Ok(profiles),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(other) => Err(ExplorerError::ConfigParse {
            profile: key.to_owned(),
            reason: format!("expected a JSON array, found {other}"),
        }),
        Err(err) => Err(ExplorerError::ConfigParse {
            profile: key.to_owned(),
            reason: err.to_string(),
        }),
    }
}

/// Keeps, in their original order, the profiles whose name was not selected.
pub fn retain_unselected<F>(profiles: Vec<Value>, selected: &[String], name: F) -> Vec<Value>
where
    F: Fn(&Value) -> String,
{
    profiles
        .into_iter()
        .filter(|profile| {
            let profile_name = name(profile);
            !selected.iter().any(|s| *s == profile_name)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Updated,
}

/// Adds `incoming` to the list, or merges it into the entry with the same name.
///
/// Entries rejected by `valid` are dropped along the way.
pub fn upsert<N, V, M>(
    profiles: Vec<Value>,
    incoming: Value,
    name: N,
    valid: V,
    merge: M,
) -> (Vec<Value>, Upsert)
where
    N: Fn(&Value) -> String,
    V: Fn(&Value) -> bool,
    M: Fn(&mut Value, &Value),
{
    let incoming_name = name(&incoming);
    let mut outcome = Upsert::Added;
    let mut kept = Vec::with_capacity(profiles.len() + 1);

    for mut profile in profiles {
        if !valid(&profile) {
            tracing::debug!("Dropping invalid profile {}", profile);
            continue;
        }
        if name(&profile) == incoming_name {
            merge(&mut profile, &incoming);
            outcome = Upsert::Updated;
        }
        kept.push(profile);
    }
    if outcome == Upsert::Added {
        kept.push(incoming);
    }
    (kept, outcome)
}
