//! Layered configuration store.
//!
//! A [`ConfigStore`] answers dotted-path queries such as `app.api.base_url`
//! from three layers, highest precedence first:
//!
//! 1. **explicit**: values the application or its config file set
//! 2. **implicit**: framework and module defaults
//! 3. **live**: providers re-evaluated on every query
//!
//! The live layer is consulted only when the store runs in
//! [`RuntimeMode::Server`]. When the winning value and lower-layer values
//! are all tables they are merged key by key, so a default table keeps the
//! keys an explicit table does not override.

use crate::{ConfigError, RuntimeMode};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A store layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Set by the application.
    Explicit,
    /// Defaults.
    Implicit,
    /// Computed per query.
    Live,
}

type LiveFn = Arc<dyn Fn() -> Option<Value> + Send + Sync>;

/// Hierarchical key-value configuration with layer precedence.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use switchyard_config::{ConfigStore, RuntimeMode};
///
/// let store = ConfigStore::new(RuntimeMode::Server);
/// store.set_default("app.api.timeout_ms", json!(5000)).unwrap();
/// store.set("app.api.timeout_ms", json!(250)).unwrap();
///
/// let timeout: u64 = store.get_as("app.api.timeout_ms").unwrap().unwrap();
/// assert_eq!(timeout, 250);
/// ```
pub struct ConfigStore {
    mode: RuntimeMode,
    explicit: RwLock<Value>,
    implicit: RwLock<Value>,
    live: RwLock<BTreeMap<String, LiveFn>>,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("mode", &self.mode)
            .field("explicit", &*self.explicit.read())
            .field("implicit", &*self.implicit.read())
            .field("live", &self.live.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(RuntimeMode::default())
    }
}

impl ConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(mode: RuntimeMode) -> Self {
        Self {
            mode,
            explicit: RwLock::new(Value::Object(Map::new())),
            implicit: RwLock::new(Value::Object(Map::new())),
            live: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the runtime mode.
    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// Sets an explicit value.
    pub fn set(&self, path: &str, value: Value) -> Result<(), ConfigError> {
        let segments = parse_path(path)?;
        insert(&mut self.explicit.write(), &segments, value);
        Ok(())
    }

    /// Sets an implicit (default) value.
    pub fn set_default(&self, path: &str, value: Value) -> Result<(), ConfigError> {
        let segments = parse_path(path)?;
        insert(&mut self.implicit.write(), &segments, value);
        Ok(())
    }

    /// Serializes `value` and stores it explicitly.
    pub fn set_serialized<T: Serialize>(&self, path: &str, value: &T) -> Result<(), ConfigError> {
        let value = serde_json::to_value(value)?;
        self.set(path, value)
    }

    /// Registers a live provider for `path`.
    ///
    /// The provider runs on every query that touches `path`. Returning
    /// `None` means "no value right now".
    pub fn set_live<F>(&self, path: &str, provider: F) -> Result<(), ConfigError>
    where
        F: Fn() -> Option<Value> + Send + Sync + 'static,
    {
        parse_path(path)?;
        self.live.write().insert(path.to_string(), Arc::new(provider));
        Ok(())
    }

    /// Deep-merges a table into the explicit layer.
    pub fn merge_explicit(&self, table: Value) -> Result<(), ConfigError> {
        merge_table(&mut self.explicit.write(), table)
    }

    /// Deep-merges a table into the implicit layer.
    pub fn merge_defaults(&self, table: Value) -> Result<(), ConfigError> {
        merge_table(&mut self.implicit.write(), table)
    }

    /// Removes an explicit value, returning it.
    pub fn remove(&self, path: &str) -> Option<Value> {
        let segments = parse_path(path).ok()?;
        let (last, parents) = segments.split_last()?;
        let mut guard = self.explicit.write();
        let mut current = &mut *guard;
        for segment in parents {
            current = current.as_object_mut()?.get_mut(*segment)?;
        }
        current.as_object_mut()?.remove(*last)
    }

    /// Looks up `path` across the applicable layers.
    ///
    /// Returns `None` when no layer has a value or the path is malformed.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        let segments = parse_path(path).ok()?;

        let mut found: Vec<Value> = Vec::with_capacity(3);
        if self.mode.supports_live() {
            if let Some(value) = lookup(&self.live_snapshot(), &segments) {
                found.push(value.clone());
            }
        }
        if let Some(value) = lookup(&self.implicit.read(), &segments) {
            found.push(value.clone());
        }
        if let Some(value) = lookup(&self.explicit.read(), &segments) {
            found.push(value.clone());
        }

        found.into_iter().reduce(|mut acc, value| {
            if acc.is_object() && value.is_object() {
                merge_into(&mut acc, value);
                acc
            } else {
                value
            }
        })
    }

    /// Looks up `path` and deserializes it.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ConfigError> {
        self.get(path)
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| ConfigError::type_mismatch(path, e.to_string()))
            })
            .transpose()
    }

    /// Like [`get_as`](Self::get_as) with a fallback for absent values.
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.get_as(path)?.unwrap_or(default))
    }

    /// Like [`get_as`](Self::get_as) but absence is an error.
    pub fn require<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        self.get_as(path)?
            .ok_or_else(|| ConfigError::MissingValue(path.to_string()))
    }

    /// Whether any applicable layer has a value at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.source_of(path).is_some()
    }

    /// Returns the highest-precedence layer holding `path`.
    #[must_use]
    pub fn source_of(&self, path: &str) -> Option<Layer> {
        let segments = parse_path(path).ok()?;
        if lookup(&self.explicit.read(), &segments).is_some() {
            return Some(Layer::Explicit);
        }
        if lookup(&self.implicit.read(), &segments).is_some() {
            return Some(Layer::Implicit);
        }
        if self.mode.supports_live() && lookup(&self.live_snapshot(), &segments).is_some() {
            return Some(Layer::Live);
        }
        None
    }

    fn live_snapshot(&self) -> Value {
        let providers: Vec<(String, LiveFn)> = self
            .live
            .read()
            .iter()
            .map(|(path, provider)| (path.clone(), Arc::clone(provider)))
            .collect();

        let mut root = Value::Object(Map::new());
        for (path, provider) in providers {
            if let Some(value) = provider() {
                let segments: Vec<&str> = path.split('.').collect();
                insert(&mut root, &segments, value);
            }
        }
        root
    }
}

fn parse_path(path: &str) -> Result<Vec<&str>, ConfigError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn lookup<'v>(root: &'v Value, segments: &[&str]) -> Option<&'v Value> {
    segments.iter().try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn insert(root: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        current = ensure_object(current)
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert((*last).to_string(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

fn merge_table(target: &mut Value, table: Value) -> Result<(), ConfigError> {
    if !table.is_object() {
        return Err(ConfigError::invalid_value(
            "<root>",
            "only tables can be merged into a layer",
        ));
    }
    merge_into(target, table);
    Ok(())
}

fn merge_into(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_into(existing, value);
                    }
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (target, overlay) => *target = overlay,
    }
}
