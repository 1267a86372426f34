//! Known value types
//!
//! Primitive values (null, bool, int, float, text, list, map) always
//! round-trip. Anything else goes through [`StateValue::Custom`] and must be
//! registered here first, the same way a host declares its serializable
//! types up front. The registry starts empty.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::PersistenceError;
use crate::value::{StateMap, StateValue};

/// A host type that can be stored in session state
pub trait KnownType: Serialize + DeserializeOwned {
    /// Tag written next to the payload; must be unique per registry
    const KIND: &'static str;
}

type Validator = fn(&serde_json::Value) -> serde_json::Result<()>;

fn validate<T: KnownType>(payload: &serde_json::Value) -> serde_json::Result<()> {
    T::deserialize(payload).map(|_| ())
}

#[derive(Clone, Default)]
pub struct KnownTypes {
    validators: HashMap<String, Validator>,
}

impl KnownTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`. Returns false if its kind was already registered.
    pub fn register<T: KnownType>(&mut self) -> bool {
        let is_new = self
            .validators
            .insert(T::KIND.to_string(), validate::<T>)
            .is_none();

        if is_new {
            tracing::debug!(kind = T::KIND, "Registered known type");
        }

        is_new
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.validators.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.validators.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Check that every custom value in `map`, at any depth, has a
    /// registered kind and a payload that decodes as that kind.
    pub fn check(&self, map: &StateMap) -> Result<(), PersistenceError> {
        map.values().try_for_each(|value| self.check_value(value))
    }

    fn check_value(&self, value: &StateValue) -> Result<(), PersistenceError> {
        match value {
            StateValue::List(items) => items.iter().try_for_each(|item| self.check_value(item)),
            StateValue::Map(map) => self.check(map),
            StateValue::Custom(custom) => {
                let validator = self
                    .validators
                    .get(&custom.kind)
                    .ok_or_else(|| PersistenceError::UnknownKind(custom.kind.clone()))?;

                validator(&custom.payload).map_err(|source| PersistenceError::InvalidPayload {
                    kind: custom.kind.clone(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for KnownTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnownTypes")
            .field("kinds", &self.kinds())
            .finish()
    }
}
