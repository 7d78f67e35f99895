//! Resource lifecycle contract and attribute bag.
//!
//! A declarative runtime hands each resource a [`ResourceData`]: the state
//! recorded after the last successful apply plus the attributes desired
//! now, both keyed by attribute name. The resource reconciles the remote
//! system against it and writes back what it observed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attribute name to value map.
pub type Attributes = BTreeMap<String, Value>;

/// Persisted view of a resource: its remote identity and attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Mutable attribute bag for one resource lifecycle call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: Option<String>,
    /// Attributes as of the last recorded state.
    prior: Attributes,
    /// Desired attributes, overwritten with observed values by reads.
    attributes: Attributes,
}

impl ResourceData {
    /// Creates the bag for a resource that does not exist yet.
    pub fn new(desired: Attributes) -> Self {
        Self {
            id: None,
            prior: Attributes::new(),
            attributes: desired,
        }
    }

    /// Creates the bag for an existing resource.
    pub fn from_state(state: ResourceState, desired: Attributes) -> Self {
        Self {
            id: state.id,
            prior: state.attributes,
            attributes: desired,
        }
    }

    /// Creates the bag for an existing resource whose desired attributes
    /// equal its recorded state (read and delete).
    pub fn from_recorded(state: ResourceState) -> Self {
        let desired = state.attributes.clone();
        Self::from_state(state, desired)
    }

    /// Returns the remote identity, if the resource exists.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Records the remote identity assigned on creation.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Marks the resource as absent.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// Returns an attribute value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    /// Returns a string attribute.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Sets an attribute value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Returns true if the attribute differs from the recorded state.
    pub fn has_change(&self, key: &str) -> bool {
        self.prior.get(key) != self.attributes.get(key)
    }

    /// Returns all current attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Converts the bag into the state to persist.
    ///
    /// An absent resource persists no attributes.
    pub fn into_state(self) -> ResourceState {
        match self.id {
            Some(id) => ResourceState {
                id: Some(id),
                attributes: self.attributes,
            },
            None => ResourceState::default(),
        }
    }
}

/// Create/read/update/delete contract driven by the lifecycle runtime.
///
/// Implementations translate the attribute bag into remote API calls.
/// `read` must normalise the bag to the remote state, or clear the id when
/// the remote object is gone.
pub trait Resource {
    /// Error type surfaced to the runtime.
    type Error;

    /// Returns the resource type name (for logging).
    fn type_name(&self) -> &str;

    /// Creates the remote object and records its id.
    fn create(&self, d: &mut ResourceData) -> Result<(), Self::Error>;

    /// Refreshes the bag from the remote object.
    fn read(&self, d: &mut ResourceData) -> Result<(), Self::Error>;

    /// Pushes the desired attributes to the remote object.
    fn update(&self, d: &mut ResourceData) -> Result<(), Self::Error>;

    /// Removes the remote object.
    fn delete(&self, d: &mut ResourceData) -> Result<(), Self::Error>;

    /// Creates the object when it has no id yet, updates it otherwise.
    fn apply(&self, d: &mut ResourceData) -> Result<(), Self::Error> {
        if d.id().is_none() {
            self.create(d)
        } else {
            self.update(d)
        }
    }
}
