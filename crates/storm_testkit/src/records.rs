//! Record types shared by the tests.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storm_core::{
    string_field, CacheHook, DeleteHook, DisplayNamed, FieldDescriptor, HookResult, Model,
    SaveHook, SelfValidating, UncacheHook,
};

/// A record with an `ID` field and one string value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Identity field.
    #[serde(rename = "ID")]
    pub id: String,
    /// Payload.
    #[serde(rename = "Value")]
    pub value: String,
}

impl Note {
    /// Creates a note without an identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            value: value.into(),
        }
    }

    /// Creates a note that only carries an identifier, ready to load.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: String::new(),
        }
    }
}

impl Model for Note {
    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![string_field!(Note, "ID", id), string_field!(Note, "Value", value)]
    }
}

/// A record stored in the `people` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Identity field.
    #[serde(rename = "ID")]
    pub id: String,
    /// Display name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Age in years.
    #[serde(rename = "Age")]
    pub age: i64,
}

impl Person {
    /// Creates a person without an identifier.
    pub fn new(name: impl Into<String>, age: i64) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            age,
        }
    }
}

impl DisplayNamed for Person {
    fn entity_name(&self) -> String {
        "people".to_string()
    }
}

impl Model for Person {
    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![
            string_field!(Person, "ID", id),
            string_field!(Person, "Name", name),
            FieldDescriptor::other("Age"),
        ]
    }

    fn as_display_named(&self) -> Option<&dyn DisplayNamed> {
        Some(self)
    }
}

/// Shared log of lifecycle events.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// A record that logs every lifecycle event and can be told to fail.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Audited {
    /// Identity field.
    #[serde(rename = "ID")]
    pub id: String,
    /// Payload.
    #[serde(rename = "Body")]
    pub body: String,
    /// Events, in the order they were observed.
    #[serde(skip)]
    pub log: EventLog,
    /// Events that return an error.
    #[serde(skip)]
    pub failing: Vec<String>,
}

impl Audited {
    /// Creates a record that logs into `log`.
    pub fn new(body: impl Into<String>, log: EventLog) -> Self {
        Self {
            body: body.into(),
            log,
            ..Self::default()
        }
    }

    /// Makes `event` fail.
    #[must_use]
    pub fn failing(mut self, event: &str) -> Self {
        self.failing.push(event.to_string());
        self
    }

    /// Returns the logged events, sorted.
    pub fn events(&self) -> Vec<String> {
        let mut events = self.log.lock().clone();
        events.sort();
        events
    }

    fn record(&self, event: &str) -> HookResult {
        self.log.lock().push(event.to_string());
        if self.failing.iter().any(|e| e == event) {
            return Err(format!("{event} failed").into());
        }
        Ok(())
    }
}

impl SelfValidating for Audited {
    fn validate(&self) -> HookResult {
        if self.body.is_empty() {
            return Err("body must not be empty".into());
        }
        self.record("validate")
    }
}

impl SaveHook for Audited {
    fn after_save(&self) -> HookResult {
        self.record("after-save")
    }
}

impl CacheHook for Audited {
    fn after_cache(&self) -> HookResult {
        self.record("after-cache")
    }
}

impl UncacheHook for Audited {
    fn after_uncache(&self) -> HookResult {
        self.record("after-uncache")
    }
}

impl DeleteHook for Audited {
    fn after_delete(&self) -> HookResult {
        self.record("after-delete")
    }
}

impl Model for Audited {
    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![string_field!(Audited, "ID", id), string_field!(Audited, "Body", body)]
    }

    fn absorb(&mut self, loaded: Self) {
        self.id = loaded.id;
        self.body = loaded.body;
    }

    fn as_self_validating(&self) -> Option<&dyn SelfValidating> {
        Some(self)
    }

    fn as_save_hook(&self) -> Option<&dyn SaveHook> {
        Some(self)
    }

    fn as_cache_hook(&self) -> Option<&dyn CacheHook> {
        Some(self)
    }

    fn as_uncache_hook(&self) -> Option<&dyn UncacheHook> {
        Some(self)
    }

    fn as_delete_hook(&self) -> Option<&dyn DeleteHook> {
        Some(self)
    }
}
