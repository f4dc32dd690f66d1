//! Purpose: Label resource model and request validation.
//! Exports: `Label`, `NewLabel`, `LabelPatch`.
//! Invariants: Label strings are non-empty and limited to `[a-zA-Z0-9:\-_@]`.
//! Invariants: Uniqueness across live labels is checked by `Store` under its lock.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::store::Touch;
use crate::core::collection::Resource;
use crate::core::error::{Error, ErrorKind};
use crate::core::mask::FieldSet;

pub(crate) const LABEL_FIELDS: FieldSet = FieldSet {
    updatable: &["label"],
    immutable: &["name", "create_time", "update_time"],
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Label {
    pub name: String,
    pub label: String,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub update_time: Option<OffsetDateTime>,
}

impl Resource for Label {
    const COLLECTION: &'static str = "labels";
    const SINGULAR: &'static str = "label";

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl Touch for Label {
    fn touch(&mut self, now: OffsetDateTime) {
        self.update_time = Some(now);
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct NewLabel {
    pub label: String,
}

impl NewLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        validate_label_string(&self.label)
    }

    pub(crate) fn into_label(self, now: OffsetDateTime) -> Label {
        Label {
            name: String::new(),
            label: self.label,
            create_time: now,
            update_time: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct LabelPatch {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
}

impl LabelPatch {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }

    pub(crate) fn present_fields(&self) -> Vec<&'static str> {
        if self.label.is_empty() {
            Vec::new()
        } else {
            vec!["label"]
        }
    }

    pub(crate) fn validate(&self, fields: &[&'static str]) -> Result<(), Error> {
        if fields.contains(&"label") {
            validate_label_string(&self.label)?;
        }
        Ok(())
    }

    pub(crate) fn apply(&self, label: &mut Label, fields: &[&'static str]) {
        if fields.contains(&"label") {
            label.label = self.label.clone();
        }
    }
}

fn validate_label_string(label: &str) -> Result<(), Error> {
    if label.is_empty() {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("label string must not be empty"));
    }
    if !label.chars().all(is_label_char) {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("label string {label:?} contains invalid characters")));
    }
    Ok(())
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '@')
}

/// Error for a label string already held by the live label `existing`.
pub(crate) fn duplicate_label(label: &str, existing: &str) -> Error {
    Error::new(ErrorKind::AlreadyExists)
        .with_message(format!("label {label:?} already exists"))
        .with_name(existing)
}
