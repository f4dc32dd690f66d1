//! Purpose: Task resource model and request validation.
//! Exports: `Task`, `NewTask`, `TaskPatch`.
//! Role: Field-level rules for the tasks collection; storage lives in `Store`.
//! Invariants: Tasks are created uncompleted and always carry a non-empty title.
//! Invariants: `name` and `create_time` are assigned by the store, never by callers.
//! Invariants: `completed` is true exactly when `complete_time` is set.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::store::Touch;
use crate::core::collection::Resource;
use crate::core::error::{Error, ErrorKind};
use crate::core::mask::FieldSet;

pub(crate) const TASK_FIELDS: FieldSet = FieldSet {
    updatable: &["title", "description"],
    immutable: &[
        "name",
        "completed",
        "create_time",
        "update_time",
        "complete_time",
    ],
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Task {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub update_time: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub complete_time: Option<OffsetDateTime>,
}

impl Task {
    /// Marks the task completed at `now`; already-completed tasks keep
    /// their original completion time.
    pub(crate) fn complete(&mut self, now: OffsetDateTime) {
        if self.complete_time.is_none() {
            self.completed = true;
            self.complete_time = Some(now);
        }
    }

    pub(crate) fn uncomplete(&mut self) {
        self.completed = false;
        self.complete_time = None;
    }
}

impl Resource for Task {
    const COLLECTION: &'static str = "tasks";
    const SINGULAR: &'static str = "task";

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl Touch for Task {
    fn touch(&mut self, now: OffsetDateTime) {
        self.update_time = Some(now);
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.title.is_empty() {
            return Err(missing_title());
        }
        if self.completed {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("task must not already be completed"));
        }
        Ok(())
    }

    pub(crate) fn into_task(self, now: OffsetDateTime) -> Task {
        Task {
            name: String::new(),
            title: self.title,
            description: self.description,
            completed: false,
            create_time: now,
            update_time: None,
            complete_time: None,
        }
    }
}

/// Replacement values for an update. Which of them apply is decided by the
/// update mask; with an empty mask only the non-empty ones do.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct TaskPatch {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl TaskPatch {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn present_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !self.title.is_empty() {
            fields.push("title");
        }
        if !self.description.is_empty() {
            fields.push("description");
        }
        fields
    }

    pub(crate) fn validate(&self, fields: &[&'static str]) -> Result<(), Error> {
        if fields.contains(&"title") && self.title.is_empty() {
            return Err(missing_title());
        }
        Ok(())
    }

    pub(crate) fn apply(&self, task: &mut Task, fields: &[&'static str]) {
        for field in fields {
            match *field {
                "title" => task.title = self.title.clone(),
                "description" => task.description = self.description.clone(),
                _ => {}
            }
        }
    }
}

fn missing_title() -> Error {
    Error::new(ErrorKind::InvalidArgument).with_message("task must have a title")
}
