//! Purpose: Project resource model and request validation.
//! Exports: `Project`, `NewProject`, `ProjectPatch`.
//! Invariants: Projects always carry a non-empty title.
//! Invariants: A project is archived exactly when `archive_time` is set.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::store::Touch;
use crate::core::collection::Resource;
use crate::core::error::{Error, ErrorKind};
use crate::core::mask::FieldSet;

pub(crate) const PROJECT_FIELDS: FieldSet = FieldSet {
    updatable: &["title", "description"],
    immutable: &["name", "create_time", "update_time", "archive_time"],
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Project {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
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
    pub archive_time: Option<OffsetDateTime>,
}

impl Project {
    pub fn is_archived(&self) -> bool {
        self.archive_time.is_some()
    }

    pub(crate) fn archive(&mut self, now: OffsetDateTime) {
        if self.archive_time.is_none() {
            self.archive_time = Some(now);
        }
    }

    pub(crate) fn unarchive(&mut self) {
        self.archive_time = None;
    }
}

impl Resource for Project {
    const COLLECTION: &'static str = "projects";
    const SINGULAR: &'static str = "project";

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl Touch for Project {
    fn touch(&mut self, now: OffsetDateTime) {
        self.update_time = Some(now);
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl NewProject {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.title.is_empty() {
            return Err(missing_title());
        }
        Ok(())
    }

    pub(crate) fn into_project(self, now: OffsetDateTime) -> Project {
        Project {
            name: String::new(),
            title: self.title,
            description: self.description,
            create_time: now,
            update_time: None,
            archive_time: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ProjectPatch {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl ProjectPatch {
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

    pub(crate) fn apply(&self, project: &mut Project, fields: &[&'static str]) {
        for field in fields {
            match *field {
                "title" => project.title = self.title.clone(),
                "description" => project.description = self.description.clone(),
                _ => {}
            }
        }
    }
}

fn missing_title() -> Error {
    Error::new(ErrorKind::InvalidArgument).with_message("project must have a title")
}
