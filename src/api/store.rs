//! Purpose: Own every collection behind one lock and expose the record operations.
//! Exports: `Store`, `StoreOptions`.
//! Role: The in-memory stand-in for the persistent record service.
//! Invariants: All state (ids, records, page tokens) changes under a single mutex.
//! Invariants: Requests are validated before the lock is taken; failures never mutate.
//! Invariants: Delete is immediate and non-cascading; a second delete is NotFound.
#![allow(clippy::result_large_err)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;

use super::label::{LABEL_FIELDS, Label, LabelPatch, NewLabel, duplicate_label};
use super::project::{NewProject, PROJECT_FIELDS, Project, ProjectPatch};
use super::task::{NewTask, TASK_FIELDS, Task, TaskPatch};
use crate::core::clock::{Clock, SystemClock};
use crate::core::collection::Resource;
use crate::core::error::Error;
use crate::core::listing::{DEFAULT_MAX_PAGE_SIZE, ListRequest, Page, PageLimits, Table};
use crate::core::mask::UpdateMask;
use crate::core::name::parse_name;

pub type ApiResult<T> = Result<T, Error>;

/// Records that carry an update timestamp.
pub(crate) trait Touch {
    fn touch(&mut self, now: OffsetDateTime);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StoreOptions {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self {
            default_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn with_default_page_size(mut self, default_page_size: u32) -> Self {
        self.default_page_size = default_page_size;
        self
    }

    fn limits(&self) -> ApiResult<PageLimits> {
        PageLimits::new(self.default_page_size, self.max_page_size)
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    tasks: Table<Task>,
    projects: Table<Project>,
    labels: Table<Label>,
}

#[derive(Debug)]
pub struct Store {
    state: Mutex<StoreState>,
    limits: PageLimits,
    clock: Arc<dyn Clock>,
}

impl Store {
    pub fn new(options: StoreOptions) -> ApiResult<Self> {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: StoreOptions, clock: Arc<dyn Clock>) -> ApiResult<Self> {
        Ok(Self {
            state: Mutex::new(StoreState::default()),
            limits: options.limits()?,
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_task(&self, new: NewTask) -> ApiResult<Task> {
        new.validate()?;
        let mut state = self.lock();
        let task = state.tasks.records.insert(new.into_task(self.clock.now()));
        tracing::debug!(name = %task.name, "created task");
        Ok(task)
    }

    pub fn get_task(&self, name: &str) -> ApiResult<Task> {
        let id = parse_name(name, Task::COLLECTION, Task::SINGULAR)?;
        let state = self.lock();
        state.tasks.records.get(id).cloned()
    }

    pub fn update_task(&self, patch: TaskPatch, mask: &UpdateMask) -> ApiResult<Task> {
        let id = parse_name(&patch.name, Task::COLLECTION, Task::SINGULAR)?;
        let fields = TASK_FIELDS.resolve(mask, &patch.present_fields())?;
        patch.validate(&fields)?;
        let mut state = self.lock();
        let now = self.clock.now();
        update_record(&mut state.tasks, id, now, |task| patch.apply(task, &fields))
    }

    pub fn delete_task(&self, name: &str) -> ApiResult<()> {
        let id = parse_name(name, Task::COLLECTION, Task::SINGULAR)?;
        let mut state = self.lock();
        state.tasks.records.remove(id)?;
        tracing::debug!(name, "deleted task");
        Ok(())
    }

    /// Marks a task completed. Completing a completed task is a no-op.
    pub fn complete_task(&self, name: &str) -> ApiResult<Task> {
        let id = parse_name(name, Task::COLLECTION, Task::SINGULAR)?;
        let mut state = self.lock();
        let now = self.clock.now();
        update_record(&mut state.tasks, id, now, |task| task.complete(now))
    }

    /// Clears a task's completion. Uncompleting an open task is a no-op.
    pub fn uncomplete_task(&self, name: &str) -> ApiResult<Task> {
        let id = parse_name(name, Task::COLLECTION, Task::SINGULAR)?;
        let mut state = self.lock();
        let now = self.clock.now();
        update_record(&mut state.tasks, id, now, Task::uncomplete)
    }

    pub fn list_tasks(&self, request: &ListRequest) -> ApiResult<Page<Task>> {
        let mut state = self.lock();
        state.tasks.list(&self.limits, request)
    }

    pub fn create_project(&self, new: NewProject) -> ApiResult<Project> {
        new.validate()?;
        let mut state = self.lock();
        let project = state
            .projects
            .records
            .insert(new.into_project(self.clock.now()));
        tracing::debug!(name = %project.name, "created project");
        Ok(project)
    }

    pub fn get_project(&self, name: &str) -> ApiResult<Project> {
        let id = parse_name(name, Project::COLLECTION, Project::SINGULAR)?;
        let state = self.lock();
        state.projects.records.get(id).cloned()
    }

    pub fn update_project(&self, patch: ProjectPatch, mask: &UpdateMask) -> ApiResult<Project> {
        let id = parse_name(&patch.name, Project::COLLECTION, Project::SINGULAR)?;
        let fields = PROJECT_FIELDS.resolve(mask, &patch.present_fields())?;
        patch.validate(&fields)?;
        let mut state = self.lock();
        let now = self.clock.now();
        update_record(&mut state.projects, id, now, |project| {
            patch.apply(project, &fields)
        })
    }

    pub fn delete_project(&self, name: &str) -> ApiResult<()> {
        let id = parse_name(name, Project::COLLECTION, Project::SINGULAR)?;
        let mut state = self.lock();
        state.projects.records.remove(id)?;
        tracing::debug!(name, "deleted project");
        Ok(())
    }

    /// Archives a project. Archiving an archived project is a no-op.
    pub fn archive_project(&self, name: &str) -> ApiResult<Project> {
        let id = parse_name(name, Project::COLLECTION, Project::SINGULAR)?;
        let mut state = self.lock();
        let now = self.clock.now();
        update_record(&mut state.projects, id, now, |project| project.archive(now))
    }

    pub fn unarchive_project(&self, name: &str) -> ApiResult<Project> {
        let id = parse_name(name, Project::COLLECTION, Project::SINGULAR)?;
        let mut state = self.lock();
        let now = self.clock.now();
        update_record(&mut state.projects, id, now, Project::unarchive)
    }

    pub fn list_projects(&self, request: &ListRequest) -> ApiResult<Page<Project>> {
        let mut state = self.lock();
        state.projects.list(&self.limits, request)
    }

    pub fn create_label(&self, new: NewLabel) -> ApiResult<Label> {
        new.validate()?;
        let mut state = self.lock();
        if let Some(existing) = state
            .labels
            .records
            .iter()
            .find(|label| label.label == new.label)
        {
            return Err(duplicate_label(&new.label, &existing.name));
        }
        let label = state.labels.records.insert(new.into_label(self.clock.now()));
        tracing::debug!(name = %label.name, "created label");
        Ok(label)
    }

    pub fn get_label(&self, name: &str) -> ApiResult<Label> {
        let id = parse_name(name, Label::COLLECTION, Label::SINGULAR)?;
        let state = self.lock();
        state.labels.records.get(id).cloned()
    }

    pub fn update_label(&self, patch: LabelPatch, mask: &UpdateMask) -> ApiResult<Label> {
        let id = parse_name(&patch.name, Label::COLLECTION, Label::SINGULAR)?;
        let fields = LABEL_FIELDS.resolve(mask, &patch.present_fields())?;
        patch.validate(&fields)?;
        let mut state = self.lock();
        state.labels.records.get(id)?;
        if fields.contains(&"label") {
            if let Some(existing) = state
                .labels
                .records
                .iter()
                .find(|label| label.label == patch.label && label.name != patch.name)
            {
                return Err(duplicate_label(&patch.label, &existing.name));
            }
        }
        let now = self.clock.now();
        update_record(&mut state.labels, id, now, |label| patch.apply(label, &fields))
    }

    pub fn delete_label(&self, name: &str) -> ApiResult<()> {
        let id = parse_name(name, Label::COLLECTION, Label::SINGULAR)?;
        let mut state = self.lock();
        state.labels.records.remove(id)?;
        tracing::debug!(name, "deleted label");
        Ok(())
    }

    pub fn list_labels(&self, request: &ListRequest) -> ApiResult<Page<Label>> {
        let mut state = self.lock();
        state.labels.list(&self.limits, request)
    }

    /// Drops every record and outstanding page token and restarts ids at 1.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.tasks.reset();
        state.projects.reset();
        state.labels.reset();
        tracing::debug!("reset store");
    }
}

impl Default for Store {
    fn default() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            limits: PageLimits::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Applies `apply` to a copy of the record and stores it, stamping the update
/// time only when something actually changed.
fn update_record<R: Resource + Touch + PartialEq>(
    table: &mut Table<R>,
    id: u64,
    now: OffsetDateTime,
    apply: impl FnOnce(&mut R),
) -> ApiResult<R> {
    let record = table.records.get_mut(id)?;
    let mut updated = record.clone();
    apply(&mut updated);
    if updated != *record {
        updated.touch(now);
        *record = updated.clone();
    }
    Ok(updated)
}
