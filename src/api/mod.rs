//! Purpose: Define the public Rust API boundary for taskdeck.
//! Exports: `Store` and the task/project/label request and record types.
//! Role: The surface the HTTP server, tests, and embedders call into.
//! Invariants: Core modules stay reachable through `crate::core` for tests, but
//! Invariants: callers go through `Store` so every mutation holds the store lock.

mod label;
mod project;
mod store;
mod task;

pub use crate::core::clock::{Clock, ManualClock, SystemClock};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::listing::{DEFAULT_MAX_PAGE_SIZE, ListRequest, Page, PageLimits};
pub use crate::core::mask::UpdateMask;
pub use label::{Label, LabelPatch, NewLabel};
pub use project::{NewProject, Project, ProjectPatch};
pub use store::{ApiResult, Store, StoreOptions};
pub use task::{NewTask, Task, TaskPatch};
