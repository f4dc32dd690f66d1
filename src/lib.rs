//! Purpose: In-memory task/project/label record store with single-use page tokens.
//! Exports: `api` (store handle, records, requests), `core` (ids, tables, cursors, errors).
//! Role: Library behind the `taskdeck` server binary and integration tests.
//! Invariants: Pagination follows creation order and survives concurrent deletes.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
