// Record table for one collection: an arena of creation-ordered slots plus an
// id -> slot index. A slot's position is the record's sequence index.
use std::collections::HashMap;

use crate::core::error::Error;
use crate::core::ids::IdAllocator;
use crate::core::name::{format_name, not_found};

/// A record type stored in a [`Collection`].
pub trait Resource: Clone {
    /// Plural name prefix, e.g. `tasks`.
    const COLLECTION: &'static str;
    /// Singular noun used in error messages, e.g. `task`.
    const SINGULAR: &'static str;

    fn set_name(&mut self, name: String);
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VisiblePage<R> {
    pub records: Vec<R>,
    /// Sequence index of the last record in `records`.
    pub last_index_seen: Option<usize>,
    /// True when at least one more visible record follows `last_index_seen`.
    pub more: bool,
}

#[derive(Debug)]
pub struct Collection<R> {
    ids: IdAllocator,
    slots: Vec<Option<R>>,
    index: HashMap<u64, usize>,
}

impl<R: Resource> Collection<R> {
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::new(),
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Assigns the next id and sequence index to `record` and appends it.
    /// Callers validate before inserting so rejected input never burns an id.
    pub fn insert(&mut self, mut record: R) -> R {
        let id = self.ids.next();
        record.set_name(format_name(R::COLLECTION, id));
        let slot = self.slots.len();
        let stored = record.clone();
        self.slots.push(Some(record));
        self.index.insert(id, slot);
        stored
    }

    pub fn get(&self, id: u64) -> Result<&R, Error> {
        self.index
            .get(&id)
            .and_then(|slot| self.slots.get(*slot))
            .and_then(Option::as_ref)
            .ok_or_else(|| not_found(R::SINGULAR, &format_name(R::COLLECTION, id)))
    }

    pub fn get_mut(&mut self, id: u64) -> Result<&mut R, Error> {
        self.index
            .get(&id)
            .and_then(|slot| self.slots.get_mut(*slot))
            .and_then(Option::as_mut)
            .ok_or_else(|| not_found(R::SINGULAR, &format_name(R::COLLECTION, id)))
    }

    /// Removes the record outright. Its slot stays behind as a hole so later
    /// sequence indices never shift.
    pub fn remove(&mut self, id: u64) -> Result<R, Error> {
        let slot = self
            .index
            .remove(&id)
            .ok_or_else(|| not_found(R::SINGULAR, &format_name(R::COLLECTION, id)))?;
        self.slots
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or_else(|| not_found(R::SINGULAR, &format_name(R::COLLECTION, id)))
    }

    /// Collects up to `limit` live records starting at sequence index `from`,
    /// in creation order.
    ///
    /// Removed records leave nothing behind to show, so `_include_deleted`
    /// selects no additional records.
    pub fn visible_from(&self, from: usize, limit: usize, _include_deleted: bool) -> VisiblePage<R> {
        let mut records = Vec::new();
        let mut last_index_seen = None;
        let mut more = false;
        for (slot, entry) in self.slots.iter().enumerate().skip(from) {
            let Some(record) = entry else {
                continue;
            };
            if records.len() == limit {
                more = true;
                break;
            }
            records.push(record.clone());
            last_index_seen = Some(slot);
        }
        VisiblePage {
            records,
            last_index_seen,
            more,
        }
    }

    /// Live records in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn reset(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.ids.reset();
    }
}

impl<R: Resource> Default for Collection<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Collection, Resource};
    use crate::core::error::ErrorKind;

    #[derive(Clone, Debug, Eq, PartialEq)]
    struct Note {
        name: String,
        body: &'static str,
    }

    impl Note {
        fn new(body: &'static str) -> Self {
            Self {
                name: String::new(),
                body,
            }
        }
    }

    impl Resource for Note {
        const COLLECTION: &'static str = "notes";
        const SINGULAR: &'static str = "note";

        fn set_name(&mut self, name: String) {
            self.name = name;
        }
    }

    fn bodies(records: &[Note]) -> Vec<&'static str> {
        records.iter().map(|note| note.body).collect()
    }

    fn filled(bodies: &[&'static str]) -> Collection<Note> {
        let mut notes = Collection::new();
        for body in bodies {
            notes.insert(Note::new(body));
        }
        notes
    }

    #[test]
    fn insert_assigns_sequential_names() {
        let mut notes = Collection::new();
        let a = notes.insert(Note::new("a"));
        let b = notes.insert(Note::new("b"));
        assert_eq!(a.name, "notes/1");
        assert_eq!(b.name, "notes/2");
        assert_eq!(notes.get(2).expect("get").body, "b");
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut notes = filled(&["a", "b"]);
        notes.remove(2).expect("remove");
        let c = notes.insert(Note::new("c"));
        assert_eq!(c.name, "notes/3");
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn remove_twice_is_not_found() {
        let mut notes = filled(&["a"]);
        notes.remove(1).expect("first remove");
        let err = notes.remove(1).expect_err("second remove");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.name(), Some("notes/1"));
        assert_eq!(notes.get(1).expect_err("get").kind(), ErrorKind::NotFound);
    }

    #[test]
    fn visible_from_reports_more_only_when_records_remain() {
        let notes = filled(&["a", "b", "c"]);

        let page = notes.visible_from(0, 2, false);
        assert_eq!(bodies(&page.records), ["a", "b"]);
        assert_eq!(page.last_index_seen, Some(1));
        assert!(page.more);

        let page = notes.visible_from(0, 3, false);
        assert_eq!(bodies(&page.records), ["a", "b", "c"]);
        assert!(!page.more);
    }

    #[test]
    fn visible_from_skips_holes() {
        let mut notes = filled(&["a", "b", "c", "d"]);
        notes.remove(2).expect("remove b");
        notes.remove(4).expect("remove d");

        let page = notes.visible_from(0, 2, false);
        assert_eq!(bodies(&page.records), ["a", "c"]);
        assert_eq!(page.last_index_seen, Some(2));
        assert!(!page.more);

        let page = notes.visible_from(1, 10, true);
        assert_eq!(bodies(&page.records), ["c"]);
    }

    #[test]
    fn visible_from_past_end_is_empty() {
        let notes = filled(&["a"]);
        let page = notes.visible_from(5, 10, false);
        assert!(page.records.is_empty());
        assert_eq!(page.last_index_seen, None);
        assert!(!page.more);
    }

    #[test]
    fn reset_restarts_ids() {
        let mut notes = filled(&["a", "b"]);
        notes.reset();
        assert!(notes.is_empty());
        assert_eq!(notes.insert(Note::new("c")).name, "notes/1");
        assert_eq!(bodies(&notes.iter().cloned().collect::<Vec<_>>()), ["c"]);
    }
}
