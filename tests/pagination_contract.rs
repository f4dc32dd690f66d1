//! Purpose: Lock down the listing contract of `Store` through the public API.
//! Role: Integration tests for ordering, completeness, and single-use page tokens.
#![allow(clippy::result_large_err)]

use std::collections::HashSet;

use taskdeck::api::{
    ErrorKind, ListRequest, NewLabel, NewProject, NewTask, Page, Store, StoreOptions, Task,
};

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn store() -> Store {
    Store::new(StoreOptions::new()).expect("store")
}

fn seed_tasks(store: &Store, count: usize) -> TestResult<Vec<Task>> {
    let mut tasks = Vec::with_capacity(count);
    for i in 1..=count {
        tasks.push(store.create_task(NewTask::titled(format!("T{i}")))?);
    }
    Ok(tasks)
}

fn names<R: AsRef<str>>(items: impl IntoIterator<Item = R>) -> Vec<String> {
    items.into_iter().map(|name| name.as_ref().to_string()).collect()
}

fn page_names(page: &Page<Task>) -> Vec<String> {
    names(page.items.iter().map(|task| task.name.as_str()))
}

/// Follows tokens until the listing completes, returning every page.
fn drain(store: &Store, page_size: i32) -> TestResult<Vec<Page<Task>>> {
    let mut pages = Vec::new();
    let mut request = ListRequest::first_page(page_size);
    loop {
        let page = store.list_tasks(&request)?;
        let done = page.is_last();
        request = ListRequest::first_page(page_size).with_page_token(page.next_page_token.clone());
        pages.push(page);
        if done {
            return Ok(pages);
        }
    }
}

#[test]
fn single_record_pages_walk_in_creation_order() -> TestResult {
    let store = store();
    let tasks = seed_tasks(&store, 7)?;

    let pages = drain(&store, 1)?;
    assert_eq!(pages.len(), 7);
    for (page, task) in pages.iter().zip(&tasks) {
        assert_eq!(page.items, [task.clone()]);
    }
    assert!(pages.iter().take(6).all(|page| !page.is_last()));
    assert_eq!(pages[6].next_page_token, "");
    Ok(())
}

#[test]
fn deleting_behind_a_token_skips_the_record() -> TestResult {
    let store = store();
    let tasks = seed_tasks(&store, 3)?;

    let first = store.list_tasks(&ListRequest::first_page(2))?;
    assert_eq!(page_names(&first), ["tasks/1", "tasks/2"]);
    assert!(!first.is_last());

    store.delete_task(&tasks[1].name)?;
    let second =
        store.list_tasks(&ListRequest::first_page(2).with_page_token(&first.next_page_token))?;
    assert_eq!(page_names(&second), ["tasks/3"]);
    assert!(second.is_last());
    Ok(())
}

#[test]
fn page_token_is_single_use() -> TestResult {
    let store = store();
    seed_tasks(&store, 3)?;

    let first = store.list_tasks(&ListRequest::first_page(2))?;
    let resume = ListRequest::first_page(2).with_page_token(&first.next_page_token);
    let second = store.list_tasks(&resume)?;
    assert_eq!(page_names(&second), ["tasks/3"]);

    let err = store.list_tasks(&resume).expect_err("replayed token");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    Ok(())
}

#[test]
fn deleting_a_record_already_returned_changes_nothing() -> TestResult {
    let store = store();
    let tasks = seed_tasks(&store, 4)?;

    let first = store.list_tasks(&ListRequest::first_page(2))?;
    store.delete_task(&tasks[0].name)?;
    let second =
        store.list_tasks(&ListRequest::first_page(2).with_page_token(&first.next_page_token))?;
    assert_eq!(page_names(&second), ["tasks/3", "tasks/4"]);
    assert!(second.is_last());
    Ok(())
}

#[test]
fn exact_fit_mints_no_token() -> TestResult {
    let store = store();
    seed_tasks(&store, 2)?;

    let first = store.list_tasks(&ListRequest::first_page(2))?;
    assert_eq!(first.items.len(), 2);
    assert!(first.is_last());
    Ok(())
}

#[test]
fn records_created_mid_listing_appear_at_the_end() -> TestResult {
    let store = store();
    seed_tasks(&store, 3)?;
    let first = store.list_tasks(&ListRequest::first_page(2))?;
    store.create_task(NewTask::titled("late"))?;
    let second =
        store.list_tasks(&ListRequest::first_page(2).with_page_token(&first.next_page_token))?;
    assert_eq!(page_names(&second), ["tasks/3", "tasks/4"]);
    assert!(second.is_last());
    Ok(())
}

#[test]
fn full_walk_returns_each_live_record_once() -> TestResult {
    let store = store();
    let tasks = seed_tasks(&store, 23)?;
    for task in tasks.iter().step_by(4) {
        store.delete_task(&task.name)?;
    }

    let pages = drain(&store, 5)?;
    let listed: Vec<String> = pages.iter().flat_map(page_names).collect();
    let expected: Vec<String> = tasks
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 4 != 0)
        .map(|(_, task)| task.name.clone())
        .collect();
    assert_eq!(listed, expected);
    let unique: HashSet<&String> = listed.iter().collect();
    assert_eq!(unique.len(), listed.len());
    assert!(pages.iter().all(|page| page.items.len() <= 5));
    Ok(())
}

#[test]
fn empty_collection_lists_nothing() -> TestResult {
    let store = store();
    let page = store.list_tasks(&ListRequest::default())?;
    assert!(page.items.is_empty());
    assert!(page.is_last());
    Ok(())
}

#[test]
fn unknown_token_is_rejected_without_side_effects() -> TestResult {
    let store = store();
    seed_tasks(&store, 3)?;
    let first = store.list_tasks(&ListRequest::first_page(1))?;

    let err = store
        .list_tasks(&ListRequest::first_page(1).with_page_token("not-a-token"))
        .expect_err("unknown token");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let second =
        store.list_tasks(&ListRequest::first_page(1).with_page_token(&first.next_page_token))?;
    assert_eq!(page_names(&second), ["tasks/2"]);
    Ok(())
}

#[test]
fn token_is_bound_to_show_deleted() -> TestResult {
    let store = store();
    seed_tasks(&store, 3)?;
    let first = store.list_tasks(&ListRequest::first_page(1).with_show_deleted(true))?;

    let err = store
        .list_tasks(&ListRequest::first_page(1).with_page_token(&first.next_page_token))
        .expect_err("flag mismatch");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let second = store.list_tasks(
        &ListRequest::first_page(1)
            .with_page_token(&first.next_page_token)
            .with_show_deleted(true),
    )?;
    assert_eq!(page_names(&second), ["tasks/2"]);
    Ok(())
}

#[test]
fn tokens_do_not_cross_collections() -> TestResult {
    let store = store();
    seed_tasks(&store, 2)?;
    store.create_project(NewProject::titled("p1"))?;
    store.create_project(NewProject::titled("p2"))?;

    let tasks = store.list_tasks(&ListRequest::first_page(1))?;
    let err = store
        .list_projects(&ListRequest::first_page(1).with_page_token(&tasks.next_page_token))
        .expect_err("task token on projects");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    Ok(())
}

#[test]
fn page_size_is_clamped_and_defaulted() -> TestResult {
    let options = StoreOptions::new()
        .with_max_page_size(4)
        .with_default_page_size(3);
    let store = Store::new(options)?;
    seed_tasks(&store, 10)?;

    let oversized = store.list_tasks(&ListRequest::first_page(50))?;
    assert_eq!(oversized.items.len(), 4);

    for size in [0, -7] {
        let defaulted = store.list_tasks(&ListRequest::first_page(size))?;
        assert_eq!(defaulted.items.len(), 3, "page_size {size}");
    }
    let unset = store.list_tasks(&ListRequest::default())?;
    assert_eq!(unset.items.len(), 3);
    Ok(())
}

#[test]
fn invalid_store_options_are_usage_errors() {
    for options in [
        StoreOptions::new().with_max_page_size(0),
        StoreOptions::new().with_default_page_size(0),
        StoreOptions::new()
            .with_max_page_size(10)
            .with_default_page_size(11),
    ] {
        let err = Store::new(options).expect_err("invalid options");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}

#[test]
fn delete_is_not_idempotent_and_ids_are_not_reused() -> TestResult {
    let store = store();
    let tasks = seed_tasks(&store, 2)?;

    store.delete_task(&tasks[1].name)?;
    let err = store.delete_task(&tasks[1].name).expect_err("second delete");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store.get_task(&tasks[1].name).expect_err("deleted get");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let next = store.create_task(NewTask::titled("T3"))?;
    assert_eq!(next.name, "tasks/3");
    Ok(())
}

#[test]
fn collections_allocate_ids_independently() -> TestResult {
    let store = store();
    seed_tasks(&store, 2)?;
    let project = store.create_project(NewProject::titled("roadmap"))?;
    let label = store.create_label(NewLabel::new("urgent"))?;
    assert_eq!(project.name, "projects/1");
    assert_eq!(label.name, "labels/1");

    let labels = store.list_labels(&ListRequest::default())?;
    assert_eq!(names(labels.items.iter().map(|l| l.name.as_str())), ["labels/1"]);
    Ok(())
}

#[test]
fn reset_drops_records_tokens_and_ids() -> TestResult {
    let store = store();
    seed_tasks(&store, 3)?;
    let first = store.list_tasks(&ListRequest::first_page(1))?;

    store.reset();

    let err = store
        .list_tasks(&ListRequest::first_page(1).with_page_token(&first.next_page_token))
        .expect_err("token cleared");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(store.list_tasks(&ListRequest::default())?.items.is_empty());
    assert_eq!(store.create_task(NewTask::titled("again"))?.name, "tasks/1");
    Ok(())
}
