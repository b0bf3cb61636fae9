use quill::collection::FindOptions;
use quill::common::SortOrder;
use quill::doc;
use quill::document::SubDocumentOptions;
use quill::filter::{all, field};
use quill::Value;
use quill_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_find_done_item() {
    run_test(
        create_test_context,
        |ctx| {
            let todos = ctx.document("todos")?;
            todos.set_data(doc! { items: [{ id: 1, done: false }, { id: 2, done: true }] })?;

            let found = todos.find_sub(&all(), "items", &field("done").eq(true), &SubDocumentOptions::new())?;
            assert_eq!(found.single(), Some(&Value::from(doc! { id: 2, done: true })));

            let stats = todos.find_sub(&all(), "items", &field("done").eq(true), &SubDocumentOptions::new().stats())?;
            let stats = stats.stats().unwrap();
            assert!(stats.path_found);
            assert_eq!(stats.sub_doc_total, 1);
            assert!(stats.err.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_missing_path_stats() {
    run_test(
        create_test_context,
        |ctx| {
            let empty = ctx.document("empty")?;
            let result = empty.find_sub(&all(), "items", &all(), &SubDocumentOptions::new().stats())?;
            let stats = result.stats().unwrap();

            assert!(!stats.path_found);
            assert_eq!(stats.sub_doc_total, 0);
            assert!(stats.sub_docs.is_empty());
            assert!(stats.err.as_ref().is_some_and(|e| !e.is_empty()));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_parent_filter_gates_search() {
    run_test(
        create_test_context,
        |ctx| {
            let order = ctx.document("order")?;
            order.set_data(doc! { status: "open", lines: [{ sku: "a" }] })?;

            let found = order.find_sub(&field("status").eq("closed"), "lines", &all(), &SubDocumentOptions::new())?;
            assert_eq!(found.single(), None);

            let found = order.find_sub(&field("status").eq("open"), "lines", &all(), &SubDocumentOptions::new())?;
            assert_eq!(found.single(), Some(&Value::from(doc! { sku: "a" })));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sorted_and_limited_results() {
    run_test(
        create_test_context,
        |ctx| {
            let board = ctx.document("board")?;
            board.set_data(doc! {
                scores: [
                    { player: "a", points: 10 },
                    { player: "b", points: 30 },
                    { player: "c", points: 20 },
                ]
            })?;

            let options = SubDocumentOptions::new()
                .stats()
                .find_options(FindOptions::new().sort_by("points", SortOrder::Descending).limit(2));
            let result = board.find_sub(&all(), "scores", &field("points").gte(15), &options)?;
            let stats = result.stats().unwrap();

            assert_eq!(stats.sub_doc_total, 2);
            assert_eq!(
                stats.sub_docs,
                vec![
                    Value::from(doc! { player: "b", points: 30 }),
                    Value::from(doc! { player: "c", points: 20 }),
                ]
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_returns_decoupled_copy() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("snapshot")?;
            document.set_data(doc! { a: 1 })?;

            let mut copy = document.find(&all())?.unwrap();
            copy.put("a", 2)?;
            assert_eq!(document.find(&all())?, Some(doc! { a: 1 }));
            assert_eq!(document.find(&field("a").eq(2))?, None);
            Ok(())
        },
        cleanup,
    )
}
