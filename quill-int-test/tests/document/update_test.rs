use quill::doc;
use quill::document::{ChangeType, DocumentEvents, DocumentOptions};
use quill::errors::ErrorKind;
use quill::filter::{all, field};
use quill::update::just_once;
use quill::Value;
use quill_int_test::test_util::{cleanup, create_test_context, record_document_events, run_test, TraceObserver};

#[test]
fn test_inc_emits_single_change() {
    run_test(
        create_test_context,
        |ctx| {
            let counter = ctx.document("counter")?;
            counter.set_data(doc! { count: 5 })?;
            ctx.db().flush();

            let events = record_document_events(&counter)?;
            assert!(counter.update(&all(), &doc! { "$inc": { count: 1 } })?);
            assert_eq!(counter.find(&all())?, Some(doc! { count: 6 }));

            ctx.db().flush();
            let events = events.lock().unwrap();
            let changes: Vec<_> = events
                .iter()
                .filter(|e| e.event_type() == DocumentEvents::Change)
                .collect();
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].change_type(), Some(ChangeType::Update));
            assert_eq!(changes[0].data(), Some(&doc! { count: 6 }));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unchanged_update_is_silent() {
    run_test(
        create_test_context,
        |ctx| {
            let counter = ctx.document("steady")?;
            counter.set_data(doc! { count: 5, label: "x" })?;
            ctx.db().flush();

            let events = record_document_events(&counter)?;
            assert!(!counter.update(&all(), &doc! { label: "x", "$unset": { missing: 1 } })?);
            assert_eq!(ctx.db().pending_events(), 0);
            assert!(events.lock().unwrap().is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_patch_leaves_data_untouched() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("atomic")?;
            document.set_data(doc! { a: 1, name: "n" })?;

            let err = document
                .update(&all(), &doc! { a: 2, "$inc": { name: "one" } })
                .unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::InvalidDataType);

            let err = document.update(&all(), &doc! { "$frobnicate": { a: 1 } }).unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::InvalidOperation);

            assert_eq!(document.find(&all())?, Some(doc! { a: 1, name: "n" }));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_positional_update_of_todo_list() {
    run_test(
        create_test_context,
        |ctx| {
            let todos = ctx.document("todos")?;
            todos.set_data(doc! {
                items: [
                    { id: 1, done: false },
                    { id: 2, done: false },
                    { id: 3, done: false },
                ]
            })?;

            assert!(todos.update(&field("items.id").eq(2), &doc! { "items.$": { done: true } })?);
            let data = todos.find(&all())?.unwrap();
            assert_eq!(data.get("items.0.done")?, Value::Bool(false));
            assert_eq!(data.get("items.1.done")?, Value::Bool(true));
            assert_eq!(data.get("items.2.done")?, Value::Bool(false));

            todos.update_with_options(&all(), &doc! { "items.$": { done: true } }, &just_once())?;
            let data = todos.find(&all())?.unwrap();
            assert_eq!(data.get("items.0.done")?, Value::Bool(true));
            assert_eq!(data.get("items.2.done")?, Value::Bool(false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_array_operators_notify_observer() {
    run_test(
        create_test_context,
        |ctx| {
            let observer = TraceObserver::new();
            let options = DocumentOptions::new().observed(observer.clone());
            let list = ctx.db().document(("playlist", options))?.unwrap();
            list.set_data(doc! { songs: ["a", "b", "c"] })?;

            list.update(&all(), &doc! { "$push": { songs: "d" } })?;
            list.update(&all(), &doc! { "$pull": { songs: "a" } })?;
            list.update(&all(), &doc! { "$spliceMove": { songs: { "$value": "d", "$index": 0 } } })?;
            list.update(&all(), &doc! { "$splicePush": { songs: { "$value": "z", "$index": 1 } } })?;

            assert_eq!(
                list.find(&all())?.unwrap().get("songs")?,
                Value::Array(vec!["d".into(), "z".into(), "b".into(), "c".into()])
            );

            let trace = observer.trace();
            assert!(trace.contains(&"insert songs[3]=\"d\"".to_string()));
            assert!(trace.contains(&"remove songs[0]".to_string()));
            assert!(trace.contains(&"move songs[2->0]".to_string()));
            assert!(trace.contains(&"insert songs[1]=\"z\"".to_string()));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_rename_and_mul() {
    run_test(
        create_test_context,
        |ctx| {
            let price = ctx.document("price")?;
            price.set_data(doc! { amount: 10, cur: "EUR" })?;
            price.update(&all(), &doc! { "$mul": { amount: 3 }, "$rename": { cur: "currency" } })?;
            assert_eq!(price.find(&all())?, Some(doc! { amount: 30, currency: "EUR" }));
            Ok(())
        },
        cleanup,
    )
}
