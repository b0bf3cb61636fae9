use quill::doc;
use quill::document::{DocumentOptions, SetDataOptions};
use quill::errors::ErrorKind;
use quill::filter::all;
use quill::update::diff_unset;
use quill::Value;
use quill_int_test::test_util::{cleanup, create_test_context, run_test, TraceObserver};

#[test]
fn test_observed_set_data_unsets_missing_keys() {
    run_test(
        create_test_context,
        |ctx| {
            let observer = TraceObserver::new();
            let options = DocumentOptions::new().observed(observer.clone());
            let document = ctx.db().document(("profile", options))?.unwrap();

            document.set_data(doc! { a: 1, b: 2 })?;
            let current = document.find(&all())?.unwrap();
            let patch = diff_unset(&current, &doc! { a: 1 }, &ctx.db().config().reserved_key_prefix());
            assert_eq!(patch.get_field("$unset"), Some(&Value::from(doc! { b: 1 })));

            document.set_data(doc! { a: 1 })?;
            assert_eq!(document.find(&all())?, Some(doc! { a: 1 }));
            assert!(observer.trace().contains(&"unset :b".to_string()));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_observed_set_data_reports_granular_edits() {
    run_test(
        create_test_context,
        |ctx| {
            let observer = TraceObserver::new();
            let options = DocumentOptions::new().observed(observer.clone());
            let document = ctx.db().document(("form", options))?.unwrap();

            document.set_data(doc! { user: { name: "Ada", age: 36 }, tags: ["x"] })?;
            document.set_data(doc! { user: { name: "Ada", age: 37 }, tags: ["x"] })?;

            let trace = observer.trace();
            assert_eq!(trace.last(), Some(&"set user:age=37".to_string()));
            assert!(!trace.iter().any(|line| line.contains("name=\"Ada\"") && line.starts_with("set user")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_reserved_keys_survive_observed_set_data() {
    run_test(
        || {
            let db = quill::Quill::builder().reserved_key_prefix("_ui_").open()?;
            Ok(quill_int_test::test_util::TestContext::new(db))
        },
        |ctx| {
            let observer = TraceObserver::new();
            let options = DocumentOptions::new().observed(observer.clone());
            let document = ctx.db().document(("view", options))?.unwrap();

            document.set_data(doc! { "_ui_scroll": 120, title: "a", body: "b" })?;
            document.set_data(doc! { title: "c" })?;

            assert_eq!(document.find(&all())?, Some(doc! { "_ui_scroll": 120, title: "c" }));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_direct_set_data_replaces_everything() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("plain")?;
            document.set_data(doc! { "__keep": 1, a: 1 })?;
            document.set_data(doc! { b: 2 })?;
            assert_eq!(document.find(&all())?, Some(doc! { b: 2 }));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_decoupled_data_is_independent() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("copy")?;
            let mut source = doc! { nested: { list: [1, 2] } };
            document.set_data(source.clone())?;
            document.set_data_with_options(source.clone(), SetDataOptions::new(false))?;

            source.put("nested.list.0", 99)?;
            let stored = document.find(&all())?.unwrap();
            assert_eq!(stored.get("nested.list.0")?, Value::from(1));

            let mut snapshot = stored.clone();
            snapshot.put("nested.list.1", 42)?;
            assert_eq!(document.find(&all())?.unwrap().get("nested.list.1")?, Value::from(2));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_set_data_on_dropped_document_fails() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("gone")?;
            assert!(document.drop());

            let err = document.set_data(doc! { a: 1 }).unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::DocumentDropped);
            let err = document.update(&all(), &doc! { a: 1 }).unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::DocumentDropped);
            assert_eq!(document.find(&all())?, None);
            Ok(())
        },
        cleanup,
    )
}
