use quill::doc;
use quill::document::{ChangeType, DatabaseEvents, DocumentEventInfo, DocumentEventListener, DocumentEvents};
use quill::errors::ErrorKind;
use quill::filter::all;
use quill_int_test::test_util::{
    cleanup, create_test_context, record_database_events, record_document_events, run_test,
};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_immediate_change_per_mutation() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("clicks")?;
            let events = record_document_events(&document)?;

            document.set_data(doc! { n: 0 })?;
            document.update(&all(), &doc! { "$inc": { n: 1 } })?;
            document.update(&all(), &doc! { "$inc": { n: 1 } })?;

            let events = events.lock().unwrap();
            let immediate: Vec<_> = events
                .iter()
                .filter(|e| e.event_type() == DocumentEvents::ImmediateChange)
                .collect();
            assert_eq!(immediate.len(), 3);
            assert_eq!(immediate[0].change_type(), Some(ChangeType::SetData));
            assert_eq!(immediate[2].data(), Some(&doc! { n: 2 }));
            assert!(events.iter().all(|e| e.name() == "clicks"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_change_events_coalesce_until_flush() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("burst")?;
            let events = record_document_events(&document)?;

            for i in 0..10 {
                document.set_data(doc! { n: i })?;
            }
            assert_eq!(ctx.db().pending_events(), 2);
            ctx.db().flush();

            let events = events.lock().unwrap();
            let changes: Vec<&DocumentEventInfo> = events
                .iter()
                .filter(|e| e.event_type() == DocumentEvents::Change)
                .collect();
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].data(), Some(&doc! { n: 9 }));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_change_snapshot_is_decoupled() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("decoupled")?;
            let events = record_document_events(&document)?;

            document.set_data(doc! { n: 1 })?;
            ctx.db().flush();
            document.set_data(doc! { n: 2 })?;

            let events = events.lock().unwrap();
            let change = events
                .iter()
                .find(|e| e.event_type() == DocumentEvents::Change)
                .unwrap();
            assert_eq!(change.data(), Some(&doc! { n: 1 }));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_database_events() {
    run_test(
        create_test_context,
        |ctx| {
            let events = record_database_events(&ctx.db())?;
            let a = ctx.document("a")?;
            ctx.document("b")?;
            a.set_data(doc! { x: 1 })?;
            ctx.db().flush();

            let events = events.lock().unwrap();
            let kinds: Vec<(DatabaseEvents, String)> = events
                .iter()
                .map(|e| (e.event_type(), e.name().to_string()))
                .collect();
            // creates coalesce into the latest one per flush
            assert_eq!(
                kinds,
                vec![
                    (DatabaseEvents::Create, "b".to_string()),
                    (DatabaseEvents::Change, "a".to_string()),
                ]
            );
            assert!(events.iter().all(|e| e.kind() == "document"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drop_event_and_idempotence() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("temp")?;
            let events = record_document_events(&document)?;
            document.set_data(doc! { a: 1 })?;

            let calls = Rc::new(Cell::new(0));
            let counter = calls.clone();
            assert!(document.drop_with_callback(move |error, dropped| {
                assert!(error.is_none());
                assert!(dropped);
                counter.set(counter.get() + 1);
            }));
            assert!(document.drop());
            assert_eq!(calls.get(), 1);

            let drops = events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.event_type() == DocumentEvents::Drop)
                .count();
            assert_eq!(drops, 1);

            // pending change of the dropped document is discarded
            assert_eq!(ctx.db().flush(), 1);
            let changes = events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.event_type() == DocumentEvents::Change)
                .count();
            assert_eq!(changes, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unsubscribe_and_subscribe_after_drop() {
    run_test(
        create_test_context,
        |ctx| {
            let document = ctx.document("quiet")?;
            let events = record_document_events(&document)?;
            let subscriber = document.subscribe(DocumentEventListener::new(|_| Ok(())))?;
            document.unsubscribe(subscriber)?;

            document.set_data(doc! { a: 1 })?;
            assert_eq!(events.lock().unwrap().len(), 1);

            document.drop();
            let err = document
                .subscribe(DocumentEventListener::new(|_| Ok(())))
                .unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::DocumentDropped);
            Ok(())
        },
        cleanup,
    )
}
