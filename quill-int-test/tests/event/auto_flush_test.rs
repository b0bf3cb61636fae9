use quill::doc;
use quill::document::DocumentEvents;
use quill_int_test::test_util::{cleanup, create_auto_flush_context, record_document_events, run_test};
use std::time::Duration;

#[test]
fn test_timer_delivers_change() {
    run_test(
        || create_auto_flush_context(Duration::from_millis(10)),
        |ctx| {
            let document = ctx.document("ticker")?;
            let events = record_document_events(&document)?;
            document.set_data(doc! { tick: 1 })?;

            awaitility::at_most(Duration::from_secs(2)).until(|| {
                events
                    .lock()
                    .map(|events| events.iter().any(|e| e.event_type() == DocumentEvents::Change))
                    .unwrap_or(false)
            });
            assert_eq!(ctx.db().pending_events(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_close_stops_timer() {
    run_test(
        || create_auto_flush_context(Duration::from_millis(10)),
        |ctx| {
            let db = ctx.db();
            db.close()?;
            assert!(db.is_closed());
            assert!(db.config().auto_flush_interval().is_some());
            assert_eq!(db.pending_events(), 0);
            Ok(())
        },
        cleanup,
    )
}
