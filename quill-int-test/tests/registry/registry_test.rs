use quill::doc;
use quill::document::{DocumentOptions, DocumentRef};
use quill::errors::ErrorKind;
use quill::filter::all;
use quill_int_test::test_util::{cleanup, create_test_context, run_test, TraceObserver};
use uuid::Uuid;

#[test]
fn test_same_instance_until_dropped() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let first = db.document("users")?.unwrap();
            let second = db.document("users")?.unwrap();
            assert!(first.same_instance(&second));

            first.set_data(doc! { count: 3 })?;
            assert!(first.drop());

            let fresh = db.document("users")?.unwrap();
            assert!(!fresh.same_instance(&first));
            assert_eq!(fresh.find(&all())?, Some(doc! {}));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_instance_reference() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let document = db.document("by-instance")?.unwrap();
            let same = db.document(&document)?.unwrap();
            assert!(same.same_instance(&document));

            document.drop();
            let recreated = db.document(&document)?.unwrap();
            assert!(!recreated.same_instance(&document));
            assert_eq!(recreated.name(), "by-instance");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_generated_names_are_unique() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let a = db.document(DocumentRef::Generated)?.unwrap();
            let b = db.document(DocumentRef::Generated)?.unwrap();
            assert_ne!(a.name(), b.name());
            assert!(Uuid::parse_str(a.name()).is_ok());
            assert_eq!(db.documents().len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_lookup_errors() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let err = db.document("").unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::MissingName);

            let name = Uuid::new_v4().to_string();
            let strict = DocumentOptions::new().auto_create(false);
            let err = db.document((name.as_str(), strict)).unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::NotFoundAutoCreateDisabled);

            let quiet = DocumentOptions::new().auto_create(false).throw_error(false);
            assert!(db.document((name.as_str(), quiet.clone()))?.is_none());
            assert!(db.document(("", quiet))?.is_none());
            assert!(!db.has_document(&name));

            db.document(name.as_str())?;
            let lookup = DocumentOptions::new().auto_create(false);
            assert!(db.document((name.as_str(), lookup))?.is_some());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_documents_report_links() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let observer = TraceObserver::new();
            db.document(("bound", DocumentOptions::new().observed(observer.clone())))?;
            let plain = db.document("plain")?.unwrap();

            let infos = db.documents();
            assert_eq!(infos.len(), 2);
            assert_eq!(infos[0].name, "bound");
            assert!(infos[0].linked);
            assert!(!infos[1].linked);

            plain.link(observer.clone());
            plain.update(&all(), &doc! { a: 1 })?;
            assert!(db.documents()[1].linked);
            assert_eq!(observer.trace(), vec!["set :a=1".to_string()]);

            plain.unlink();
            plain.update(&all(), &doc! { a: 2 })?;
            assert_eq!(observer.trace().len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_close_drops_all_documents() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let a = db.document("a")?.unwrap();
            let b = db.document("b")?.unwrap();
            db.close()?;

            assert!(a.is_dropped() && b.is_dropped());
            assert!(db.documents().is_empty());
            let err = db.document("a").unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::DatabaseClosed);
            Ok(())
        },
        cleanup,
    )
}
