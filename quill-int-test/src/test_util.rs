use quill::common::Value;
use quill::document::{DatabaseEventInfo, DatabaseEventListener, DocumentEventInfo, DocumentEventListener};
use quill::update::BindingObserver;
use quill::errors::QuillResult;
use quill::{Quill, QuillDocument};
use std::backtrace::Backtrace;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Runs a test between `before` and `after`, retrying a failed attempt.
///
/// `after` runs even when the test fails.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> QuillResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> QuillResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> QuillResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx).map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();
        let error = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                if !bt.is_empty() && !bt.contains("disabled") {
                    eprintln!("Backtrace:\n{}", bt);
                }
                e
            }
            Err(panic_err) => {
                if let Some(s) = panic_err.downcast_ref::<&str>() {
                    format!("Panic: {}", s)
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    format!("Panic: {}", s)
                } else {
                    "Panic: unknown payload".to_string()
                }
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", error);
            thread::sleep(Duration::from_millis(50 * attempt as u64));
        }
        last_error = Some(error);
    }

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    db: Quill,
}

impl TestContext {
    pub fn new(db: Quill) -> Self {
        Self { db }
    }

    pub fn db(&self) -> Quill {
        self.db.clone()
    }

    /// Gets or creates a document by name.
    pub fn document(&self, name: &str) -> QuillResult<QuillDocument> {
        match self.db.document(name)? {
            Some(document) => Ok(document),
            None => Err(quill::QuillError::new(
                &format!("Document {} could not be created", name),
                quill::ErrorKind::InternalError,
            )),
        }
    }
}

pub fn create_test_context() -> QuillResult<TestContext> {
    let db = Quill::builder().open()?;
    Ok(TestContext::new(db))
}

pub fn create_auto_flush_context(interval: Duration) -> QuillResult<TestContext> {
    let db = Quill::builder().auto_flush(interval).open()?;
    Ok(TestContext::new(db))
}

pub fn cleanup(ctx: TestContext) -> QuillResult<()> {
    ctx.db().close()
}

/// Collects every event a document publishes.
pub fn record_document_events(document: &QuillDocument) -> QuillResult<Arc<Mutex<Vec<DocumentEventInfo>>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    document.subscribe(DocumentEventListener::new(move |event: DocumentEventInfo| {
        if let Ok(mut events) = sink.lock() {
            events.push(event);
        }
        Ok(())
    }))?;
    Ok(events)
}

/// Collects every event the database publishes.
pub fn record_database_events(db: &Quill) -> QuillResult<Arc<Mutex<Vec<DatabaseEventInfo>>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    db.subscribe(DatabaseEventListener::new(move |event: DatabaseEventInfo| {
        if let Ok(mut events) = sink.lock() {
            events.push(event);
        }
        Ok(())
    }))?;
    Ok(events)
}

/// A binding observer that keeps one line per notification, in the form
/// `set scope:key=value`, `unset scope:key`, `insert scope[i]=value`,
/// `remove scope[i]` and `move scope[from->to]`.
#[derive(Default)]
pub struct TraceObserver {
    trace: Mutex<Vec<String>>,
}

impl TraceObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn trace(&self) -> Vec<String> {
        self.trace.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn push(&self, line: String) {
        if let Ok(mut trace) = self.trace.lock() {
            trace.push(line);
        }
    }
}

impl BindingObserver for TraceObserver {
    fn property_set(&self, scope: &str, key: &str, _old: Option<&Value>, new: &Value) {
        self.push(format!("set {}:{}={}", scope, key, new));
    }

    fn property_removed(&self, scope: &str, key: &str, _old: &Value) {
        self.push(format!("unset {}:{}", scope, key));
    }

    fn item_inserted(&self, scope: &str, index: usize, value: &Value) {
        self.push(format!("insert {}[{}]={}", scope, index, value));
    }

    fn item_removed(&self, scope: &str, index: usize, _value: &Value) {
        self.push(format!("remove {}[{}]", scope, index));
    }

    fn item_moved(&self, scope: &str, from: usize, to: usize) {
        self.push(format!("move {}[{}->{}]", scope, from, to));
    }
}
