mod auto_flush_test;
mod event_test;
