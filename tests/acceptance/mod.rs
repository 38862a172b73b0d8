//! Workspace-level acceptance tests.
//!
//! Grouped by subsystem:
//! - dispatch queue ordering, cadence, and teardown
//! - topic bus freshness across subscribers and threads
//! - the combined publish/dispatch pipeline

mod common;
mod dispatch_test;
mod topic_test;
