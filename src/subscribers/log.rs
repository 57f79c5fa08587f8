//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [starting] component=cam attempt=1
//! [failed] component=cam err="hardware unavailable: no answer" attempt=1
//! [started] component=cam
//! [scan-backoff] delay=10000ms
//! [shutdown-requested]
//! [terminated] component=cam
//! [all-terminated]
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::subscriber::Subscribe;
use async_trait::async_trait;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    fn name(&self) -> &'static str {
        "log-writer"
    }

    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ComponentStarting => {
                if let (Some(component), Some(att)) = (&e.component, e.attempt) {
                    println!("[starting] component={component} attempt={att}");
                }
            }
            EventKind::ComponentStarted => {
                println!("[started] component={:?}", e.component);
            }
            EventKind::ComponentFailed => {
                println!(
                    "[failed] component={:?} err={:?} attempt={:?}",
                    e.component, e.reason, e.attempt
                );
            }
            EventKind::UnexpectedChild => {
                println!(
                    "[unexpected-child] component={:?} from={:?}",
                    e.component, e.reason
                );
            }
            EventKind::ScanBackoff => {
                println!("[scan-backoff] delay={:?}ms", e.delay_ms);
            }
            EventKind::StarterStopped => {
                println!("[starter-stopped]");
            }
            EventKind::StarterDead => {
                println!(
                    "[starter-dead] component={:?} err={:?}",
                    e.component, e.reason
                );
            }
            EventKind::StarterStuck => {
                println!("[starter-stuck] {:?}", e.reason);
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::ComponentTerminated => {
                println!("[terminated] component={:?}", e.component);
            }
            EventKind::TerminateFailed => {
                println!(
                    "[terminate-failed] component={:?} err={:?}",
                    e.component, e.reason
                );
            }
            EventKind::TerminationStalled => {
                println!(
                    "[termination-stalled] forcing component={:?}",
                    e.component
                );
            }
            EventKind::AllTerminated => {
                println!("[all-terminated]");
            }
            EventKind::SettingsError => {
                println!(
                    "[settings-error] component={:?} err={:?}",
                    e.component, e.reason
                );
            }
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-fault] subscriber={:?} reason={:?}",
                    e.component, e.reason
                );
            }
        }
    }
}
