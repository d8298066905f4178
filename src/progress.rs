//! Progress event channel between the sync pipeline and any observer.
//!
//! The pipeline pushes events; it never depends on a UI. The binary wires
//! the receiving end to indicatif bars, other embedders can log or ignore.

use tokio::sync::mpsc;

use crate::sync::SyncSummary;

/// Pipeline phase for the item currently being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Downloading,
    Done,
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Work list is final; `total_items` counts items after truncation.
    Started { total_items: usize },
    /// Stale-file cleanup pass is running.
    DeletingStale,
    /// State change for one item. `bytes_total` is the remote
    /// Content-Length when known.
    Item {
        index: usize,
        total: usize,
        phase: Phase,
        bytes_so_far: u64,
        bytes_total: Option<u64>,
    },
    /// Terminal event; always sent exactly once, even on early abort.
    Finished { summary: SyncSummary },
}

pub type ProgressSender = mpsc::UnboundedSender<SyncEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<SyncEvent>;

pub fn channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Best-effort send; a dropped receiver never stalls the pipeline.
pub(crate) fn emit(sender: Option<&ProgressSender>, event: SyncEvent) {
    if let Some(tx) = sender {
        let _ = tx.send(event);
    }
}
