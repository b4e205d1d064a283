use std::sync::Mutex;

use archiver_core::{MergeOutcome, SyncEvent};
use engine_logging::{engine_debug, engine_info, engine_warn};

/// Receives progress events as a pass narrates its work.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &SyncEvent);
}

/// Narrates progress through the logging facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: &SyncEvent) {
        match event {
            SyncEvent::PassStarted { site } => engine_info!("Exporting data for {}...", site),
            SyncEvent::AuthorMerged { id, outcome } => match outcome {
                MergeOutcome::Created => engine_info!("Exporting author: {}", id),
                MergeOutcome::Refreshed => {
                    engine_debug!("Author \"{}\" already exists, refreshed remote id", id)
                }
            },
            SyncEvent::CategoryMerged { id, outcome } => match outcome {
                MergeOutcome::Created => engine_info!("Exporting category: {}", id),
                MergeOutcome::Refreshed => {
                    engine_debug!("Category \"{}\" already exists, refreshed remote id", id)
                }
            },
            SyncEvent::CategorySkipped { slug } => {
                engine_debug!("Category \"{}\" has no posts, skipping", slug)
            }
            SyncEvent::PostArchived { id, title } => {
                engine_info!("Exported post: {} ({})", title, id)
            }
            SyncEvent::PostFailed { id, reason } => {
                engine_warn!("Post \"{}\" could not be archived: {}", id, reason)
            }
            SyncEvent::AssetUnresolved { url } => engine_warn!("Asset not downloaded: {}", url),
            SyncEvent::BatchPublished {
                number,
                total,
                files,
                pushed,
            } => {
                if *pushed {
                    engine_info!("Batch {} of {} ({} files) pushed", number, total, files)
                } else {
                    engine_warn!("Batch {} of {} ({} files) was not pushed", number, total, files)
                }
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingProgressSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<SyncEvent> {
        match self.events.lock() {
            Ok(mut events) => events.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl ProgressSink for RecordingProgressSink {
    fn emit(&self, event: &SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Events produced by one stage of a pass. Each event is narrated to the sink
/// as it happens and kept so the caller can fold it into the pass report.
pub struct Journal<'s> {
    sink: &'s dyn ProgressSink,
    events: Vec<SyncEvent>,
}

impl<'s> Journal<'s> {
    pub fn new(sink: &'s dyn ProgressSink) -> Self {
        Self {
            sink,
            events: Vec::new(),
        }
    }

    pub fn record(&mut self, event: SyncEvent) {
        self.sink.emit(&event);
        self.events.push(event);
    }

    pub fn into_events(self) -> Vec<SyncEvent> {
        self.events
    }
}
