use crate::MergeOutcome;

/// Progress of a sync pass, narrated per entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A pass over `site` has started.
    PassStarted { site: String },
    /// An author from the remote collection was reconciled.
    AuthorMerged { id: String, outcome: MergeOutcome },
    /// A category from the remote collection was reconciled.
    CategoryMerged { id: String, outcome: MergeOutcome },
    /// A category with no posts was left out of the ledger.
    CategorySkipped { slug: String },
    /// A post's metadata and content documents were written.
    PostArchived { id: String, title: String },
    /// Archiving a post failed; the pass moved on to the next one.
    PostFailed { id: String, reason: String },
    /// An asset could not be downloaded.
    AssetUnresolved { url: String },
    /// A publish batch finished; `pushed` is false when commit or push failed.
    BatchPublished {
        number: usize,
        total: usize,
        files: usize,
        pushed: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPost {
    pub id: String,
    pub reason: String,
}

/// Outcome of one sync pass, folded from [`SyncEvent`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PassReport {
    pub site: String,
    pub authors_created: usize,
    pub authors_refreshed: usize,
    pub categories_created: usize,
    pub categories_refreshed: usize,
    pub categories_skipped: usize,
    pub posts_archived: usize,
    pub failed_posts: Vec<FailedPost>,
    /// Remote URLs of assets that could not be downloaded, in the order they
    /// were encountered.
    pub unresolved_assets: Vec<String>,
    pub batches_pushed: usize,
    pub batches_failed: usize,
}

impl PassReport {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Self::default()
        }
    }

    /// True when every post was archived and every asset resolved.
    pub fn is_clean(&self) -> bool {
        self.failed_posts.is_empty() && self.unresolved_assets.is_empty()
    }

    /// Human readable end-of-pass summary.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{}: {} posts archived, authors {} new / {} refreshed, categories {} new / {} refreshed / {} skipped",
            self.site,
            self.posts_archived,
            self.authors_created,
            self.authors_refreshed,
            self.categories_created,
            self.categories_refreshed,
            self.categories_skipped,
        )];
        if self.batches_pushed + self.batches_failed > 0 {
            lines.push(format!(
                "publish: {} batches pushed, {} failed",
                self.batches_pushed, self.batches_failed
            ));
        }
        if !self.failed_posts.is_empty() {
            lines.push("The following posts could not be archived:".to_string());
            for failed in &self.failed_posts {
                lines.push(format!("  {}: {}", failed.id, failed.reason));
            }
        }
        if !self.unresolved_assets.is_empty() {
            lines.push("The following images could not be downloaded:".to_string());
            for url in &self.unresolved_assets {
                lines.push(format!("  {url}"));
            }
        }
        lines
    }
}

/// Pure update function: folds one event into the report.
pub fn update(mut report: PassReport, event: SyncEvent) -> PassReport {
    match event {
        SyncEvent::PassStarted { site } => {
            report = PassReport::new(site);
        }
        SyncEvent::AuthorMerged { outcome, .. } => match outcome {
            MergeOutcome::Created => report.authors_created += 1,
            MergeOutcome::Refreshed => report.authors_refreshed += 1,
        },
        SyncEvent::CategoryMerged { outcome, .. } => match outcome {
            MergeOutcome::Created => report.categories_created += 1,
            MergeOutcome::Refreshed => report.categories_refreshed += 1,
        },
        SyncEvent::CategorySkipped { .. } => report.categories_skipped += 1,
        SyncEvent::PostArchived { .. } => report.posts_archived += 1,
        SyncEvent::PostFailed { id, reason } => {
            report.failed_posts.push(FailedPost { id, reason });
        }
        SyncEvent::AssetUnresolved { url } => report.unresolved_assets.push(url),
        SyncEvent::BatchPublished { pushed, .. } => {
            if pushed {
                report.batches_pushed += 1;
            } else {
                report.batches_failed += 1;
            }
        }
    }
    report
}
