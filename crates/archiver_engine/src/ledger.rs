use std::path::Path;

use archiver_core::{
    avatar_filename, local_id, AuthorEntry, CategoryEntry, Ledger, LedgerEntry, MergeOutcome,
    SyncEvent,
};
use engine_logging::{engine_info, engine_warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Map;

use crate::fetch::AssetFetcher;
use crate::layout::ArchiveLayout;
use crate::markup::plain_text;
use crate::persist::{ensure_output_dir, read_json, AtomicFileWriter, PersistError};
use crate::progress::{Journal, ProgressSink};
use crate::source::{Collection, Pager, RemoteAuthor, RemoteCategory, RestSource};
use crate::types::SyncError;

/// A ledger after reconciliation plus the events the merge produced.
#[derive(Debug, Clone)]
pub struct MergeResult<E> {
    pub ledger: Ledger<E>,
    pub events: Vec<SyncEvent>,
}

/// Reads a persisted ledger; a missing file is an empty ledger.
pub fn load_ledger<E>(path: &Path) -> Result<Ledger<E>, PersistError>
where
    E: LedgerEntry + DeserializeOwned,
{
    let entries: Vec<E> = read_json(path)?.unwrap_or_default();
    Ok(Ledger::from_entries(entries))
}

/// Atomically replaces the ledger file at `path`.
pub fn save_ledger<E>(ledger: &Ledger<E>, path: &Path) -> Result<(), PersistError>
where
    E: LedgerEntry + Serialize,
{
    let (dir, filename) = split_path(path)?;
    AtomicFileWriter::new(dir.to_path_buf()).write_json(filename, ledger.entries())?;
    Ok(())
}

fn split_path(path: &Path) -> Result<(&Path, &str), PersistError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PersistError::OutputDir(format!("{} has no file name", path.display())))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok((dir, filename))
}

/// Reconciles the remote author and category collections against the
/// persisted ledgers.
pub struct LedgerMerger<'a> {
    source: &'a RestSource,
    fetcher: &'a dyn AssetFetcher,
    layout: &'a ArchiveLayout,
    sink: &'a dyn ProgressSink,
}

impl<'a> LedgerMerger<'a> {
    pub fn new(
        source: &'a RestSource,
        fetcher: &'a dyn AssetFetcher,
        layout: &'a ArchiveLayout,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            source,
            fetcher,
            layout,
            sink,
        }
    }

    /// Loads the authors ledger, merges the remote collection into it and
    /// writes it back.
    pub async fn sync_authors(&self) -> Result<MergeResult<AuthorEntry>, SyncError> {
        engine_info!("Exporting authors...");
        let path = self.layout.authors_file();
        let existing = load_ledger(&path)?;
        let result = self.merge_authors(existing).await?;
        save_ledger(&result.ledger, &path)?;
        Ok(result)
    }

    /// Loads the categories ledger, merges the remote collection into it and
    /// writes it back.
    pub async fn sync_categories(&self) -> Result<MergeResult<CategoryEntry>, SyncError> {
        engine_info!("Exporting categories...");
        let path = self.layout.categories_file();
        let existing = load_ledger(&path)?;
        let result = self.merge_categories(existing).await?;
        save_ledger(&result.ledger, &path)?;
        Ok(result)
    }

    pub async fn merge_authors(
        &self,
        mut ledger: Ledger<AuthorEntry>,
    ) -> Result<MergeResult<AuthorEntry>, SyncError> {
        let authors_dir = self.layout.authors_dir();
        ensure_output_dir(&authors_dir)?;

        let mut journal = Journal::new(self.sink);
        let mut pager = Pager::new(Collection::Authors);
        while let Some(page) = pager.next_page::<RemoteAuthor>(self.source).await? {
            for remote in page.items {
                let id = local_id(&remote.slug);
                if id.is_empty() {
                    engine_warn!("Author {} has an empty slug, skipping", remote.id);
                    continue;
                }
                if let Some(outcome) = ledger.refresh_remote_id(&id, remote.id) {
                    journal.record(SyncEvent::AuthorMerged { id, outcome });
                    continue;
                }

                let avatar = match remote.avatar_url() {
                    Some(url) => {
                        let filename = avatar_filename(&id, url);
                        if self.fetcher.fetch(url, &authors_dir.join(&filename)).await {
                            Some(filename)
                        } else {
                            journal.record(SyncEvent::AssetUnresolved {
                                url: url.to_string(),
                            });
                            None
                        }
                    }
                    None => None,
                };

                ledger.insert(AuthorEntry {
                    id: id.clone(),
                    name: remote.name,
                    bio: remote.description,
                    website: remote.url,
                    avatar,
                    remote_id: remote.id,
                    extra: Map::new(),
                });
                journal.record(SyncEvent::AuthorMerged {
                    id,
                    outcome: MergeOutcome::Created,
                });
            }
        }

        Ok(MergeResult {
            ledger,
            events: journal.into_events(),
        })
    }

    pub async fn merge_categories(
        &self,
        mut ledger: Ledger<CategoryEntry>,
    ) -> Result<MergeResult<CategoryEntry>, SyncError> {
        let mut journal = Journal::new(self.sink);
        let mut pager = Pager::new(Collection::Categories);
        while let Some(page) = pager.next_page::<RemoteCategory>(self.source).await? {
            for remote in page.items {
                if remote.count == 0 {
                    journal.record(SyncEvent::CategorySkipped { slug: remote.slug });
                    continue;
                }
                let id = local_id(&remote.slug);
                if id.is_empty() {
                    engine_warn!("Category {} has an empty slug, skipping", remote.id);
                    continue;
                }
                if let Some(outcome) = ledger.refresh_remote_id(&id, remote.id) {
                    journal.record(SyncEvent::CategoryMerged { id, outcome });
                    continue;
                }

                ledger.insert(CategoryEntry {
                    id: id.clone(),
                    name: plain_text(&remote.name),
                    description: remote.description,
                    remote_id: remote.id,
                    extra: Map::new(),
                });
                journal.record(SyncEvent::CategoryMerged {
                    id,
                    outcome: MergeOutcome::Created,
                });
            }
        }

        Ok(MergeResult {
            ledger,
            events: journal.into_events(),
        })
    }
}
