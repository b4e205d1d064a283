use std::path::PathBuf;

use archiver_core::{update, PassReport, SyncEvent};
use engine_logging::{engine_error, engine_info, engine_warn};

use crate::fetch::{AssetFetcher, FetchSettings, ReqwestAssetFetcher};
use crate::layout::ArchiveLayout;
use crate::ledger::LedgerMerger;
use crate::persist::ensure_output_dir;
use crate::posts::PostArchiver;
use crate::progress::{Journal, ProgressSink};
use crate::publish::{GitCli, Publisher, Repository};
use crate::source::RestSource;
use crate::types::SyncError;

pub const DEFAULT_ARCHIVE_SUBDIR: &str = "blog";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Nightly archive update";

/// One site to archive and the checkout it is published from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub name: String,
    pub api_url: String,
    /// Working copy of the publishing repository.
    pub repository: PathBuf,
    /// Archive root relative to `repository`.
    pub archive_subdir: String,
    pub commit_message: String,
    pub per_page: Option<u32>,
    pub publish: bool,
    pub pull: bool,
}

impl SiteConfig {
    pub fn new(
        name: impl Into<String>,
        api_url: impl Into<String>,
        repository: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            api_url: api_url.into(),
            repository: repository.into(),
            archive_subdir: DEFAULT_ARCHIVE_SUBDIR.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            per_page: None,
            publish: true,
            pull: true,
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.name.trim().is_empty() {
            return Err(SyncError::Config("site name is empty".to_string()));
        }
        if self.api_url.trim().is_empty() {
            return Err(SyncError::Config(format!("site {} has no api_url", self.name)));
        }
        if self.repository.as_os_str().is_empty() {
            return Err(SyncError::Config(format!(
                "site {} has no repository",
                self.name
            )));
        }
        Ok(())
    }

    pub fn archive_root(&self) -> PathBuf {
        if self.archive_subdir.is_empty() {
            self.repository.clone()
        } else {
            self.repository.join(&self.archive_subdir)
        }
    }
}

/// Runs sync passes for one site: authors, categories, posts, then publish.
pub struct SiteArchiver {
    site: SiteConfig,
    source: RestSource,
    layout: ArchiveLayout,
    fetcher: Box<dyn AssetFetcher>,
    repository: Box<dyn Repository>,
}

impl SiteArchiver {
    pub fn new(site: SiteConfig, settings: &FetchSettings) -> Result<Self, SyncError> {
        site.validate()?;
        let client = settings
            .build_client()
            .map_err(|err| SyncError::Client(err.to_string()))?;
        let source = RestSource::new(&site.api_url, client.clone(), site.per_page)?;
        let layout = ArchiveLayout::new(site.archive_root());
        let repository = Box::new(GitCli::new(site.repository.clone()));
        Ok(Self {
            site,
            source,
            layout,
            fetcher: Box::new(ReqwestAssetFetcher::new(client)),
            repository,
        })
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn AssetFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_repository(mut self, repository: Box<dyn Repository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// One full pass. Failing to read the author, category or post
    /// collections aborts before anything is published; single posts, assets
    /// and git commands fail softly and end up in the report.
    pub async fn run_pass(&self, sink: &dyn ProgressSink) -> Result<PassReport, SyncError> {
        let mut journal = Journal::new(sink);
        journal.record(SyncEvent::PassStarted {
            site: self.site.name.clone(),
        });

        if self.site.publish && self.site.pull {
            if let Err(err) = self.repository.pull().await {
                engine_warn!("Pull of {:?} failed: {}", self.site.repository, err);
            }
        }

        ensure_output_dir(self.layout.root())?;
        let mut events = journal.into_events();

        let merger = LedgerMerger::new(&self.source, self.fetcher.as_ref(), &self.layout, sink);
        let authors = merger.sync_authors().await?;
        events.extend(authors.events);
        let categories = merger.sync_categories().await?;
        events.extend(categories.events);

        let archiver = PostArchiver::new(&self.source, self.fetcher.as_ref(), &self.layout, sink);
        events.extend(
            archiver
                .archive_all(&authors.ledger, &categories.ledger)
                .await?,
        );

        if self.site.publish {
            let publisher = Publisher::new(self.repository.as_ref(), sink);
            match publisher
                .publish(self.layout.root(), &self.site.commit_message)
                .await
            {
                Ok(published) => events.extend(published),
                Err(err) => engine_error!("Publishing {} failed: {}", self.site.name, err),
            }
        } else {
            engine_info!("Publishing disabled for {}", self.site.name);
        }

        let report = events
            .into_iter()
            .fold(PassReport::new(self.site.name.clone()), update);
        Ok(report)
    }
}
