//! Archiver engine: remote source, content pipeline, persistence and publishing.
mod engine;
mod fetch;
mod layout;
mod ledger;
mod markup;
mod persist;
mod posts;
mod progress;
mod publish;
mod sanitize;
mod source;
mod transcode;
mod types;

pub use engine::{SiteArchiver, SiteConfig, DEFAULT_ARCHIVE_SUBDIR, DEFAULT_COMMIT_MESSAGE};
pub use fetch::{AssetFetcher, FetchSettings, ReqwestAssetFetcher, DEFAULT_USER_AGENT};
pub use layout::{
    ArchiveLayout, AUTHORS_DIR, AUTHORS_FILE, CATEGORIES_FILE, CONTENT_FILE, META_FILE, POSTS_DIR,
};
pub use ledger::{load_ledger, save_ledger, LedgerMerger, MergeResult};
pub use markup::plain_text;
pub use persist::{ensure_output_dir, read_json, AtomicFileWriter, PersistError};
pub use posts::PostArchiver;
pub use progress::{Journal, LogProgressSink, ProgressSink, RecordingProgressSink};
pub use publish::{archive_files, GitCli, PublishError, Publisher, Repository};
pub use sanitize::{image_sources, rewrite_asset_references, sanitize, RewrittenMarkup, POLL_PLACEHOLDER};
pub use source::{
    Collection, Page, Pager, Rendered, RemoteAuthor, RemoteCategory, RemoteMedia, RemotePost,
    RemoteTag, RestSource, TOTAL_PAGES_HEADER,
};
pub use transcode::{transcode, Converter, MarkdownTranscoder, KEPT_ELEMENTS};
pub use types::{PostError, SourceError, SyncError};
