use std::path::Path;

use archiver_core::{
    asset_filename, local_id, AuthorEntry, CategoryEntry, Ledger, LedgerEntry, PostRecord,
    PostStatus, SyncEvent,
};
use engine_logging::{engine_debug, engine_info};

use crate::fetch::AssetFetcher;
use crate::layout::{ArchiveLayout, CONTENT_FILE, META_FILE};
use crate::markup::plain_text;
use crate::persist::{ensure_output_dir, AtomicFileWriter};
use crate::progress::{Journal, ProgressSink};
use crate::sanitize::{rewrite_asset_references, sanitize};
use crate::source::{Collection, Pager, RemotePost, RestSource};
use crate::transcode::{Converter, MarkdownTranscoder};
use crate::types::{PostError, SyncError};

/// Writes every remote post into `posts/<slug>/` as a metadata document plus
/// a Markdown body with its images stored alongside.
pub struct PostArchiver<'a> {
    source: &'a RestSource,
    fetcher: &'a dyn AssetFetcher,
    layout: &'a ArchiveLayout,
    sink: &'a dyn ProgressSink,
    converter: Box<dyn Converter>,
}

impl<'a> PostArchiver<'a> {
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
            converter: Box::new(MarkdownTranscoder::default()),
        }
    }

    /// Archives every post page by page. A post that fails is reported and
    /// skipped; failing to list posts aborts.
    pub async fn archive_all(
        &self,
        authors: &Ledger<AuthorEntry>,
        categories: &Ledger<CategoryEntry>,
    ) -> Result<Vec<SyncEvent>, SyncError> {
        engine_info!("Exporting posts...");
        let mut journal = Journal::new(self.sink);
        let mut pager = Pager::new(Collection::Posts);
        while let Some(page) = pager.next_page::<RemotePost>(self.source).await? {
            engine_debug!(
                "Archiving {} posts from page {} of {}",
                page.items.len(),
                page.number,
                page.total_pages
            );
            for post in &page.items {
                let id = post_id(post);
                match self.archive_post(post, authors, categories, &mut journal).await {
                    Ok(record) => journal.record(SyncEvent::PostArchived {
                        id: record.id,
                        title: record.title,
                    }),
                    Err(err) => journal.record(SyncEvent::PostFailed {
                        id,
                        reason: err.to_string(),
                    }),
                }
            }
        }
        Ok(journal.into_events())
    }

    /// Writes `meta.json` and `index.md` for one post, overwriting any
    /// previous version.
    pub async fn archive_post(
        &self,
        post: &RemotePost,
        authors: &Ledger<AuthorEntry>,
        categories: &Ledger<CategoryEntry>,
        journal: &mut Journal<'_>,
    ) -> Result<PostRecord, PostError> {
        let id = post_id(post);
        let author = authors
            .find_by_remote_id(post.author)
            .ok_or(PostError::MissingAuthor {
                remote_id: post.author,
            })?;
        let category_ids: Vec<String> = categories
            .filter_by_remote_ids(&post.categories)
            .into_iter()
            .map(|entry| entry.local_id().to_string())
            .collect();
        let tags = self.resolve_tags(&post.tags).await?;

        let post_dir = self.layout.post_dir(&id);
        ensure_output_dir(&post_dir)?;

        let title_image = if post.featured_media != 0 {
            self.resolve_title_image(post.featured_media, &post_dir, journal)
                .await
        } else {
            None
        };

        let record = PostRecord {
            id: id.clone(),
            title: plain_text(&post.title.rendered),
            status: PostStatus::from_remote(&post.status),
            authors: vec![author.local_id().to_string()],
            title_image,
            excerpt: plain_text(&post.excerpt.rendered),
            categories: category_ids,
            tags,
            published_date: post.date.clone(),
            updated_date: post.modified.clone(),
            remote_id: post.id,
        };

        let writer = AtomicFileWriter::new(post_dir.clone());
        writer.write_json(META_FILE, &record)?;

        let cleaned = sanitize(&post.content.rendered);
        let rewritten = rewrite_asset_references(&cleaned, &post_dir, self.fetcher).await;
        for url in rewritten.unresolved {
            journal.record(SyncEvent::AssetUnresolved { url });
        }
        let mut body = self.converter.to_markdown(&rewritten.markup);
        body.push('\n');
        writer.write(CONTENT_FILE, &body)?;

        Ok(record)
    }

    async fn resolve_tags(&self, tag_ids: &[u64]) -> Result<Vec<String>, PostError> {
        let mut names: Vec<String> = Vec::with_capacity(tag_ids.len());
        for &tag_id in tag_ids {
            let tag = self.source.tag(tag_id).await?;
            let name = plain_text(&tag.name);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    async fn resolve_title_image(
        &self,
        media_id: u64,
        post_dir: &Path,
        journal: &mut Journal<'_>,
    ) -> Option<String> {
        let media = match self.source.media(media_id).await {
            Ok(media) => media,
            Err(err) => {
                engine_debug!("Media {} lookup failed: {}", media_id, err);
                let url = self
                    .source
                    .media_url(media_id)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| format!("media/{media_id}"));
                journal.record(SyncEvent::AssetUnresolved { url });
                return None;
            }
        };
        let source_url = media.source_url.filter(|u| !u.trim().is_empty())?;
        match asset_filename(&source_url) {
            Some(filename)
                if self
                    .fetcher
                    .fetch(&source_url, &post_dir.join(&filename))
                    .await =>
            {
                Some(filename)
            }
            _ => {
                journal.record(SyncEvent::AssetUnresolved { url: source_url });
                None
            }
        }
    }
}

fn post_id(post: &RemotePost) -> String {
    let id = local_id(&post.slug);
    if id.is_empty() {
        post.id.to_string()
    } else {
        id
    }
}
