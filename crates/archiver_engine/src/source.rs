use std::collections::BTreeMap;

use bytes::Bytes;
use engine_logging::engine_debug;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::types::SourceError;

/// Response header carrying the number of pages of a collection.
pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// Paginated collections of the remote content API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Authors,
    Categories,
    Posts,
}

impl Collection {
    fn endpoint(self) -> &'static str {
        match self {
            Collection::Authors => "users",
            Collection::Categories => "categories",
            Collection::Posts => "posts",
        }
    }
}

/// One page of a collection together with the total page count reported
/// alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub number: u32,
    pub total_pages: u32,
    pub items: Vec<T>,
}

/// Walks a collection page by page in ascending order. The page count
/// reported with the first page bounds the walk.
#[derive(Debug, Clone)]
pub struct Pager {
    collection: Collection,
    next: u32,
    total: Option<u32>,
}

impl Pager {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            next: 1,
            total: None,
        }
    }

    /// Fetches the next page, or `None` once every page has been seen.
    pub async fn next_page<T: DeserializeOwned>(
        &mut self,
        source: &RestSource,
    ) -> Result<Option<Page<T>>, SourceError> {
        if let Some(total) = self.total {
            if self.next > total {
                return Ok(None);
            }
        }
        let page = source.page::<T>(self.collection, self.next).await?;
        self.total.get_or_insert(page.total_pages);
        self.next += 1;
        Ok(Some(page))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteAuthor {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub avatar_urls: BTreeMap<String, String>,
}

impl RemoteAuthor {
    /// URL of the largest avatar size on offer.
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_urls
            .iter()
            .filter(|(_, url)| !url.trim().is_empty())
            .max_by_key(|(size, _)| size.parse::<u32>().unwrap_or(0))
            .map(|(_, url)| url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteCategory {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemotePost {
    pub id: u64,
    pub slug: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub modified: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    pub author: u64,
    #[serde(default)]
    pub featured_media: u64,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTag {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteMedia {
    pub id: u64,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Read-only client for a WordPress-style REST API rooted at `api_url`
/// (for example `https://blog.example.com/wp-json/wp/v2/`).
#[derive(Debug, Clone)]
pub struct RestSource {
    client: reqwest::Client,
    base: Url,
    per_page: Option<u32>,
}

impl RestSource {
    pub fn new(
        api_url: &str,
        client: reqwest::Client,
        per_page: Option<u32>,
    ) -> Result<Self, SourceError> {
        let mut normalized = api_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized).map_err(|err| SourceError::InvalidUrl {
            url: api_url.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            client,
            base,
            per_page,
        })
    }

    /// Fetches one page of `collection`. Page numbers start at 1.
    pub async fn page<T: DeserializeOwned>(
        &self,
        collection: Collection,
        number: u32,
    ) -> Result<Page<T>, SourceError> {
        let mut url = self.endpoint(collection.endpoint())?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &number.to_string());
            if let Some(per_page) = self.per_page {
                query.append_pair("per_page", &per_page.to_string());
            }
        }

        let (headers, body) = self.get(&url).await?;
        let total_pages = total_pages(&headers, &url)?;
        let items = decode(&url, &body)?;
        engine_debug!("Fetched {:?} page {} of {}", collection, number, total_pages);
        Ok(Page {
            number,
            total_pages,
            items,
        })
    }

    pub async fn tag(&self, id: u64) -> Result<RemoteTag, SourceError> {
        let url = self.endpoint(&format!("tags/{id}"))?;
        let (_, body) = self.get(&url).await?;
        decode(&url, &body)
    }

    pub async fn media(&self, id: u64) -> Result<RemoteMedia, SourceError> {
        let url = self.media_url(id)?;
        let (_, body) = self.get(&url).await?;
        decode(&url, &body)
    }

    pub fn media_url(&self, id: u64) -> Result<Url, SourceError> {
        self.endpoint(&format!("media/{id}"))
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base.join(path).map_err(|err| SourceError::InvalidUrl {
            url: format!("{}{}", self.base, path),
            message: err.to_string(),
        })
    }

    async fn get(&self, url: &Url) -> Result<(HeaderMap, Bytes), SourceError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| SourceError::Network {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|err| SourceError::Network {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        Ok((headers, body))
    }
}

fn total_pages(headers: &HeaderMap, url: &Url) -> Result<u32, SourceError> {
    let value = headers
        .get(TOTAL_PAGES_HEADER)
        .ok_or_else(|| SourceError::MissingPageCount {
            url: url.to_string(),
        })?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .ok_or_else(|| SourceError::Decode {
            url: url.to_string(),
            message: format!("unparsable {TOTAL_PAGES_HEADER} header {value:?}"),
        })
}

fn decode<T: DeserializeOwned>(url: &Url, body: &[u8]) -> Result<T, SourceError> {
    serde_json::from_slice(body).map_err(|err| SourceError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })
}
