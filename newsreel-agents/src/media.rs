//! Stock image search and download
//!
//! Unsplash is searched first and Pexels fills any remaining slots. Chosen
//! images are downloaded into the media cache so the assembler only reads
//! local files.

use async_trait::async_trait;
use futures::future::join_all;
use newsreel_core::domain::article::Category;
use newsreel_core::domain::health::{ComponentHealth, Reachability};
use newsreel_core::domain::segment::{ImageRef, ProcessedSegment};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::MediaConfig;
use crate::error::{AdapterError, Result};
use crate::http::check_response;
use crate::retry::RetryPolicy;

const UNSPLASH: &str = "unsplash";
const PEXELS: &str = "pexels";

/// One stock photo provider
#[async_trait]
pub trait ImageSearch: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    /// Portrait photos matching `query`, best match first
    async fn search(&self, query: &str, count: usize) -> Result<Vec<ImageRef>>;

    async fn probe(&self) -> ComponentHealth;
}

/// Finds and caches the images shown during a segment
#[async_trait]
pub trait MediaCollector: Send + Sync {
    async fn collect(
        &self,
        segment: &ProcessedSegment,
        count: usize,
        cache_dir: &Path,
    ) -> Result<Vec<ImageRef>>;

    async fn probe(&self) -> ComponentHealth;
}

const TOPIC_WORDS: [&str; 10] = [
    "government",
    "minister",
    "election",
    "policy",
    "economy",
    "technology",
    "business",
    "education",
    "health",
    "sports",
];

fn category_terms(category: Category) -> &'static [&'static str] {
    match category {
        Category::International => &["world news", "global", "international", "diplomacy"],
        Category::National => &["india", "government", "parliament", "delhi"],
        Category::Karnataka => &["bangalore", "karnataka", "india tech"],
        Category::TamilNadu => &["chennai", "tamil nadu", "south india"],
        Category::Andhra => &["hyderabad", "andhra pradesh", "telangana"],
        Category::Kerala => &["kerala", "cochin", "backwaters"],
    }
}

/// Search queries for a segment: topic words found in the text first,
/// then the category's stock terms
pub fn search_terms(category: Category, text: &str) -> Vec<String> {
    let text = text.to_lowercase();

    let topics = TOPIC_WORDS
        .iter()
        .filter(|topic| text.contains(*topic))
        .take(2)
        .map(|topic| format!("{} {}", category_terms(category)[0], topic));

    let mut terms: Vec<String> = topics
        .chain(category_terms(category).iter().map(|t| t.to_string()))
        .collect();
    terms.dedup();
    terms.truncate(5);
    terms
}

#[derive(Debug, Deserialize)]
struct UnsplashSearch {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    id: String,
    alt_description: Option<String>,
    urls: UnsplashUrls,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: String,
}

pub struct UnsplashClient {
    client: Client,
    policy: RetryPolicy,
    api_key: Option<String>,
    base_url: String,
}

impl UnsplashClient {
    pub fn new(client: Client, policy: RetryPolicy, api_key: Option<String>) -> Self {
        Self {
            client,
            policy,
            api_key,
            base_url: "https://api.unsplash.com".to_string(),
        }
    }

    async fn request(&self, query: &str, count: usize) -> Result<Vec<ImageRef>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::MissingCredential { adapter: UNSPLASH })?;
        let per_page = count.to_string();

        let response = self
            .client
            .get(format!("{}/search/photos", self.base_url))
            .header(reqwest::header::AUTHORIZATION, format!("Client-ID {}", api_key))
            .query(&[
                ("query", query),
                ("per_page", per_page.as_str()),
                ("orientation", "portrait"),
                ("order_by", "relevant"),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::request(UNSPLASH, e, self.policy.timeout))?;
        let response = check_response(UNSPLASH, response).await?;

        let body: UnsplashSearch = response
            .json()
            .await
            .map_err(|e| AdapterError::parse(UNSPLASH, e))?;

        Ok(body
            .results
            .into_iter()
            .map(|photo| ImageRef {
                id: photo.id,
                provider: UNSPLASH.to_string(),
                url: photo.urls.regular,
                description: photo.alt_description,
                local_path: None,
            })
            .collect())
    }
}

#[async_trait]
impl ImageSearch for UnsplashClient {
    fn name(&self) -> &'static str {
        UNSPLASH
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<ImageRef>> {
        self.policy
            .run(UNSPLASH, || self.request(query, count))
            .await
    }

    async fn probe(&self) -> ComponentHealth {
        if !self.is_configured() {
            return ComponentHealth::unreachable(UNSPLASH, "credential not configured");
        }

        match RetryPolicy::probe(self.policy.timeout)
            .run(UNSPLASH, || self.request("news", 1))
            .await
        {
            Ok(_) => ComponentHealth::healthy(UNSPLASH),
            Err(e) => ComponentHealth::unreachable(UNSPLASH, e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PexelsSearch {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    id: u64,
    alt: Option<String>,
    src: PexelsSources,
}

#[derive(Debug, Deserialize)]
struct PexelsSources {
    large: String,
}

pub struct PexelsClient {
    client: Client,
    policy: RetryPolicy,
    api_key: Option<String>,
    base_url: String,
}

impl PexelsClient {
    pub fn new(client: Client, policy: RetryPolicy, api_key: Option<String>) -> Self {
        Self {
            client,
            policy,
            api_key,
            base_url: "https://api.pexels.com/v1".to_string(),
        }
    }

    async fn request(&self, query: &str, count: usize) -> Result<Vec<ImageRef>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::MissingCredential { adapter: PEXELS })?;
        let per_page = count.to_string();

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .header(reqwest::header::AUTHORIZATION, api_key)
            .query(&[
                ("query", query),
                ("per_page", per_page.as_str()),
                ("orientation", "portrait"),
                ("size", "large"),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::request(PEXELS, e, self.policy.timeout))?;
        let response = check_response(PEXELS, response).await?;

        let body: PexelsSearch = response
            .json()
            .await
            .map_err(|e| AdapterError::parse(PEXELS, e))?;

        Ok(body
            .photos
            .into_iter()
            .map(|photo| ImageRef {
                id: photo.id.to_string(),
                provider: PEXELS.to_string(),
                url: photo.src.large,
                description: photo.alt.filter(|a| !a.is_empty()),
                local_path: None,
            })
            .collect())
    }
}

#[async_trait]
impl ImageSearch for PexelsClient {
    fn name(&self) -> &'static str {
        PEXELS
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<ImageRef>> {
        self.policy.run(PEXELS, || self.request(query, count)).await
    }

    async fn probe(&self) -> ComponentHealth {
        if !self.is_configured() {
            return ComponentHealth::unreachable(PEXELS, "credential not configured");
        }

        match RetryPolicy::probe(self.policy.timeout)
            .run(PEXELS, || self.request("news", 1))
            .await
        {
            Ok(_) => ComponentHealth::healthy(PEXELS),
            Err(e) => ComponentHealth::unreachable(PEXELS, e.to_string()),
        }
    }
}

/// Searches providers in order and downloads the results
pub struct StockMediaCollector {
    client: Client,
    policy: RetryPolicy,
    providers: Vec<Box<dyn ImageSearch>>,
}

impl StockMediaCollector {
    pub fn new(client: Client, policy: RetryPolicy, providers: Vec<Box<dyn ImageSearch>>) -> Self {
        Self {
            client,
            policy,
            providers,
        }
    }

    /// Unsplash first, Pexels as fallback
    pub fn from_config(client: Client, policy: RetryPolicy, config: &MediaConfig) -> Self {
        let providers: Vec<Box<dyn ImageSearch>> = vec![
            Box::new(UnsplashClient::new(
                client.clone(),
                policy,
                config.unsplash_api_key.clone(),
            )),
            Box::new(PexelsClient::new(
                client.clone(),
                policy,
                config.pexels_api_key.clone(),
            )),
        ];
        Self::new(client, policy, providers)
    }

    async fn download(&self, image: &ImageRef, target: &Path) -> Result<()> {
        let response = self
            .client
            .get(&image.url)
            .send()
            .await
            .map_err(|e| AdapterError::request("media", e, self.policy.timeout))?;
        let response = check_response("media", response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AdapterError::request("media", e, self.policy.timeout))?;

        tokio::fs::write(target, &bytes).await?;
        Ok(())
    }

    /// Downloads an image unless it is already cached
    async fn cache(&self, mut image: ImageRef, category: Category, cache_dir: &Path) -> Result<ImageRef> {
        let target = cache_dir.join(format!("{}_{}_{}.jpg", category, image.provider, image.id));

        if tokio::fs::try_exists(&target).await? {
            debug!(path = %target.display(), "Image already cached");
        } else {
            self.policy
                .run("media", || self.download(&image, &target))
                .await?;
        }

        image.local_path = Some(target);
        Ok(image)
    }
}

#[async_trait]
impl MediaCollector for StockMediaCollector {
    async fn collect(
        &self,
        segment: &ProcessedSegment,
        count: usize,
        cache_dir: &Path,
    ) -> Result<Vec<ImageRef>> {
        let configured: Vec<_> = self.providers.iter().filter(|p| p.is_configured()).collect();
        if configured.is_empty() {
            return Err(AdapterError::MissingCredential { adapter: "media" });
        }

        let terms = search_terms(segment.category, &format!("{} {}", segment.headline, segment.summary));
        let mut found: Vec<ImageRef> = Vec::new();
        let mut last_error = None;

        'providers: for provider in configured {
            for term in terms.iter().take(2) {
                match provider.search(term, count).await {
                    Ok(images) => {
                        for image in images {
                            if !found.iter().any(|f| f.provider == image.provider && f.id == image.id) {
                                found.push(image);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(provider = provider.name(), query = %term, "Image search failed: {}", e);
                        last_error = Some(e);
                        continue 'providers;
                    }
                }

                if found.len() >= count {
                    break 'providers;
                }
            }
        }

        if found.is_empty() {
            return match last_error {
                Some(e) => Err(e),
                None => Ok(Vec::new()),
            };
        }

        found.truncate(count);
        tokio::fs::create_dir_all(cache_dir).await?;

        let mut images = Vec::with_capacity(found.len());
        for image in found {
            images.push(self.cache(image, segment.category, cache_dir).await?);
        }

        info!(category = %segment.category, images = images.len(), "Media collected");
        Ok(images)
    }

    /// Healthy while at least one provider answers
    async fn probe(&self) -> ComponentHealth {
        let reports = join_all(self.providers.iter().map(|p| p.probe())).await;

        let healthy = reports
            .iter()
            .filter(|r| r.status == Reachability::Healthy)
            .count();
        let detail = reports
            .iter()
            .filter_map(|r| r.detail.as_ref().map(|d| format!("{}: {}", r.name, d)))
            .collect::<Vec<_>>()
            .join("; ");

        if healthy == reports.len() && healthy > 0 {
            ComponentHealth::healthy("media")
        } else if healthy > 0 {
            ComponentHealth::degraded("media", detail)
        } else {
            ComponentHealth::unreachable("media", detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::serve;
    use crate::mock::fast_policy;
    use axum::extract::{Path as UrlPath, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct StockApis {
        unsplash: AtomicUsize,
        pexels: AtomicUsize,
        downloads: AtomicUsize,
    }

    /// Unsplash is down, Pexels answers with two photos served locally
    async fn stock_apis() -> (String, Arc<StockApis>) {
        let apis = Arc::new(StockApis::default());
        let app = Router::new()
            .route(
                "/unsplash/search/photos",
                get(|State(apis): State<Arc<StockApis>>| async move {
                    apis.unsplash.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::INTERNAL_SERVER_ERROR, "unavailable")
                }),
            )
            .route(
                "/pexels/search",
                get(|State(apis): State<Arc<StockApis>>, headers: HeaderMap| async move {
                    apis.pexels.fetch_add(1, Ordering::SeqCst);
                    let host = headers
                        .get("host")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let photo = |id: u64| {
                        json!({
                            "id": id,
                            "alt": "Bengaluru skyline",
                            "src": { "large": format!("http://{}/img/{}.jpg", host, id) }
                        })
                    };
                    Json(json!({ "photos": [photo(77), photo(78)] }))
                }),
            )
            .route(
                "/img/{name}",
                get(|State(apis): State<Arc<StockApis>>, UrlPath(name): UrlPath<String>| async move {
                    apis.downloads.fetch_add(1, Ordering::SeqCst);
                    name.into_bytes()
                }),
            )
            .with_state(apis.clone());

        (serve(app).await, apis)
    }

    #[test]
    fn test_search_terms_prefer_topics() {
        let terms = search_terms(
            Category::Karnataka,
            "Minister announces new education policy",
        );
        assert_eq!(terms[0], "bangalore minister");
        assert_eq!(terms[1], "bangalore policy");
        assert_eq!(terms[2], "bangalore");
        assert!(terms.len() <= 5);
    }

    #[test]
    fn test_search_terms_fall_back_to_category() {
        let terms = search_terms(Category::Kerala, "Boat race draws crowds");
        assert_eq!(terms, vec!["kerala", "cochin", "backwaters"]);
    }

    #[tokio::test]
    async fn test_collect_without_any_key_is_unavailable() {
        let collector = StockMediaCollector::from_config(
            Client::new(),
            RetryPolicy::default(),
            &MediaConfig::default(),
        );
        let segment = ProcessedSegment::new(Category::Kerala, "Boat race", "Crowds gather", 8.0);

        let err = collector
            .collect(&segment, 3, Path::new("/tmp/newsreel-media-test"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::MissingCredential { adapter: "media" }));
    }

    #[tokio::test]
    async fn test_probe_without_keys_is_unreachable() {
        let collector = StockMediaCollector::from_config(
            Client::new(),
            RetryPolicy::default(),
            &MediaConfig::default(),
        );
        let health = collector.probe().await;
        assert_eq!(health.status, Reachability::Unreachable);
        assert!(health.detail.unwrap().contains("unsplash"));
    }

    #[tokio::test]
    async fn test_collect_falls_back_to_pexels_and_caches_images() {
        let (base, apis) = stock_apis().await;
        let policy = RetryPolicy {
            timeout: Duration::from_secs(2),
            ..fast_policy()
        };
        let client = Client::new();
        let providers: Vec<Box<dyn ImageSearch>> = vec![
            Box::new(UnsplashClient {
                base_url: format!("{}/unsplash", base),
                ..UnsplashClient::new(client.clone(), policy, Some("unsplash-key".to_string()))
            }),
            Box::new(PexelsClient {
                base_url: format!("{}/pexels", base),
                ..PexelsClient::new(client.clone(), policy, Some("pexels-key".to_string()))
            }),
        ];
        let collector = StockMediaCollector::new(client, policy, providers);

        let cache_dir =
            std::env::temp_dir().join(format!("newsreel-media-{}", uuid::Uuid::new_v4()));
        let segment = ProcessedSegment::new(
            Category::Karnataka,
            "Minister opens metro line",
            "Commuters welcome the new line",
            8.0,
        );

        let images = collector.collect(&segment, 2, &cache_dir).await.unwrap();

        assert_eq!(apis.unsplash.load(Ordering::SeqCst), 1);
        assert_eq!(apis.pexels.load(Ordering::SeqCst), 1);
        assert_eq!(apis.downloads.load(Ordering::SeqCst), 2);

        let ids: Vec<_> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["77", "78"]);
        assert!(images.iter().all(|i| i.provider == "pexels"));

        let first = images[0].local_path.clone().unwrap();
        assert_eq!(
            first,
            cache_dir.join(format!("{}_pexels_77.jpg", Category::Karnataka))
        );
        assert_eq!(tokio::fs::read(&first).await.unwrap(), b"77.jpg");

        // Cached files are not fetched again
        collector.collect(&segment, 2, &cache_dir).await.unwrap();
        assert_eq!(apis.downloads.load(Ordering::SeqCst), 2);
    }
}
