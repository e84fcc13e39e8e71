//! News source adapters
//!
//! Articles come from per-category RSS feeds and, when a key is configured,
//! from NewsAPI top headlines. Every article is scored for engagement so
//! the collect stage can keep the most engaging one per category.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use newsreel_core::domain::article::{Article, Category, engagement_score};
use newsreel_core::domain::health::{ComponentHealth, Reachability};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{AdapterError, Result};
use crate::http::check_response;
use crate::retry::RetryPolicy;

const RSS: &str = "rss";
const NEWS_API: &str = "newsapi";

/// Entries read from each feed
const ENTRIES_PER_FEED: usize = 10;

/// A provider of candidate articles
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidate articles for one category, in provider order
    async fn fetch(&self, category: Category) -> Result<Vec<Article>>;

    /// One lightweight request to check the provider is reachable
    async fn probe(&self) -> ComponentHealth;
}

/// Keeps the `limit` most engaging articles, ties broken by recency
pub fn select_top(mut articles: Vec<Article>, limit: usize) -> Vec<Article> {
    articles.sort_by(|a, b| {
        b.engagement_score
            .total_cmp(&a.engagement_score)
            .then_with(|| b.published_at.cmp(&a.published_at))
    });
    articles.truncate(limit);
    articles
}

/// Removes markup from feed summaries and collapses whitespace
pub(crate) fn strip_html(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_tag = false;

    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn default_feeds() -> HashMap<Category, Vec<String>> {
    let feeds: [(Category, &[&str]); 6] = [
        (
            Category::International,
            &[
                "https://feeds.bbci.co.uk/news/world/rss.xml",
                "https://rss.cnn.com/rss/edition.rss",
            ],
        ),
        (
            Category::National,
            &[
                "https://www.thehindu.com/news/national/feeder/default.rss",
                "https://timesofindia.indiatimes.com/rssfeedstopstories.cms",
            ],
        ),
        (
            Category::Karnataka,
            &[
                "https://www.thehindu.com/news/national/karnataka/feeder/default.rss",
                "https://www.deccanherald.com/rss/state.rss",
            ],
        ),
        (
            Category::TamilNadu,
            &["https://www.thehindu.com/news/national/tamil-nadu/feeder/default.rss"],
        ),
        (
            Category::Andhra,
            &["https://www.thehindu.com/news/national/andhra-pradesh/feeder/default.rss"],
        ),
        (
            Category::Kerala,
            &["https://www.thehindu.com/news/national/kerala/feeder/default.rss"],
        ),
    ];

    feeds
        .into_iter()
        .map(|(category, urls)| (category, urls.iter().map(|u| u.to_string()).collect()))
        .collect()
}

/// Articles from RSS/Atom feeds, parsed with `feed-rs`
pub struct RssNewsSource {
    client: Client,
    policy: RetryPolicy,
    feeds: HashMap<Category, Vec<String>>,
}

impl RssNewsSource {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            feeds: default_feeds(),
        }
    }

    /// Replaces the feed list of one category
    pub fn with_feeds(mut self, category: Category, urls: Vec<String>) -> Self {
        self.feeds.insert(category, urls);
        self
    }

    async fn fetch_feed(&self, url: &str, category: Category) -> Result<Vec<Article>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AdapterError::request(RSS, e, self.policy.timeout))?;
        let response = check_response(RSS, response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AdapterError::request(RSS, e, self.policy.timeout))?;

        parse_feed(&bytes, url, category)
    }
}

/// Converts a feed document into articles of `category`
pub(crate) fn parse_feed(bytes: &[u8], source_id: &str, category: Category) -> Result<Vec<Article>> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| AdapterError::parse(RSS, e))?;

    let articles = feed
        .entries
        .into_iter()
        .take(ENTRIES_PER_FEED)
        .filter_map(|entry| {
            let title = entry.title.map(|t| strip_html(&t.content))?;
            if title.is_empty() {
                return None;
            }

            let body = entry
                .summary
                .map(|s| strip_html(&s.content))
                .unwrap_or_default();
            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);

            Some(Article {
                source_id: source_id.to_string(),
                engagement_score: engagement_score(&title),
                url: entry.links.first().map(|l| l.href.clone()),
                title,
                body,
                category,
                published_at,
            })
        })
        .collect();

    Ok(articles)
}

#[async_trait]
impl NewsSource for RssNewsSource {
    fn name(&self) -> &'static str {
        RSS
    }

    /// Reads every feed of the category; unreachable feeds are skipped as
    /// long as at least one feed answered
    async fn fetch(&self, category: Category) -> Result<Vec<Article>> {
        let Some(urls) = self.feeds.get(&category).filter(|u| !u.is_empty()) else {
            debug!(%category, "No feeds configured");
            return Ok(Vec::new());
        };

        let results = join_all(
            urls.iter()
                .map(|url| self.policy.run(RSS, move || self.fetch_feed(url, category))),
        )
        .await;

        let mut articles = Vec::new();
        let mut last_error = None;

        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(mut items) => articles.append(&mut items),
                Err(e) => {
                    warn!(%category, feed = %url, "Feed unavailable: {}", e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if articles.is_empty() => Err(e),
            _ => Ok(articles),
        }
    }

    async fn probe(&self) -> ComponentHealth {
        let Some(url) = self
            .feeds
            .get(&Category::National)
            .and_then(|urls| urls.first())
        else {
            return ComponentHealth::degraded(RSS, "no feeds configured");
        };

        let probe = RetryPolicy::probe(self.policy.timeout);
        let result = probe
            .run(RSS, || async move {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| AdapterError::request(RSS, e, probe.timeout))?;
                check_response(RSS, response).await
            })
            .await;

        match result {
            Ok(_) => ComponentHealth::healthy(RSS),
            Err(e) => ComponentHealth::unreachable(RSS, e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<DateTime<Utc>>,
    source: Option<NewsApiSourceRef>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSourceRef {
    name: Option<String>,
}

/// Top headlines from NewsAPI
pub struct NewsApiSource {
    client: Client,
    policy: RetryPolicy,
    api_key: Option<String>,
    base_url: String,
}

impl NewsApiSource {
    pub fn new(client: Client, policy: RetryPolicy, api_key: Option<String>) -> Self {
        Self {
            client,
            policy,
            api_key,
            base_url: "https://newsapi.org/v2".to_string(),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(AdapterError::MissingCredential { adapter: NEWS_API })
    }

    /// Query parameters selecting headlines of one category
    fn query(category: Category) -> Vec<(&'static str, String)> {
        match category {
            Category::International => vec![
                ("language", "en".to_string()),
                ("category", "general".to_string()),
            ],
            Category::National => vec![("country", "in".to_string())],
            Category::Karnataka => vec![("q", "Karnataka".to_string())],
            Category::TamilNadu => vec![("q", "\"Tamil Nadu\"".to_string())],
            Category::Andhra => vec![("q", "\"Andhra Pradesh\"".to_string())],
            Category::Kerala => vec![("q", "Kerala".to_string())],
        }
    }

    async fn request(&self, category: Category, page_size: usize) -> Result<Vec<Article>> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/top-headlines", self.base_url))
            .header("X-Api-Key", api_key)
            .query(&Self::query(category))
            .query(&[("pageSize", page_size.to_string())])
            .send()
            .await
            .map_err(|e| AdapterError::request(NEWS_API, e, self.policy.timeout))?;
        let response = check_response(NEWS_API, response).await?;

        let body: NewsApiResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::parse(NEWS_API, e))?;

        Ok(body
            .articles
            .into_iter()
            .filter_map(|a| {
                let title = a.title.filter(|t| !t.trim().is_empty() && t != "[Removed]")?;
                Some(Article {
                    source_id: a
                        .source
                        .and_then(|s| s.name)
                        .unwrap_or_else(|| NEWS_API.to_string()),
                    engagement_score: engagement_score(&title),
                    title,
                    body: a.description.unwrap_or_default(),
                    category,
                    published_at: a.published_at.unwrap_or_else(Utc::now),
                    url: a.url,
                })
            })
            .collect())
    }
}

#[async_trait]
impl NewsSource for NewsApiSource {
    fn name(&self) -> &'static str {
        NEWS_API
    }

    async fn fetch(&self, category: Category) -> Result<Vec<Article>> {
        self.policy
            .run(NEWS_API, || self.request(category, ENTRIES_PER_FEED))
            .await
    }

    async fn probe(&self) -> ComponentHealth {
        if self.api_key.is_none() {
            return ComponentHealth::unreachable(NEWS_API, "credential not configured");
        }

        match RetryPolicy::probe(self.policy.timeout)
            .run(NEWS_API, || self.request(Category::National, 1))
            .await
        {
            Ok(_) => ComponentHealth::healthy(NEWS_API),
            Err(e) => ComponentHealth::unreachable(NEWS_API, e.to_string()),
        }
    }
}

/// Merges several sources into one
///
/// A category fails only when every source failed for it.
pub struct CompositeNewsSource {
    sources: Vec<Box<dyn NewsSource>>,
}

impl CompositeNewsSource {
    pub fn new(sources: Vec<Box<dyn NewsSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl NewsSource for CompositeNewsSource {
    fn name(&self) -> &'static str {
        "news"
    }

    async fn fetch(&self, category: Category) -> Result<Vec<Article>> {
        let results = join_all(self.sources.iter().map(|s| s.fetch(category))).await;

        let mut articles = Vec::new();
        let mut last_error = None;

        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(mut items) => articles.append(&mut items),
                Err(e) => {
                    warn!(%category, source = source.name(), "News source failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if articles.is_empty() => Err(e),
            _ => Ok(articles),
        }
    }

    async fn probe(&self) -> ComponentHealth {
        let reports = join_all(self.sources.iter().map(|s| s.probe())).await;

        let healthy = reports
            .iter()
            .filter(|r| r.status == Reachability::Healthy)
            .count();

        if !reports.is_empty() && healthy == reports.len() {
            return ComponentHealth::healthy(self.name());
        }

        let detail = reports
            .iter()
            .filter_map(|r| r.detail.as_ref().map(|d| format!("{}: {}", r.name, d)))
            .collect::<Vec<_>>()
            .join("; ");

        if healthy > 0 {
            ComponentHealth::degraded(self.name(), detail)
        } else {
            ComponentHealth::unreachable(self.name(), detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>State news</title>
    <link>https://example.com</link>
    <description>Latest</description>
    <item>
      <title>Bengaluru metro opens new line</title>
      <link>https://example.com/metro</link>
      <description>&lt;p&gt;The purple line extension &lt;b&gt;opens&lt;/b&gt; today.&lt;/p&gt;</description>
      <pubDate>Mon, 12 Oct 2026 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Annual review meeting held</title>
      <link>https://example.com/meeting</link>
    </item>
  </channel>
</rss>"#;

    fn article(title: &str, hour: u32) -> Article {
        Article {
            source_id: "test".to_string(),
            title: title.to_string(),
            body: String::new(),
            category: Category::Karnataka,
            published_at: Utc.with_ymd_and_hms(2026, 10, 12, hour, 0, 0).unwrap(),
            url: None,
            engagement_score: engagement_score(title),
        }
    }

    #[test]
    fn test_parse_feed() {
        let articles = parse_feed(SAMPLE_RSS.as_bytes(), "feed", Category::Karnataka).unwrap();
        assert_eq!(articles.len(), 2);

        let metro = &articles[0];
        assert_eq!(metro.title, "Bengaluru metro opens new line");
        assert_eq!(metro.body, "The purple line extension opens today.");
        assert_eq!(metro.url.as_deref(), Some("https://example.com/metro"));
        assert_eq!(metro.category, Category::Karnataka);
        assert!(metro.engagement_score > articles[1].engagement_score);
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        let err = parse_feed(b"not a feed", "feed", Category::Kerala).unwrap_err();
        assert!(matches!(err, AdapterError::Parse { adapter: "rss", .. }));
    }

    #[test]
    fn test_select_top_prefers_engagement_then_recency() {
        let picked = select_top(
            vec![
                article("Cabinet meeting today", 9),
                article("Breaking: dam gates opened", 7),
                article("Team wins trophy", 8),
                article("Breaking: flood alert issued", 10),
            ],
            2,
        );

        let titles: Vec<_> = picked.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Breaking: flood alert issued", "Breaking: dam gates opened"]
        );
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Rain &amp; wind</p>\n<br/>expected"),
            "Rain & wind expected"
        );
    }

    #[test]
    fn test_default_feeds_cover_every_category() {
        let feeds = default_feeds();
        for category in Category::ALL {
            assert!(!feeds[&category].is_empty(), "{} has no feeds", category);
        }
    }

    #[tokio::test]
    async fn test_newsapi_probe_without_key_is_unreachable() {
        let source = NewsApiSource::new(Client::new(), RetryPolicy::default(), None);
        let health = source.probe().await;
        assert_eq!(health.status, Reachability::Unreachable);
    }
}
