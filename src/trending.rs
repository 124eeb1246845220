//! Trending lists from public hot-list endpoints.
//!
//! Each [`HotListSource`] knows its endpoint and how to turn the response into at most
//! [`TOP_ITEMS`] [`HotItem`]s.  A [`TrendingRefresher`] owns a background task that refetches
//! every source on a fixed period for as long as the refresher is alive.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{TRENDING_ERRORS, TRENDING_FETCHES};
use crate::transport::error_from_parts;

/// How many entries of each list are kept.
pub const TOP_ITEMS: usize = 5;

/// How often a [`TrendingRefresher`] refetches.
pub const REFRESH_PERIOD: Duration = Duration::from_secs(5 * 60);

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// A public hot list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HotListSource {
    /// Zhihu's hot questions.
    Zhihu,
    /// Juejin's hot articles.
    Juejin,
    /// Weibo's realtime hot searches.
    Weibo,
}

impl HotListSource {
    /// Every source, in display order.
    pub const ALL: [HotListSource; 3] = [
        HotListSource::Zhihu,
        HotListSource::Juejin,
        HotListSource::Weibo,
    ];

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            HotListSource::Zhihu => "zhihu",
            HotListSource::Juejin => "juejin",
            HotListSource::Weibo => "weibo",
        }
    }

    /// Heading shown above the list.
    pub fn title(&self) -> &'static str {
        match self {
            HotListSource::Zhihu => "知乎热榜",
            HotListSource::Juejin => "掘金热榜",
            HotListSource::Weibo => "微博热搜",
        }
    }

    /// The endpoint the list is fetched from.
    pub fn endpoint(&self) -> &'static str {
        match self {
            HotListSource::Zhihu => {
                "https://www.zhihu.com/api/v3/feed/topstory/hot-lists/total?limit=50"
            }
            HotListSource::Juejin => {
                "https://api.juejin.cn/content_api/v1/content/article_rank?category_id=1&type=hot"
            }
            HotListSource::Weibo => "https://weibo.com/ajax/side/hotSearch",
        }
    }

    /// Parse a response body into the top entries.
    pub fn parse(&self, body: &str) -> Result<Vec<HotItem>> {
        let items = match self {
            HotListSource::Zhihu => parse_zhihu(body)?,
            HotListSource::Juejin => parse_juejin(body)?,
            HotListSource::Weibo => parse_weibo(body)?,
        };
        Ok(items)
    }
}

impl fmt::Display for HotListSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HotListSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        HotListSource::ALL
            .into_iter()
            .find(|source| source.name() == s)
            .ok_or_else(|| Error::validation(format!("unknown hot list {s:?}"), None))
    }
}

/// One entry of a hot list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotItem {
    /// 1-based rank.
    pub index: usize,
    /// Headline.
    pub title: String,
    /// Where the entry links to.
    pub url: String,
    /// Source specific extra text; may be empty.
    pub detail: String,
}

impl fmt::Display for HotItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.index, self.title)?;
        if !self.detail.is_empty() {
            write!(f, "  ({})", self.detail)?;
        }
        write!(f, "\n   {}", self.url)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(u64),
    Text(String),
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdValue::Number(n) => write!(f, "{n}"),
            IdValue::Text(s) => write!(f, "{s}"),
        }
    }
}

fn parse_zhihu(body: &str) -> Result<Vec<HotItem>> {
    #[derive(Deserialize)]
    struct Response {
        data: Vec<Entry>,
    }

    #[derive(Deserialize)]
    struct Entry {
        target: Target,
    }

    #[derive(Deserialize)]
    struct Target {
        id: IdValue,
        title: String,
        #[serde(default)]
        detail_text: Option<String>,
    }

    let response: Response = serde_json::from_str(body)?;
    Ok(response
        .data
        .into_iter()
        .take(TOP_ITEMS)
        .enumerate()
        .map(|(i, entry)| HotItem {
            index: i + 1,
            url: format!("https://www.zhihu.com/question/{}", entry.target.id),
            title: entry.target.title,
            detail: entry.target.detail_text.unwrap_or_default(),
        })
        .collect())
}

fn parse_juejin(body: &str) -> Result<Vec<HotItem>> {
    #[derive(Deserialize)]
    struct Response {
        data: Vec<Entry>,
    }

    #[derive(Deserialize)]
    struct Entry {
        content: Content,
        author: Author,
        content_counter: Counter,
    }

    #[derive(Deserialize)]
    struct Content {
        content_id: IdValue,
        title: String,
    }

    #[derive(Deserialize)]
    struct Author {
        name: String,
    }

    #[derive(Deserialize)]
    struct Counter {
        #[serde(default)]
        view: u64,
    }

    let response: Response = serde_json::from_str(body)?;
    Ok(response
        .data
        .into_iter()
        .take(TOP_ITEMS)
        .enumerate()
        .map(|(i, entry)| HotItem {
            index: i + 1,
            url: format!("https://juejin.cn/post/{}", entry.content.content_id),
            title: entry.content.title,
            detail: format!("{} · {} 阅读", entry.author.name, entry.content_counter.view),
        })
        .collect())
}

fn parse_weibo(body: &str) -> Result<Vec<HotItem>> {
    #[derive(Deserialize)]
    struct Response {
        data: Data,
    }

    #[derive(Deserialize)]
    struct Data {
        realtime: Vec<Entry>,
    }

    #[derive(Deserialize)]
    struct Entry {
        word: String,
        #[serde(default)]
        icon_desc: Option<String>,
        #[serde(default)]
        num: Option<u64>,
    }

    let response: Response = serde_json::from_str(body)?;
    response
        .data
        .realtime
        .into_iter()
        .take(TOP_ITEMS)
        .enumerate()
        .map(|(i, entry)| {
            let url = weibo_search_url(&entry.word)?;
            let mut detail = Vec::new();
            if let Some(tag) = entry.icon_desc.filter(|t| !t.is_empty()) {
                detail.push(tag);
            }
            if let Some(num) = entry.num.filter(|n| *n > 0) {
                detail.push(format!("{}讨论", discussion_count(num)));
            }
            Ok(HotItem {
                index: i + 1,
                title: entry.word,
                url: url.into(),
                detail: detail.join(" "),
            })
        })
        .collect()
}

/// Weibo's discussion count in units of ten thousand, rounded down.
pub fn discussion_count(num: u64) -> String {
    format!("{}万", num / 10_000)
}

/// The search page for a Weibo hot word.
pub fn weibo_search_url(word: &str) -> Result<Url> {
    Ok(Url::parse_with_params("https://s.weibo.com/weibo", &[("q", word)])?)
}

/// Fetches one hot list.
#[async_trait::async_trait]
pub trait HotListFetcher: Send + Sync {
    /// Fetch and parse the top entries of `source`.
    async fn fetch(&self, source: HotListSource) -> Result<Vec<HotItem>>;
}

/// [`HotListFetcher`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct TrendingClient {
    client: ReqwestClient,
}

impl TrendingClient {
    /// Create a client with a 10 second request timeout.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let client = ReqwestClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self { client })
    }

    async fn fetch_body(&self, source: HotListSource) -> Result<String> {
        let response = self
            .client
            .get(source.endpoint())
            .send()
            .await
            .map_err(|e| Error::connection(format!("{source}: {e}"), Some(Box::new(e))))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::connection(format!("{source}: {e}"), Some(Box::new(e))))?;
        if !status.is_success() {
            return Err(error_from_parts(status, &body));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl HotListFetcher for TrendingClient {
    async fn fetch(&self, source: HotListSource) -> Result<Vec<HotItem>> {
        let body = self.fetch_body(source).await?;
        source.parse(&body)
    }
}

/// One source's list at the time of a refresh.
#[derive(Debug, Clone)]
pub struct HotList {
    /// Where the list came from.
    pub source: HotListSource,
    /// The entries, or why the fetch failed.
    pub items: Result<Vec<HotItem>>,
}

/// Every list as of one refresh.
#[derive(Debug, Clone)]
pub struct TrendingSnapshot {
    /// When the refresh finished.
    pub fetched_at: OffsetDateTime,
    /// One list per source, in [`HotListSource::ALL`] order.
    pub lists: Vec<HotList>,
}

impl TrendingSnapshot {
    /// The list for `source`.
    pub fn list(&self, source: HotListSource) -> Option<&HotList> {
        self.lists.iter().find(|list| list.source == source)
    }

    /// Text for a terminal, limited to `only` when given.
    pub fn render(&self, only: Option<HotListSource>) -> String {
        let format = format_description!("[hour]:[minute]:[second]");
        let stamp = self
            .fetched_at
            .format(&format)
            .unwrap_or_else(|_| "?".to_string());
        let mut out = format!("Updated {stamp} UTC\n");
        for list in &self.lists {
            if only.is_some_and(|source| source != list.source) {
                continue;
            }
            out.push_str(&format!("\n{}\n", list.source.title()));
            match &list.items {
                Ok(items) if items.is_empty() => out.push_str("  (empty)\n"),
                Ok(items) => {
                    for item in items {
                        out.push_str(&format!("{item}\n"));
                    }
                }
                Err(err) => out.push_str(&format!("  failed to load: {err}\n")),
            }
        }
        out
    }
}

/// Fetch every source concurrently.  A failing source does not affect the others.
pub async fn fetch_all(fetcher: &dyn HotListFetcher) -> TrendingSnapshot {
    let lists = futures::future::join_all(HotListSource::ALL.into_iter().map(|source| async move {
        TRENDING_FETCHES.click();
        let items = fetcher.fetch(source).await;
        if items.is_err() {
            TRENDING_ERRORS.click();
        }
        HotList { source, items }
    }))
    .await;
    TrendingSnapshot {
        fetched_at: OffsetDateTime::now_utc(),
        lists,
    }
}

/// Keeps a [`TrendingSnapshot`] fresh in the background.
///
/// The first refresh starts immediately.  Dropping the refresher stops the task.
pub struct TrendingRefresher {
    latest: watch::Receiver<Option<TrendingSnapshot>>,
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl TrendingRefresher {
    /// Start refreshing every `period` on the current tokio runtime.
    pub fn spawn(fetcher: Arc<dyn HotListFetcher>, period: Duration) -> Self {
        let (tx, latest) = watch::channel(None);
        let wake = Arc::new(Notify::new());
        let handle = tokio::spawn(refresh_loop(fetcher, period, tx, Arc::clone(&wake)));
        Self {
            latest,
            wake,
            handle,
        }
    }

    /// The most recent snapshot, if a refresh has finished.
    pub fn latest(&self) -> Option<TrendingSnapshot> {
        self.latest.borrow().clone()
    }

    /// Watch for new snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Option<TrendingSnapshot>> {
        self.latest.clone()
    }

    /// Refresh now instead of waiting for the next period.
    pub fn refresh(&self) {
        self.wake.notify_one();
    }
}

impl Drop for TrendingRefresher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn refresh_loop(
    fetcher: Arc<dyn HotListFetcher>,
    period: Duration,
    tx: watch::Sender<Option<TrendingSnapshot>>,
    wake: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = wake.notified() => interval.reset(),
        }
        let snapshot = fetch_all(fetcher.as_ref()).await;
        if tx.send(Some(snapshot)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn source_names() {
        assert_eq!("Weibo".parse::<HotListSource>().unwrap(), HotListSource::Weibo);
        assert!("reddit".parse::<HotListSource>().is_err());
        assert_eq!(HotListSource::Zhihu.to_string(), "zhihu");
    }

    #[test]
    fn zhihu_items() {
        let body = serde_json::json!({
            "data": (1..=7).map(|i| serde_json::json!({
                "target": {"id": 1000 + i, "title": format!("Q{i}"), "detail_text": format!("{i} 万热度")}
            })).collect::<Vec<_>>()
        })
        .to_string();
        let items = HotListSource::Zhihu.parse(&body).unwrap();
        assert_eq!(items.len(), TOP_ITEMS);
        assert_eq!(
            items[0],
            HotItem {
                index: 1,
                title: "Q1".to_string(),
                url: "https://www.zhihu.com/question/1001".to_string(),
                detail: "1 万热度".to_string(),
            }
        );
        assert_eq!(items[4].index, 5);
    }

    #[test]
    fn juejin_items() {
        let body = r#"{"data":[{"content":{"content_id":"7312","title":"Rust async"},"author":{"name":"alice"},"content_counter":{"view":4321}}]}"#;
        let items = HotListSource::Juejin.parse(body).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://juejin.cn/post/7312");
        assert_eq!(items[0].detail, "alice · 4321 阅读");
    }

    #[test]
    fn weibo_items() {
        let body = r#"{"data":{"realtime":[
            {"word":"春节 档","icon_desc":"热","num":1234567},
            {"word":"plain"}
        ]}}"#;
        let items = HotListSource::Weibo.parse(body).unwrap();
        assert_eq!(items[0].title, "春节 档");
        assert_eq!(items[0].detail, "热 123万讨论");
        assert!(items[0].url.starts_with("https://s.weibo.com/weibo?q="));
        assert!(!items[0].url.contains(' '));
        assert_eq!(items[1].detail, "");
        assert_eq!(items[1].url, "https://s.weibo.com/weibo?q=plain");
    }

    #[test]
    fn discussion_counts() {
        assert_eq!(discussion_count(9_999), "0万");
        assert_eq!(discussion_count(10_000), "1万");
        assert_eq!(discussion_count(2_599_999), "259万");
    }

    #[test]
    fn unexpected_shape_is_an_error() {
        assert!(HotListSource::Weibo.parse(r#"{"data":[]}"#).is_err());
        assert!(HotListSource::Zhihu.parse("<html>").is_err());
    }

    struct FakeFetcher {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl HotListFetcher for FakeFetcher {
        async fn fetch(&self, source: HotListSource) -> Result<Vec<HotItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match source {
                HotListSource::Juejin => {
                    Err(Error::request_failed(503, "Service Unavailable", None))
                }
                _ => Ok(vec![HotItem {
                    index: 1,
                    title: format!("{source} top"),
                    url: "https://example.invalid/".to_string(),
                    detail: String::new(),
                }]),
            }
        }
    }

    #[tokio::test]
    async fn failing_source_is_isolated() {
        let fetcher = FakeFetcher {
            calls: AtomicUsize::new(0),
        };
        let snapshot = fetch_all(&fetcher).await;
        assert_eq!(snapshot.lists.len(), 3);
        assert!(snapshot.list(HotListSource::Zhihu).unwrap().items.is_ok());
        assert!(snapshot.list(HotListSource::Juejin).unwrap().items.is_err());
        let text = snapshot.render(None);
        assert!(text.contains("知乎热榜"));
        assert!(text.contains("failed to load"));
        assert!(text.contains("1. weibo top"));
        let only = snapshot.render(Some(HotListSource::Weibo));
        assert!(!only.contains("知乎热榜"));
    }

    #[tokio::test(start_paused = true)]
    async fn refresher_refreshes_on_period() {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
        });
        let refresher = TrendingRefresher::spawn(fetcher.clone(), REFRESH_PERIOD);
        let mut updates = refresher.subscribe();

        updates.changed().await.unwrap();
        assert!(refresher.latest().is_some());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        updates.changed().await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 6);

        refresher.refresh();
        updates.changed().await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_refresher_stops_task() {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
        });
        let refresher = TrendingRefresher::spawn(fetcher.clone(), REFRESH_PERIOD);
        let mut updates = refresher.subscribe();
        updates.changed().await.unwrap();
        drop(refresher);
        tokio::time::sleep(REFRESH_PERIOD * 3).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }
}
