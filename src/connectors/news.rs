//! News feeds: Google News search and arbitrary RSS 2.0 / Atom URLs.
//!
//! Feeds are fetched as text through the shared client and parsed with a
//! streaming `quick-xml` reader into a flat list of entries.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::{unknown_command, CommandSpec, Connector, Module, Params};
use crate::http::{Request, Scope, UpstreamClient};
use crate::types::{Outcome, SkillsError};

pub const GOOGLE_NEWS_URL: &str = "https://news.google.com/rss/search";
const FEED_TTL_SECS: u64 = 300;

const FEED_PARAMS: &[&str] = &[
    "google_news",
    "query",
    "url",
    "language",
    "country",
    "after",
    "before",
    "sort_by_date",
];

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "fetch_feed",
        "Fetch and parse an RSS/Atom feed or a Google News search",
        &[],
        FEED_PARAMS,
    ),
    CommandSpec::new(
        "fetch_items",
        "Entries of an RSS/Atom feed or Google News search, optionally limited",
        &[],
        &[
            "google_news",
            "query",
            "url",
            "limit",
            "language",
            "country",
            "after",
            "before",
            "sort_by_date",
        ],
    ),
];

// ---------------------------------------------------------------------------
// Feed model
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Serialize, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    pub source: String,
    pub author: String,
    pub id: String,
}

impl FeedEntry {
    /// Publication time from RFC 2822 (RSS) or RFC 3339 (Atom) dates.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.published.trim();
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    #[default]
    Rss,
    Atom,
}

#[derive(Debug, Default, Serialize)]
pub struct Feed {
    pub format: FeedFormat,
    pub title: String,
    pub link: String,
    pub description: String,
    pub updated: String,
    pub entries: Vec<FeedEntry>,
}

fn set_once(slot: &mut String, value: &str) {
    if slot.is_empty() && !value.is_empty() {
        *slot = value.to_string();
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// `href` of an Atom `<link>`; only alternate (or unlabelled) links count.
fn atom_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value().ok()?.into_owned();
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }
    match rel.as_deref() {
        None | Some("alternate") => href,
        _ => None,
    }
}

/// Parse an RSS 2.0, RSS 1.0 (RDF) or Atom document.
pub fn parse_feed(xml: &str) -> Result<Feed, SkillsError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut recognised = false;
    let mut stack: Vec<String> = Vec::new();
    let mut entry: Option<FeedEntry> = None;
    let mut buf = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SkillsError::InvalidInput(format!("Malformed feed XML: {e}")))?;
        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                match name.as_str() {
                    "rss" | "RDF" if stack.is_empty() => recognised = true,
                    "feed" if stack.is_empty() => {
                        recognised = true;
                        feed.format = FeedFormat::Atom;
                    }
                    "item" | "entry" => entry = Some(FeedEntry::default()),
                    "link" => {
                        if let Some(href) = atom_href(&e) {
                            match entry.as_mut() {
                                Some(item) => set_once(&mut item.link, &href),
                                None => set_once(&mut feed.link, &href),
                            }
                        }
                    }
                    _ => {}
                }
                stack.push(name);
                buf.clear();
            }
            Event::Empty(e) => {
                if local_name(&e) == "link" {
                    if let Some(href) = atom_href(&e) {
                        match entry.as_mut() {
                            Some(item) => set_once(&mut item.link, &href),
                            None => set_once(&mut feed.link, &href),
                        }
                    }
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| SkillsError::InvalidInput(format!("Malformed feed XML: {e}")))?;
                buf.push_str(&text);
            }
            Event::CData(c) => buf.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                let parent = stack.last().map(String::as_str).unwrap_or("");
                let value = buf.trim().to_string();
                buf.clear();

                if name == "item" || name == "entry" {
                    if let Some(done) = entry.take() {
                        feed.entries.push(done);
                    }
                    continue;
                }
                match entry.as_mut() {
                    Some(item) => match name.as_str() {
                        "title" => set_once(&mut item.title, &value),
                        "link" => set_once(&mut item.link, &value),
                        "published" | "pubDate" | "date" => item.published = value,
                        "updated" => set_once(&mut item.published, &value),
                        "description" | "summary" | "content" | "encoded" => {
                            set_once(&mut item.summary, &value)
                        }
                        "source" => set_once(&mut item.source, &value),
                        "creator" => set_once(&mut item.author, &value),
                        "author" if parent != "source" => set_once(&mut item.author, &value),
                        "name" if parent == "author" => set_once(&mut item.author, &value),
                        "guid" | "id" => set_once(&mut item.id, &value),
                        _ => {}
                    },
                    None => match name.as_str() {
                        "title" if parent != "image" => set_once(&mut feed.title, &value),
                        "link" if parent != "image" => set_once(&mut feed.link, &value),
                        "description" | "subtitle" => set_once(&mut feed.description, &value),
                        "lastBuildDate" | "updated" | "pubDate" => {
                            set_once(&mut feed.updated, &value)
                        }
                        _ => {}
                    },
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !recognised {
        return Err(SkillsError::InvalidInput(
            "Response is not an RSS or Atom feed".into(),
        ));
    }
    Ok(feed)
}

// ---------------------------------------------------------------------------
// Request options
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FeedQuery {
    url: String,
    after: Option<NaiveDate>,
    before: Option<NaiveDate>,
    /// Google News applies the bounds server-side as query operators.
    google_news: bool,
    sort_by_date: bool,
}

fn parse_day(params: &Params, key: &str) -> Result<Option<NaiveDate>, SkillsError> {
    params
        .str(key)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                SkillsError::InvalidInput(format!(
                    "Invalid value for --{key}: expected YYYY-MM-DD, got {raw}"
                ))
            })
        })
        .transpose()
}

/// Google News search URL. Date bounds become `after:`/`before:` search
/// operators.
pub fn google_news_url(
    query: &str,
    language: &str,
    country: &str,
    after: Option<NaiveDate>,
    before: Option<NaiveDate>,
) -> String {
    let mut q = query.to_string();
    if let Some(d) = after {
        q.push_str(&format!(" after:{}", d.format("%Y-%m-%d")));
    }
    if let Some(d) = before {
        q.push_str(&format!(" before:{}", d.format("%Y-%m-%d")));
    }
    let lang = language.split('-').next().unwrap_or(language);
    format!(
        "{GOOGLE_NEWS_URL}?q={}&hl={}&gl={}&ceid={}",
        urlencoding::encode(&q),
        urlencoding::encode(language),
        urlencoding::encode(country),
        urlencoding::encode(&format!("{country}:{lang}")),
    )
}

impl FeedQuery {
    fn from_params(params: &Params) -> Result<Self, SkillsError> {
        let after = parse_day(params, "after")?;
        let before = parse_day(params, "before")?;
        let google_news = params.flag("google_news").unwrap_or(false);
        let url = if google_news {
            let query = params.str("query").ok_or_else(|| {
                SkillsError::InvalidInput("query is required when google_news is set".into())
            })?;
            google_news_url(
                &query,
                &params.str_or("language", "en-US"),
                &params.str_or("country", "US"),
                after,
                before,
            )
        } else {
            params.str("url").ok_or_else(|| {
                SkillsError::InvalidInput("url is required unless google_news is set".into())
            })?
        };
        Ok(Self {
            url,
            after,
            before,
            google_news,
            sort_by_date: params.flag("sort_by_date").unwrap_or(false),
        })
    }

    /// Apply date bounds and ordering. With a bound set on a plain feed,
    /// undated entries are dropped.
    fn apply(&self, entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
        let bounded = !self.google_news && (self.after.is_some() || self.before.is_some());
        let mut kept: Vec<FeedEntry> = entries
            .into_iter()
            .filter(|e| {
                if !bounded {
                    return true;
                }
                let Some(day) = e.published_at().map(|t| t.date_naive()) else {
                    return false;
                };
                self.after.map_or(true, |a| day >= a) && self.before.map_or(true, |b| day < b)
            })
            .collect();
        if self.sort_by_date {
            kept.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
        }
        kept
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct NewsConnector {
    client: Arc<UpstreamClient>,
}

impl NewsConnector {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }

    async fn load(&self, query: &FeedQuery) -> Result<Feed, SkillsError> {
        let req = Request::new(Scope::News, query.url.as_str())
            .header(
                "Accept",
                "application/rss+xml, application/atom+xml, application/xml, text/xml",
            )
            .ttl_secs(FEED_TTL_SECS);
        let body = self.client.get_text(&req).await?;
        let mut feed = parse_feed(&body)?;
        feed.entries = query.apply(std::mem::take(&mut feed.entries));
        Ok(feed)
    }

    async fn fetch_feed(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let query = FeedQuery::from_params(params)?;
        let feed = self.load(&query).await?;
        let message = format!(
            "Fetched {} entries from {}",
            feed.entries.len(),
            feed_label(&feed, &query)
        );
        let count = feed.entries.len();
        Ok(Outcome::ok_with(
            json!({
                "feed": {
                    "format": feed.format,
                    "title": feed.title,
                    "link": feed.link,
                    "description": feed.description,
                    "updated": feed.updated,
                },
                "entries": feed.entries,
                "count": count,
            }),
            message,
        ))
    }

    async fn fetch_items(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let query = FeedQuery::from_params(params)?;
        let limit = params.int("limit")?;
        if matches!(limit, Some(n) if n < 1) {
            return Err(SkillsError::InvalidInput("limit must be a positive integer".into()));
        }
        let mut items = self.load(&query).await?.entries;
        if let Some(n) = limit {
            items.truncate(n as usize);
        }
        Ok(Outcome::ok_with(
            json!({"items": items, "count": items.len()}),
            format!("Retrieved {} items", items.len()),
        ))
    }
}

fn feed_label<'a>(feed: &'a Feed, query: &'a FeedQuery) -> &'a str {
    if feed.title.is_empty() {
        &query.url
    } else {
        &feed.title
    }
}

#[async_trait]
impl Connector for NewsConnector {
    fn module(&self) -> Module {
        Module::News
    }

    async fn call(&self, command: &str, params: &Params) -> Outcome {
        let result = match command {
            "fetch_feed" => self.fetch_feed(params).await,
            "fetch_items" => self.fetch_items(params).await,
            _ => return unknown_command(Module::News, command),
        };
        result.unwrap_or_else(Outcome::from)
    }
}
