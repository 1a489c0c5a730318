use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use tracing::debug;
use url::Url;

use crate::decode::{decode_bytes, DecodeError};
use crate::post::Record;

pub const DEFAULT_CACHE_BUST_PARAM: &str = "_";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("feed request failed with status {0}")]
    Status(u16),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FeedError {
    pub fn is_decode(&self) -> bool {
        matches!(self, FeedError::Decode(_))
    }

    /// Message shown in place of, or above, the posts.
    pub fn fallback_message(&self) -> &'static str {
        if self.is_decode() {
            "Error loading posts. Please check the sheet URL."
        } else {
            "Failed to fetch posts. Check your internet connection."
        }
    }
}

/// Where the feed text comes from.
pub trait FeedSource: Send + Sync {
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<Vec<u8>, FeedError>;
}

/// One fetch plus decode; runs off the state-owning thread.
pub fn load_records(source: &dyn FeedSource) -> Result<Vec<Record>, FeedError> {
    let body = source.fetch()?;
    Ok(decode_bytes(&body)?)
}

#[derive(Debug, Clone, Default)]
pub struct HttpSourceConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub cache_bust_param: String,
}

pub struct HttpFeedSource {
    http: HttpClient,
    url: Url,
    user_agent: String,
    cache_bust_param: String,
}

impl HttpFeedSource {
    pub fn new(config: HttpSourceConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            bail!("feed url required");
        }
        if config.user_agent.trim().is_empty() {
            bail!("feed client user agent required");
        }
        let url = Url::parse(config.url.trim())
            .with_context(|| format!("parse feed url {:?}", config.url))?;

        let timeout = if config.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            config.timeout
        };
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build feed http client")?;

        let cache_bust_param = if config.cache_bust_param.is_empty() {
            DEFAULT_CACHE_BUST_PARAM.to_string()
        } else {
            config.cache_bust_param
        };

        Ok(Self {
            http,
            url,
            user_agent: config.user_agent,
            cache_bust_param,
        })
    }

    pub fn request_url(&self, now: DateTime<Utc>) -> Url {
        cache_busted_url(&self.url, &self.cache_bust_param, now.timestamp_millis())
    }
}

impl FeedSource for HttpFeedSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        let url = self.request_url(Utc::now());
        debug!(%url, "fetching feed");

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(|err| FeedError::Fetch(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .map_err(|err| FeedError::Fetch(err.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Appends `param=millis` so intermediaries never serve a stale copy.
pub fn cache_busted_url(base: &Url, param: &str, millis: i64) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair(param, &millis.to_string());
    url
}

/// Reads a local CSV file on every refresh.
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FileFeedSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        fs::read(&self.path)
            .map_err(|err| FeedError::Fetch(format!("read {}: {}", self.path.display(), err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::thread;
    use tiny_http::{Response, Server};

    fn serve_once(status: i32, body: &'static str) -> (String, crossbeam_channel::Receiver<String>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let base = format!("http://{}/sheet.csv?output=csv", server.server_addr());
        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let _ = tx.send(request.url().to_string());
                let _ = request.respond(Response::from_string(body).with_status_code(status));
            }
        });
        (base, rx)
    }

    fn source(url: &str) -> HttpFeedSource {
        HttpFeedSource::new(HttpSourceConfig {
            url: url.to_string(),
            user_agent: "postboard-test".into(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn cache_buster_appends_to_existing_query() {
        let base = Url::parse("https://docs.example.com/pub?output=csv").unwrap();
        let url = cache_busted_url(&base, "_", 1234);
        assert_eq!(url.as_str(), "https://docs.example.com/pub?output=csv&_=1234");

        let bare = Url::parse("https://example.com/feed.csv").unwrap();
        assert_eq!(
            cache_busted_url(&bare, "_", 99).as_str(),
            "https://example.com/feed.csv?_=99"
        );
    }

    #[test]
    fn http_source_fetches_with_cache_buster() {
        let (base, requested) = serve_once(200, "Title\nHello\n");
        let records = load_records(&source(&base)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Title"], "Hello");

        let path = requested.recv().unwrap();
        assert!(path.starts_with("/sheet.csv?output=csv&_="), "{path}");
    }

    #[test]
    fn non_success_status_is_fetch_error() {
        let (base, _requested) = serve_once(500, "oops");
        let err = load_records(&source(&base)).unwrap_err();
        assert_eq!(err, FeedError::Status(500));
        assert!(!err.is_decode());
    }

    #[test]
    fn unreachable_host_is_fetch_error() {
        let err = load_records(&source("http://127.0.0.1:1/feed.csv")).unwrap_err();
        assert!(matches!(err, FeedError::Fetch(_)));
    }

    #[test]
    fn missing_url_is_rejected() {
        let result = HttpFeedSource::new(HttpSourceConfig {
            user_agent: "postboard-test".into(),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn file_source_reads_and_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        fs::write(&path, "Title,Tags\nHello,a\n").unwrap();
        let records = load_records(&FileFeedSource::new(&path)).unwrap();
        assert_eq!(records[0]["Tags"], "a");

        let missing = FileFeedSource::new(dir.path().join("nope.csv"));
        assert!(matches!(load_records(&missing), Err(FeedError::Fetch(_))));
    }

    #[test]
    fn empty_body_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        fs::write(&path, "").unwrap();
        let err = load_records(&FileFeedSource::new(&path)).unwrap_err();
        assert!(err.is_decode());
        assert_eq!(
            err.fallback_message(),
            "Error loading posts. Please check the sheet URL."
        );
    }
}
