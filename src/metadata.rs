//! Movie metadata lookups against the OMDb API.
//!
//! Lookup failures never escape this module as errors: they come back as a
//! [`MetadataRecord`] carrying only the failure fields, so one missing title
//! cannot stop the workbook from being produced.

use std::fmt;
use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;

use crate::error::{LookupFailure, PipelineError};
use crate::title::{is_anniversary_edition, QUERY_JOINER};
use crate::types::{MetadataRecord, SelectionEntry};

pub const DEFAULT_BASE_URL: &str = "http://www.omdbapi.com/";
pub const DEFAULT_TARGET_YEAR: i32 = 2024;

/// Older films that chart like new releases; searched without a year.
pub const DEFAULT_YEAR_EXEMPT_TITLES: &[&str] = &["The Amazing Spider-Man"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub title: String,
    pub year: Option<i32>,
}

/// Decides whether a lookup is pinned to the release year of the target week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearPolicy {
    pub target_year: i32,
    pub exempt_titles: Vec<String>,
}

impl Default for YearPolicy {
    fn default() -> Self {
        Self {
            target_year: DEFAULT_TARGET_YEAR,
            exempt_titles: DEFAULT_YEAR_EXEMPT_TITLES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl YearPolicy {
    /// Re-releases (anniversary editions) and exempt titles are unconstrained.
    pub fn year_for(&self, entry: &SelectionEntry) -> Option<i32> {
        if is_anniversary_edition(&entry.raw_title) {
            return None;
        }
        let exempt = self
            .exempt_titles
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(entry.canonical_title.trim()));
        if exempt {
            None
        } else {
            Some(self.target_year)
        }
    }

    pub fn query_for(&self, entry: &SelectionEntry) -> LookupQuery {
        LookupQuery {
            title: entry.query.clone(),
            year: self.year_for(entry),
        }
    }
}

/// Source of movie metadata.
pub trait MetadataLookup: Sync {
    fn lookup(&self, query: &LookupQuery) -> Result<MetadataRecord, LookupFailure>;
}

/// OMDb API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Read the key from `var`, failing when it is unset or blank.
    pub fn from_env(var: &str) -> Result<Self, PipelineError> {
        std::env::var(var)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| PipelineError::MissingCredential {
                var: var.to_string(),
            })
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Blocking OMDb client.
pub struct OmdbClient {
    http_client: ureq::Agent,
    base_url: String,
    api_key: ApiKey,
}

impl OmdbClient {
    pub fn new(base_url: &str, api_key: ApiKey, timeout: Duration) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .build();
        Self {
            http_client,
            base_url: base_url.trim().to_string(),
            api_key,
        }
    }

    fn request_url(&self, query: &LookupQuery) -> String {
        // `+` already separates words; encode each word, keep the separators.
        let title = query
            .title
            .split(QUERY_JOINER)
            .map(|word| urlencoding::encode(word).into_owned())
            .collect::<Vec<_>>()
            .join("+");
        let mut url = format!(
            "{}?apikey={}&t={}",
            self.base_url,
            urlencoding::encode(self.api_key.expose()),
            title
        );
        if let Some(year) = query.year {
            url.push_str(&format!("&y={year}"));
        }
        url
    }

    /// Transport errors echo the request URL; keep the key out of logs.
    fn redact(&self, message: String) -> String {
        let key = self.api_key.expose();
        message
            .replace(&*urlencoding::encode(key), "***")
            .replace(key, "***")
    }

    fn classify_ureq_failure(&self, error: ureq::Error) -> LookupFailure {
        match error {
            ureq::Error::Status(code, _) => LookupFailure::Status(code),
            ureq::Error::Transport(transport) => {
                let timed_out = is_timeout(&transport);
                let message = self.redact(transport.to_string());
                if timed_out {
                    LookupFailure::Timeout(message)
                } else {
                    LookupFailure::Transport(message)
                }
            }
        }
    }
}

/// Deadline expiries surface as I/O errors of kind `TimedOut` (or
/// `WouldBlock` from a socket read timeout) somewhere in the source chain.
fn is_timeout(transport: &ureq::Transport) -> bool {
    if !matches!(
        transport.kind(),
        ureq::ErrorKind::Io | ureq::ErrorKind::ConnectionFailed
    ) {
        return false;
    }
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            );
        }
        source = err.source();
    }
    false
}

impl MetadataLookup for OmdbClient {
    fn lookup(&self, query: &LookupQuery) -> Result<MetadataRecord, LookupFailure> {
        debug!("OMDb lookup t={} y={:?}", query.title, query.year);
        let response = self
            .http_client
            .get(&self.request_url(query))
            .set("Accept", "application/json")
            .call()
            .map_err(|e| self.classify_ureq_failure(e))?;
        let body: Value = response
            .into_json()
            .map_err(|e| LookupFailure::MalformedBody(self.redact(e.to_string())))?;
        match body {
            Value::Object(fields) => Ok(MetadataRecord::from_fields(fields)),
            other => Err(LookupFailure::MalformedBody(format!(
                "expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Look up one selected title. Failures become a failure record.
pub fn resolve<L>(lookup: &L, entry: &SelectionEntry, policy: &YearPolicy) -> MetadataRecord
where
    L: MetadataLookup + ?Sized,
{
    match lookup.lookup(&policy.query_for(entry)) {
        Ok(record) => {
            if record.is_failure() {
                warn!(
                    "no metadata for {:?}: {}",
                    entry.raw_title,
                    record.error_message().unwrap_or("service reported a miss")
                );
            }
            record
        }
        Err(failure) => {
            warn!("metadata lookup for {:?} failed: {}", entry.raw_title, failure);
            MetadataRecord::failure(failure.to_string())
        }
    }
}

/// Resolve every entry; results line up with `entries`.
///
/// With `workers > 1` the entries are split into contiguous chunks, each
/// resolved on a scoped thread, and the chunks are concatenated in order.
pub fn resolve_all<L>(
    lookup: &L,
    entries: &[SelectionEntry],
    policy: &YearPolicy,
    workers: usize,
) -> Vec<MetadataRecord>
where
    L: MetadataLookup + ?Sized,
{
    if workers <= 1 || entries.len() <= 1 {
        return entries.iter().map(|e| resolve(lookup, e, policy)).collect();
    }
    let chunk = entries.len().div_ceil(workers);
    std::thread::scope(|scope| {
        let handles: Vec<_> = entries
            .chunks(chunk)
            .map(|part| {
                let handle = scope.spawn(move || {
                    part.iter()
                        .map(|e| resolve(lookup, e, policy))
                        .collect::<Vec<_>>()
                });
                (part, handle)
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|(part, handle)| match handle.join() {
                Ok(records) => records,
                Err(_) => {
                    warn!("metadata worker panicked; {} titles left without metadata", part.len());
                    part.iter()
                        .map(|_| MetadataRecord::failure("metadata worker panicked"))
                        .collect()
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::title::{canonicalize, to_query};
    use serde_json::json;
    use std::sync::Mutex;

    fn entry(rank: u32, raw: &str) -> SelectionEntry {
        SelectionEntry {
            rank,
            raw_title: raw.to_string(),
            canonical_title: canonicalize(raw),
            query: to_query(raw),
        }
    }

    /// Answers from a fixed table and records every query it saw.
    struct FakeLookup {
        seen: Mutex<Vec<LookupQuery>>,
    }

    impl FakeLookup {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl MetadataLookup for FakeLookup {
        fn lookup(&self, query: &LookupQuery) -> Result<MetadataRecord, LookupFailure> {
            self.seen.lock().unwrap().push(query.clone());
            match query.title.as_str() {
                "Borderlands" => Err(LookupFailure::Status(503)),
                "Unknown+Film" => Ok(MetadataRecord::failure("Movie not found!")),
                title => {
                    let fields = json!({ "Title": title.replace('+', " "), "Response": "True" })
                        .as_object()
                        .cloned()
                        .unwrap();
                    Ok(MetadataRecord::from_fields(fields))
                }
            }
        }
    }

    #[test]
    fn current_releases_are_pinned_to_target_year() {
        let policy = YearPolicy::default();
        assert_eq!(policy.year_for(&entry(1, "Deadpool & Wolverine")), Some(2024));
    }

    #[test]
    fn anniversary_editions_search_any_year() {
        let policy = YearPolicy::default();
        let jaws = entry(7, "Jaws (50th Anniversary)");
        assert_eq!(
            policy.query_for(&jaws),
            LookupQuery {
                title: "Jaws".to_string(),
                year: None,
            }
        );
    }

    #[test]
    fn exempt_titles_search_any_year() {
        let policy = YearPolicy::default();
        assert_eq!(policy.year_for(&entry(12, "The Amazing Spider-Man")), None);
        assert_eq!(policy.year_for(&entry(12, "the amazing spider-man")), None);
        assert_eq!(policy.year_for(&entry(12, "The Amazing Spider-Man 2")), Some(2024));
    }

    #[test]
    fn failures_become_records() {
        let lookup = FakeLookup::new();
        let policy = YearPolicy::default();
        let failed = resolve(&lookup, &entry(5, "Borderlands"), &policy);
        assert!(failed.is_failure());
        assert_eq!(failed.error_message(), Some("metadata service answered HTTP 503"));

        let missing = resolve(&lookup, &entry(9, "Unknown Film"), &policy);
        assert_eq!(missing.error_message(), Some("Movie not found!"));
    }

    #[test]
    fn resolve_all_keeps_order_across_workers() {
        let lookup = FakeLookup::new();
        let entries: Vec<SelectionEntry> = [
            "Deadpool & Wolverine",
            "Alien: Romulus",
            "Borderlands",
            "It Ends With Us",
            "Twisters",
        ]
        .iter()
        .enumerate()
        .map(|(i, t)| entry(i as u32 + 1, t))
        .collect();

        let records = resolve_all(&lookup, &entries, &YearPolicy::default(), 3);
        assert_eq!(records.len(), entries.len());
        assert!(records[2].is_failure());
        assert_eq!(records[0].get("Title"), Some(&json!("Deadpool & Wolverine")));
        assert_eq!(records[4].get("Title"), Some(&json!("Twisters")));
        assert_eq!(lookup.seen.lock().unwrap().len(), 5);
    }

    #[test]
    fn request_url_encodes_words_and_year() {
        let client = OmdbClient::new(
            DEFAULT_BASE_URL,
            ApiKey::new("k3y").unwrap(),
            Duration::from_secs(10),
        );
        let url = client.request_url(&LookupQuery {
            title: "Deadpool+&+Wolverine".to_string(),
            year: Some(2024),
        });
        assert_eq!(
            url,
            "http://www.omdbapi.com/?apikey=k3y&t=Deadpool+%26+Wolverine&y=2024"
        );
        let url = client.request_url(&LookupQuery {
            title: "Jaws".to_string(),
            year: None,
        });
        assert!(url.ends_with("&t=Jaws"));
    }

    #[test]
    fn api_key_is_never_shown() {
        let key = ApiKey::new(" secret ").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(ApiKey::new("   ").is_none());
        let client = OmdbClient::new(DEFAULT_BASE_URL, key, Duration::from_secs(1));
        assert_eq!(
            client.redact("GET http://x/?apikey=secret failed".to_string()),
            "GET http://x/?apikey=*** failed"
        );
    }

    #[test]
    fn silent_server_is_a_timeout() {
        // Accepted by the kernel backlog, never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/", listener.local_addr().unwrap());
        let client = OmdbClient::new(
            &base_url,
            ApiKey::new("k3y").unwrap(),
            Duration::from_millis(300),
        );
        let failure = client
            .lookup(&LookupQuery {
                title: "Twisters".to_string(),
                year: Some(2024),
            })
            .unwrap_err();
        match failure {
            LookupFailure::Timeout(message) => assert!(!message.contains("k3y")),
            other => panic!("expected a timeout, got {other:?}"),
        }
        drop(listener);
    }

    #[test]
    fn refused_connection_is_a_transport_failure() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let client = OmdbClient::new(
            &format!("http://{addr}/"),
            ApiKey::new("k3y").unwrap(),
            Duration::from_secs(2),
        );
        let failure = client
            .lookup(&LookupQuery {
                title: "Twisters".to_string(),
                year: None,
            })
            .unwrap_err();
        assert!(matches!(failure, LookupFailure::Transport(_)), "{failure:?}");
    }

    #[test]
    fn missing_env_key_is_fatal() {
        let err = ApiKey::from_env("BOX_OFFICE_TEST_UNSET_KEY").unwrap_err();
        assert!(matches!(err, PipelineError::MissingCredential { .. }));
    }
}
