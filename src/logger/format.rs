//! Access log line rendering
//!
//! `combined` and `common` are fixed `$var` patterns, `json` is one object per
//! line, and anything else is treated as a custom pattern.

use std::borrow::Cow;

use chrono::Local;
use serde_json::json;

const COMMON: &str = r#"$remote_addr - - [$time_local] "$request" $status $body_bytes_sent"#;
const COMBINED: &str =
    r#"$remote_addr - - [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent""#;

/// One served request, as recorded by the router
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: chrono::DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    /// Declared `Content-Length`, 0 when the body length is unknown
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
    /// `X-Ipfs-Path` of a gateway response
    pub content_path: Option<String>,
}

impl AccessLogEntry {
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
            content_path: None,
        }
    }

    /// Render the entry as `combined`, `common`, `json` or a custom pattern
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.render(COMBINED),
            "common" => self.render(COMMON),
            "json" => self.to_json(),
            pattern => self.render(pattern),
        }
    }

    fn to_json(&self) -> String {
        json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
            "content_path": self.content_path,
        })
        .to_string()
    }

    /// Substitute every `$name` in `pattern` in a single pass.
    ///
    /// Names are the longest run of `[a-z0-9_]` after the `$`; unknown names are
    /// copied through untouched.
    fn render(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() + 64);
        let mut rest = pattern;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let name_len = after
                .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..name_len];

            match self.variable(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[name_len..];
        }
        out.push_str(rest);
        out
    }

    fn variable(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "remote_addr" => Cow::Borrowed(self.remote_addr.as_str()),
            "time_local" => Cow::Owned(self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string()),
            "request" => Cow::Owned(format!(
                "{} {} HTTP/{}",
                self.method,
                self.request_uri(),
                self.http_version
            )),
            "status" => Cow::Owned(self.status.to_string()),
            "body_bytes_sent" => Cow::Owned(self.body_bytes.to_string()),
            "http_referer" => Cow::Borrowed(self.referer.as_deref().unwrap_or("-")),
            "http_user_agent" => Cow::Borrowed(self.user_agent.as_deref().unwrap_or("-")),
            "request_time" => {
                #[allow(clippy::cast_precision_loss)]
                let seconds = self.request_time_us as f64 / 1_000_000.0;
                Cow::Owned(format!("{seconds:.3}"))
            }
            "content_path" => Cow::Borrowed(self.content_path.as_deref().unwrap_or("-")),
            _ => return None,
        };
        Some(value)
    }

    fn request_uri(&self) -> Cow<'_, str> {
        match &self.query {
            Some(q) => Cow::Owned(format!("{}?{q}", self.path)),
            None => Cow::Borrowed(self.path.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID_PATH: &str = "/ipfs/bafkreiabltrd5zm73pvi7plq25pef3hm7jxhbi3kv4hapegrkfpkqtkbme";

    fn entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new("192.168.1.1".to_string(), "GET".to_string(), CID_PATH.to_string());
        entry.query = Some("page=1".to_string());
        entry.status = 200;
        entry.body_bytes = 1234;
        entry.referer = Some("https://example.com".to_string());
        entry.user_agent = Some("curl/8.5".to_string());
        entry.request_time_us = 1_250_000;
        entry.content_path = Some(CID_PATH.to_string());
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = entry().format("combined");
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains(&format!("\"GET {CID_PATH}?page=1 HTTP/1.1\" 200 1234")));
        assert!(log.ends_with("\"https://example.com\" \"curl/8.5\""));
    }

    #[test]
    fn test_format_common_omits_headers() {
        let log = entry().format("common");
        assert!(log.ends_with(" 200 1234"), "{log}");
        assert!(!log.contains("example.com"));
    }

    #[test]
    fn test_format_json() {
        let value: serde_json::Value = serde_json::from_str(&entry().format("json")).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 1234);
        assert_eq!(value["query"], "page=1");
        assert_eq!(value["content_path"], CID_PATH);
    }

    #[test]
    fn test_format_json_escapes_and_nulls() {
        let mut entry = AccessLogEntry::new("10.0.0.1".to_string(), "GET".to_string(), "/ipfs/\"quoted\"".to_string());
        entry.status = 404;
        let value: serde_json::Value = serde_json::from_str(&entry.format("json")).unwrap();
        assert_eq!(value["path"], "/ipfs/\"quoted\"");
        assert!(value["referer"].is_null());
        assert!(value["content_path"].is_null());
    }

    #[test]
    fn test_custom_pattern() {
        let log = entry().format("$status $request_time $content_path");
        assert_eq!(log, format!("200 1.250 {CID_PATH}"));
    }

    #[test]
    fn test_custom_pattern_prefix_names_and_unknowns() {
        // `$request` must not eat the start of `$request_time`
        let log = entry().format("[$request] $request_time $upstream $");
        assert_eq!(log, format!("[GET {CID_PATH}?page=1 HTTP/1.1] 1.250 $upstream $"));

        let mut plain = entry();
        plain.content_path = None;
        assert_eq!(plain.format("$content_path"), "-");
    }
}
