//! Wire types and header helpers for the HTTP API.
//!
//! Every JSON body the server produces or consumes is defined here, along
//! with the header plumbing that is easy to get subtly wrong: the
//! RFC 5987 dual-form `Content-Disposition` value and the URL-encoded
//! `X-Airlift-Filename` upload header.

use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Response envelope for mutations: the URL of the resource acted on, or
/// an error message. Exactly one side is ever set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resp {
    #[serde(rename = "URL", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "Err", skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl Resp {
    pub fn url(url: impl Into<String>) -> Self {
        Resp {
            url: Some(url.into()),
            err: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Resp {
            url: None,
            err: Some(msg.into()),
        }
    }
}

/// One upload in a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEntry {
    pub id: String,
    /// Original filename as supplied by the uploader.
    pub name: String,
    pub uploaded: DateTime<Utc>,
    pub size: u64,
    /// Whether the file's format can be thumbnailed.
    pub has_thumb: bool,
}

/// One page of upload history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub list: Vec<UploadEntry>,
    pub current_page: usize,
    pub total_pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<usize>,
    pub append_ext: bool,
}

/// Cache totals for the overview endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overview {
    pub num_uploads: usize,
    pub uploads_size: u64,
    pub thumbs_size: u64,
}

/// Body of the eviction-preview endpoints: a megabyte or day count in,
/// an affected-upload count out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PruneN {
    pub n: u64,
}

/// Characters that survive unescaped in an RFC 5987 `filename*` value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// `Content-Disposition` value naming an alternate download filename, in
/// both the RFC 2616 quoted form and the RFC 5987 extended form so
/// non-ASCII names survive every browser.
pub fn content_disposition(filename: &str) -> String {
    let escaped = filename.replace('\\', r"\\").replace('"', "\\\"");
    let encoded = percent_encode(filename.as_bytes(), ATTR_CHAR);
    format!("filename=\"{escaped}\"; filename*=UTF-8''{encoded}")
}

/// Decode the URL-encoded `X-Airlift-Filename` header value.
pub fn decode_filename(raw: &str) -> Result<String, std::str::Utf8Error> {
    percent_decode_str(raw).decode_utf8().map(|s| s.into_owned())
}

/// Format a timestamp the way HTTP date headers want it.
pub fn http_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resp_serializes_one_side() {
        let ok = serde_json::to_string(&Resp::url("example.com/ab12")).unwrap();
        assert_eq!(ok, r#"{"URL":"example.com/ab12"}"#);

        let err = serde_json::to_string(&Resp::err("password required")).unwrap();
        assert_eq!(err, r#"{"Err":"password required"}"#);
    }

    #[test]
    fn test_resp_roundtrip() {
        let parsed: Resp = serde_json::from_str(r#"{"URL":"h/x9"}"#).unwrap();
        assert_eq!(parsed, Resp::url("h/x9"));
    }

    #[test]
    fn test_content_disposition_plain() {
        assert_eq!(
            content_disposition("hi.txt"),
            "filename=\"hi.txt\"; filename*=UTF-8''hi.txt"
        );
    }

    #[test]
    fn test_content_disposition_quotes_and_spaces() {
        let value = content_disposition("my \"file\" 1.png");
        assert!(value.starts_with("filename=\"my \\\"file\\\" 1.png\";"));
        assert!(value.ends_with("filename*=UTF-8''my%20%22file%22%201.png"));
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition("résumé.pdf");
        // quoted form keeps the raw bytes, extended form escapes them
        assert!(value.contains("filename=\"résumé.pdf\""));
        assert!(value.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
    }

    #[test]
    fn test_decode_filename() {
        assert_eq!(decode_filename("hi.txt").unwrap(), "hi.txt");
        assert_eq!(
            decode_filename("my%20photo%20%281%29.jpg").unwrap(),
            "my photo (1).jpg"
        );
        assert_eq!(
            decode_filename("r%C3%A9sum%C3%A9.pdf").unwrap(),
            "résumé.pdf"
        );
        assert!(decode_filename("bad%ff%fe").is_err());
    }

    #[test]
    fn test_http_date_format() {
        let t = DateTime::parse_from_rfc3339("2016-03-01T12:30:45Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(http_date(t), "Tue, 01 Mar 2016 12:30:45 GMT");
    }

    #[test]
    fn test_history_page_serializes() {
        let page = HistoryPage {
            list: vec![],
            current_page: 1,
            total_pages: 1,
            next_page: None,
            prev_page: None,
            append_ext: false,
        };
        let json = serde_json::to_string(&page).unwrap();
        assert!(json.contains("\"current_page\":1"));
        assert!(!json.contains("next_page"));
    }
}
