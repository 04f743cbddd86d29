// Page-markup extractor - scrapes the public share page
//
// Pattern order on the fetched markup:
// 1. og:title meta tag
// 2. <title> tag
// 3. JSON-LD structured data `name`
// 4. loose `"name": "..."` anywhere in script content

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

use super::traits::MetadataExtractor;
use crate::transfer::errors::MetadataError;
use crate::transfer::models::{Metadata, VideoReference};
use crate::transfer::utils::{strip_brand_suffix, BROWSER_USER_AGENT};

lazy_static! {
    static ref OG_TITLE_RE: Regex =
        Regex::new(r#"(?i)<meta property="og:title" content="([^"]*)"[^>]*>"#).unwrap();
    static ref TITLE_TAG_RE: Regex = Regex::new(r"(?i)<title>([^<]*)</title>").unwrap();
    static ref JSON_LD_RE: Regex =
        Regex::new(r#"(?is)<script type="application/ld\+json"[^>]*>(.*?)</script>"#).unwrap();
    static ref SCRIPT_NAME_RE: Regex = Regex::new(r#""name":\s*"([^"]+)""#).unwrap();
}

type TitlePattern = (&'static str, fn(&str) -> Option<String>);

const TITLE_PATTERNS: [TitlePattern; 4] = [
    ("og:title", og_title),
    ("title tag", title_tag),
    ("json-ld", json_ld_name),
    ("script data", script_name),
];

fn og_title(html: &str) -> Option<String> {
    OG_TITLE_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
}

fn title_tag(html: &str) -> Option<String> {
    TITLE_TAG_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
}

fn json_ld_name(html: &str) -> Option<String> {
    let block = JSON_LD_RE.captures(html)?.get(1)?.as_str();
    match serde_json::from_str::<serde_json::Value>(block) {
        Ok(json) => json["name"].as_str().map(|s| s.to_string()),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse JSON-LD data");
            None
        }
    }
}

fn script_name(html: &str) -> Option<String> {
    SCRIPT_NAME_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// First pattern yielding a non-empty title, with the pattern's label
pub fn title_from_markup(html: &str) -> Option<(&'static str, String)> {
    TITLE_PATTERNS.iter().find_map(|(label, pattern)| {
        pattern(html)
            .map(|raw| strip_brand_suffix(&raw))
            .filter(|title| !title.is_empty())
            .map(|title| (*label, title))
    })
}

pub struct PageMarkupExtractor {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl PageMarkupExtractor {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MetadataExtractor for PageMarkupExtractor {
    fn name(&self) -> &'static str {
        "page-markup"
    }

    async fn extract(&self, reference: &VideoReference) -> Result<Metadata, MetadataError> {
        let url = format!("{}/share/{}", self.base_url.trim_end_matches('/'), reference.id);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Unavailable(format!("share page returned HTTP {}", status.as_u16())));
        }

        let html = response.text().await?;
        let (pattern, title) = title_from_markup(&html).ok_or_else(|| {
            MetadataError::Unavailable("Could not extract video title from any source".to_string())
        })?;

        tracing::debug!(video_id = %reference.id, pattern, "Found title in share page");

        Ok(Metadata {
            title,
            ..Metadata::default()
        })
    }
}
