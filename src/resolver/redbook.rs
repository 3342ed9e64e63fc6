//! RedBook (Xiaohongshu) share-link resolver.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::{header, Client};
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::media::{Author, ImageRef, MediaManifest};
use crate::resolver::ManifestResolver;
use crate::transfer::{ResourceProber, DEFAULT_USER_AGENT};

/// Client state embedded in the share page.
const INITIAL_STATE_PATTERN: &str = r"(?s)window\.__INITIAL_STATE__\s*=\s*(.*?)</script>";

/// String literals, or a bare `undefined` value in the embedded object
/// literal. Strings are matched first so their contents stay untouched.
const UNDEFINED_VALUE_PATTERN: &str = r#""(?:[^"\\]|\\.)*"|([:\[,]\s*)undefined\b"#;

/// Note id the site hands out once a share link has expired.
const EXPIRED_NOTE_ID: &str = "undefined";

/// Desktop browsers a page request may pretend to be.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36 Edg/123.0.2420.81",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 OPR/108.0.0.0",
];

#[derive(Debug, Deserialize)]
struct InitialState {
    note: NoteState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteState {
    current_note_id: Option<String>,
    #[serde(default)]
    note_detail_map: HashMap<String, NoteDetail>,
}

#[derive(Debug, Deserialize)]
struct NoteDetail {
    note: Note,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Note {
    title: Option<String>,
    desc: Option<String>,
    video: Option<Video>,
    #[serde(default)]
    image_list: Vec<ImageItem>,
    user: User,
}

#[derive(Debug, Deserialize)]
struct Video {
    media: Option<VideoMedia>,
}

#[derive(Debug, Deserialize)]
struct VideoMedia {
    stream: Option<Stream>,
}

#[derive(Debug, Default, Deserialize)]
struct Stream {
    #[serde(default)]
    h264: Vec<StreamVariant>,
}

impl Stream {
    fn master_url(&self) -> Option<&str> {
        self.h264
            .first()
            .and_then(|v| v.master_url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamVariant {
    master_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageItem {
    #[serde(default)]
    url_default: String,
    live_photo: Option<bool>,
    stream: Option<Stream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    user_id: Option<String>,
    nickname: Option<String>,
    avatar: Option<String>,
}

/// Resolves RedBook share links, probing rewritten image URLs to pick a
/// PNG or JPG rendition.
pub struct RedBookResolver {
    client: Client,
    prober: ResourceProber,
    user_agent: Option<String>,
    timeout: Duration,
    image_host: String,
}

impl RedBookResolver {
    pub fn new(client: Client, config: &Config) -> Self {
        let prober = ResourceProber::new(client.clone(), &config.transfer);
        Self {
            client,
            prober,
            user_agent: config.resolver.user_agent.clone(),
            timeout: Duration::from_secs(config.resolver.timeout_secs),
            image_host: config.resolver.image_host.trim_end_matches('/').to_string(),
        }
    }

    /// Replace the prober built from the transfer settings.
    pub fn with_prober(mut self, prober: ResourceProber) -> Self {
        self.prober = prober;
        self
    }

    async fn fetch_page(&self, share_url: &str) -> Result<String> {
        let user_agent = self.user_agent.clone().unwrap_or_else(random_user_agent);

        let response = self
            .client
            .get(share_url)
            .header(header::USER_AGENT, user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Resolution(format!("Failed to fetch share page: {}", e)))?;

        let status = response.status();
        tracing::debug!("Share page {} -> {}", share_url, status);
        if !status.is_success() {
            return Err(Error::Resolution(format!(
                "Share page returned HTTP {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Resolution(format!("Failed to read share page: {}", e)))
    }

    async fn build_manifest(&self, note: Note) -> MediaManifest {
        let video_url = note
            .video
            .as_ref()
            .and_then(|v| v.media.as_ref())
            .and_then(|m| m.stream.as_ref())
            .and_then(Stream::master_url)
            .map(str::to_string);

        // Galleries only; a video note carries its frames as cover images
        let images = if video_url.is_none() {
            join_all(note.image_list.iter().map(|item| self.image_ref(item)))
                .await
                .into_iter()
                .flatten()
                .collect()
        } else {
            Vec::new()
        };

        let cover_url = note
            .image_list
            .first()
            .map(|item| item.url_default.clone())
            .unwrap_or_default();

        MediaManifest {
            author: Author {
                uid: note.user.user_id.unwrap_or_default(),
                name: note.user.nickname.unwrap_or_default(),
                avatar: note.user.avatar.unwrap_or_default(),
            },
            video_url,
            images,
            title: note.title.unwrap_or_default(),
            desc: note.desc.unwrap_or_default(),
            cover_url,
        }
    }

    async fn image_ref(&self, item: &ImageItem) -> Option<ImageRef> {
        let Some(mut url) = rewrite_image_url(&self.image_host, &item.url_default) else {
            tracing::warn!("Skipping image without an id: {}", item.url_default);
            return None;
        };

        if !self.prober.probe(&url).await {
            url = url.replace("format/png", "format/jpg");
            tracing::debug!("PNG unavailable, using {}", url);
        }

        let mut image = ImageRef::new(url);
        if item.live_photo.unwrap_or(false) {
            if let Some(live) = item.stream.as_ref().and_then(Stream::master_url) {
                image = image.with_live_photo(live);
            }
        }

        Some(image)
    }
}

#[async_trait]
impl ManifestResolver for RedBookResolver {
    async fn resolve(&self, share_url: &str) -> Result<MediaManifest> {
        if !share_url.starts_with("http://") && !share_url.starts_with("https://") {
            return Err(Error::Resolution(format!(
                "Expected a share URL, got '{}' (bare note ids are not supported)",
                share_url
            )));
        }

        let html = self.fetch_page(share_url).await?;
        let state = extract_initial_state(&html)?;
        let note = parse_note(&state)?;

        let manifest = self.build_manifest(note).await;
        manifest.validate()?;

        tracing::info!(
            "Resolved note by {}: {} images, video: {}",
            manifest.author.name,
            manifest.images.len(),
            manifest.video_url.is_some()
        );

        Ok(manifest)
    }
}

/// Pull the client-state object literal out of the page.
fn extract_initial_state(html: &str) -> Result<String> {
    let pattern = Regex::new(INITIAL_STATE_PATTERN)
        .map_err(|e| Error::Resolution(format!("Invalid state pattern: {}", e)))?;

    let raw = pattern
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().trim_end_matches(';').trim())
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| Error::Resolution("parse video json info from html fail".to_string()))?;

    normalize_js_literal(raw)
}

/// Turn the object literal into JSON by replacing bare `undefined` values.
fn normalize_js_literal(raw: &str) -> Result<String> {
    let pattern = Regex::new(UNDEFINED_VALUE_PATTERN)
        .map_err(|e| Error::Resolution(format!("Invalid literal pattern: {}", e)))?;
    let normalized = pattern.replace_all(raw, |captures: &regex::Captures<'_>| {
        match captures.get(1) {
            Some(prefix) => format!("{}null", prefix.as_str()),
            None => captures[0].to_string(),
        }
    });
    Ok(normalized.into_owned())
}

/// Decode the state and select the current note.
fn parse_note(state_json: &str) -> Result<Note> {
    let state: InitialState = serde_json::from_str(state_json)
        .map_err(|e| Error::Resolution(format!("Failed to parse page state: {}", e)))?;

    let note_id = match state.note.current_note_id {
        Some(id) if id != EXPIRED_NOTE_ID && !id.is_empty() => id,
        _ => {
            return Err(Error::ExpiredLink(
                "note id in response is undefined".to_string(),
            ))
        }
    };

    let mut details = state.note.note_detail_map;
    details
        .remove(&note_id)
        .map(|detail| detail.note)
        .ok_or_else(|| Error::Resolution(format!("Note {} missing from page state", note_id)))
}

/// Rewrite a CDN image URL to the watermark-free image host, PNG rendition.
fn rewrite_image_url(host: &str, url_default: &str) -> Option<String> {
    let image_id = url_default
        .rsplit('/')
        .next()
        .and_then(|segment| segment.split('!').next())
        .filter(|id| !id.is_empty())?;

    let url = if url_default.contains("notes_pre_post") {
        let spectrum = if url_default.contains("spectrum") {
            "spectrum/"
        } else {
            ""
        };
        format!(
            "{}/notes_pre_post/{}{}?imageView2/format/png",
            host, spectrum, image_id
        )
    } else {
        format!("{}/{}?imageView2/format/png", host, image_id)
    };

    Some(url)
}

fn random_user_agent() -> String {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEFAULT_USER_AGENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gallery_page(current_note_id: &str) -> String {
        format!(
            r#"<html><head></head><body><script>window.__INITIAL_STATE__={{"global":{{"appSettings":undefined}},"note":{{"currentNoteId":{},"noteDetailMap":{{"n1":{{"note":{{"title":"标题","desc":"描述","user":{{"userId":"u1","nickname":"测试用户","avatar":"https://a/av.jpg"}},"imageList":[{{"urlDefault":"http://sns-webpic.xhscdn.com/202401/abc/notes_pre_post/spectrum/img1!nd_dft_wlteh_webp_3","livePhoto":true,"stream":{{"h264":[{{"masterUrl":"https://v.example.com/live1.mp4"}}]}}}},{{"urlDefault":"http://sns-webpic.xhscdn.com/202401/abc/img2!nd_dft_wlteh_webp_3","livePhoto":false,"stream":{{"h264":[]}}}}]}}}}}}}}}}</script></body></html>"#,
            current_note_id
        )
    }

    fn video_page() -> String {
        r#"<script>window.__INITIAL_STATE__ = {"note":{"currentNoteId":"v1","noteDetailMap":{"v1":{"note":{"title":"clip","desc":"","video":{"media":{"stream":{"h264":[{"masterUrl":"https://v.example.com/main.mp4"}],"h265":[]}}},"user":{"userId":"u2","nickname":"bob","avatar":""},"imageList":[{"urlDefault":"http://sns-webpic.xhscdn.com/cover!frame"}]}}}}};</script>"#.to_string()
    }

    fn resolver_for(server: &MockServer) -> RedBookResolver {
        let mut config = Config::default();
        config.resolver.image_host = server.uri();

        let fast = TransferConfig {
            probe_retry_delay_ms: 5,
            ..TransferConfig::default()
        };
        let prober = ResourceProber::new(Client::new(), &fast);

        RedBookResolver::new(Client::new(), &config).with_prober(prober)
    }

    async fn serve_page(server: &MockServer, body: String) {
        Mock::given(method("GET"))
            .and(path("/explore/n1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolve_gallery() {
        let server = MockServer::start().await;
        serve_page(&server, gallery_page(r#""n1""#)).await;
        Mock::given(method("GET"))
            .and(path("/notes_pre_post/spectrum/img1"))
            .respond_with(ResponseTemplate::new(206))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let share_url = format!("{}/explore/n1", server.uri());
        let manifest = resolver_for(&server).resolve(&share_url).await.unwrap();

        assert_eq!(manifest.author.name, "测试用户");
        assert_eq!(manifest.author.uid, "u1");
        assert_eq!(manifest.title, "标题");
        assert_eq!(manifest.video_url, None);
        assert_eq!(manifest.images.len(), 2);
        assert_eq!(
            manifest.images[0].url,
            format!(
                "{}/notes_pre_post/spectrum/img1?imageView2/format/png",
                server.uri()
            )
        );
        assert_eq!(
            manifest.images[0].live_photo_url.as_deref(),
            Some("https://v.example.com/live1.mp4")
        );
        assert_eq!(
            manifest.images[1].url,
            format!("{}/img2?imageView2/format/jpg", server.uri())
        );
        assert_eq!(manifest.images[1].live_photo_url, None);
        assert!(manifest.cover_url.ends_with("img1!nd_dft_wlteh_webp_3"));
    }

    #[tokio::test]
    async fn test_resolve_video_note_skips_images() {
        let server = MockServer::start().await;
        serve_page(&server, video_page()).await;

        let share_url = format!("{}/explore/n1", server.uri());
        let manifest = resolver_for(&server).resolve(&share_url).await.unwrap();

        assert_eq!(
            manifest.video_url.as_deref(),
            Some("https://v.example.com/main.mp4")
        );
        assert!(manifest.images.is_empty());
        assert_eq!(manifest.cover_url, "http://sns-webpic.xhscdn.com/cover!frame");
    }

    #[tokio::test]
    async fn test_expired_link_bare_undefined() {
        let server = MockServer::start().await;
        serve_page(&server, gallery_page("undefined")).await;

        let share_url = format!("{}/explore/n1", server.uri());
        let err = resolver_for(&server).resolve(&share_url).await.unwrap_err();
        assert!(matches!(err, Error::ExpiredLink(_)));
    }

    #[tokio::test]
    async fn test_expired_link_quoted_undefined() {
        let server = MockServer::start().await;
        serve_page(&server, gallery_page(r#""undefined""#)).await;

        let share_url = format!("{}/explore/n1", server.uri());
        let err = resolver_for(&server).resolve(&share_url).await.unwrap_err();
        assert!(matches!(err, Error::ExpiredLink(_)));
    }

    #[tokio::test]
    async fn test_page_without_state_is_resolution_error() {
        let server = MockServer::start().await;
        serve_page(&server, "<html><body>captcha</body></html>".to_string()).await;

        let share_url = format!("{}/explore/n1", server.uri());
        let err = resolver_for(&server).resolve(&share_url).await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[tokio::test]
    async fn test_page_http_error_is_resolution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let share_url = format!("{}/explore/n1", server.uri());
        let err = resolver_for(&server).resolve(&share_url).await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[tokio::test]
    async fn test_bare_note_id_is_rejected() {
        let server = MockServer::start().await;
        let err = resolver_for(&server).resolve("64f0c1e2000000001f03a0b1").await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[test]
    fn test_normalize_js_literal() {
        let raw = r#"{"a":undefined,"b":[undefined, undefined],"c":"undefined","d":1}"#;
        assert_eq!(
            normalize_js_literal(raw).unwrap(),
            r#"{"a":null,"b":[null, null],"c":"undefined","d":1}"#
        );
    }

    #[test]
    fn test_normalize_keeps_string_contents() {
        let raw = r#"{"desc":"price: undefined, see [undefined]","title":"a,undefined","q":"say \"x\", undefined","v":undefined}"#;
        assert_eq!(
            normalize_js_literal(raw).unwrap(),
            r#"{"desc":"price: undefined, see [undefined]","title":"a,undefined","q":"say \"x\", undefined","v":null}"#
        );
    }

    #[test]
    fn test_rewrite_image_url() {
        let host = "https://ci.xiaohongshu.com";
        assert_eq!(
            rewrite_image_url(host, "http://sns-webpic.xhscdn.com/202401/abc/id1!nd_dft"),
            Some("https://ci.xiaohongshu.com/id1?imageView2/format/png".to_string())
        );
        assert_eq!(
            rewrite_image_url(host, "http://sns-webpic.xhscdn.com/x/notes_pre_post/id2!nd"),
            Some("https://ci.xiaohongshu.com/notes_pre_post/id2?imageView2/format/png".to_string())
        );
        assert_eq!(
            rewrite_image_url(
                host,
                "http://sns-webpic.xhscdn.com/x/notes_pre_post/spectrum/id3!nd"
            ),
            Some(
                "https://ci.xiaohongshu.com/notes_pre_post/spectrum/id3?imageView2/format/png"
                    .to_string()
            )
        );
        assert_eq!(rewrite_image_url(host, "http://x/"), None);
    }

    #[test]
    fn test_random_user_agent_is_desktop_windows() {
        assert!(random_user_agent().contains("Windows NT"));
    }
}
