//! Media manifest produced by a resolver and consumed by the transfer pipeline.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::media::item::{MediaKind, TransferUnit};
use crate::media::naming::sanitize_folder_segment;

/// Author of a shared note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

impl Author {
    /// Path-safe form of the author name, used as a storage folder segment.
    pub fn folder_name(&self) -> String {
        sanitize_folder_segment(&self.name)
    }
}

/// A still image, optionally paired with a live-photo clip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub url: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub live_photo_url: Option<String>,
}

impl ImageRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            live_photo_url: None,
        }
    }

    pub fn with_live_photo(mut self, url: impl Into<String>) -> Self {
        self.live_photo_url = Some(url.into());
        self
    }
}

/// Resolved description of one share link's media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaManifest {
    pub author: Author,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_url: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub cover_url: String,
}

impl MediaManifest {
    /// Decode a manifest from a parser-service JSON payload.
    ///
    /// Accepts a bare manifest, a `{code, msg, data}` wrapper, or an error
    /// envelope. Error envelopes become [`Error::ParserService`].
    pub fn from_json(text: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| Error::InvalidManifest(format!("undecodable payload: {}", e)))?;
        let manifest = envelope.into_manifest()?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reject manifests that carry nothing to transfer.
    pub fn validate(&self) -> Result<()> {
        if self.image_units().is_empty() && self.video_units().is_empty() {
            return Err(Error::InvalidManifest(
                "manifest has neither images nor a video URL".to_string(),
            ));
        }
        Ok(())
    }

    /// Still-image units, in display order.
    pub fn image_units(&self) -> Vec<TransferUnit> {
        self.images
            .iter()
            .filter(|image| !image.url.is_empty())
            .enumerate()
            .map(|(index, image)| TransferUnit::new(index, image.url.clone(), MediaKind::Image))
            .collect()
    }

    /// Live-photo clips followed by the main video, if any.
    pub fn video_units(&self) -> Vec<TransferUnit> {
        self.images
            .iter()
            .filter_map(|image| image.live_photo_url.clone())
            .chain(self.video_url.clone())
            .enumerate()
            .map(|(index, url)| TransferUnit::new(index, url, MediaKind::Video))
            .collect()
    }

    /// Storage folder for a batch of the given kind.
    pub fn destination_folder(&self, kind: MediaKind) -> String {
        format!("{}/{}", kind.folder_prefix(), self.author.folder_name())
    }
}

/// Payload returned by a manifest-producing parser service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawEnvelope")]
pub enum Envelope {
    Manifest(MediaManifest),
    ErrorResponse { code: i64, msg: String },
}

impl Envelope {
    pub fn into_manifest(self) -> Result<MediaManifest> {
        match self {
            Envelope::Manifest(manifest) => Ok(manifest),
            Envelope::ErrorResponse { code, msg } => Err(Error::ParserService { code, msg }),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEnvelope {
    Wrapped {
        code: i64,
        #[serde(default)]
        msg: String,
        #[serde(default)]
        data: Option<MediaManifest>,
    },
    Bare(MediaManifest),
}

impl From<RawEnvelope> for Envelope {
    fn from(raw: RawEnvelope) -> Self {
        match raw {
            RawEnvelope::Wrapped {
                data: Some(manifest),
                ..
            } => Envelope::Manifest(manifest),
            RawEnvelope::Wrapped { code, msg, .. } => Envelope::ErrorResponse { code, msg },
            RawEnvelope::Bare(manifest) => Envelope::Manifest(manifest),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest() -> MediaManifest {
        MediaManifest {
            author: Author {
                name: "测试用户".to_string(),
                ..Default::default()
            },
            video_url: None,
            images: vec![
                ImageRef::new("https://x/a.jpg"),
                ImageRef::new("https://x/b.jpg").with_live_photo("https://x/b.mp4"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_partition_units() {
        let manifest = sample_manifest();
        let images = manifest.image_units();
        let videos = manifest.video_units();

        assert_eq!(images.len(), 2);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].url, "https://x/b.mp4");
        assert!(images.iter().all(|u| u.kind == MediaKind::Image));
    }

    #[test]
    fn test_video_url_is_last_video_unit() {
        let mut manifest = sample_manifest();
        manifest.video_url = Some("https://x/main.mp4".to_string());

        let videos = manifest.video_units();
        assert_eq!(videos.len(), 2);
        assert!(videos.len() <= 1 + manifest.images.len());
        assert_eq!(videos[1].url, "https://x/main.mp4");
        assert_eq!(videos[1].index, 1);
    }

    #[test]
    fn test_destination_folders() {
        let manifest = sample_manifest();
        assert_eq!(manifest.destination_folder(MediaKind::Image), "img/测试用户");
        assert_eq!(
            manifest.destination_folder(MediaKind::Video),
            "video/测试用户"
        );
    }

    #[test]
    fn test_empty_manifest_is_invalid() {
        let manifest = MediaManifest::default();
        assert!(matches!(
            manifest.validate(),
            Err(Error::InvalidManifest(_))
        ));
        assert!(sample_manifest().validate().is_ok());
    }

    #[test]
    fn test_live_photo_only_manifest_is_valid() {
        let manifest = MediaManifest {
            images: vec![ImageRef {
                url: String::new(),
                live_photo_url: Some("https://x/b.mp4".to_string()),
            }],
            ..Default::default()
        };

        assert!(manifest.validate().is_ok());
        assert!(manifest.image_units().is_empty());
        assert_eq!(manifest.video_units().len(), 1);
    }

    #[test]
    fn test_from_json_bare() {
        let json = r#"{
            "author": {"uid": "1", "name": "alice", "avatar": ""},
            "video_url": "",
            "images": [{"url": "https://x/a.jpg", "live_photo_url": ""}],
            "title": "t", "desc": "d", "cover_url": "c"
        }"#;
        let manifest = MediaManifest::from_json(json).unwrap();
        assert_eq!(manifest.video_url, None);
        assert_eq!(manifest.images[0].live_photo_url, None);
        assert_eq!(manifest.author.name, "alice");
    }

    #[test]
    fn test_from_json_wrapped() {
        let json = r#"{
            "code": 200,
            "msg": "ok",
            "data": {
                "author": {"name": "bob"},
                "video_url": "https://x/v.mp4",
                "images": []
            }
        }"#;
        let manifest = MediaManifest::from_json(json).unwrap();
        assert_eq!(manifest.video_url.as_deref(), Some("https://x/v.mp4"));
    }

    #[test]
    fn test_from_json_error_envelope() {
        let json = r#"{"code": 201, "msg": "parse fail"}"#;
        match MediaManifest::from_json(json) {
            Err(Error::ParserService { code, msg }) => {
                assert_eq!(code, 201);
                assert_eq!(msg, "parse fail");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_json_without_media() {
        let json = r#"{"author": {"name": "bob"}, "video_url": "", "images": []}"#;
        assert!(matches!(
            MediaManifest::from_json(json),
            Err(Error::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_from_json_malformed_data() {
        let json = r#"{"code": 200, "msg": "ok", "data": {"images": "oops"}}"#;
        assert!(matches!(
            MediaManifest::from_json(json),
            Err(Error::InvalidManifest(_))
        ));

        assert!(matches!(
            MediaManifest::from_json("not json"),
            Err(Error::InvalidManifest(_))
        ));
    }
}
