use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("media reference cannot be empty")]
    Empty,
}

/// Where a media reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaLocation {
    Local,
    Remote,
}

/// Reference to an image or audio asset attached to a question.
///
/// The bank only stores the reference; fetching and playback belong to the
/// front-end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaRef(String);

impl MediaRef {
    /// # Errors
    ///
    /// Returns `MediaError::Empty` for blank input.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, MediaError> {
        let s = raw.as_ref().trim();
        if s.is_empty() {
            return Err(MediaError::Empty);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn location(&self) -> MediaLocation {
        match self.remote_url() {
            Some(_) => MediaLocation::Remote,
            None => MediaLocation::Local,
        }
    }

    /// The parsed URL when the reference is an absolute http(s) address.
    #[must_use]
    pub fn remote_url(&self) -> Option<Url> {
        Url::parse(&self.0)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MediaRef {
    type Error = MediaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MediaRef::parse(value)
    }
}

impl From<MediaRef> for String {
    fn from(media: MediaRef) -> Self {
        media.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_reference_fails() {
        assert_eq!(MediaRef::parse("   ").unwrap_err(), MediaError::Empty);
    }

    #[test]
    fn classifies_location() {
        let local = MediaRef::parse(" /placeholder.svg ").unwrap();
        assert_eq!(local.as_str(), "/placeholder.svg");
        assert_eq!(local.location(), MediaLocation::Local);

        let remote = MediaRef::parse("https://cdn.example.com/p1q1.mp3").unwrap();
        assert_eq!(remote.location(), MediaLocation::Remote);
    }

    #[test]
    fn scheme_match_ignores_case() {
        let upper = MediaRef::parse("HTTPS://cdn.example.com/a.mp3").unwrap();
        assert_eq!(upper.location(), MediaLocation::Remote);
        assert_eq!(
            upper.remote_url().map(|u| u.host_str().map(str::to_owned)),
            Some(Some("cdn.example.com".to_owned()))
        );
        assert_eq!(upper.as_str(), "HTTPS://cdn.example.com/a.mp3");
    }

    #[test]
    fn non_http_schemes_and_relative_paths_are_local() {
        for raw in ["audio/p1.mp3", "file:///srv/media/a.mp3", "C:/media/a.png", "http//broken"] {
            let media = MediaRef::parse(raw).unwrap();
            assert_eq!(media.location(), MediaLocation::Local, "{raw}");
            assert!(media.remote_url().is_none());
        }
    }
}
