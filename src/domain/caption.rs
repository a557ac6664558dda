//! Caption tracks and the normalized text produced from them.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Marker token opening every WebVTT file
pub const WEBVTT_MARKER: &str = "WEBVTT";

/// UTF-8 byte-order mark some tools put in front of caption files
pub const BYTE_ORDER_MARK: char = '\u{feff}';

/// Subtitle formats the normalizer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionFormat {
    WebVtt,
    Srt,
}

impl CaptionFormat {
    /// Detect the format from raw content; anything that is not WebVTT is SRT
    pub fn detect(content: &str) -> Self {
        if content
            .trim_start_matches(BYTE_ORDER_MARK)
            .trim()
            .starts_with(WEBVTT_MARKER)
        {
            Self::WebVtt
        } else {
            Self::Srt
        }
    }

    /// Characters that close a paragraph when they end a line
    pub fn terminators(&self) -> &'static [char] {
        match self {
            Self::WebVtt => &['.', '!', '?', ':'],
            Self::Srt => &['.', '!', '?', ':', ']'],
        }
    }
}

impl fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebVtt => f.write_str("webvtt"),
            Self::Srt => f.write_str("srt"),
        }
    }
}

/// Raw subtitle content read from a downloaded file
#[derive(Debug, Clone)]
pub struct CaptionTrack {
    /// File the track was read from
    pub path: PathBuf,

    pub format: CaptionFormat,

    pub content: String,
}

impl CaptionTrack {
    /// Create a track, detecting its format from the content
    pub fn new(path: PathBuf, content: String) -> Self {
        let format = CaptionFormat::detect(&content);
        Self {
            path,
            format,
            content,
        }
    }
}

/// Ordered, non-empty paragraphs of reflowed caption text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    paragraphs: Vec<String>,
}

impl NormalizedText {
    /// Build from paragraphs, dropping blank ones
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paragraphs: paragraphs
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.trim().is_empty())
                .collect(),
        }
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Canonical plain-text form: paragraphs separated by a blank line
    pub fn to_plain_text(&self) -> String {
        self.paragraphs.join("\n\n")
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_text())
    }
}
