//! Caption text normalization.
//!
//! Turns a raw WebVTT or SRT track into deduplicated, reflowed paragraphs:
//!
//! 1. Detect the format (`WEBVTT` prefix, otherwise SRT)
//! 2. Strip headers, timestamp ranges, cue indices and inline markup
//! 3. Trim lines and drop empty ones
//! 4. Keep only the first occurrence of each distinct line
//! 5. Reflow lines into paragraphs, closing one after terminal punctuation
//!
//! Steps 3-5 are shared by both formats; only the terminator set differs.
//! Everything here is pure and performs no I/O.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{
    CaptionFormat, CaptionTrack, NormalizedText, BYTE_ORDER_MARK, WEBVTT_MARKER,
};

fn vtt_timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)\d{2}:\d{2}:\d{2}\.\d{3} --> \d{2}:\d{2}:\d{2}\.\d{3}.*$")
            .expect("valid WebVTT timestamp regex")
    })
}

fn inline_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid inline tag regex"))
}

fn srt_cue_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\d+\n\d{2}:\d{2}:\d{2},\d{3} --> \d{2}:\d{2}:\d{2},\d{3}\n")
            .expect("valid SRT cue header regex")
    })
}

/// Normalize raw caption content, detecting its format
pub fn normalize(raw: &str) -> NormalizedText {
    normalize_as(raw, CaptionFormat::detect(raw))
}

/// Normalize a track using its already-detected format
pub fn normalize_track(track: &CaptionTrack) -> NormalizedText {
    normalize_as(&track.content, track.format)
}

/// Normalize raw content as a specific format
pub fn normalize_as(raw: &str, format: CaptionFormat) -> NormalizedText {
    let content = unify_line_endings(raw);
    let stripped = match format {
        CaptionFormat::WebVtt => strip_webvtt(&content),
        CaptionFormat::Srt => strip_srt(&content),
    };
    reflow(&stripped, format.terminators())
}

fn unify_line_endings(raw: &str) -> String {
    raw.trim_start_matches(BYTE_ORDER_MARK)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Drop the header block, timestamp ranges and inline tags
fn strip_webvtt(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();

    // First real cue line: non-empty, not the marker, containing a colon.
    // A track without one has no cues at all.
    let body_start = lines
        .iter()
        .position(|line| {
            !line.trim().is_empty() && !line.starts_with(WEBVTT_MARKER) && line.contains(':')
        })
        .unwrap_or(lines.len());

    let body = lines[body_start..].join("\n");
    let body = vtt_timestamp_re().replace_all(&body, "");
    inline_tag_re().replace_all(&body, "").into_owned()
}

/// Drop `<index>\n<start> --> <end>\n` cue headers
fn strip_srt(content: &str) -> String {
    srt_cue_header_re().replace_all(content, "").into_owned()
}

/// Deduplicate lines and fold them into paragraphs
fn reflow(content: &str, terminators: &[char]) -> NormalizedText {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        if !seen.insert(line) {
            continue;
        }

        current.push(line);
        if line.ends_with(terminators) {
            paragraphs.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    NormalizedText::from_paragraphs(paragraphs)
}
