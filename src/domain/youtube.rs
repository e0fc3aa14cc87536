//! YouTube video references attached to tracks

use std::sync::LazyLock;

use regex::Regex;

const VIDEO_ID_LEN: usize = 11;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("youtube url pattern is valid")
});

/// true for an 11 character id made of `[A-Za-z0-9_-]`
pub fn is_video_id(s: &str) -> bool {
    s.len() == VIDEO_ID_LEN
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Pulls the video id out of a watch, short, embed or legacy `v/` url.
pub fn extract_video_id(url: &str) -> Option<String> {
    URL_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .filter(|id| is_video_id(id))
        .map(str::to_string)
}

/// accepts either a bare video id or any url `extract_video_id` understands
pub fn parse_video_ref(s: &str) -> Option<String> {
    let s = s.trim();
    if is_video_id(s) {
        Some(s.to_string())
    } else {
        extract_video_id(s)
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://youtu.be/{video_id}")
}
