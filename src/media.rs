//! File naming for downloaded media.

use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-.() ]+").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strips characters unsafe in file names and joins words with underscores.
pub fn clean_name(raw: &str) -> String {
    let kept = DISALLOWED.replace_all(raw.trim(), "");
    WHITESPACE.replace_all(&kept, "_").into_owned()
}

/// `{species}_ML{ml_id}` cleaned, plus `ext` (which includes its dot).
pub fn build_filename(species: &str, ml_id: &str, ext: &str) -> String {
    let base = format!("{}_ML{}", species, ml_id.trim());
    format!("{}{}", clean_name(&base), ext)
}

/// Maps a `Content-Type` header to a file extension, defaulting to `.mp3`.
pub fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let ctype = content_type.unwrap_or("").to_ascii_lowercase();
    const TABLE: &[(&[&str], &str)] = &[
        (&["m4a", "mp4"], ".m4a"),
        (&["mpeg", "mp3"], ".mp3"),
        (&["wav"], ".wav"),
        (&["jpeg", "jpg"], ".jpg"),
        (&["png"], ".png"),
        (&["webp"], ".webp"),
    ];
    TABLE
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| ctype.contains(n)))
        .map(|(_, ext)| *ext)
        .unwrap_or(".mp3")
}
