use crate::types::ArtistRef;

/// Extracts the bare track id from a Spotify URI.
///
/// `spotify:track:4uLU6hMCjMI75M1A2tKUQC` yields
/// `4uLU6hMCjMI75M1A2tKUQC`; a string without `:` is returned unchanged.
pub fn track_id_from_uri(uri: &str) -> &str {
    uri.rsplit(':').next().unwrap_or(uri)
}

/// Derives the display artist from the artists array of a playing item.
///
/// The first entry wins; an empty or absent array falls back to
/// `"Unknown Artist"`.
pub fn primary_artist(artists: &[ArtistRef]) -> String {
    artists
        .first()
        .map(|a| a.name.clone())
        .unwrap_or_else(|| "Unknown Artist".to_string())
}

/// Formats a millisecond position as `m:ss` for the display.
pub fn format_track_time(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
