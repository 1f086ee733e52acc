//! Now-playing display contract and the terminal renderer.
//!
//! The session never draws; the driver hands a state snapshot and a
//! refresh scope to a [`DisplaySink`]. The fixed layout mirrors the
//! device screen: artist, song, liked flag, play state and a 20-segment
//! progress bar.

use colored::Colorize;

use crate::{types::PlaybackState, utils};

/// Number of segments in the progress bar.
pub const PROGRESS_SEGMENTS: u64 = 20;

/// How much of the layout a render call replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshScope {
    /// Redraw the whole layout.
    Full,
    /// Only the liked flag changed.
    LikedOnly,
}

/// Number of filled segments for a position within a duration.
///
/// A zero duration renders an empty bar rather than dividing by zero; a
/// position at or past the duration fills the whole bar.
pub fn filled_segments(position_ms: u64, duration_ms: u64) -> u64 {
    if duration_ms == 0 {
        return 0;
    }
    let progress = position_ms as f64 / duration_ms as f64;
    ((PROGRESS_SEGMENTS as f64 * progress).floor() as u64).min(PROGRESS_SEGMENTS)
}

/// Renders a fixed now-playing layout from a playback-state snapshot.
pub trait DisplaySink {
    fn render(&mut self, state: &PlaybackState, scope: RefreshScope);
}

/// Terminal implementation of the display.
pub struct TermDisplay;

impl TermDisplay {
    pub fn new() -> Self {
        TermDisplay
    }
}

impl Default for TermDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for TermDisplay {
    fn render(&mut self, state: &PlaybackState, scope: RefreshScope) {
        let Some(track) = &state.track else {
            println!("{}", "Nothing playing.".dimmed());
            return;
        };

        let liked = if track.liked { "Yes" } else { "No" };

        if scope == RefreshScope::LikedOnly {
            println!("{} {}", "Liked:".bold(), liked);
            return;
        }

        let status = if state.is_playing {
            "Playing".green().to_string()
        } else {
            "Paused".yellow().to_string()
        };

        let filled = filled_segments(state.position_ms, track.duration_ms) as usize;
        let bar: String = (0..PROGRESS_SEGMENTS as usize)
            .map(|i| if i < filled { '#' } else { '-' })
            .collect();

        println!();
        println!("{} {}", "Artist:".bold(), track.artist);
        println!("{} {}", "Song:".bold(), track.name);
        println!("{} {}", "Album:".bold(), track.album);
        println!("{} {}", "Liked:".bold(), liked);
        println!("{} {}", "Status:".bold(), status);
        println!(
            "[{}] {} / {}",
            bar,
            utils::format_track_time(state.position_ms),
            utils::format_track_time(track.duration_ms)
        );
        println!("{} {}%", "Volume:".bold(), state.volume_percent);
    }
}
