//! Cursor sprite cache.
//!
//! Sprites live as `<style>.png` files in a configured directory. Each style
//! is loaded at most once per process; a missing or unreadable asset is
//! cached as an explicit "unavailable" result so the hot per-frame path
//! never repeats filesystem misses.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::RgbaImage;

/// Lazily-populated, append-only map of cursor sprites by style name.
pub struct SpriteCache {
    dir: PathBuf,
    entries: Mutex<HashMap<String, Option<Arc<RgbaImage>>>>,
}

impl SpriteCache {
    /// Create a cache reading sprites from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up the sprite for a style, loading it on first use.
    ///
    /// Returns `None` when the asset is missing; that result is cached and
    /// never re-attempted.
    pub fn get(&self, style: &str) -> Option<Arc<RgbaImage>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get(style) {
            return entry.clone();
        }

        let path = self.dir.join(format!("{style}.png"));
        let loaded = match image::open(&path) {
            Ok(img) => Some(Arc::new(img.to_rgba8())),
            Err(e) => {
                tracing::warn!(
                    style,
                    path = %path.display(),
                    error = %e,
                    "Cursor sprite unavailable; frames will render without it"
                );
                None
            }
        };

        entries.insert(style.to_string(), loaded.clone());
        loaded
    }
}
