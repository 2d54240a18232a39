//! Persistent floating-geometry cache: remembers where the user last placed a
//! floating window, keyed by window class, so the same program re-opens where
//! it was left. A miss is an absent entry, never an error.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::xconn::Rect;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Entries(HashMap<String, Rect>);

#[derive(Debug)]
pub struct Cookie {
    path: Option<PathBuf>,
    entries: Entries,
}

impl Cookie {
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join("driftwm").join("cookie.json"))
    }

    /// Loads the cache file; a missing or corrupt file yields an empty cache.
    pub fn load(path: Option<PathBuf>) -> Self {
        let entries = path
            .as_deref()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|text| match serde_json::from_str(&text) {
                Ok(entries) => Some(entries),
                Err(e) => {
                    warn!("discarding corrupt cookie file: {e}");
                    None
                }
            })
            .unwrap_or_default();
        Self { path, entries }
    }

    pub fn get(&self, key: &str) -> Option<Rect> {
        self.entries.0.get(key).copied()
    }

    pub fn put(&mut self, key: &str, rect: Rect) {
        self.entries.0.insert(key.to_string(), rect);
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.path else { return };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string(&self.entries) {
            Ok(text) => {
                if let Err(e) = std::fs::write(path, text) {
                    warn!("failed to write cookie file {}: {e}", path.display());
                } else {
                    debug!("persisted {} cookie entries", self.entries.0.len());
                }
            }
            Err(e) => warn!("failed to serialize cookie entries: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("driftwm-cookie-test-{name}-{}", std::process::id()))
    }

    #[test]
    fn miss_returns_none() {
        let cookie = Cookie::load(None);
        assert_eq!(cookie.get("anything"), None);
    }

    #[test]
    fn put_then_get_roundtrips_through_disk() {
        let path = temp_path("roundtrip");
        let rect = Rect::new(10, 20, 300, 400);

        let mut cookie = Cookie::load(Some(path.clone()));
        cookie.put("urxvt", rect);
        assert_eq!(cookie.get("urxvt"), Some(rect));

        let reloaded = Cookie::load(Some(path.clone()));
        assert_eq!(reloaded.get("urxvt"), Some(rect));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_yields_empty_cache() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "not json at all").unwrap();
        let cookie = Cookie::load(Some(path.clone()));
        assert_eq!(cookie.get("urxvt"), None);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn put_overwrites_previous_entry() {
        let path = temp_path("overwrite");
        let mut cookie = Cookie::load(Some(path.clone()));
        cookie.put("mpv", Rect::new(0, 0, 100, 100));
        cookie.put("mpv", Rect::new(5, 5, 200, 200));
        assert_eq!(cookie.get("mpv"), Some(Rect::new(5, 5, 200, 200)));
        let _ = std::fs::remove_file(path);
    }
}
