//! Version store: named songs as append-only lists of immutable code versions
//!
//! The whole collection is one human-readable JSON document mapping song name
//! to its version list. Every mutation is a locked read-modify-write of the
//! entire document: load, mutate in memory, atomically replace the file
//! (write to a temp sibling, then rename). Versions are 1-indexed externally.
//!
//! Readers that go through [`SongStore::detail`] / [`SongStore::list`] do not
//! take the collection lock; the atomic replace guarantees they always see a
//! complete (possibly one-mutation-stale) document, never a torn one.

use crate::config::Paths;
use crate::lock::DirLock;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One immutable snapshot of a song's code plus creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    /// Opaque pattern source text; never parsed here
    pub code: String,
    /// Creation timestamp (RFC 3339, UTC)
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A named song: an ordered, append-only sequence of versions
///
/// Invariant: at least one version from creation onward. Versions are never
/// mutated or deleted in place; rollback appends a copy of old content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub versions: Vec<Version>,
}

/// Everything `detail` reports about one version of a song
#[derive(Debug, Clone)]
pub struct SongDetail {
    pub code: String,
    pub version: usize,
    pub total_versions: usize,
    pub created_at: DateTime<Utc>,
}

/// Result of a find-replace update: the new latest code and its version number
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub code: String,
    pub version: usize,
}

/// Result of promoting a historical version to the front
#[derive(Debug, Clone)]
pub struct Promotion {
    pub code: String,
    pub from_version: usize,
    pub new_version: usize,
}

type Collection = BTreeMap<String, Song>;

/// Durable song storage rooted at a tapedeck data directory
#[derive(Debug, Clone)]
pub struct SongStore {
    paths: Paths,
}

impl SongStore {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// Create a new song with `code` as version 1
    pub fn create(&self, name: &str, code: &str) -> Result<Version> {
        let _lock = DirLock::acquire(&self.paths.songs_lock())?;
        let mut songs = self.load()?;

        if songs.contains_key(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        let version = Version {
            code: code.to_string(),
            created_at: Utc::now(),
        };
        songs.insert(
            name.to_string(),
            Song {
                versions: vec![version.clone()],
            },
        );
        self.save(&songs)?;
        debug!(song = name, "Created song (version 1)");
        Ok(version)
    }

    /// Replace one occurrence of `from` with `to` in the latest version's
    /// code and append the result as a new version
    ///
    /// Matches are enumerated with overlapping semantics: after a match at
    /// character position p the next search starts at p+1, not past the full
    /// match. More than one match requires `index` to disambiguate.
    pub fn update(
        &self,
        name: &str,
        from: &str,
        to: &str,
        index: Option<usize>,
    ) -> Result<UpdateOutcome> {
        if from.is_empty() {
            return Err(Error::InvalidArgument(
                "search string must not be empty".to_string(),
            ));
        }

        let _lock = DirLock::acquire(&self.paths.songs_lock())?;
        let mut songs = self.load()?;

        let song = songs
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let latest = song
            .versions
            .last()
            .ok_or_else(|| Error::Internal(format!("song \"{name}\" has no versions")))?;

        let matches = find_matches(&latest.code, from);
        let offset = match (matches.len(), index) {
            (0, _) => return Err(Error::NoMatch(from.to_string())),
            (1, None) => matches[0],
            (count, None) => {
                return Err(Error::AmbiguousMatch {
                    needle: from.to_string(),
                    count,
                })
            }
            (count, Some(i)) if i >= count => {
                return Err(Error::IndexOutOfRange { index: i, count })
            }
            (_, Some(i)) => matches[i],
        };

        let mut code = String::with_capacity(latest.code.len() + to.len());
        code.push_str(&latest.code[..offset]);
        code.push_str(to);
        code.push_str(&latest.code[offset + from.len()..]);

        song.versions.push(Version {
            code: code.clone(),
            created_at: Utc::now(),
        });
        let version = song.versions.len();
        self.save(&songs)?;
        debug!(song = name, version, "Appended updated version");
        Ok(UpdateOutcome { code, version })
    }

    /// Fetch one version of a song (latest when `version` is None)
    pub fn detail(&self, name: &str, version: Option<usize>) -> Result<SongDetail> {
        let songs = self.load()?;
        let song = songs
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let total = song.versions.len();

        let version = version.unwrap_or(total);
        if version < 1 || version > total {
            return Err(Error::VersionOutOfRange {
                name: name.to_string(),
                version,
                total,
            });
        }

        let v = &song.versions[version - 1];
        Ok(SongDetail {
            code: v.code.clone(),
            version,
            total_versions: total,
            created_at: v.created_at,
        })
    }

    /// Append a copy of a historical version as the new latest version
    ///
    /// This is how rollback works: history is never truncated, only extended.
    pub fn promote(&self, name: &str, version: usize) -> Result<Promotion> {
        let _lock = DirLock::acquire(&self.paths.songs_lock())?;
        let mut songs = self.load()?;

        let song = songs
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let total = song.versions.len();
        if version < 1 || version > total {
            return Err(Error::VersionOutOfRange {
                name: name.to_string(),
                version,
                total,
            });
        }

        let code = song.versions[version - 1].code.clone();
        song.versions.push(Version {
            code: code.clone(),
            created_at: Utc::now(),
        });
        let new_version = song.versions.len();
        self.save(&songs)?;
        debug!(
            song = name,
            from = version,
            to = new_version,
            "Promoted historical version"
        );
        Ok(Promotion {
            code,
            from_version: version,
            new_version,
        })
    }

    /// All song names, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.load()?.keys().cloned().collect())
    }

    /// Remove a song and all its versions irreversibly
    pub fn delete(&self, name: &str) -> Result<()> {
        let _lock = DirLock::acquire(&self.paths.songs_lock())?;
        let mut songs = self.load()?;
        if songs.remove(name).is_none() {
            return Err(Error::NotFound(name.to_string()));
        }
        self.save(&songs)?;
        debug!(song = name, "Deleted song");
        Ok(())
    }

    /// Move a song to a new name, keeping all versions
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        let _lock = DirLock::acquire(&self.paths.songs_lock())?;
        let mut songs = self.load()?;
        if songs.contains_key(new) {
            return Err(Error::AlreadyExists(new.to_string()));
        }
        let song = songs
            .remove(old)
            .ok_or_else(|| Error::NotFound(old.to_string()))?;
        songs.insert(new.to_string(), song);
        self.save(&songs)?;
        debug!(from = old, to = new, "Renamed song");
        Ok(())
    }

    /// Load the whole collection; a missing file is an empty collection
    fn load(&self) -> Result<Collection> {
        match std::fs::read_to_string(self.paths.songs_file()) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Collection::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replace the songs file (temp sibling + rename)
    fn save(&self, songs: &Collection) -> Result<()> {
        self.paths.ensure_exists()?;
        let target = self.paths.songs_file();
        let tmp = target.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(songs)?)?;
        std::fs::rename(&tmp, &target)?;
        Ok(())
    }
}

/// Byte offsets of all occurrences of `needle`, stepping one character after
/// each match start so overlapping occurrences are individually enumerable
fn find_matches(haystack: &str, needle: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut pos = 0;
    while pos <= haystack.len() {
        if haystack[pos..].starts_with(needle) {
            offsets.push(pos);
        }
        match haystack[pos..].chars().next() {
            Some(c) => pos += c.len_utf8(),
            None => break,
        }
    }
    offsets
}
