//! Operator identity and its on-disk persistence
//!
//! The operator is the person running this client. Their id, color and name
//! are read once at startup, written when they join, and can be erased with
//! an explicit purge.

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{generate_random_name, random_palette_color};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub color: String,
    pub name: String,
}

impl Operator {
    pub fn new(id: impl Into<String>, color: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color: color.into(),
            name: name.into(),
        }
    }

    /// Fresh identity with a time-ordered id, a palette color and a random name.
    pub fn generate() -> Self {
        Self::new(generate_player_id(), random_palette_color(), generate_random_name())
    }
}

/// `player_<unix millis>_<9 base-36 chars>`. Ids minted later compare greater
/// for as long as the millisecond count keeps its digit width.
pub fn generate_player_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();

    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();

    format!("player_{}_{}", millis, suffix)
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to access identity file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("identity file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON file holding the operator identity between runs.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when nothing has been stored yet.
    pub fn load(&self) -> Result<Option<Operator>, IdentityError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No stored identity at {}", self.path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(IdentityError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let operator = serde_json::from_str(&text).map_err(|source| IdentityError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(operator))
    }

    pub fn save(&self, operator: &Operator) -> Result<(), IdentityError> {
        let text = serde_json::to_string_pretty(operator).map_err(|source| {
            IdentityError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| IdentityError::Io {
                path: self.path.clone(),
                source,
            })?;
        }

        fs::write(&self.path, text).map_err(|source| IdentityError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("Saved identity for {} to {}", operator.id, self.path.display());
        Ok(())
    }

    /// Removes the stored identity. Erasing twice is not an error.
    pub fn erase(&self) -> Result<(), IdentityError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Erased stored identity at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(IdentityError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> IdentityStore {
        let path = std::env::temp_dir().join(format!(
            "gridmap-identity-{}-{}-{}.json",
            tag,
            std::process::id(),
            generate_player_id()
        ));
        IdentityStore::new(path)
    }

    #[test]
    fn test_generated_id_shape() {
        let id = generate_player_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "player");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generated_ids_are_time_ordered() {
        let first = generate_player_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = generate_player_id();
        assert!(second > first);
    }

    #[test]
    fn test_missing_file_loads_none() {
        let store = temp_store("missing");
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_load_erase() {
        let store = temp_store("cycle");
        let operator = Operator::new("player_1_abc", "#3B82F6", "Fox");

        store.save(&operator).unwrap();
        assert_eq!(store.load().unwrap(), Some(operator));

        store.erase().unwrap();
        assert!(store.load().unwrap().is_none());
        store.erase().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let store = temp_store("corrupt");
        fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(IdentityError::Corrupt { .. })));
        store.erase().unwrap();
    }
}
