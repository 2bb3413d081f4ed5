use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

const FILE_NAME: &str = "wallet-disconnected.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Persisted {
    #[serde(rename = "wallet-disconnected")]
    wallet_disconnected: bool,
}

/// Persisted "user disconnected on purpose" flag.
///
/// While set, the session does not reconnect on its own.
#[derive(Debug, Clone)]
pub struct DisconnectFlag {
    path: PathBuf,
}

impl DisconnectFlag {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(FILE_NAME),
        }
    }

    pub fn is_set(&self) -> bool {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return false,
        };
        match serde_json::from_str::<Persisted>(&contents) {
            Ok(p) => p.wallet_disconnected,
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", self.path.display(), e);
                false
            }
        }
    }

    pub fn set(&self) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string(&Persisted {
            wallet_disconnected: true,
        })?;
        fs::write(&self.path, contents)
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("agririsk-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let flag = DisconnectFlag::new(scratch_dir("flag-set-clear"));
        assert!(!flag.is_set());

        flag.set().unwrap();
        assert!(flag.is_set());
        assert!(DisconnectFlag::new(flag.path.parent().unwrap()).is_set());

        flag.clear().unwrap();
        assert!(!flag.is_set());
        flag.clear().unwrap(); // clearing twice is fine
    }

    #[test]
    fn test_garbage_file_is_not_set() {
        let dir = scratch_dir("flag-garbage");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(FILE_NAME), "not json").unwrap();

        assert!(!DisconnectFlag::new(&dir).is_set());
    }
}
