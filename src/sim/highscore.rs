/// High-score persistence: best score per difficulty.
///
/// The engine sees only the `HighScoreStore` capability (read / write),
/// so game logic never touches the filesystem and tests can swap in
/// `MemoryHighScoreStore`.
///
/// ## File format:
///   A TOML table keyed by difficulty name:
///
///   ```toml
///   easy = 120
///   medium = 85
///   hard = 40
///   ```
///
///   Missing keys read as 0. Keys this build does not know about are kept
///   when the file is rewritten.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::difficulty::Difficulty;
use crate::error::HighScoreError;

pub trait HighScoreStore {
    fn read(&self, difficulty: Difficulty) -> Result<u32, HighScoreError>;
    fn write(&mut self, difficulty: Difficulty, score: u32) -> Result<(), HighScoreError>;
}

impl<S: HighScoreStore + ?Sized> HighScoreStore for Box<S> {
    fn read(&self, difficulty: Difficulty) -> Result<u32, HighScoreError> {
        (**self).read(difficulty)
    }

    fn write(&mut self, difficulty: Difficulty, score: u32) -> Result<(), HighScoreError> {
        (**self).write(difficulty, score)
    }
}

/// Read the best score, logging and falling back to 0 on failure.
pub fn read_or_zero<S: HighScoreStore + ?Sized>(store: &S, difficulty: Difficulty) -> u32 {
    match store.read(difficulty) {
        Ok(best) => best,
        Err(e) => {
            warn!(%difficulty, error = %e, "high score read failed, using 0");
            0
        }
    }
}

// ══════════════════════════════════════════════════════════════
// File-backed store
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct FileHighScoreStore {
    path: PathBuf,
}

impl FileHighScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileHighScoreStore { path: path.into() }
    }

    /// Place `file_name` in the first writable data directory.
    /// Absolute names are used as-is.
    pub fn locate(file_name: &str) -> Self {
        let p = PathBuf::from(file_name);
        if p.is_absolute() {
            return Self::new(p);
        }
        Self::new(data_dir().join(p))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_table(&self) -> Result<toml::Table, HighScoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(toml::Table::new()),
            Err(source) => {
                return Err(HighScoreError::Read { path: self.path.clone(), source });
            }
        };
        Ok(toml::from_str(&text)?)
    }
}

impl HighScoreStore for FileHighScoreStore {
    fn read(&self, difficulty: Difficulty) -> Result<u32, HighScoreError> {
        let table = self.load_table()?;
        let best = table
            .get(difficulty.name())
            .and_then(toml::Value::as_integer)
            .map(|v| v.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(0);
        Ok(best)
    }

    fn write(&mut self, difficulty: Difficulty, score: u32) -> Result<(), HighScoreError> {
        let mut table = self.load_table()?;
        table.insert(difficulty.name().to_string(), toml::Value::Integer(score as i64));
        let text = toml::to_string(&table)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|source| HighScoreError::Write { path: self.path.clone(), source })?;
        }
        std::fs::write(&self.path, text)
            .map_err(|source| HighScoreError::Write { path: self.path.clone(), source })?;
        debug!(path = %self.path.display(), %difficulty, score, "high score saved");
        Ok(())
    }
}

fn data_dir() -> PathBuf {
    // 1. Try exe directory (works for local/portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs won't be writable
            let probe = parent.join(".write_test_gridstrike");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/gridstrike");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. Fallback to CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// In-memory store
// ══════════════════════════════════════════════════════════════

/// Volatile store for tests and headless runs. Can be told to fail.
#[derive(Clone, Debug, Default)]
pub struct MemoryHighScoreStore {
    scores: HashMap<Difficulty, u32>,
    /// Every successful write, in order.
    pub writes: Vec<(Difficulty, u32)>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl MemoryHighScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, difficulty: Difficulty, score: u32) -> Self {
        self.scores.insert(difficulty, score);
        self
    }

    pub fn get(&self, difficulty: Difficulty) -> u32 {
        self.scores.get(&difficulty).copied().unwrap_or(0)
    }
}

impl HighScoreStore for MemoryHighScoreStore {
    fn read(&self, difficulty: Difficulty) -> Result<u32, HighScoreError> {
        if self.fail_reads {
            return Err(HighScoreError::Unavailable("read disabled".into()));
        }
        Ok(self.get(difficulty))
    }

    fn write(&mut self, difficulty: Difficulty, score: u32) -> Result<(), HighScoreError> {
        if self.fail_writes {
            return Err(HighScoreError::Unavailable("write disabled".into()));
        }
        self.scores.insert(difficulty, score);
        self.writes.push((difficulty, score));
        Ok(())
    }
}
