//! Persisted high score (XDG config or ~/.config/blockfall).

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

const DIR_NAME: &str = "blockfall";
const FILENAME: &str = "highscore";

/// Fallback next to the working directory when no config directory is known.
pub const LOCAL_HIGH_SCORE_FILE: &str = "highscore.txt";

#[derive(Debug, Error)]
pub enum HighScoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no config directory (XDG_CONFIG_HOME and HOME are unset)")]
    NoConfigDir,
}

pub trait HighScoreStore {
    /// The stored high score, 0 when nothing usable is stored.
    fn read(&self) -> u32;

    fn write(&mut self, score: u32) -> Result<(), HighScoreError>;
}

/// Returns the path to the high score file (config dir / blockfall / highscore).
pub fn default_path() -> Result<PathBuf, HighScoreError> {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .map_err(|_| HighScoreError::NoConfigDir)?,
    };
    Ok(base.join(DIR_NAME).join(FILENAME))
}

/// One decimal number in a text file.
#[derive(Debug, Clone)]
pub struct FileHighScoreStore {
    path: PathBuf,
}

impl FileHighScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default_location() -> Result<Self, HighScoreError> {
        default_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HighScoreStore for FileHighScoreStore {
    fn read(&self) -> u32 {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Creates the parent directory if needed.
    fn write(&mut self, score: u32) -> Result<(), HighScoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, format!("{score}\n"))?;
        Ok(())
    }
}

/// Keeps the score in memory and remembers every write.
#[derive(Debug, Clone, Default)]
pub struct MemoryHighScoreStore {
    score: u32,
    writes: Vec<u32>,
}

impl MemoryHighScoreStore {
    pub fn new(score: u32) -> Self {
        Self {
            score,
            writes: Vec::new(),
        }
    }

    pub fn writes(&self) -> &[u32] {
        &self.writes
    }
}

impl HighScoreStore for MemoryHighScoreStore {
    fn read(&self) -> u32 {
        self.score
    }

    fn write(&mut self, score: u32) -> Result<(), HighScoreError> {
        self.score = score;
        self.writes.push(score);
        Ok(())
    }
}
