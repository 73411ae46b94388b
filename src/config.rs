/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// A missing file or missing keys fall back to defaults; a file that
/// exists but cannot be read or parsed is reported to the caller.
///
/// Difficulty parameters and the session length are fixed and not
/// exposed here.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::difficulty::Difficulty;
use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "config.toml";

// ── Public Config Struct ──

#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    pub high_score_file: String,
    pub frame_ms: u64,
    pub logging: LoggingConfig,
    pub sound: SoundConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `gridstrike=debug`.
    pub level: String,
    /// None disables logging.
    pub file: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SoundConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GamepadConfig {
    pub hit: Vec<String>,
    pub start: Vec<String>,
    pub restart: Vec<String>,
    pub difficulty: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    logging: TomlLogging,
    #[serde(default)]
    sound: TomlSound,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default = "default_high_score_file")]
    high_score_file: String,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlLogging {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default = "default_log_file")]
    file: String,
}

#[derive(Deserialize, Debug)]
struct TomlSound {
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_hit")]
    hit: Vec<String>,
    #[serde(default = "default_start")]
    start: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_difficulty_buttons")]
    difficulty: Vec<String>,
}

// ── Defaults ──

fn default_high_score_file() -> String { "highscores.toml".into() }
fn default_frame_ms() -> u64 { 16 }     // ~60 fps redraw
fn default_log_level() -> String { "info".into() }
fn default_log_file() -> String { "gridstrike.log".into() }
fn default_true() -> bool { true }

fn default_hit() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_start() -> Vec<String> { vec!["Start".into()] }
fn default_restart() -> Vec<String> { vec!["Select".into()] }
fn default_difficulty_buttons() -> Vec<String> { vec!["L1".into(), "R1".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            difficulty: Difficulty::default(),
            high_score_file: default_high_score_file(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl Default for TomlLogging {
    fn default() -> Self {
        TomlLogging { level: default_log_level(), file: default_log_file() }
    }
}

impl Default for TomlSound {
    fn default() -> Self {
        TomlSound { enabled: true }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            hit: default_hit(),
            start: default_start(),
            restart: default_restart(),
            difficulty: default_difficulty_buttons(),
        }
    }
}

impl From<TomlConfig> for GameConfig {
    fn from(t: TomlConfig) -> Self {
        let file = t.logging.file.trim();
        GameConfig {
            difficulty: t.general.difficulty,
            high_score_file: t.general.high_score_file,
            // 0 would spin the loop
            frame_ms: t.general.frame_ms.max(1),
            logging: LoggingConfig {
                level: t.logging.level,
                file: (!file.is_empty()).then(|| PathBuf::from(file)),
            },
            sound: SoundConfig { enabled: t.sound.enabled },
            gamepad: GamepadConfig {
                hit: t.gamepad.hit,
                start: t.gamepad.start,
                restart: t.gamepad.restart,
                difficulty: t.gamepad.difficulty,
            },
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        TomlConfig::default().into()
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// No file at all yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match find_config(&candidate_dirs()) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let cfg: TomlConfig = toml::from_str(text)?;
        Ok(cfg.into())
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so an installed link still finds the real binary's dir
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn find_config(search_dirs: &[PathBuf]) -> Option<PathBuf> {
    search_dirs
        .iter()
        .map(|d| d.join(CONFIG_FILE_NAME))
        .find(|p| p.is_file())
}
