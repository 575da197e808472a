//! Level repository
//!
//! Levels arrive as raw grids of block codes grouped into level files. The
//! simulation only ever asks a [`LevelSource`] for a level count and for the
//! raw data of one level; turning that into live blocks happens in `sim::level`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{BLOCKS_TOTAL, BLOCKS_X, BLOCKS_Y};

/// Block codes used in raw level data
pub const BLOCK_NONE_CODE: u8 = 0;
pub const BLOCK_DEFAULT_CODE: u8 = 1;
pub const BLOCK_INVINCIBLE_CODE: u8 = 2;
pub const BLOCK_STRONG_1_CODE: u8 = 3;
pub const BLOCK_STRONG_2_CODE: u8 = 4;
pub const BLOCK_STRONG_3_CODE: u8 = 5;
pub const BLOCK_EXPLODE_CODE: u8 = 6;
pub const MAX_BLOCK_CODE: u8 = BLOCK_EXPLODE_CODE;

const DEFAULT_NAME: &str = "No Name";
const DEFAULT_AUTHOR: &str = "No Author";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelError {
    /// The repository is empty
    NoLevels,
    /// A level index past the end of the repository
    NotFound { index: usize, count: usize },
    /// A grid that isn't exactly BLOCKS_X * BLOCKS_Y cells
    WrongCellCount { expected: usize, actual: usize },
    /// A cell holding something other than 0..=6
    InvalidBlockCode { cell: usize, code: u8 },
    /// A level file that couldn't be read
    Io { path: PathBuf, message: String },
    /// A level file that couldn't be parsed
    Parse { path: PathBuf, message: String },
    /// A level file that is already loaded
    DuplicateFile { path: PathBuf },
    /// Removing a level file title that isn't loaded
    UnknownTitle { title: String },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLevels => write!(f, "no levels configured"),
            Self::NotFound { index, count } => {
                write!(f, "level {index} not found ({count} levels available)")
            }
            Self::WrongCellCount { expected, actual } => {
                write!(f, "level grid has {actual} cells, expected {expected}")
            }
            Self::InvalidBlockCode { cell, code } => {
                write!(f, "invalid block code {code} in cell {cell} (allowed 0..={MAX_BLOCK_CODE})")
            }
            Self::Io { path, message } => {
                write!(f, "cannot read level file {}: {message}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "cannot parse level file {}: {message}", path.display())
            }
            Self::DuplicateFile { path } => {
                write!(f, "level file {} is already loaded", path.display())
            }
            Self::UnknownTitle { title } => write!(f, "no level file titled {title:?}"),
        }
    }
}

impl std::error::Error for LevelError {}

/// Raw level data, before block generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelData {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_author")]
    pub author: String,
    /// Title of the level file the level came from (filled in on load)
    #[serde(default)]
    pub levelfile_title: String,
    #[serde(default)]
    pub difficulty: u32,
    /// Row-major block codes, BLOCKS_X * BLOCKS_Y of them
    pub blocks: Vec<u8>,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

impl LevelData {
    /// Build a level from rows of digit characters, top row first.
    /// Missing rows and short rows are padded with empty cells.
    pub fn from_rows(name: &str, author: &str, difficulty: u32, rows: &[&str]) -> Self {
        let mut blocks = vec![BLOCK_NONE_CODE; BLOCKS_TOTAL];
        for (y, row) in rows.iter().take(BLOCKS_Y).enumerate() {
            for (x, ch) in row.chars().take(BLOCKS_X).enumerate() {
                blocks[y * BLOCKS_X + x] = ch.to_digit(10).map(|d| d as u8).unwrap_or(u8::MAX);
            }
        }
        Self {
            name: name.to_string(),
            author: author.to_string(),
            levelfile_title: String::new(),
            difficulty,
            blocks,
        }
    }

    /// Check the grid size and block codes
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.blocks.len() != BLOCKS_TOTAL {
            return Err(LevelError::WrongCellCount {
                expected: BLOCKS_TOTAL,
                actual: self.blocks.len(),
            });
        }
        if let Some((cell, &code)) = self
            .blocks
            .iter()
            .enumerate()
            .find(|(_, code)| **code > MAX_BLOCK_CODE)
        {
            return Err(LevelError::InvalidBlockCode { cell, code });
        }
        Ok(())
    }

    /// Number of blocks that must be destroyed to clear the level
    pub fn destructible_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|&&code| code != BLOCK_NONE_CODE && code != BLOCK_INVINCIBLE_CODE)
            .count()
    }
}

/// Where the simulation gets its levels from
pub trait LevelSource {
    /// Total number of levels available
    fn level_count(&self) -> usize;
    /// Raw data for level `index` (0-based)
    fn load_level(&self, index: usize) -> Result<LevelData, LevelError>;
}

/// A level file: a titled group of levels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelFile {
    pub title: String,
    pub levels: Vec<LevelData>,
    /// Where the file was loaded from (empty for built-in sets)
    #[serde(skip)]
    pub filename: PathBuf,
}

/// In-memory level repository.
///
/// Levels from every loaded file are kept in one sequence, ordered by
/// difficulty and then by name.
#[derive(Debug, Clone, Default)]
pub struct LevelSet {
    files: Vec<LevelFile>,
    levels: Vec<LevelData>,
}

impl LevelSet {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// A small built-in set, used when no level files are configured
    pub fn builtin() -> Self {
        let mut set = Self::new();
        let result = set.add_level_file(LevelFile {
            title: "Builtin".to_string(),
            filename: PathBuf::new(),
            levels: vec![
                LevelData::from_rows(
                    "Warm Up",
                    "Brickfall",
                    0,
                    &[
                        "",
                        "",
                        "1111111111",
                        "1111111111",
                        "3333333333",
                        "1111111111",
                        "1111111111",
                    ],
                ),
                LevelData::from_rows(
                    "Powder Keg",
                    "Brickfall",
                    1,
                    &[
                        "",
                        "2000000002",
                        "0111111110",
                        "0161111610",
                        "0111111110",
                        "0444444440",
                        "0111111110",
                        "0161111610",
                        "0111111110",
                        "2000000002",
                    ],
                ),
                LevelData::from_rows(
                    "Fortress",
                    "Brickfall",
                    2,
                    &[
                        "5555555555",
                        "5000000005",
                        "5041111405",
                        "5016666105",
                        "5041111405",
                        "5000000005",
                        "2223333222",
                    ],
                ),
            ],
        });
        if let Err(e) = result {
            log::error!("Built-in level set is invalid: {}", e);
        }
        set
    }

    /// Load every file in `paths`, skipping (and reporting) the ones that fail
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut set = Self::new();
        for path in paths {
            match set.add_file(path.as_ref()) {
                Ok(title) => log::info!("Loaded level file {:?}", title),
                Err(e) => log::warn!("Skipping level file: {}", e),
            }
        }
        set
    }

    /// Read a level file (JSON) from disk and add it.
    /// Returns the file's title.
    pub fn add_file(&mut self, path: &Path) -> Result<String, LevelError> {
        if self.files.iter().any(|f| f.filename == path) {
            return Err(LevelError::DuplicateFile {
                path: path.to_path_buf(),
            });
        }

        let json = fs::read_to_string(path).map_err(|e| LevelError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut file: LevelFile = serde_json::from_str(&json).map_err(|e| LevelError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.filename = path.to_path_buf();
        self.add_level_file(file)
    }

    /// Parse a level file from a JSON string and add it
    pub fn add_json(&mut self, json: &str) -> Result<String, LevelError> {
        let file: LevelFile = serde_json::from_str(json).map_err(|e| LevelError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        self.add_level_file(file)
    }

    /// Add an already-parsed level file. Every level is validated first;
    /// one bad level rejects the whole file.
    pub fn add_level_file(&mut self, mut file: LevelFile) -> Result<String, LevelError> {
        for level in &mut file.levels {
            level.validate()?;
            level.levelfile_title = file.title.clone();
        }
        let title = file.title.clone();
        self.files.push(file);
        self.regenerate_level_list();
        Ok(title)
    }

    /// Remove a level file by title, returning its filename
    pub fn remove_file(&mut self, title: &str) -> Result<PathBuf, LevelError> {
        let pos = self
            .files
            .iter()
            .position(|f| f.title == title)
            .ok_or_else(|| LevelError::UnknownTitle {
                title: title.to_string(),
            })?;
        let file = self.files.remove(pos);
        self.regenerate_level_list();
        Ok(file.filename)
    }

    /// Titles of the loaded level files
    pub fn titles(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.title.as_str()).collect()
    }

    /// All levels, in play order
    pub fn levels(&self) -> &[LevelData] {
        &self.levels
    }

    fn regenerate_level_list(&mut self) {
        self.levels = self
            .files
            .iter()
            .flat_map(|f| f.levels.iter().cloned())
            .collect();
        // Stable sort keeps file order for identical difficulty and name
        self.levels
            .sort_by(|a, b| a.difficulty.cmp(&b.difficulty).then_with(|| a.name.cmp(&b.name)));
    }
}

impl LevelSource for LevelSet {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn load_level(&self, index: usize) -> Result<LevelData, LevelError> {
        if self.levels.is_empty() {
            return Err(LevelError::NoLevels);
        }
        self.levels
            .get(index)
            .cloned()
            .ok_or(LevelError::NotFound {
                index,
                count: self.levels.len(),
            })
    }
}
