use std::collections::HashSet;

use bevy::prelude::*;
use serde::Deserialize;
use strum::Display;
use thiserror::Error;

use crate::grid::DEFAULT_BOARD_SIZE;

pub const DEFAULT_REQUIRED_COUNT: usize = 3;
pub const DEFAULT_STORAGE_KEY: &str = "icon_puzzle_completed";

/// Puzzle list shipped with the bit.
pub const BUNDLED_CONFIG: &str = include_str!("../assets/puzzles.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

/// One icon that can be turned into a puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PuzzleDefinition {
    pub id: u32,
    pub filename: String,
    pub title: String,
    pub story: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub grid_size: usize,
}

impl PuzzleDefinition {
    /// Asset path of the source image.
    pub fn image_path(&self) -> String {
        format!("icons/{}", self.filename)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse puzzle configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No puzzle definitions configured")]
    NoDefinitions,

    #[error("Puzzle {id} has an invalid grid size {grid_size}")]
    InvalidGridSize { id: u32, grid_size: usize },

    #[error("Puzzle id {0} is configured more than once")]
    DuplicateId(u32),

    #[error("Required count {required} must be between 1 and {total}")]
    InvalidRequiredCount { required: usize, total: usize },

    #[error("Board size must be positive, got {0}")]
    InvalidBoardSize(f32),
}

#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    /// Side length of the board in board units
    pub board_size: f32,
    /// Distinct puzzles to solve before the mini-game may be finished
    pub required_count: usize,
    /// Persistence slot for the completed puzzle ids
    pub storage_key: String,
    /// Cosmetic pause before the solved popup appears
    pub settle_delay_ms: u64,
    /// Puzzles in presentation order
    pub definitions: Vec<PuzzleDefinition>,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            required_count: DEFAULT_REQUIRED_COUNT,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            settle_delay_ms: 250,
            definitions: default_definitions(),
        }
    }
}

impl PuzzleConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The shipped puzzle list, or the built-in icons if it is rejected.
    pub fn bundled() -> Self {
        Self::from_json(BUNDLED_CONFIG).unwrap_or_else(|err| {
            warn!("Bundled puzzle list rejected, using built-in icons: {err}");
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.definitions.is_empty() {
            return Err(ConfigError::NoDefinitions);
        }
        if self.board_size <= 0. || !self.board_size.is_finite() {
            return Err(ConfigError::InvalidBoardSize(self.board_size));
        }
        let total = self.definitions.len();
        if self.required_count == 0 || self.required_count > total {
            return Err(ConfigError::InvalidRequiredCount {
                required: self.required_count,
                total,
            });
        }

        let mut seen = HashSet::new();
        for definition in &self.definitions {
            if definition.grid_size == 0 {
                return Err(ConfigError::InvalidGridSize {
                    id: definition.id,
                    grid_size: definition.grid_size,
                });
            }
            if !seen.insert(definition.id) {
                return Err(ConfigError::DuplicateId(definition.id));
            }
        }
        Ok(())
    }
}

fn default_definitions() -> Vec<PuzzleDefinition> {
    vec![
        PuzzleDefinition {
            id: 1,
            filename: "icon.jpg".to_owned(),
            title: "St. Onophrios (Abu Nofer) next to a palm tree.".to_owned(),
            story: "The icon is originally painted by \u{201c}Ibrahim Al-Nasekh\u{201d} in the \
                    18th century, and it located in the Church of the Holy Virgin Mary Al \
                    Damshiriah in Old Cairo."
                .to_owned(),
            difficulty: Difficulty::Easy,
            grid_size: 3,
        },
        PuzzleDefinition {
            id: 2,
            filename: "icon2.jpg".to_owned(),
            title: "The Icon of Christ and Abbot Mena".to_owned(),
            story: "is a Coptic painting currently housed in the Louvre Museum in Paris. The \
                    icon is a wooden panel painting that was brought from the Monastery of \
                    Apollo in Bawit, Egypt."
                .to_owned(),
            difficulty: Difficulty::Easy,
            grid_size: 3,
        },
        PuzzleDefinition {
            id: 3,
            filename: "icon3.jpg".to_owned(),
            title: "Abraham receiving Holy Communion from Melchizedek".to_owned(),
            story: "who is standing before an altar giving a spoon from a chalice to Abraham \
                    drawn between the 11th and the 13th Centuries on the eastern wall of the \
                    central Sanctuary in the Church of the Holy Virgin Mary located at the \
                    Monastery of Al-Baramos, Wadi Al-Natrun."
                .to_owned(),
            difficulty: Difficulty::Easy,
            grid_size: 3,
        },
    ]
}
