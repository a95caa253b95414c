//! Error types for the dreidel engine

use thiserror::Error;

use crate::turn::Phase;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DreidelError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot {action} while {phase}")]
    InvalidState { action: &'static str, phase: Phase },

    #[error("player index {index} out of range for {count} players")]
    Index { index: usize, count: usize },

    #[error("pot and every player are out of gelt")]
    Exhausted,
}

impl DreidelError {
    pub fn config(msg: impl Into<String>) -> Self {
        DreidelError::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DreidelError>;
