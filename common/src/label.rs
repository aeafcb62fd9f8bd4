use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of `_` separated tokens in a scaling label, ie.
/// `Program_A_Scaling_cpu_4`.
pub const SCALING_MIN_TOKENS: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("Label {label:?} has {found} tokens, expected at least {expected}")]
    TooFewTokens {
        label: String,
        found: usize,
        expected: usize,
    },
    #[error("Label {label:?} has an invalid worker count {count:?}")]
    InvalidCount { label: String, count: String },
    #[error("Label {0:?} is not a <variant>+<task> pair")]
    NotAPair(String),
}

/// A parsed configuration label
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    pub variant: String,
    pub task: String,
    /// Only present for scaling labels
    pub workers: Option<u32>,
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.workers {
            Some(workers) => write!(f, "{}/{}/{workers}", self.variant, self.task),
            None => write!(f, "{}/{}", self.variant, self.task),
        }
    }
}

/// How the composite label column of a table is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelScheme {
    /// `<Program>_<Variant>_..._<Task>_<Count>`
    Scaling,
    /// `<Program>+<Task>`
    Pair,
}

impl LabelScheme {
    pub fn delimiter(&self) -> char {
        match self {
            LabelScheme::Scaling => '_',
            LabelScheme::Pair => '+',
        }
    }

    /// Whether labels of this scheme carry a worker count
    pub fn has_workers(&self) -> bool {
        matches!(self, LabelScheme::Scaling)
    }

    /// Parses a label into its variant, task and worker count.
    ///
    /// Scaling labels take the variant from the first two tokens, the task
    /// from the second-to-last token and the worker count from the last one.
    /// Pair labels must consist of exactly two non-empty tokens.
    pub fn parse(&self, label: &str) -> Result<Label, LabelError> {
        let delimiter = self.delimiter();
        let tokens = label.split(delimiter).collect::<Vec<_>>();
        match self {
            LabelScheme::Scaling => {
                if tokens.len() < SCALING_MIN_TOKENS {
                    return Err(LabelError::TooFewTokens {
                        label: label.to_owned(),
                        found: tokens.len(),
                        expected: SCALING_MIN_TOKENS,
                    });
                }
                let count = tokens[tokens.len() - 1];
                let workers = count
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| LabelError::InvalidCount {
                        label: label.to_owned(),
                        count: count.to_owned(),
                    })?;
                Ok(Label {
                    variant: format!("{}{delimiter}{}", tokens[0], tokens[1]),
                    task: tokens[tokens.len() - 2].to_owned(),
                    workers: Some(workers),
                })
            }
            LabelScheme::Pair => match tokens.as_slice() {
                [variant, task] if !variant.is_empty() && !task.is_empty() => Ok(Label {
                    variant: (*variant).to_owned(),
                    task: (*task).to_owned(),
                    workers: None,
                }),
                _ => Err(LabelError::NotAPair(label.to_owned())),
            },
        }
    }
}
