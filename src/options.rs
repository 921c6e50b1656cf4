use crate::language::ast::{OutputMode, OutputType};

/// Evaluation settings shared by a session and its interpreter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Evaluations per `sample` output.
    pub sample_size: u64,
    /// Type of outputs that do not name one with `as`.
    pub default_type: OutputType,
    /// Mode of the output wrapped around programs that have none.
    pub default_mode: OutputMode,
    /// Fixed seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sample_size: 100_000,
            default_type: OutputType::default(),
            default_mode: OutputMode::default(),
            seed: None,
        }
    }
}

impl Options {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_sample_size(mut self, sample_size: u64) -> Self {
        self.sample_size = sample_size;
        self
    }
}
