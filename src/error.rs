use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No tile count in 1..=5 makes the panel's strips fit the roll width.
    #[error("panel {panel_id} cannot be tiled to fit the roll width")]
    NotFittable { panel_id: u32 },
    /// A single ordering could not be fully placed. Never surfaced by the solver.
    #[error("pieces could not be packed in this order")]
    PackingFailed,
    #[error("no feasible layout found in {passes} passes")]
    NoFeasibleLayout { passes: usize },
}

pub type Result<T> = std::result::Result<T, NestError>;
