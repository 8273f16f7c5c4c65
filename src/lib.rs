pub mod error;
pub mod guillotine;
pub mod render;
pub mod roll_finder;
pub mod solver;
pub mod tiler;
pub mod types;

pub use error::{NestError, Result};
pub use solver::Solver;
pub use types::{Layout, NestConfig, PanelDemand, PlacedPiece, Rect, Solution, TiledPiece};
