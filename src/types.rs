use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NestError, Result};

/// Tolerance for fit tests on fractional strip widths.
pub const EPSILON: f64 = 1e-9;

/// Axis-aligned size on the roll. `length` runs along the roll, `width` across it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub length: f64,
    pub width: f64,
}

impl Rect {
    pub fn new(length: f64, width: f64) -> Self {
        Self { length, width }
    }

    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    pub fn rotated(&self) -> Self {
        Self {
            length: self.width,
            width: self.length,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.length <= other.length + EPSILON && self.width <= other.width + EPSILON
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}x{:.1}", self.width, self.length)
    }
}

/// One row of the caller's order: a panel of `width` x `height` cm, `quantity` times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelDemand {
    pub id: u32,
    pub width: f64,
    pub height: f64,
    pub quantity: u32,
}

impl PanelDemand {
    pub fn new(id: u32, width: f64, height: f64, quantity: u32) -> Self {
        Self {
            id,
            width,
            height,
            quantity,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(NestError::InvalidInput(format!(
                "panel {} width must be positive",
                self.id
            )));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(NestError::InvalidInput(format!(
                "panel {} height must be positive",
                self.id
            )));
        }
        Ok(())
    }
}

/// A single physical strip ready for packing.
///
/// Orientation 0 lays the strip width across the roll, orientation 1 is the
/// same strip turned 90 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiledPiece {
    pub panel_id: u32,
    pub orientations: [Rect; 2],
}

impl TiledPiece {
    pub fn new(panel_id: u32, strip_width: f64, height: f64) -> Self {
        let as_tiled = Rect::new(height, strip_width);
        Self {
            panel_id,
            orientations: [as_tiled, as_tiled.rotated()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedPiece {
    pub panel_id: u32,
    pub rect: Rect,
    /// Offset along the roll.
    pub x: f64,
    /// Offset across the roll.
    pub y: f64,
    pub rotated: bool,
}

impl PlacedPiece {
    pub fn end_x(&self) -> f64 {
        self.x + self.rect.length
    }

    pub fn end_y(&self) -> f64 {
        self.y + self.rect.width
    }
}

/// Placements in placement order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub placements: Vec<PlacedPiece>,
}

impl Layout {
    /// Roll length consumed by the layout; zero when nothing is placed.
    pub fn length(&self) -> f64 {
        self.placements
            .iter()
            .map(PlacedPiece::end_x)
            .fold(0.0, f64::max)
    }

    pub fn used_area(&self) -> f64 {
        self.placements.iter().map(|p| p.rect.area()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NestConfig {
    pub roll_width: f64,
    /// Extra material added at each seam between strips of one panel.
    pub overlap: f64,
    pub passes: usize,
    pub seed: Option<u64>,
    /// Physical roll length; `None` leaves the roll unbounded.
    pub roll_length: Option<f64>,
    pub time_limit: Option<Duration>,
    pub parallel: bool,
}

impl NestConfig {
    pub const DEFAULT_ROLL_WIDTH: f64 = 137.0;
    pub const DEFAULT_OVERLAP: f64 = 1.0;
    pub const DEFAULT_PASSES: usize = 150;

    pub fn new(roll_width: f64, overlap: f64, passes: usize) -> Self {
        Self {
            roll_width,
            overlap,
            passes,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.roll_width.is_finite() && self.roll_width > 0.0) {
            return Err(NestError::InvalidInput(
                "roll width must be positive".to_string(),
            ));
        }
        if !(self.overlap.is_finite() && self.overlap >= 0.0) {
            return Err(NestError::InvalidInput(
                "overlap must be non-negative".to_string(),
            ));
        }
        if self.overlap >= self.roll_width {
            return Err(NestError::InvalidInput(
                "overlap must be smaller than the roll width".to_string(),
            ));
        }
        if self.passes == 0 {
            return Err(NestError::InvalidInput(
                "passes must be non-zero".to_string(),
            ));
        }
        if let Some(len) = self.roll_length
            && !(len > 0.0)
        {
            return Err(NestError::InvalidInput(
                "roll length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for NestConfig {
    fn default() -> Self {
        Self {
            roll_width: Self::DEFAULT_ROLL_WIDTH,
            overlap: Self::DEFAULT_OVERLAP,
            passes: Self::DEFAULT_PASSES,
            seed: None,
            roll_length: None,
            time_limit: None,
            parallel: cfg!(feature = "parallel"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub passes_requested: usize,
    pub passes_run: usize,
    pub passes_packed: usize,
    /// Number of times a pass beat the best length seen so far.
    pub improvements: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub layout: Layout,
    pub length: f64,
    pub roll_width: f64,
    pub stats: SearchStats,
}

impl Solution {
    pub fn piece_count(&self) -> usize {
        self.layout.placements.len()
    }

    pub fn total_area(&self) -> f64 {
        self.length * self.roll_width
    }

    pub fn utilization_percent(&self) -> f64 {
        let total = self.total_area();
        if total <= 0.0 {
            return 0.0;
        }
        self.layout.used_area() / total * 100.0
    }

    pub fn waste_percent(&self) -> f64 {
        if self.total_area() <= 0.0 {
            return 0.0;
        }
        100.0 - self.utilization_percent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_rotation_and_fit() {
        let r = Rect::new(50.0, 100.0);
        assert_eq!(r.rotated(), Rect::new(100.0, 50.0));
        assert!(r.fits_in(&Rect::new(50.0, 100.0)));
        assert!(!r.rotated().fits_in(&Rect::new(50.0, 100.0)));
    }

    #[test]
    fn test_tiled_piece_orientations() {
        let p = TiledPiece::new(3, 100.0, 50.0);
        assert_eq!(p.orientations[0].width, 100.0);
        assert_eq!(p.orientations[0].length, 50.0);
        assert_eq!(p.orientations[1].width, 50.0);
        assert_eq!(p.orientations[1].length, 100.0);
    }

    #[test]
    fn test_empty_layout_length_is_zero() {
        assert_eq!(Layout::default().length(), 0.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(NestConfig::default().validate().is_ok());
        assert!(NestConfig::new(0.0, 0.0, 10).validate().is_err());
        assert!(NestConfig::new(100.0, -1.0, 10).validate().is_err());
        assert!(NestConfig::new(100.0, 100.0, 10).validate().is_err());
        assert!(NestConfig::new(100.0, 1.0, 0).validate().is_err());
        let cfg = NestConfig {
            roll_length: Some(0.0),
            ..NestConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_demand_validation() {
        assert!(PanelDemand::new(1, 10.0, 10.0, 1).validate().is_ok());
        assert!(PanelDemand::new(1, 0.0, 10.0, 1).validate().is_err());
        assert!(PanelDemand::new(1, 10.0, f64::NAN, 1).validate().is_err());
    }
}
