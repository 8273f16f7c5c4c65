use serde::Serialize;

/// Stock roll widths in cm.
pub const ROLL_WIDTHS: [f64; 22] = [
    50.0, 51.0, 91.0, 94.0, 100.0, 105.0, 106.0, 110.0, 112.0, 120.0, 127.0, 137.0, 152.0,
    160.0, 162.0, 200.0, 240.0, 250.0, 257.0, 260.0, 310.0, 320.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Orientation {
    Normal,
    Rotated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollOption {
    pub roll_width: f64,
    pub orientation: Orientation,
    /// Roll length consumed by the artwork.
    pub used_length: f64,
    pub waste_area: f64,
}

/// Ranks every roll the artwork fits on, least waste first, narrower roll on ties.
pub fn find_rolls(art_width: f64, art_height: f64, limit: usize) -> Vec<RollOption> {
    let area = art_width * art_height;
    let mut options = Vec::new();

    for &roll in &ROLL_WIDTHS {
        if art_width <= roll {
            options.push(RollOption {
                roll_width: roll,
                orientation: Orientation::Normal,
                used_length: art_height,
                waste_area: roll * art_height - area,
            });
        }
        if art_height <= roll {
            options.push(RollOption {
                roll_width: roll,
                orientation: Orientation::Rotated,
                used_length: art_width,
                waste_area: roll * art_width - area,
            });
        }
    }

    options.sort_by(|a, b| {
        a.waste_area
            .total_cmp(&b.waste_area)
            .then(a.roll_width.total_cmp(&b.roll_width))
    });
    options.truncate(limit);
    options
}
