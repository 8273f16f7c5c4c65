use crate::error::{NestError, Result};
use crate::types::{EPSILON, PanelDemand, TiledPiece};

/// Largest number of strips a single panel may be split into.
pub const MAX_TILES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    /// Width of every strip, overlap included.
    pub strip_width: f64,
    pub count: u32,
}

/// Splits a panel into the fewest equal strips that fit the roll.
///
/// `n` strips cover `n * roll_width - (n - 1) * overlap` of panel width, and
/// each strip carries its share of the seam allowance.
pub fn tile_width(panel_width: f64, roll_width: f64, overlap: f64) -> Option<Tile> {
    (1..=MAX_TILES).find_map(|n| {
        let nf = n as f64;
        let seams = (n - 1) as f64 * overlap;
        if panel_width <= nf * roll_width - seams + EPSILON {
            Some(Tile {
                strip_width: (panel_width + seams) / nf,
                count: n,
            })
        } else {
            None
        }
    })
}

/// Upper bound on the strips one run may expand to.
pub const MAX_PIECES: u64 = 50_000;

/// Expands every demand into one piece per physical strip.
///
/// Fails as a whole on the first panel that cannot be tiled, and before
/// allocating when the order would exceed [`MAX_PIECES`].
pub fn expand_demands(
    demands: &[PanelDemand],
    roll_width: f64,
    overlap: f64,
) -> Result<Vec<TiledPiece>> {
    let mut tiled = Vec::with_capacity(demands.len());
    let mut total: u64 = 0;
    for d in demands {
        d.validate()?;
        let tile = tile_width(d.width, roll_width, overlap).ok_or(NestError::NotFittable {
            panel_id: d.id,
        })?;
        tracing::debug!(
            panel_id = d.id,
            strips = tile.count,
            strip_width = tile.strip_width,
            "tiled panel"
        );
        total += u64::from(d.quantity) * u64::from(tile.count);
        if total > MAX_PIECES {
            return Err(NestError::InvalidInput(format!(
                "order expands to more than {MAX_PIECES} pieces"
            )));
        }
        tiled.push((d, tile));
    }

    let mut pieces = Vec::with_capacity(total as usize);
    for (d, tile) in tiled {
        for _ in 0..d.quantity {
            for _ in 0..tile.count {
                pieces.push(TiledPiece::new(d.id, tile.strip_width, d.height));
            }
        }
    }
    Ok(pieces)
}
