use crate::error::{NestError, Result};
use crate::types::{EPSILON, Layout, PlacedPiece, Rect, TiledPiece};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeRect {
    pub x: f64,
    pub y: f64,
    pub rect: Rect,
}

/// Free-space bookkeeping for one packing attempt on a roll.
#[derive(Debug, Clone)]
pub struct GuillotineRoll {
    pub free_rects: Vec<FreeRect>,
    pub placements: Vec<PlacedPiece>,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredPlacement {
    pub free_idx: usize,
    pub orientation: usize,
    /// Free area left in the chosen region after placement.
    pub waste: f64,
}

impl GuillotineRoll {
    /// Starts with a single free region spanning the roll width. Without a
    /// `roll_length` the region is unbounded along the roll.
    pub fn new(roll_width: f64, roll_length: Option<f64>) -> Self {
        Self {
            free_rects: vec![FreeRect {
                x: 0.0,
                y: 0.0,
                rect: Rect::new(roll_length.unwrap_or(f64::INFINITY), roll_width),
            }],
            placements: Vec::new(),
        }
    }

    /// Best-area-fit over every free region and both orientations. The first
    /// candidate wins on equal waste.
    pub fn find_best(&self, piece: &TiledPiece) -> Option<ScoredPlacement> {
        let mut best: Option<ScoredPlacement> = None;

        for (idx, free) in self.free_rects.iter().enumerate() {
            for (orientation, candidate) in piece.orientations.iter().enumerate() {
                if !candidate.fits_in(&free.rect) {
                    continue;
                }
                let waste = free.rect.area() - candidate.area();
                if best.is_none_or(|b| waste < b.waste) {
                    best = Some(ScoredPlacement {
                        free_idx: idx,
                        orientation,
                        waste,
                    });
                }
            }
        }

        best
    }

    pub fn place(&mut self, scored: ScoredPlacement, piece: &TiledPiece) -> PlacedPiece {
        // Order of the remaining regions decides later ties.
        let free = self.free_rects.remove(scored.free_idx);
        let placed = piece.orientations[scored.orientation];

        let placement = PlacedPiece {
            panel_id: piece.panel_id,
            rect: placed,
            x: free.x,
            y: free.y,
            rotated: scored.orientation == 1,
        };

        self.split(free, placed);
        self.placements.push(placement);
        placement
    }

    fn split(&mut self, free: FreeRect, placed: Rect) {
        // Beside the piece, across the roll, as long as the piece.
        let beside = FreeRect {
            x: free.x,
            y: free.y + placed.width,
            rect: Rect::new(placed.length, free.rect.width - placed.width),
        };
        // After the piece, along the roll, the full width of the region.
        let after = FreeRect {
            x: free.x + placed.length,
            y: free.y,
            rect: Rect::new(free.rect.length - placed.length, free.rect.width),
        };

        for r in [beside, after] {
            if r.rect.length > EPSILON && r.rect.width > EPSILON {
                self.free_rects.push(r);
            }
        }
    }

    /// Places every piece in the given order, or fails without exposing a
    /// partial layout.
    pub fn pack<'a, I>(mut self, pieces: I) -> Result<Layout>
    where
        I: IntoIterator<Item = &'a TiledPiece>,
    {
        for piece in pieces {
            let scored = self.find_best(piece).ok_or(NestError::PackingFailed)?;
            self.place(scored, piece);
        }
        Ok(Layout {
            placements: self.placements,
        })
    }
}

/// Packs one ordering on a fresh roll.
pub fn pack_once<'a, I>(pieces: I, roll_width: f64, roll_length: Option<f64>) -> Result<Layout>
where
    I: IntoIterator<Item = &'a TiledPiece>,
{
    GuillotineRoll::new(roll_width, roll_length).pack(pieces)
}

pub fn layout_length(layout: &Layout) -> f64 {
    layout.length()
}
