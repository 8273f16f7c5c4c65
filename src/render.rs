use crate::types::{Layout, PlacedPiece};

const MAX_WIDTH: f64 = 100.0;
const MAX_HEIGHT: f64 = 30.0;

/// Draws the used part of the roll, length running left to right.
pub fn render_layout(roll_width: f64, layout: &Layout) -> String {
    let length = layout.length();
    if length <= 0.0 || roll_width <= 0.0 {
        return String::new();
    }

    let scale = f64::min(MAX_WIDTH / length, MAX_HEIGHT / roll_width);
    let grid_w = (length * scale).round() as usize;
    let grid_h = (roll_width * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];

    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for p in &layout.placements {
        let sx = (p.x * scale).round() as usize;
        let sy = (p.y * scale).round() as usize;
        let sw = (p.rect.length * scale).round() as usize;
        let sh = (p.rect.width * scale).round() as usize;

        if sw == 0 || sh == 0 {
            continue;
        }

        draw_rect(&mut grid, sx, sy, sw, sh);
        draw_label(&mut grid, &p.panel_id.to_string(), sx, sy, sw, sh);
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

/// One line per placement, in placement order.
pub fn piece_table(layout: &Layout) -> String {
    let mut out = format!(
        "{:>5}  {:>10}  {:>10}  {:>9}  {:>9}\n",
        "Panel", "Tile W", "Tile H", "Along", "Across"
    );
    for p in &layout.placements {
        out.push_str(&table_row(p));
        out.push('\n');
    }
    out
}

fn table_row(p: &PlacedPiece) -> String {
    let rot = if p.rotated { " [rotated]" } else { "" };
    format!(
        "{:>5}  {:>10.2}  {:>10.2}  {:>9.2}  {:>9.2}{}",
        p.panel_id, p.rect.width, p.rect.length, p.x, p.y, rot
    )
}

fn draw_label(grid: &mut [Vec<char>], label: &str, sx: usize, sy: usize, sw: usize, sh: usize) {
    if sw <= 2 || sh == 0 {
        return;
    }
    let label_chars: Vec<char> = label.chars().collect();
    let cx = sx + sw / 2;
    let cy = sy + sh / 2;
    let start_x = cx.saturating_sub(label_chars.len() / 2);

    for (i, &ch) in label_chars.iter().enumerate() {
        let x = start_x + i;
        if x > sx && x < sx + sw && cy > sy && cy < sy + sh && cy < grid.len() && x < grid[cy].len() {
            grid[cy][x] = ch;
        }
    }
}

#[allow(clippy::needless_range_loop)]
fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = if rows > 0 { grid[0].len() } else { return };

    // Horizontal edges
    for i in x..=x + w {
        if i < cols {
            for row in [y, y + h] {
                if row < rows {
                    grid[row][i] = if grid[row][i] == '|' || grid[row][i] == '+' {
                        '+'
                    } else {
                        '-'
                    };
                }
            }
        }
    }

    // Vertical edges
    for j in y..=y + h {
        if j < rows {
            for col in [x, x + w] {
                if col < cols {
                    grid[j][col] = if grid[j][col] == '-' || grid[j][col] == '+' {
                        '+'
                    } else {
                        '|'
                    };
                }
            }
        }
    }

    for &cx in &[x, x + w] {
        for &cy in &[y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}
