// src/renderer.rs

use crate::error::{JjError, Result};
use crate::graph::CommitGraph;
use crate::model::*;
use image::{Rgb, RgbImage};
use palette::{FromColor, Lch, Srgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([8, 8, 12]);
const RING: Rgb<u8> = Rgb([240, 240, 240]);

/// Allowed edge length of one graph cell, in pixels
pub const MIN_CELL: u32 = 4;
pub const MAX_CELL: u32 = 256;
/// Upper bound on the pixel count of a rendered graph
const MAX_PIXELS: u64 = 1 << 28;

/// One colour per column, the same on every run.
pub fn lane_colors(columns: usize) -> Vec<Rgb<u8>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..columns.max(1))
        .map(|_| {
            let hue = rng.gen_range(0.0f32..360.0f32);
            let color = Lch::new(70.0f32, 80.0f32, hue);
            let srgb: Srgb<f32> = Srgb::from_color(color);
            let (r, g, b) = srgb.into_components();
            Rgb([to_u8(r), to_u8(g), to_u8(b)])
        })
        .collect()
}

fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0f32) as u8
}

// ---------------------------------------------------------------------------
// Text

struct Lanes<'a> {
    colors: &'a [Rgb<u8>],
    color: bool,
    width: usize,
}

impl Lanes<'_> {
    fn paint(&self, cells: &[Option<(char, usize)>]) -> String {
        let mut out = String::with_capacity(self.width * 2);
        for cell in cells {
            match cell {
                Some((ch, col)) if self.color => {
                    let Rgb([r, g, b]) = self.colors[col % self.colors.len()];
                    let _ = write!(out, "\x1b[38;2;{r};{g};{b}m{ch}\x1b[0m ");
                }
                Some((ch, _)) => {
                    out.push(*ch);
                    out.push(' ');
                }
                None => out.push_str("  "),
            }
        }
        out
    }

    fn blank(&self) -> Vec<Option<(char, usize)>> {
        vec![None; self.width]
    }
}

/// Renders the graph in the style of `git log --graph`, one commit per line,
/// with connector lines above merges into a node and below branches out of it.
pub fn render_text(graph: &CommitGraph, layout: &GraphLayout, color: bool) -> String {
    let colors = lane_colors(layout.width());
    let lanes = Lanes {
        colors: &colors,
        color,
        width: layout.width(),
    };
    let mut out = String::new();

    for (row, commit) in layout.rows.iter().zip(graph.commits()) {
        let verticals = row
            .lines
            .iter()
            .filter(|l| l.line_type == GraphLineType::Vertical)
            .map(|l| l.from_column);

        let merges: Vec<&GraphLine> = lines_of(row, GraphLineType::MergeFrom).collect();
        if !merges.is_empty() {
            let mut cells = lanes.blank();
            for col in verticals.clone() {
                cells[col] = Some(('|', col));
            }
            for line in merges {
                let ch = if line.from_column > line.to_column { '/' } else { '\\' };
                cells[line.from_column] = Some((ch, line.from_column));
            }
            cells[row.column] = Some(('|', row.column));
            out.push_str(lanes.paint(&cells).trim_end());
            out.push('\n');
        }

        let mut cells = lanes.blank();
        for col in verticals.clone() {
            cells[col] = Some(('|', col));
        }
        cells[row.column] = Some((node_char(row.node_type), row.column));
        out.push_str(&lanes.paint(&cells));
        out.push_str(&describe(commit));
        out.push('\n');

        let branches: Vec<&GraphLine> = lines_of(row, GraphLineType::BranchTo).collect();
        if !branches.is_empty() {
            let mut cells = lanes.blank();
            for col in verticals {
                cells[col] = Some(('|', col));
            }
            cells[row.column] = Some(('|', row.column));
            for line in branches {
                let ch = if line.to_column > line.from_column { '\\' } else { '/' };
                cells[line.to_column] = Some((ch, line.to_column));
            }
            out.push_str(lanes.paint(&cells).trim_end());
            out.push('\n');
        }
    }

    out
}

fn lines_of(row: &GraphRow, kind: GraphLineType) -> impl Iterator<Item = &GraphLine> {
    row.lines.iter().filter(move |l| l.line_type == kind)
}

fn node_char(node_type: GraphNodeType) -> char {
    match node_type {
        GraphNodeType::WorkingCopy => '@',
        GraphNodeType::Merge => 'M',
        GraphNodeType::Normal => 'o',
    }
}

/// The text following the graph prefix: id, author, time, refs, description.
pub fn describe(commit: &Commit) -> String {
    let mut out = format!(
        "{} {} {}",
        commit.short_change_id(),
        commit.author_display(),
        commit.timestamp.format("%Y-%m-%d %H:%M"),
    );

    for bookmark in commit.local_bookmarks() {
        let marker = if commit.is_bookmark_synced(bookmark) { "" } else { "*" };
        let _ = write!(out, " {bookmark}{marker}");
    }
    for remote in commit.remote_only_bookmarks() {
        let _ = write!(out, " {remote}");
    }
    for tag in &commit.tags {
        let _ = write!(out, " #{tag}");
    }
    match &commit.signature {
        Some(SignatureStatus::Good) => out.push_str(" [signed]"),
        Some(SignatureStatus::Bad) => out.push_str(" [bad signature]"),
        Some(SignatureStatus::Other(status)) => {
            let _ = write!(out, " [signature: {status}]");
        }
        None => {}
    }
    if commit.is_orphaned() {
        out.push_str(" (empty)");
    }

    out.push(' ');
    out.push_str(commit.display_description());
    out
}

// ---------------------------------------------------------------------------
// PNG

/// Pixel dimensions for `layout`, or an error when they would not fit.
fn image_size(layout: &GraphLayout, cell: u32) -> Result<(u32, u32)> {
    let too_large = || {
        JjError::Render(format!(
            "{} columns x {} rows at {}px cells is too large",
            layout.width(),
            layout.rows.len(),
            cell
        ))
    };
    let columns = u32::try_from(layout.width()).map_err(|_| too_large())?;
    let rows = u32::try_from(layout.rows.len().max(1)).map_err(|_| too_large())?;
    let width = columns.checked_mul(cell).ok_or_else(too_large)?;
    let height = rows.checked_mul(cell).ok_or_else(too_large)?;
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(too_large());
    }
    Ok((width, height))
}

/// Draws `layout` with one `cell`-pixel square per column and row.
///
/// `cell` is clamped to `MIN_CELL..=MAX_CELL`.
pub fn render_image(layout: &GraphLayout, cell: u32) -> Result<RgbImage> {
    let cell = cell.clamp(MIN_CELL, MAX_CELL);
    let (width, height) = image_size(layout, cell)?;
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
    let colors = lane_colors(layout.width());
    let color = |col: usize| colors[col % colors.len()];

    let half = cell as i64 / 2;
    for (r, row) in layout.rows.iter().enumerate() {
        let top = r as i64 * cell as i64;
        let mid = top + half;
        let bottom = top + cell as i64;
        let x = |col: usize| col as i64 * cell as i64 + half;

        for line in &row.lines {
            let (from, to) = (x(line.from_column), x(line.to_column));
            match line.line_type {
                GraphLineType::Vertical => {
                    draw_line(&mut image, (from, top), (from, bottom), color(line.from_column))
                }
                GraphLineType::MergeFrom => {
                    draw_line(&mut image, (from, top), (to, mid), color(line.from_column))
                }
                GraphLineType::BranchTo => {
                    draw_line(&mut image, (from, mid), (to, bottom), color(line.to_column))
                }
            }
        }

        let cx = x(row.column);
        if row.has_children {
            draw_line(&mut image, (cx, top), (cx, mid), color(row.column));
        }
        if row.has_parents {
            draw_line(&mut image, (cx, mid), (cx, bottom), color(row.column));
        }

        let radius = (cell as i64 / 4).max(2);
        match row.node_type {
            GraphNodeType::WorkingCopy => {
                fill_circle(&mut image, (cx, mid), radius + 2, RING);
                fill_circle(&mut image, (cx, mid), radius, color(row.column));
            }
            GraphNodeType::Merge => {
                fill_circle(&mut image, (cx, mid), radius, color(row.column));
                fill_circle(&mut image, (cx, mid), radius / 2, BACKGROUND);
            }
            GraphNodeType::Normal => fill_circle(&mut image, (cx, mid), radius, color(row.column)),
        }
    }

    Ok(image)
}

/// Renders the layout and writes it as an image; format follows the extension.
pub fn save_png(layout: &GraphLayout, cell: u32, path: &Path) -> Result<()> {
    render_image(layout, cell)?
        .save(path)
        .map_err(|e| JjError::Render(format!("{}: {}", path.display(), e)))
}

fn put(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham, two pixels wide.
fn draw_line(image: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(image, x0, y0, color);
        put(image, x0 + 1, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn fill_circle(image: &mut RgbImage, center: (i64, i64), radius: i64, color: Rgb<u8>) {
    let (cx, cy) = center;
    for y in -radius..=radius {
        for x in -radius..=radius {
            if x * x + y * y <= radius * radius {
                put(image, cx + x, cy + y, color);
            }
        }
    }
}
