//! Level Grid
//!
//! Fixed-size, row-major grid of tile types built from level text.
//! Queries never fail: anything outside the grid reads as `Void`.

use serde::{Serialize, Deserialize};

use crate::game::tile::TileType;

/// Cell coordinate. Signed so that queries left of or above the grid are
/// representable (and read as `Void`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    /// Row index (0 = top)
    pub row: i32,
    /// Column index (0 = left)
    pub col: i32,
}

impl CellCoord {
    /// Create a new cell coordinate.
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Cell containing a world point.
    ///
    /// Non-finite coordinates map to a cell that is out of bounds for any
    /// grid.
    #[inline]
    pub fn from_world(px: f64, py: f64, tile_size: f64) -> Self {
        Self {
            row: world_to_index(py, tile_size),
            col: world_to_index(px, tile_size),
        }
    }

    /// World-space x of this cell's left edge.
    #[inline]
    pub fn left(self, tile_size: f64) -> f64 {
        self.col as f64 * tile_size
    }

    /// World-space y of this cell's top edge.
    #[inline]
    pub fn top(self, tile_size: f64) -> f64 {
        self.row as f64 * tile_size
    }
}

#[inline]
fn world_to_index(p: f64, tile_size: f64) -> i32 {
    let cell = (p / tile_size).floor();
    if cell.is_finite() {
        // `as` saturates, which keeps huge values out of bounds
        cell as i32
    } else {
        i32::MIN
    }
}

/// What the parser had to fix while reading level text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Characters that were not a tile digit (stored as Void)
    pub unknown_chars: usize,
    /// Characters dropped past the last column
    pub overflow_chars: usize,
    /// Lines dropped past the last row
    pub overflow_rows: usize,
}

impl ParseReport {
    /// Did the text fit the grid exactly with only known digits?
    pub fn is_clean(&self) -> bool {
        self.unknown_chars == 0 && self.overflow_chars == 0 && self.overflow_rows == 0
    }
}

/// Row-major tile grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelGrid {
    rows: usize,
    cols: usize,
    tiles: Vec<TileType>,
}

impl LevelGrid {
    /// Create an all-Void grid.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            tiles: vec![TileType::Void; rows * cols],
        }
    }

    /// Parse level text into a `rows × cols` grid.
    ///
    /// `\n`, `\r` and `\r\n` each end a line. Characters past `cols` are
    /// dropped until the next line break, lines past `rows` are ignored and
    /// anything that is not a tile digit becomes Void.
    pub fn parse(text: &str, rows: usize, cols: usize) -> Self {
        Self::parse_with_report(text, rows, cols).0
    }

    /// Parse, also reporting what had to be substituted or dropped.
    pub fn parse_with_report(text: &str, rows: usize, cols: usize) -> (Self, ParseReport) {
        let mut grid = Self::empty(rows, cols);
        let mut report = ParseReport::default();

        let mut row = 0usize;
        let mut col = 0usize;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch == '\r' || ch == '\n' {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row += 1;
                col = 0;
                continue;
            }

            if row >= rows {
                // Count each dropped line once, at its first character
                if col == 0 {
                    report.overflow_rows += 1;
                }
                col += 1;
                continue;
            }

            if col >= cols {
                report.overflow_chars += 1;
                continue;
            }

            let tile = match TileType::from_digit(ch) {
                Some(tile) => tile,
                None => {
                    report.unknown_chars += 1;
                    TileType::Void
                }
            };
            grid.tiles[row * cols + col] = tile;
            col += 1;
        }

        (grid, report)
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index(&self, cell: CellCoord) -> Option<usize> {
        let row = usize::try_from(cell.row).ok()?;
        let col = usize::try_from(cell.col).ok()?;
        if row < self.rows && col < self.cols {
            Some(row * self.cols + col)
        } else {
            None
        }
    }

    /// Is the cell inside the grid?
    #[inline]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Tile at a cell. Void outside the grid.
    #[inline]
    pub fn tile_at(&self, cell: CellCoord) -> TileType {
        self.index(cell)
            .map(|i| self.tiles[i])
            .unwrap_or(TileType::Void)
    }

    /// Cell under a world point, or `None` outside the grid.
    #[inline]
    pub fn cell_at_world_point(&self, px: f64, py: f64, tile_size: f64) -> Option<CellCoord> {
        let cell = CellCoord::from_world(px, py, tile_size);
        self.contains(cell).then_some(cell)
    }

    /// Tile under a world point. Void outside the grid.
    #[inline]
    pub fn tile_at_world_point(&self, px: f64, py: f64, tile_size: f64) -> TileType {
        self.tile_at(CellCoord::from_world(px, py, tile_size))
    }

    /// Replace a tile. Returns false (and does nothing) outside the grid.
    pub fn set_tile(&mut self, cell: CellCoord, tile: TileType) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    /// Count tiles of one type.
    pub fn count(&self, tile: TileType) -> usize {
        self.tiles.iter().filter(|t| **t == tile).count()
    }

    /// Iterate all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, TileType)> + '_ {
        let cols = self.cols;
        self.tiles.iter().enumerate().map(move |(i, tile)| {
            (CellCoord::new((i / cols) as i32, (i % cols) as i32), *tile)
        })
    }

    /// Render rows back to level text (one string per row).
    pub fn to_rows(&self) -> Vec<String> {
        if self.cols == 0 {
            return vec![String::new(); self.rows];
        }
        self.tiles
            .chunks(self.cols)
            .map(|row| row.iter().map(|t| t.digit()).collect())
            .collect()
    }
}
