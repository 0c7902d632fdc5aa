//! Arena layouts loaded from JSON map files.

use std::{fs, path::Path};

use ctf_core::{GridCell, TilePosition};
use glam::Vec2;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading an arena map.
#[derive(Debug, Error)]
pub enum MapError {
    /// The map file could not be read.
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),

    /// The map file is not valid JSON or misses required fields.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The map declares a zero-sized grid.
    #[error("map must be at least one tile wide and tall, got {width}x{height}")]
    EmptyGrid {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },

    /// The number of box rows differs from the declared height.
    #[error("expected {expected} box rows, found {found}")]
    RowCount {
        /// Declared height.
        expected: u32,
        /// Rows present in the file.
        found: usize,
    },

    /// A box row is not as long as the declared width.
    #[error("box row {row} has {found} entries, expected {expected}")]
    RowWidth {
        /// Offending row.
        row: usize,
        /// Declared width.
        expected: u32,
        /// Entries present in the row.
        found: usize,
    },

    /// A box code is not one of the known obstacle kinds.
    #[error("unknown box code {code} at ({x}, {y})")]
    UnknownBox {
        /// Code found in the file.
        code: u8,
        /// Column of the box.
        x: u32,
        /// Row of the box.
        y: u32,
    },

    /// The map declares no tank starting positions.
    #[error("map declares no tank starting positions")]
    NoTanks,

    /// A start position lies outside the grid or on an obstacle.
    #[error("{what} start ({x}, {y}) is not on open ground")]
    BlockedStart {
        /// Which entity the start belongs to.
        what: &'static str,
        /// Horizontal coordinate.
        x: f32,
        /// Vertical coordinate.
        y: f32,
    },
}

/// Starting pose of a tank, which doubles as its home base.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TankStart {
    /// Body centre in tile units.
    pub position: Vec2,
    /// Initial heading in radians.
    pub heading: f32,
}

impl TankStart {
    /// Tile that acts as the tank's home base.
    #[must_use]
    pub fn home_tile(&self) -> TilePosition {
        TilePosition::containing(self.position)
    }
}

/// Immutable description of an arena's initial layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaMap {
    width: u32,
    height: u32,
    cells: Vec<GridCell>,
    tank_starts: Vec<TankStart>,
    flag_start: Vec2,
}

#[derive(Debug, Deserialize)]
struct MapFile {
    width: u32,
    height: u32,
    boxes: Vec<Vec<u8>>,
    tanks_start: Vec<[f32; 3]>,
    flag_start: [f32; 2],
}

impl ArenaMap {
    /// Parses a map from its JSON representation.
    ///
    /// Box rows are listed from the top of the arena; tank angles are given in
    /// degrees.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let file: MapFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    /// Reads and parses a JSON map file.
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn from_file(file: MapFile) -> Result<Self, MapError> {
        let MapFile {
            width,
            height,
            boxes,
            tanks_start,
            flag_start,
        } = file;

        if width == 0 || height == 0 {
            return Err(MapError::EmptyGrid { width, height });
        }
        if boxes.len() != height as usize {
            return Err(MapError::RowCount {
                expected: height,
                found: boxes.len(),
            });
        }

        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for (row, codes) in boxes.iter().enumerate() {
            if codes.len() != width as usize {
                return Err(MapError::RowWidth {
                    row,
                    expected: width,
                    found: codes.len(),
                });
            }
            for (column, &code) in codes.iter().enumerate() {
                let cell = box_cell(code).ok_or(MapError::UnknownBox {
                    code,
                    x: column as u32,
                    y: row as u32,
                })?;
                cells.push(cell);
            }
        }

        if tanks_start.is_empty() {
            return Err(MapError::NoTanks);
        }

        let map = Self {
            width,
            height,
            cells,
            tank_starts: tanks_start
                .iter()
                .map(|&[x, y, degrees]| TankStart {
                    position: Vec2::new(x, y),
                    heading: degrees.to_radians(),
                })
                .collect(),
            flag_start: Vec2::from(flag_start),
        };

        for start in &map.tank_starts {
            map.ensure_open(start.position, "tank")?;
        }
        map.ensure_open(map.flag_start, "flag")?;

        Ok(map)
    }

    fn ensure_open(&self, position: Vec2, what: &'static str) -> Result<(), MapError> {
        let inside = position.x >= 0.0
            && position.y >= 0.0
            && position.x < self.width as f32
            && position.y < self.height as f32;
        if inside && self.cell(TilePosition::containing(position)) == Some(GridCell::Open) {
            Ok(())
        } else {
            Err(MapError::BlockedStart {
                what,
                x: position.x,
                y: position.y,
            })
        }
    }

    /// Number of tile columns.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Initial content of every tile in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Initial content of a single tile, if it lies within the grid.
    #[must_use]
    pub fn cell(&self, tile: TilePosition) -> Option<GridCell> {
        if tile.x() >= self.width || tile.y() >= self.height {
            return None;
        }
        let index = tile.y() as usize * self.width as usize + tile.x() as usize;
        self.cells.get(index).copied()
    }

    /// Starting poses of every tank, in tank id order.
    #[must_use]
    pub fn tank_starts(&self) -> &[TankStart] {
        &self.tank_starts
    }

    /// Initial flag position.
    #[must_use]
    pub fn flag_start(&self) -> Vec2 {
        self.flag_start
    }

    /// Nine-by-nine arena with four corner bases used when no map is supplied.
    ///
    /// Rock walls break every line of fire between bases. The flag chamber
    /// opens to the north and east only, so the northern bases have short
    /// walled lanes and the southern bases share a longer approach through
    /// the gate at (6, 5).
    #[must_use]
    pub fn builtin() -> Self {
        let rows: [[GridCell; 9]; 9] = {
            use GridCell::{Breakable as W, Open as O, Unbreakable as R};
            [
                [O, O, O, O, O, R, W, R, O],
                [R, R, R, R, O, R, W, W, O],
                [O, W, O, R, O, R, R, W, O],
                [O, O, W, R, O, R, W, R, O],
                [O, O, O, R, O, O, O, O, O],
                [O, W, R, W, R, R, O, R, R],
                [O, O, O, O, O, O, O, R, O],
                [O, R, W, O, W, R, O, R, O],
                [O, W, R, R, W, O, O, O, O],
            ]
        };

        Self {
            width: 9,
            height: 9,
            cells: rows.iter().flatten().copied().collect(),
            tank_starts: vec![
                TankStart {
                    position: Vec2::new(0.5, 0.5),
                    heading: 0.0,
                },
                TankStart {
                    position: Vec2::new(8.5, 0.5),
                    heading: 0.0,
                },
                TankStart {
                    position: Vec2::new(0.5, 8.5),
                    heading: std::f32::consts::PI,
                },
                TankStart {
                    position: Vec2::new(8.5, 8.5),
                    heading: std::f32::consts::PI,
                },
            ],
            flag_start: Vec2::new(4.5, 4.5),
        }
    }
}

/// Maps a box code from the map file onto a grid cell.
///
/// Rock (1) and metal (3) are both indestructible; wood (2) breaks.
fn box_cell(code: u8) -> Option<GridCell> {
    match code {
        0 => Some(GridCell::Open),
        1 | 3 => Some(GridCell::Unbreakable),
        2 => Some(GridCell::Breakable),
        _ => None,
    }
}
