use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rectangular extent of the environment, in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp a point into `[0, width] x [0, height]`.
    ///
    /// A negative or NaN side collapses to 0, so every coordinate on that
    /// axis maps to 0.
    pub fn clamp(&self, position: [f64; 2]) -> [f64; 2] {
        [
            position[0].clamp(0.0, self.width.max(0.0)),
            position[1].clamp(0.0, self.height.max(0.0)),
        ]
    }

    pub fn contains(&self, position: [f64; 2]) -> bool {
        (0.0..=self.width).contains(&position[0]) && (0.0..=self.height).contains(&position[1])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Nutrient,
    Toxicity,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Nutrient => "nutrient",
            FieldKind::Toxicity => "toxicity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("grid_size must be positive")]
    EmptyGrid,
    #[error("expected {expected} cells for the grid, found {actual}")]
    CellCount { expected: usize, actual: usize },
    #[error("cell dimensions must be finite and positive (got {width} x {height})")]
    CellSize { width: f64, height: f64 },
    #[error("base level must be finite and non-negative (got {0})")]
    Base(f64),
}

/// Square grid of non-negative concentrations stretched over an [`Extent`].
/// Each cell holds one value; cells are row-major (`y * grid_size + x`).
///
/// Deserialization checks that the cell data matches the grid shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldRepr")]
pub struct Field {
    kind: FieldKind,
    base: f64,
    grid_size: usize,
    cell_width: f64,
    cell_height: f64,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct FieldRepr {
    kind: FieldKind,
    base: f64,
    grid_size: usize,
    cell_width: f64,
    cell_height: f64,
    data: Vec<f64>,
}

impl TryFrom<FieldRepr> for Field {
    type Error = FieldError;

    fn try_from(repr: FieldRepr) -> Result<Self, FieldError> {
        if repr.grid_size == 0 {
            return Err(FieldError::EmptyGrid);
        }
        let expected = repr.grid_size.checked_mul(repr.grid_size);
        if expected != Some(repr.data.len()) {
            return Err(FieldError::CellCount {
                expected: expected.unwrap_or(usize::MAX),
                actual: repr.data.len(),
            });
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(repr.cell_width) || !positive(repr.cell_height) {
            return Err(FieldError::CellSize {
                width: repr.cell_width,
                height: repr.cell_height,
            });
        }
        if !repr.base.is_finite() || repr.base < 0.0 {
            return Err(FieldError::Base(repr.base));
        }
        Ok(Self {
            kind: repr.kind,
            base: repr.base,
            grid_size: repr.grid_size,
            cell_width: repr.cell_width,
            cell_height: repr.cell_height,
            data: repr.data,
        })
    }
}

impl Field {
    pub const DEFAULT_GRID_SIZE: usize = 20;

    const RICH_CHANCE: f64 = 0.1;
    const POOR_CHANCE: f64 = 0.1;
    const HOTSPOT_CHANCE: f64 = 0.05;

    /// Build a fresh grid around `base`.
    ///
    /// Every cell starts at `base * (0.5 + u)` with `u` uniform in `[0, 1)`.
    /// Nutrient cells are then doubled with 10% probability ("rich") or, failing
    /// that, halved with 10% probability ("poor"). Toxicity cells are tripled
    /// with 5% probability ("hotspot").
    pub fn generate<R: Rng + ?Sized>(
        base: f64,
        kind: FieldKind,
        extent: Extent,
        grid_size: usize,
        rng: &mut R,
    ) -> Self {
        debug_assert!(grid_size > 0, "grid_size must be positive");
        debug_assert!(base >= 0.0, "field base level cannot be negative");
        let grid_size = grid_size.max(1);
        let mut data = Vec::with_capacity(grid_size * grid_size);
        for _ in 0..grid_size * grid_size {
            let mut value = base * (0.5 + rng.random::<f64>());
            match kind {
                FieldKind::Nutrient => {
                    if rng.random::<f64>() < Self::RICH_CHANCE {
                        value *= 2.0;
                    } else if rng.random::<f64>() < Self::POOR_CHANCE {
                        value *= 0.5;
                    }
                }
                FieldKind::Toxicity => {
                    if rng.random::<f64>() < Self::HOTSPOT_CHANCE {
                        value *= 3.0;
                    }
                }
            }
            data.push(value);
        }
        Self {
            kind,
            base,
            grid_size,
            cell_width: extent.width / grid_size as f64,
            cell_height: extent.height / grid_size as f64,
            data,
        }
    }

    /// Value of the cell covering `(x, y)`.
    ///
    /// Total over every input: positions outside the extent land in the
    /// nearest edge cell, and NaN coordinates resolve to cell 0.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let cx = Self::cell_index(x, self.cell_width, self.grid_size);
        let cy = Self::cell_index(y, self.cell_height, self.grid_size);
        self.data[cy * self.grid_size + cx]
    }

    fn cell_index(coord: f64, cell_len: f64, grid_size: usize) -> usize {
        let max = (grid_size - 1) as f64;
        // `as usize` saturates and maps NaN to 0.
        (coord / cell_len).floor().clamp(0.0, max) as usize
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Base level the grid was generated from.
    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    pub fn cell_height(&self) -> f64 {
        self.cell_height
    }

    /// Cell value by grid coordinate, `None` outside the grid.
    pub fn cell(&self, cx: usize, cy: usize) -> Option<f64> {
        if cx >= self.grid_size || cy >= self.grid_size {
            return None;
        }
        self.data.get(cy * self.grid_size + cx).copied()
    }

    /// Iterate `(cx, cy, value)` over all cells.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.grid_size;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % n, i / n, v))
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        self.total() / self.data.len() as f64
    }
}
