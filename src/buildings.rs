//! Obstruction grid construction.
//!
//! Generates a deterministic rectangular grid of axis-aligned building boxes
//! with uniform street gaps between them. The boxes are registered with the
//! simulation engine for propagation purposes and exported for plotting;
//! within this module they are purely geometric.

use serde::{Deserialize, Serialize};

/// Dimensions of the obstruction grid.
///
/// Rows advance along the Y axis, columns along the X axis, with the grid
/// origin at (0, 0). All lengths are in meters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    /// Number of building rows (Y direction)
    pub rows: u32,
    /// Number of building columns (X direction)
    pub columns: u32,
    /// Building footprint along X
    pub building_width_x: f64,
    /// Building footprint along Y
    pub building_width_y: f64,
    /// Building height
    pub building_height: f64,
    /// Gap between neighboring buildings
    pub street_width: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            rows: 4,
            columns: 4,
            building_width_x: 70.0,
            building_width_y: 70.0,
            building_height: 10.0,
            street_width: 10.0,
        }
    }
}

impl GridSpec {
    /// Validate the grid dimensions.
    ///
    /// Every count and length must be strictly positive; there is no
    /// recovery for a degenerate grid, the caller has to supply a valid
    /// configuration.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.rows == 0 {
            return Err(GridError::NonPositiveDimension { name: "rows", value: 0.0 });
        }
        if self.columns == 0 {
            return Err(GridError::NonPositiveDimension { name: "columns", value: 0.0 });
        }
        for (name, value) in [
            ("building_width_x", self.building_width_x),
            ("building_width_y", self.building_width_y),
            ("building_height", self.building_height),
            ("street_width", self.street_width),
        ] {
            if !(value > 0.0) {
                return Err(GridError::NonPositiveDimension { name, value });
            }
        }
        Ok(())
    }

    /// Total covered extent along X, streets included between buildings but
    /// not past the outermost column.
    pub fn covered_width(&self) -> f64 {
        self.columns as f64 * (self.building_width_x + self.street_width) - self.street_width
    }

    /// Total covered extent along Y.
    pub fn covered_height(&self) -> f64 {
        self.rows as f64 * (self.building_width_y + self.street_width) - self.street_width
    }

    /// Area of the covered rectangle.
    pub fn total_area(&self) -> f64 {
        self.covered_width() * self.covered_height()
    }
}

/// Axis-aligned building box.
///
/// Created once per grid generation pass and never mutated afterwards.
/// Boxes from the same pass are pairwise non-overlapping.
#[derive(Debug, Clone, Serialize)]
pub struct Obstruction {
    /// Sequential identifier, unique within one grid pass
    pub id: u32,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
    /// Number of floors (always one for this grid)
    pub floor_count: u8,
    /// Room subdivision along X
    pub room_grid_x: u8,
    /// Room subdivision along Y
    pub room_grid_y: u8,
}

impl Obstruction {
    /// True if this box shares interior volume with `other`.
    pub fn overlaps(&self, other: &Obstruction) -> bool {
        self.x_min < other.x_max
            && other.x_min < self.x_max
            && self.y_min < other.y_max
            && other.y_min < self.y_max
            && self.z_min < other.z_max
            && other.z_min < self.z_max
    }
}

/// Grid construction errors
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("grid dimension '{name}' must be positive (got {value})")]
    NonPositiveDimension { name: &'static str, value: f64 },
}

/// Build the obstruction grid described by `spec`.
///
/// Produces exactly `rows * columns` boxes with sequential ids starting at 0,
/// one floor and a 1x1 room subdivision each.
///
/// # Returns
/// The obstruction list, or a `GridError` if any dimension is non-positive.
pub fn build_grid(spec: &GridSpec) -> Result<Vec<Obstruction>, GridError> {
    spec.validate()?;

    let mut obstructions = Vec::with_capacity((spec.rows * spec.columns) as usize);
    let mut id = 0u32;
    for row in 0..spec.rows {
        let y_min = row as f64 * (spec.building_width_y + spec.street_width);
        for column in 0..spec.columns {
            let x_min = column as f64 * (spec.building_width_x + spec.street_width);
            let obstruction = Obstruction {
                id,
                x_min,
                x_max: x_min + spec.building_width_x,
                y_min,
                y_max: y_min + spec.building_width_y,
                z_min: 0.0,
                z_max: spec.building_height,
                floor_count: 1,
                room_grid_x: 1,
                room_grid_y: 1,
            };
            log::debug!(
                "created building {} between ({}, {}) and ({}, {}) with height {} m",
                obstruction.id,
                obstruction.x_min,
                obstruction.y_min,
                obstruction.x_max,
                obstruction.y_max,
                obstruction.z_max - obstruction.z_min
            );
            obstructions.push(obstruction);
            id += 1;
        }
    }

    log::info!(
        "built {} obstructions covering {:.0} x {:.0} m ({:.0} m^2)",
        obstructions.len(),
        spec.covered_width(),
        spec.covered_height(),
        spec.total_area()
    );
    Ok(obstructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_count_matches_dimensions() {
        let spec = GridSpec { rows: 3, columns: 5, ..GridSpec::default() };
        let grid = build_grid(&spec).unwrap();
        assert_eq!(grid.len(), 15);

        // Sequential ids
        for (i, b) in grid.iter().enumerate() {
            assert_eq!(b.id, i as u32);
            assert_eq!(b.floor_count, 1);
            assert_eq!(b.room_grid_x, 1);
            assert_eq!(b.room_grid_y, 1);
        }
    }

    #[test]
    fn test_grid_is_pairwise_non_overlapping() {
        let grid = build_grid(&GridSpec::default()).unwrap();
        for a in &grid {
            for b in &grid {
                if a.id != b.id {
                    assert!(!a.overlaps(b), "buildings {} and {} overlap", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn test_total_area_formula() {
        let spec = GridSpec { rows: 4, columns: 4, ..GridSpec::default() };
        // 4 * (70 + 10) - 10 = 310 on both axes
        assert_eq!(spec.covered_width(), 310.0);
        assert_eq!(spec.covered_height(), 310.0);
        assert_eq!(spec.total_area(), 310.0 * 310.0);

        let wide = GridSpec { rows: 2, columns: 6, ..GridSpec::default() };
        assert_eq!(
            wide.total_area(),
            (6.0 * 80.0 - 10.0) * (2.0 * 80.0 - 10.0)
        );
    }

    #[test]
    fn test_non_positive_dimensions_rejected() {
        let zero_rows = GridSpec { rows: 0, ..GridSpec::default() };
        assert!(build_grid(&zero_rows).is_err());

        let zero_width = GridSpec { building_width_x: 0.0, ..GridSpec::default() };
        assert!(matches!(
            build_grid(&zero_width),
            Err(GridError::NonPositiveDimension { name: "building_width_x", .. })
        ));

        let negative_street = GridSpec { street_width: -1.0, ..GridSpec::default() };
        assert!(build_grid(&negative_street).is_err());
    }

    #[test]
    fn test_grid_is_deterministic() {
        let spec = GridSpec::default();
        let a = build_grid(&spec).unwrap();
        let b = build_grid(&spec).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.x_min, y.x_min);
            assert_eq!(x.y_min, y.y_min);
            assert_eq!(x.x_max, y.x_max);
            assert_eq!(x.y_max, y.y_max);
        }
    }
}
