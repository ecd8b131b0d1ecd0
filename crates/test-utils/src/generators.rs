//! Test data generators for creating synthetic raster bands.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read, windowed and
/// flipped correctly by checking that grid[row][col] == col * 1000 + row.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
///
/// # Returns
///
/// A `Vec<f64>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Creates a grid where each cell holds its own row-major index.
///
/// Useful as a second band with values distinct from [`create_test_grid`].
pub fn create_index_grid(width: usize, height: usize) -> Vec<f64> {
    (0..width * height).map(|i| i as f64).collect()
}

/// Creates an elevation-like grid with a smooth diagonal gradient.
///
/// Values run from `base` at the top-left corner to `base + range` at the
/// bottom-right corner, which gives interpolating resamplers something
/// non-constant to chew on.
pub fn create_gradient_grid(width: usize, height: usize, base: f64, range: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    let span = (width + height).max(2) as f64 - 2.0;
    for row in 0..height {
        for col in 0..width {
            let t = (col + row) as f64 / span.max(1.0);
            data.push(base + t * range);
        }
    }
    data
}

/// Creates a grid filled with a single value.
pub fn create_constant_grid(width: usize, height: usize, value: f64) -> Vec<f64> {
    vec![value; width * height]
}

/// Creates a test grid with specific cells set to a nodata value.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `nodata` - The value to punch into the listed cells
/// * `cells` - List of (col, row) positions to mark as nodata
pub fn create_grid_with_nodata(
    width: usize,
    height: usize,
    nodata: f64,
    cells: &[(usize, usize)],
) -> Vec<f64> {
    let mut data = create_test_grid(width, height);
    for &(col, row) in cells {
        if col < width && row < height {
            data[row * width + col] = nodata;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(10, 5);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[1], 1000.0);
        assert_eq!(grid[10], 1.0);
        assert_eq!(grid[4 * 10 + 9], 9004.0);
    }

    #[test]
    fn test_create_index_grid() {
        let grid = create_index_grid(4, 3);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[11], 11.0);
    }

    #[test]
    fn test_create_gradient_grid() {
        let grid = create_gradient_grid(10, 10, 100.0, 50.0);
        assert_eq!(grid[0], 100.0);
        let last = grid[99];
        assert!((last - 150.0).abs() < 1e-9);
        // Monotone along the diagonal
        assert!(grid[0] < grid[11]);
    }

    #[test]
    fn test_create_constant_grid() {
        let grid = create_constant_grid(10, 10, 42.0);
        assert_eq!(grid.len(), 100);
        assert!(grid.iter().all(|&v| v == 42.0));
    }

    #[test]
    fn test_create_grid_with_nodata() {
        let grid = create_grid_with_nodata(10, 10, -9999.0, &[(5, 5), (0, 0)]);
        assert_eq!(grid[0], -9999.0);
        assert_eq!(grid[55], -9999.0);
        assert_eq!(grid[1], 1000.0);
    }
}
