//! Point sampling of a source band at fractional cell positions
//!
//! Positions are continuous (row, col) coordinates from
//! [`GridGeometry::world_to_fractional`](gridzone_core::GridGeometry::world_to_fractional):
//! integers are cell corners and cell `i` spans `[i, i + 1)`.

use gridzone_core::RasterElement;
use ndarray::ArrayView2;

/// Result of sampling one position
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Sample<T> {
    /// Position is outside the source grid
    Outside,
    /// Position is inside but no valid value could be produced
    NoData,
    Value(T),
}

/// Whether a fractional position lies on the source grid, outer edge included
fn on_grid(band: &ArrayView2<'_, impl RasterElement>, row_f: f64, col_f: f64) -> bool {
    let (rows, cols) = band.dim();
    (0.0..=rows as f64).contains(&row_f) && (0.0..=cols as f64).contains(&col_f)
}

/// Index of the nearest cell center along one axis.
///
/// Centers sit at `i + 0.5`; at an exact midpoint the lower index wins, and
/// the outer edge maps onto the edge cell.
fn nearest_index(pos: f64, n: usize) -> usize {
    ((pos - 1.0).ceil().max(0.0) as usize).min(n - 1)
}

/// Nearest-neighbor sample
pub(crate) fn nearest<T: RasterElement>(
    band: &ArrayView2<'_, T>,
    nodata: Option<T>,
    row_f: f64,
    col_f: f64,
) -> Sample<T> {
    if !on_grid(band, row_f, col_f) {
        return Sample::Outside;
    }
    let (rows, cols) = band.dim();
    let value = band[[nearest_index(row_f, rows), nearest_index(col_f, cols)]];
    if value.is_nodata(nodata) {
        Sample::NoData
    } else {
        Sample::Value(value)
    }
}

/// Bilinear sample over the four surrounding cell centers.
///
/// Any neighbor with a non-zero weight that is off the grid or no-data
/// makes the sample no-data. Integer types round the interpolated value.
pub(crate) fn bilinear<T: RasterElement>(
    band: &ArrayView2<'_, T>,
    nodata: Option<T>,
    row_f: f64,
    col_f: f64,
) -> Sample<T> {
    if !on_grid(band, row_f, col_f) {
        return Sample::Outside;
    }

    // Shift so that integer positions are cell centers
    let p = row_f - 0.5;
    let q = col_f - 0.5;
    let r0 = p.floor();
    let c0 = q.floor();
    let fr = p - r0;
    let fc = q - c0;

    let corners = [
        (r0, c0, (1.0 - fr) * (1.0 - fc)),
        (r0, c0 + 1.0, (1.0 - fr) * fc),
        (r0 + 1.0, c0, fr * (1.0 - fc)),
        (r0 + 1.0, c0 + 1.0, fr * fc),
    ];

    let (rows, cols) = band.dim();
    let mut acc = 0.0;
    for (r, c, w) in corners {
        if w == 0.0 {
            continue;
        }
        if r < 0.0 || c < 0.0 || r >= rows as f64 || c >= cols as f64 {
            return Sample::NoData;
        }
        let value = band[[r as usize, c as usize]];
        if value.is_nodata(nodata) {
            return Sample::NoData;
        }
        match value.to_f64() {
            Some(v) => acc += w * v,
            None => return Sample::NoData,
        }
    }

    match T::from_f64(acc) {
        Some(v) => Sample::Value(v),
        None => Sample::NoData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_nearest_index_ties_and_edges() {
        assert_eq!(nearest_index(0.0, 4), 0);
        assert_eq!(nearest_index(0.5, 4), 0);
        assert_eq!(nearest_index(1.0, 4), 0);
        assert_eq!(nearest_index(1.2, 4), 1);
        assert_eq!(nearest_index(2.0, 4), 1);
        assert_eq!(nearest_index(4.0, 4), 3);
    }

    #[test]
    fn test_nearest_outside() {
        let band = array![[1.0, 2.0], [3.0, 4.0]];
        let view = band.view();
        assert_eq!(nearest(&view, None, -0.1, 1.0), Sample::Outside);
        assert_eq!(nearest(&view, None, 1.0, 2.1), Sample::Outside);
        assert_eq!(nearest(&view, None, 2.0, 2.0), Sample::Value(4.0));
    }

    #[test]
    fn test_bilinear_center_and_exact() {
        let band = array![[0.0, 10.0], [20.0, 30.0]];
        let view = band.view();
        assert_eq!(bilinear(&view, None, 1.0, 1.0), Sample::Value(15.0));
        // Exactly on a cell center: no interpolation
        assert_eq!(bilinear(&view, None, 0.5, 1.5), Sample::Value(10.0));
        // Half a cell from the edge still needs an off-grid neighbor
        assert_eq!(bilinear(&view, None, 0.25, 1.0), Sample::NoData);
    }

    #[test]
    fn test_bilinear_nodata_neighbor() {
        let band = array![[0.0, -1.0], [20.0, 30.0]];
        let view = band.view();
        assert_eq!(bilinear(&view, Some(-1.0), 1.0, 1.0), Sample::NoData);
        // Zero weight on the no-data cell
        assert_eq!(bilinear(&view, Some(-1.0), 1.5, 1.0), Sample::Value(25.0));
    }

    #[test]
    fn test_bilinear_integer_rounding() {
        let band = array![[0_u8, 1], [2, 4]];
        let view = band.view();
        assert_eq!(bilinear(&view, None, 1.0, 1.0), Sample::Value(2_u8));
    }
}
