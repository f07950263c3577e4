//! Catalogue builders shared by the integration tests

use masterlist_io::{Catalogue, Column, DataColumn};

/// Degrees per arcsecond
pub const ARCSEC: f64 = 1.0 / 3600.0;

/// Catalogue with an integer id column and the given position columns
pub fn catalogue_with(
    id_col: &str,
    ra_col: &str,
    dec_col: &str,
    positions: &[(f64, f64)],
) -> Catalogue {
    let ids = (0..positions.len() as i64).collect();
    Catalogue::from_columns(vec![
        Column::new(id_col, DataColumn::Int64(ids)),
        Column::new(ra_col, DataColumn::Float64(positions.iter().map(|p| p.0).collect())),
        Column::new(dec_col, DataColumn::Float64(positions.iter().map(|p| p.1).collect())),
    ])
    .unwrap_or_else(|e| panic!("Failed to build catalogue: {}", e))
}

/// Master catalogue with `id`, `ra` and `dec`
pub fn master(positions: &[(f64, f64)]) -> Catalogue {
    catalogue_with("id", "ra", "dec", positions)
}

/// Second catalogue with `id_2`, `ra_2` and `dec_2`
#[allow(dead_code)]
pub fn other(positions: &[(f64, f64)]) -> Catalogue {
    catalogue_with("id_2", "ra_2", "dec_2", positions)
}

/// Integer column values, `None` where masked
#[allow(dead_code)]
pub fn int_values(catalogue: &Catalogue, name: &str) -> Vec<Option<i64>> {
    let column = catalogue
        .column(name)
        .unwrap_or_else(|_| panic!("Missing column: {}", name));
    match &column.data {
        DataColumn::Int64(values) => values
            .iter()
            .enumerate()
            .map(|(row, &v)| (!column.is_masked(row)).then_some(v))
            .collect(),
        other => panic!("Column {} is not int64: {:?}", name, other.dtype()),
    }
}

/// Boolean column values; masked cells read as `None`
pub fn bool_values(catalogue: &Catalogue, name: &str) -> Vec<Option<bool>> {
    let column = catalogue
        .column(name)
        .unwrap_or_else(|_| panic!("Missing column: {}", name));
    match column.data.as_bool() {
        Some(values) => values
            .iter()
            .enumerate()
            .map(|(row, &v)| (!column.is_masked(row)).then_some(v))
            .collect(),
        None => panic!("Column {} is not boolean", name),
    }
}

/// Boolean column values, panicking on masked cells
pub fn flags(catalogue: &Catalogue, name: &str) -> Vec<bool> {
    bool_values(catalogue, name)
        .into_iter()
        .map(|v| v.unwrap_or_else(|| panic!("Masked cell in {}", name)))
        .collect()
}

/// Small deterministic field of positions, clustered enough to produce pairs
#[allow(dead_code)]
pub fn scattered(n: usize, seed: u64, extent_arcsec: f64) -> Vec<(f64, f64)> {
    let mut state = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut next = || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..n)
        .map(|_| {
            (
                150.0 + next() * extent_arcsec * ARCSEC,
                2.0 + next() * extent_arcsec * ARCSEC,
            )
        })
        .collect()
}
