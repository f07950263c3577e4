//! Catalogue merge integration tests

mod common;

use std::collections::HashSet;

use common::fixtures::{bool_values, flags, int_values, master, other, scattered, ARCSEC};
use masterlist_core::{
    merge_all, merge_catalogues, merge_catalogues_with, Angle, BruteForcePairFinder,
    CatalogueSource, MasterlistError, MergeOptions, DEGREE_UNIT, FLAG_MERGED,
};
use masterlist_io::{read_csv_str, Catalogue, Column, DataColumn};
use proptest::prelude::*;
use rstest::rstest;

fn options(radius_arcsec: f64) -> MergeOptions {
    MergeOptions::new("ra_2", "dec_2", Angle::from_arcsec(radius_arcsec))
}

// === Scenarios ===

#[test]
fn test_disjoint_catalogues_are_concatenated() {
    let cat_1 = master(&[(0.0, 0.0), (1.0, 1.0)]);
    let cat_2 = other(&[(10.0, 10.0), (20.0, 20.0), (30.0, 30.0)]);
    let outcome = merge_catalogues(&cat_1, &cat_2, &options(0.4)).unwrap();
    let merged = &outcome.catalogue;

    assert_eq!(merged.len(), 5);
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.only_in_first, 2);
    assert_eq!(outcome.only_in_second, 3);
    assert_eq!(flags(merged, FLAG_MERGED), vec![false; 5]);

    assert_eq!(merged.column_names(), vec!["id", "ra", "dec", FLAG_MERGED, "id_2"]);
    assert_eq!(
        int_values(merged, "id"),
        vec![Some(0), Some(1), None, None, None]
    );
    assert_eq!(
        int_values(merged, "id_2"),
        vec![None, None, Some(0), Some(1), Some(2)]
    );
    assert_eq!(
        merged.float_column("ra").unwrap(),
        vec![0.0, 1.0, 10.0, 20.0, 30.0]
    );
}

#[test]
fn test_ambiguous_source_matches_nearer_counterpart() {
    let cat_1 = master(&[(0.0, 0.0)]);
    let cat_2 = other(&[(0.0, 0.3 * ARCSEC), (0.0, 0.1 * ARCSEC)]);
    let outcome = merge_catalogues(&cat_1, &cat_2, &options(0.4)).unwrap();
    let merged = &outcome.catalogue;

    // Matched row first, then the leftover counterpart
    assert_eq!(merged.len(), 2);
    assert_eq!(int_values(merged, "id"), vec![Some(0), None]);
    assert_eq!(int_values(merged, "id_2"), vec![Some(1), Some(0)]);
    assert_eq!(flags(merged, FLAG_MERGED), vec![true, true]);
    assert_eq!(outcome.ambiguous_first, 1);
    assert_eq!(outcome.ambiguous_second, 2);

    // The leftover takes its own position
    let dec = merged.float_column("dec").unwrap();
    assert_eq!(dec[0], 0.0);
    assert!((dec[1] - 0.3 * ARCSEC).abs() < 1e-15);
}

#[test]
fn test_one_to_one_pairs_are_not_flagged() {
    let cat_1 = master(&[(0.0, 0.0), (5.0, 5.0)]);
    let cat_2 = other(&[(5.0, 5.0 + 0.2 * ARCSEC), (0.0, 0.1 * ARCSEC)]);
    let outcome = merge_catalogues(&cat_1, &cat_2, &options(0.4)).unwrap();
    let merged = &outcome.catalogue;

    assert_eq!(merged.len(), 2);
    assert_eq!(flags(merged, FLAG_MERGED), vec![false, false]);
    // Matches come out closest first
    assert_eq!(int_values(merged, "id"), vec![Some(0), Some(1)]);
    assert_eq!(int_values(merged, "id_2"), vec![Some(1), Some(0)]);
}

#[test]
fn test_competing_sources_resolved_over_rounds() {
    // A0 and A1 both want B0; A1 also sees B1 farther out
    let cat_1 = master(&[(0.0, 0.0), (0.0, 0.25 * ARCSEC)]);
    let cat_2 = other(&[(0.0, 0.05 * ARCSEC), (0.0, 0.6 * ARCSEC)]);
    let outcome = merge_catalogues(&cat_1, &cat_2, &options(0.4)).unwrap();

    let matched: Vec<(usize, usize)> = outcome.matches.iter().map(|p| (p.first, p.second)).collect();
    assert_eq!(matched, vec![(0, 0), (1, 1)]);
    assert_eq!(outcome.catalogue.len(), 2);
    assert_eq!(flags(&outcome.catalogue, FLAG_MERGED), vec![true, true]);
}

#[rstest]
#[case(0.4, 1)]
#[case(0.41, 2)]
fn test_boundary_is_inclusive(#[case] offset_arcsec: f64, #[case] rows: usize) {
    let cat_1 = master(&[(120.0, -30.0)]);
    let cat_2 = other(&[(120.0, -30.0 + offset_arcsec * ARCSEC)]);
    let outcome = merge_catalogues(&cat_1, &cat_2, &options(0.4)).unwrap();
    assert_eq!(outcome.catalogue.len(), rows);
}

#[test]
fn test_position_units_are_degrees() {
    let outcome = merge_catalogues(&master(&[(0.0, 0.0)]), &other(&[(1.0, 1.0)]), &options(0.4)).unwrap();
    for name in ["ra", "dec"] {
        let column = outcome.catalogue.column(name).unwrap();
        assert_eq!(column.descriptor.unit.as_deref(), Some(DEGREE_UNIT));
    }
}

#[test]
fn test_flag_columns_are_filled_with_false() {
    let mut cat_2 = other(&[(0.0, 0.0), (40.0, 40.0)]);
    cat_2
        .add_column(Column::new("flag_saturated", DataColumn::Bool(vec![true, true])))
        .unwrap();
    let cat_1 = master(&[(0.0, 0.0), (20.0, 20.0)]);

    let outcome = merge_catalogues(&cat_1, &cat_2, &options(0.4)).unwrap();
    // Rows: A1 only, A0+B0, B1 only
    assert_eq!(
        bool_values(&outcome.catalogue, "flag_saturated"),
        vec![Some(false), Some(true), Some(true)]
    );
}

// === Empty inputs ===

#[rstest]
#[case(0, 0)]
#[case(0, 3)]
#[case(2, 0)]
fn test_empty_inputs(#[case] n_1: usize, #[case] n_2: usize) {
    let cat_1 = master(&vec![(0.0, 0.0); n_1]);
    let cat_2 = other(&vec![(0.0, 0.0); n_2]);
    let outcome = merge_catalogues(&cat_1, &cat_2, &options(0.4)).unwrap();

    assert_eq!(outcome.catalogue.len(), n_1 + n_2);
    assert!(outcome.matches.is_empty());
    assert_eq!(flags(&outcome.catalogue, FLAG_MERGED), vec![false; n_1 + n_2]);
}

#[test]
fn test_header_only_csv_catalogues() {
    let cat_1 = read_csv_str("id,ra,dec\n").unwrap();
    let cat_2 = read_csv_str("id_2,ra_2,dec_2\n").unwrap();
    let outcome = merge_catalogues(&cat_1, &cat_2, &options(0.4)).unwrap();

    assert_eq!(outcome.catalogue.len(), 0);
    assert!(outcome.matches.is_empty());
    assert!(outcome.catalogue.has_column(FLAG_MERGED));

    // An empty catalogue merged into a populated one leaves it intact
    let outcome = merge_catalogues(&master(&[(0.0, 0.0), (1.0, 1.0)]), &cat_2, &options(0.4)).unwrap();
    assert_eq!(outcome.catalogue.len(), 2);
}

// === Errors ===

#[test]
fn test_shared_column_is_a_collision() {
    let mut cat_1 = master(&[(0.0, 0.0)]);
    let mut cat_2 = other(&[(0.0, 0.0)]);
    for cat in [&mut cat_1, &mut cat_2] {
        cat.add_column(Column::new("mag", DataColumn::Float64(vec![20.0])))
            .unwrap();
    }

    match merge_catalogues(&cat_1, &cat_2, &options(0.4)) {
        Err(MasterlistError::ColumnCollision { column }) => assert_eq!(column, "mag"),
        result => panic!("expected a collision, got {:?}", result.map(|o| o.catalogue.len())),
    }
}

#[rstest]
#[case(FLAG_MERGED, DataColumn::Bool(vec![false]))]
#[case("ra", DataColumn::Float64(vec![0.0]))]
fn test_reserved_names_in_second_catalogue(#[case] name: &str, #[case] data: DataColumn) {
    let mut cat_2 = other(&[(0.0, 0.0)]);
    cat_2.add_column(Column::new(name, data)).unwrap();

    let err = merge_catalogues(&master(&[(0.0, 0.0)]), &cat_2, &options(0.4)).unwrap_err();
    assert!(matches!(err, MasterlistError::ColumnCollision { .. }));
}

#[test]
fn test_missing_position_columns() {
    let cat_1 = master(&[(0.0, 0.0)]);
    let err = merge_catalogues(&cat_1, &master(&[(0.0, 0.0)]), &options(0.4)).unwrap_err();
    assert!(err.is_missing_column());

    let err = merge_catalogues(&other(&[(0.0, 0.0)]), &other(&[(0.0, 0.0)]), &options(0.4)).unwrap_err();
    assert!(err.is_missing_column());
}

#[test]
fn test_non_boolean_merge_flag() {
    let mut cat_1 = master(&[(0.0, 0.0)]);
    cat_1
        .add_column(Column::new(FLAG_MERGED, DataColumn::Int64(vec![0])))
        .unwrap();

    let err = merge_catalogues(&cat_1, &other(&[(0.0, 0.0)]), &options(0.4)).unwrap_err();
    assert!(matches!(err, MasterlistError::TypeMismatch { .. }));
}

// === Folding ===

#[test]
fn test_existing_flags_are_carried() {
    let mut cat_1 = master(&[(0.0, 0.0), (3.0, 3.0)]);
    cat_1
        .add_column(Column::new(FLAG_MERGED, DataColumn::Bool(vec![true, false])))
        .unwrap();

    let outcome = merge_catalogues(&cat_1, &other(&[(0.0, 0.0)]), &options(0.4)).unwrap();
    // Rows: A1 only, A0+B0
    assert_eq!(flags(&outcome.catalogue, FLAG_MERGED), vec![false, true]);
}

#[test]
fn test_merge_all_folds_in_order() {
    let cat_a = common::fixtures::catalogue_with("id_a", "RA", "DEC", &[(0.0, 0.0), (1.0, 1.0)]);
    let cat_b = common::fixtures::catalogue_with("id_b", "ra_b", "dec_b", &[(0.0, 0.1 * ARCSEC)]);
    let cat_c = common::fixtures::catalogue_with("id_c", "ra_c", "dec_c", &[(1.0, 1.0), (2.0, 2.0)]);

    let merged = merge_all(
        &[
            CatalogueSource::new(&cat_a, "RA", "DEC"),
            CatalogueSource::new(&cat_b, "ra_b", "dec_b"),
            CatalogueSource::new(&cat_c, "ra_c", "dec_c"),
        ],
        Angle::from_arcsec(0.4),
    )
    .unwrap();

    assert_eq!(merged.len(), 3);
    assert!(merged.has_column("ra") && !merged.has_column("RA"));
    assert_eq!(int_values(&merged, "id_a"), vec![Some(0), Some(1), None]);
    assert_eq!(int_values(&merged, "id_b"), vec![Some(0), None, None]);
    assert_eq!(int_values(&merged, "id_c"), vec![None, Some(0), Some(1)]);
}

#[test]
fn test_merge_all_of_nothing() {
    let merged = merge_all(&[], Angle::default()).unwrap();
    assert!(merged.is_empty());
}

// === Properties ===

fn field() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((0.0..5.0f64, 0.0..5.0f64), 0..25).prop_map(|offsets| {
        offsets
            .into_iter()
            .map(|(x, y)| (150.0 + x * ARCSEC, 2.0 + y * ARCSEC))
            .collect()
    })
}

fn with_row_ids(mut catalogue: Catalogue, name: &str) -> Catalogue {
    let ids = (0..catalogue.len() as i64).collect();
    catalogue
        .add_column(Column::new(name, DataColumn::Int64(ids)))
        .unwrap();
    catalogue
}

proptest! {
    #[test]
    fn test_rows_are_conserved(a in field(), b in field()) {
        let outcome = merge_catalogues(&master(&a), &other(&b), &options(1.0)).unwrap();
        let rows = outcome.catalogue.len();

        prop_assert_eq!(rows, outcome.only_in_first + outcome.matches.len() + outcome.only_in_second);
        prop_assert_eq!(outcome.only_in_first + outcome.matches.len(), a.len());
        prop_assert_eq!(outcome.only_in_second + outcome.matches.len(), b.len());
        prop_assert!(rows <= a.len() + b.len());
        if !a.is_empty() && !b.is_empty() {
            prop_assert!(rows >= a.len().max(b.len()));
        }
    }

    #[test]
    fn test_matching_is_a_partial_injection(a in field(), b in field()) {
        let radius = Angle::from_arcsec(1.0);
        let outcome = merge_catalogues(&master(&a), &other(&b), &options(1.0)).unwrap();

        let firsts: HashSet<usize> = outcome.matches.iter().map(|p| p.first).collect();
        let seconds: HashSet<usize> = outcome.matches.iter().map(|p| p.second).collect();
        prop_assert_eq!(firsts.len(), outcome.matches.len());
        prop_assert_eq!(seconds.len(), outcome.matches.len());
        prop_assert!(outcome.matches.iter().all(|p| radius.contains(p.separation)));
    }

    #[test]
    fn test_tree_and_brute_force_merge_agree(a in field(), b in field()) {
        let cat_1 = master(&a);
        let cat_2 = other(&b);
        let tree = merge_catalogues(&cat_1, &cat_2, &options(1.0)).unwrap();
        let brute = merge_catalogues_with(&BruteForcePairFinder, &cat_1, &cat_2, &options(1.0)).unwrap();

        prop_assert_eq!(tree.matches, brute.matches);
        prop_assert_eq!(int_values(&tree.catalogue, "id"), int_values(&brute.catalogue, "id"));
        prop_assert_eq!(flags(&tree.catalogue, FLAG_MERGED), flags(&brute.catalogue, FLAG_MERGED));
    }

    #[test]
    fn test_flags_never_reset_across_rounds(seed in 0u64..500) {
        let cat_a = master(&scattered(15, seed, 4.0));
        let cat_b = other(&scattered(15, seed + 1, 4.0));
        let cat_c = common::fixtures::catalogue_with("id_3", "ra_3", "dec_3", &scattered(15, seed + 2, 4.0));

        let round_1 = merge_catalogues(&cat_a, &cat_b, &options(1.0)).unwrap().catalogue;
        let round_1 = with_row_ids(round_1, "round_1_row");
        let before = flags(&round_1, FLAG_MERGED);

        let options_3 = MergeOptions::new("ra_3", "dec_3", Angle::from_arcsec(1.0));
        let round_2 = merge_catalogues(&round_1, &cat_c, &options_3).unwrap().catalogue;
        let after = flags(&round_2, FLAG_MERGED);

        for (row, source) in int_values(&round_2, "round_1_row").into_iter().enumerate() {
            if let Some(source) = source {
                if before[source as usize] {
                    prop_assert!(after[row]);
                }
            }
        }
    }
}
