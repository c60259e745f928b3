use std::path::PathBuf;

use optica_common::config::FrameRatePolicy;
use optica_device_model::format::{ChromaSubtype, Dimensions, FocusSystem, FormatDescriptor, FrameRateRange};
use optica_device_model::lens::{LensRole, Topology};
use optica_negotiation::ranking::FormatRanker;
use optica_negotiation::scoring::FormatScorer;
use optica_negotiation::selection::select;
use optica_negotiation::zoom::{compute_weights, route};

fn load_fixture_topology() -> Topology {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("triple-camera.json");

    Topology::load(&path).expect("fixture topology should load")
}

#[test]
fn wide_lens_ranking_is_stable_across_policies() {
    let topology = load_fixture_topology();
    let wide = topology.lens(LensRole::Wide).expect("fixture has a wide lens");

    for policy in [FrameRatePolicy::Tiered, FrameRatePolicy::Raw] {
        let ranker = FormatRanker::new(FormatScorer::new(policy));
        let ranked = ranker.rank_lens(wide, true).unwrap();
        let order: Vec<_> = ranked.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![5, 4, 2, 3, 1, 0, 6], "{policy:?}");
        assert!(ranked[0].enhanced_subtype_supported);
        assert!(ranked[0].hdr_supported);
    }

    let ranked = FormatRanker::default().rank_lens(wide, false).unwrap();
    let order: Vec<_> = ranked.iter().map(|s| s.index).collect();
    assert_eq!(order, vec![4, 5, 2, 3, 1, 0, 6]);
}

#[test]
fn wide_lens_selection_walks_down_the_ranking() {
    let topology = load_fixture_topology();
    let wide = topology.lens(LensRole::Wide).unwrap();
    let ranked = FormatRanker::default().rank_lens(wide, true).unwrap();

    let pick = |dimensions, fps| select(&ranked, dimensions, fps).unwrap();

    let s = pick(Dimensions::FHD_1080P, 60.0);
    assert_eq!(s.scored().index, 2);

    let s = pick(Dimensions::UHD_4K, 60.0);
    assert_eq!(s.scored().index, 2);

    let s = pick(Dimensions::UHD_4K, 240.0);
    assert_eq!(s.scored().index, 1);
    assert!(!s.is_degraded());

    let s = pick(Dimensions::FHD_1080P, 500.0);
    assert!(s.is_degraded());
    assert_eq!(s.scored().index, 5);
}

#[test]
fn two_format_scenario_prefers_resolution_then_matches_target() {
    let catalog = vec![
        FormatDescriptor {
            dimensions: Dimensions::UHD_4K,
            frame_rate_range: FrameRateRange::new(1.0, 30.0),
            subtype: ChromaSubtype::Enhanced,
            focus_system: FocusSystem::PhaseDetection,
            hdr_supported: true,
            binned: false,
        },
        FormatDescriptor {
            dimensions: Dimensions::FHD_1080P,
            frame_rate_range: FrameRateRange::new(1.0, 60.0),
            subtype: ChromaSubtype::VideoRange,
            focus_system: FocusSystem::PhaseDetection,
            hdr_supported: false,
            binned: false,
        },
    ];

    let ranked = FormatRanker::default().rank(&catalog, true).unwrap();
    assert_eq!(ranked[0].format.dimensions, Dimensions::UHD_4K);

    let selection = select(&ranked, Dimensions::FHD_1080P, 60.0).unwrap();
    assert!(!selection.is_degraded());
    assert_eq!(selection.format(), &catalog[1]);
}

#[test]
fn fixture_zoom_routes_cover_all_lenses() {
    let topology = load_fixture_topology();
    let weights = compute_weights(&topology.roles(), &topology.crossover).unwrap();

    let ultra = route(0.5, &weights).unwrap();
    assert_eq!(ultra.role, LensRole::UltraWide);
    assert!((ultra.native_factor - 1.0).abs() < 1e-9);

    let wide = route(2.0, &weights).unwrap();
    assert_eq!(wide.role, LensRole::Wide);

    // crossover [2, 6]: telephoto weight 1/3, hand-off at 3x.
    let tele = route(6.0, &weights).unwrap();
    assert_eq!(tele.role, LensRole::Telephoto);
    assert!((tele.native_factor - 2.0).abs() < 1e-9);
}
