use proptest::prelude::*;
use sky_geometry::{Region, SphericalBox, SphericalCircle, SphericalConvexPolygon, SphericalRegion};
use sky_partition::{PartitionConfig, PartitionError, PartitionMap};

// ── Helper Functions ─────────────────────────────────────────────────────

fn collect<'a>(map: &'a PartitionMap, regions: &'a [Region]) -> Vec<(u32, Vec<(u32, usize)>)> {
    map.intersect(regions)
        .map(|(chunk, subs)| (chunk, subs.map(|(s, rs)| (s, rs.len())).collect()))
        .collect()
}

// ── Fixtures ─────────────────────────────────────────────────────────────

#[test]
fn small_box_lands_in_one_sub_chunk() {
    let map = PartitionMap::new(18, 10).unwrap();
    let region = Region::from(SphericalBox::new((0.01, 0.01), (0.99, 0.99)).unwrap());

    let hits: Vec<_> = map
        .intersect_region(&region)
        .map(|(chunk, subs)| (chunk, subs.collect::<Vec<_>>()))
        .collect();
    assert_eq!(hits.len(), 1);
    let (chunk, subs) = &hits[0];
    assert_eq!(*chunk, 324);
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].0, 0);
    assert_eq!(subs[0].1, vec![&region]);
}

#[test]
fn single_cell_map() {
    let map = PartitionMap::new(1, 1).unwrap();
    assert_eq!(map.total_chunks(), 1);
    let all: Vec<_> = map.iterate().map(|(c, s)| (c, s.collect::<Vec<_>>())).collect();
    assert_eq!(all, vec![(0, vec![0])]);

    let regions = [Region::from(SphericalCircle::new((10.0, 10.0), 1.0).unwrap())];
    assert_eq!(collect(&map, &regions), vec![(0, vec![(0, 1)])]);
}

#[test]
fn invalid_parameters_are_rejected() {
    for (ns, nss) in [(0, 1), (1, 0), (-1, 1), (1, -5)] {
        assert!(
            matches!(PartitionMap::new(ns, nss), Err(PartitionError::InvalidParameters(_))),
            "({ns}, {nss})"
        );
    }
}

#[test]
fn map_from_config_document() {
    let config = PartitionConfig::from_json(r#"{"part": {"num-stripes": 18, "num-sub-stripes": 10}}"#).unwrap();
    let map = PartitionMap::from_config(&config).unwrap();
    assert_eq!(map, PartitionMap::new(18, 10).unwrap());
    assert_eq!(map.num_stripes(), 18);
    assert_eq!(map.num_sub_stripes_per_stripe(), 10);
}

// ── Region intersection ──────────────────────────────────────────────────

#[test]
fn whole_sky_region_keeps_every_cell_without_tests() {
    let map = PartitionMap::new(6, 2).unwrap();
    let regions = [Region::from(SphericalBox::full())];
    let hits = collect(&map, &regions);
    assert_eq!(hits.len() as u64, map.total_chunks());
    for (chunk, subs) in hits {
        let expected = map.iterate().find(|(c, _)| *c == chunk).unwrap().1.count();
        assert_eq!(subs.len(), expected);
        assert!(subs.iter().all(|&(_, n)| n == 0));
    }
}

#[test]
fn intersected_cells_actually_touch_the_region() {
    let map = PartitionMap::new(18, 10).unwrap();
    let polygon = SphericalConvexPolygon::new(vec![(40.0, -12.0), (55.0, -12.0), (55.0, 3.0), (40.0, 3.0)]).unwrap();
    let regions = [Region::from(polygon)];
    let mut inside = 0;
    for (chunk, subs) in map.intersect(&regions) {
        let chunk_box = Region::from(map.chunk_bounding_box(chunk).unwrap());
        assert!(regions[0].intersects(&chunk_box));
        for (sub, rs) in subs {
            let cell = Region::from(map.sub_chunk_bounding_box(chunk, sub).unwrap());
            assert!(regions[0].intersects(&cell));
            if rs.is_empty() {
                assert!(regions[0].contains(&cell));
                inside += 1;
            }
        }
    }
    assert!(inside > 0);
}

#[test]
fn every_located_point_is_in_an_intersected_cell() {
    let map = PartitionMap::new(18, 10).unwrap();
    let circle = SphericalCircle::new((359.5, 45.0), 3.0).unwrap();
    let regions = [Region::from(circle)];
    let hits = collect(&map, &regions);
    for i in 0..40 {
        let lon = 356.0 + f64::from(i) * 0.2;
        let (chunk, sub) = map.locate(lon, 45.0);
        if !circle.contains_point((lon, 45.0)) {
            continue;
        }
        let subs = &hits.iter().find(|(c, _)| *c == chunk).unwrap().1;
        assert!(subs.iter().any(|&(s, _)| s == sub), "({lon}, 45) in {chunk}/{sub}");
    }
}

#[test]
fn several_regions_share_cells() {
    let map = PartitionMap::new(18, 10).unwrap();
    let a = Region::from(SphericalCircle::new((0.5, 0.5), 0.2).unwrap());
    let b = Region::from(SphericalCircle::new((0.6, 0.4), 0.2).unwrap());
    let far = Region::from(SphericalCircle::new((181.3, -63.7), 0.1).unwrap());
    let regions = [a, b, far];
    let hits = collect(&map, &regions);
    let shared = hits.iter().find(|(c, _)| *c == 324).unwrap();
    assert_eq!(shared.1, vec![(0, 2)]);

    let (far_chunk, far_sub) = map.locate(181.3, -63.7);
    let far_hit = hits.iter().find(|(c, _)| *c == far_chunk).unwrap();
    assert!(far_hit.1.contains(&(far_sub, 1)));
    for (chunk, subs) in &hits {
        if *chunk != 324 {
            assert!(subs.iter().all(|&(_, n)| n == 1));
        }
    }
}

// ── Properties ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn located_cell_contains_point(lon in -720.0f64..720.0, lat in -90.0f64..=90.0) {
        let map = PartitionMap::new(18, 10).unwrap();
        let (chunk, sub) = map.locate(lon, lat);
        prop_assert!(map.is_valid_chunk(chunk));
        let cell = map.sub_chunk_bounding_box(chunk, sub).unwrap();
        prop_assert!(cell.contains_lon_lat(lon, lat), "({}, {}) not in {:?}", lon, lat, cell);
        prop_assert!(map.chunk_bounding_box(chunk).unwrap().contains_box(&cell));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn chunk_counts_follow_latitude(ns in 1i64..60, nss in 1i64..6) {
        let map = PartitionMap::new(ns, nss).unwrap();
        let ns = map.num_stripes();
        for stripe in 0..ns {
            let nc = map.num_chunks(stripe).unwrap();
            prop_assert!(nc >= 1 && nc <= 2 * ns);
            prop_assert_eq!(nc, map.num_chunks(ns - 1 - stripe).unwrap());
        }
        prop_assert_eq!(map.num_chunks(0), Some(1));
    }
}
