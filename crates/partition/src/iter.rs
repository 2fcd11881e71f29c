//! Lazy cursors over the cells of a [`PartitionMap`].
//!
//! All cursors borrow the map and the query regions, so they are cheap to
//! clone and nothing is materialized up front.

use sky_geometry::{Region, SphericalBox, SphericalRegion};
use tracing::{Span, debug_span, trace};

use crate::map::PartitionMap;

/// Every chunk in increasing id order. Yields `(chunk_id, sub_chunks)`.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    map: &'a PartitionMap,
    stripe: u32,
    chunk: u32,
}

impl<'a> Chunks<'a> {
    pub(crate) fn new(map: &'a PartitionMap) -> Self {
        Self { map, stripe: 0, chunk: 0 }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = (u32, SubChunks<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (stripe, chunk) = advance(self.map, &mut self.stripe, &mut self.chunk)?;
        Some((self.map.chunk_id(stripe, chunk), SubChunks::new(self.map, stripe)))
    }
}

/// Sub-chunk ids of one chunk in increasing order.
#[derive(Debug, Clone)]
pub struct SubChunks<'a> {
    map: &'a PartitionMap,
    stripe: u32,
    y: u32,
    x: u32,
}

impl<'a> SubChunks<'a> {
    fn new(map: &'a PartitionMap, stripe: u32) -> Self {
        Self { map, stripe, y: 0, x: 0 }
    }
}

impl Iterator for SubChunks<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let (y, x) = advance_sub(self.map, self.stripe, &mut self.y, &mut self.x)?;
        Some(self.map.sub_chunk_id(y, x))
    }
}

/// Chunks touched by a set of regions. Yields `(chunk_id, sub_chunks)`,
/// skipping chunks no region intersects.
#[derive(Debug, Clone)]
pub struct IntersectChunks<'a> {
    map: &'a PartitionMap,
    regions: &'a [Region],
    bbox: SphericalBox,
    span: Span,
    stripe: u32,
    chunk: u32,
}

impl<'a> IntersectChunks<'a> {
    pub(crate) fn new(map: &'a PartitionMap, regions: &'a [Region]) -> Self {
        let mut bbox = SphericalBox::empty();
        for region in regions {
            bbox.extend(&region.bounding_box());
        }
        let span = debug_span!("intersect", regions = regions.len());
        Self {
            map,
            regions,
            bbox,
            span,
            stripe: 0,
            chunk: 0,
        }
    }
}

impl<'a> Iterator for IntersectChunks<'a> {
    type Item = (u32, IntersectSubChunks<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let _entered = self.span.enter();
        let regions = self.regions;
        while let Some((stripe, chunk)) = advance(self.map, &mut self.stripe, &mut self.chunk) {
            let cell = self.map.chunk_box(stripe, chunk);
            if !self.bbox.intersects_box(&cell) {
                continue;
            }
            let chunk_id = self.map.chunk_id(stripe, chunk);
            let Some(survivors) = classify(regions.iter(), cell) else {
                trace!(chunk_id, "chunk outside every region");
                continue;
            };
            trace!(chunk_id, survivors = survivors.len(), "chunk touched");
            let sub_chunks = IntersectSubChunks {
                map: self.map,
                span: self.span.clone(),
                stripe,
                chunk,
                whole: survivors.is_empty(),
                regions: survivors,
                y: 0,
                x: 0,
            };
            return Some((chunk_id, sub_chunks));
        }
        None
    }
}

/// Sub-chunks of one chunk touched by the chunk's surviving regions.
///
/// Yields `(sub_chunk_id, regions)`. An empty `regions` means the sub-chunk
/// lies entirely inside some region, so every row in it matches.
#[derive(Debug, Clone)]
pub struct IntersectSubChunks<'a> {
    map: &'a PartitionMap,
    span: Span,
    stripe: u32,
    chunk: u32,
    /// Some region contains the whole chunk.
    whole: bool,
    regions: Vec<&'a Region>,
    y: u32,
    x: u32,
}

impl<'a> Iterator for IntersectSubChunks<'a> {
    type Item = (u32, Vec<&'a Region>);

    fn next(&mut self) -> Option<Self::Item> {
        let _entered = self.span.enter();
        while let Some((y, x)) = advance_sub(self.map, self.stripe, &mut self.y, &mut self.x) {
            let id = self.map.sub_chunk_id(y, x);
            if self.whole {
                return Some((id, Vec::new()));
            }
            let cell = self.map.sub_chunk_box(self.stripe, self.chunk, y, x);
            if let Some(survivors) = classify(self.regions.iter().copied(), cell) {
                return Some((id, survivors));
            }
        }
        None
    }
}

/// Regions that still need testing against `cell`: `None` if none touch
/// it, an empty list if one contains it.
fn classify<'a>(regions: impl Iterator<Item = &'a Region>, cell: SphericalBox) -> Option<Vec<&'a Region>> {
    let cell = Region::from(cell);
    let mut survivors = Vec::new();
    for region in regions {
        if region.contains(&cell) {
            return Some(Vec::new());
        }
        if region.intersects(&cell) {
            survivors.push(region);
        }
    }
    (!survivors.is_empty()).then_some(survivors)
}

/// Current `(stripe, chunk)`, stepping the cursor past it.
fn advance(map: &PartitionMap, stripe: &mut u32, chunk: &mut u32) -> Option<(u32, u32)> {
    let nc = map.num_chunks(*stripe)?;
    let current = (*stripe, *chunk);
    *chunk += 1;
    if *chunk == nc {
        *stripe += 1;
        *chunk = 0;
    }
    Some(current)
}

/// Current `(sub_stripe_in_stripe, sub_chunk)` within `stripe`, stepping
/// the cursor past it.
fn advance_sub(map: &PartitionMap, stripe: u32, y: &mut u32, x: &mut u32) -> Option<(u32, u32)> {
    let nss = map.num_sub_stripes_per_stripe();
    if *y >= nss {
        return None;
    }
    let nsc = map.num_sub_chunks(stripe * nss + *y)?;
    let current = (*y, *x);
    *x += 1;
    if *x == nsc {
        *y += 1;
        *x = 0;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sky_geometry::SphericalCircle;

    #[test]
    fn iterate_visits_every_chunk_once() {
        let map = PartitionMap::new(18, 10).unwrap();
        let ids: Vec<u32> = map.iterate().map(|(id, _)| id).collect();
        assert_eq!(ids.len() as u64, map.total_chunks());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.iter().all(|&id| map.is_valid_chunk(id)));
    }

    #[test]
    fn sub_chunks_are_ordered_and_valid() {
        let map = PartitionMap::new(18, 10).unwrap();
        let (chunk_id, subs) = map.iterate().find(|(id, _)| *id == 324).unwrap();
        let subs: Vec<u32> = subs.collect();
        assert_eq!(subs.len(), 10 * 10);
        assert!(subs.windows(2).all(|w| w[0] < w[1]));
        for s in subs {
            assert!(map.sub_chunk_bounding_box(chunk_id, s).is_ok());
        }
    }

    #[test]
    fn iterators_restart_from_clones() {
        let map = PartitionMap::new(4, 2).unwrap();
        let mut it = map.iterate();
        it.next();
        let rest: Vec<u32> = it.clone().map(|(id, _)| id).collect();
        let again: Vec<u32> = it.map(|(id, _)| id).collect();
        assert_eq!(rest, again);
    }

    #[test]
    fn region_containing_chunk_clears_its_sub_chunks() {
        let map = PartitionMap::new(18, 10).unwrap();
        let regions = [Region::from(SphericalCircle::new((5.0, 5.0), 20.0).unwrap())];
        let (_, subs) = map.intersect(&regions).find(|(id, _)| *id == 324).unwrap();
        let subs: Vec<_> = subs.collect();
        assert_eq!(subs.len(), 100);
        assert!(subs.iter().all(|(_, rs)| rs.is_empty()));
    }

    #[test]
    fn intersect_resumes_from_clones() {
        let map = PartitionMap::new(18, 10).unwrap();
        let regions = [Region::from(SphericalCircle::new((30.0, -20.0), 12.0).unwrap())];
        let flatten = |it: IntersectChunks<'_>| -> Vec<(u32, Vec<u32>)> {
            it.map(|(c, subs)| (c, subs.map(|(s, _)| s).collect())).collect()
        };
        let mut it = map.intersect(&regions);
        let first = it.next().unwrap();
        let rest = flatten(it.clone());
        assert_eq!(flatten(it), rest);
        assert!(!rest.is_empty());

        let whole = flatten(map.intersect(&regions));
        assert_eq!(whole[0].0, first.0);
        assert_eq!(&whole[1..], &rest[..]);
    }

    #[test]
    fn empty_region_list_touches_nothing() {
        let map = PartitionMap::new(18, 10).unwrap();
        assert_eq!(map.intersect(&[]).count(), 0);
    }
}
