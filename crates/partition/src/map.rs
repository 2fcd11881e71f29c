use sky_geometry::constants::DEG_PER_ARCSEC;
use sky_geometry::{Region, SphericalBox, clamp_phi, reduce_lon};
use tracing::{debug, instrument};

use crate::config::PartitionConfig;
use crate::error::{PartitionError, Result};
use crate::iter::{Chunks, IntersectChunks};

/// Number of equal-width longitude segments a latitude band can be cut into
/// so that each segment is at least `width` degrees wide along the band's
/// most poleward edge.
///
/// Bands touching a pole (within one arcsecond) and widths of 180 degrees
/// or more get a single segment; widths under one arcsecond are raised to
/// one arcsecond.
pub fn segments(lat_min: f64, lat_max: f64, width: f64) -> u32 {
    let lat = lat_min.abs().max(lat_max.abs());
    if lat > 90.0 - DEG_PER_ARCSEC || width >= 180.0 {
        return 1;
    }
    let width = width.max(DEG_PER_ARCSEC);
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let x = width.to_radians().cos() - sin_lat * sin_lat;
    let u = cos_lat * cos_lat;
    let y = (u * u - x * x).abs().sqrt();
    // Longitude spanned by a `width`-degree great-circle chord on the band.
    let span = y.atan2(x).to_degrees().abs();
    (360.0 / span).floor().max(1.0) as u32
}

/// The sky grid: latitude stripes split into chunks, each chunk split into
/// sub-chunks along sub-stripes.
///
/// Chunk ids are `stripe * 2 * num_stripes + chunk` and sub-chunk ids are
/// `sub_stripe_in_stripe * max_sub_chunks_per_chunk + sub_chunk`, both fixed
/// by the two parameters alone so independent processes agree on them.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionMap {
    num_stripes: u32,
    num_sub_stripes_per_stripe: u32,
    stripe_height: f64,
    sub_stripe_height: f64,
    /// Chunks in each stripe.
    num_chunks: Vec<u32>,
    /// Sub-chunks per chunk in each sub-stripe, indexed globally.
    num_sub_chunks: Vec<u32>,
    max_sub_chunks: u32,
}

impl PartitionMap {
    #[instrument]
    pub fn new(num_stripes: i64, num_sub_stripes_per_stripe: i64) -> Result<Self> {
        PartitionConfig::new(num_stripes, num_sub_stripes_per_stripe).validate()?;
        let ns = u32::try_from(num_stripes).map_err(|e| PartitionError::InvalidParameters(e.to_string()))?;
        let nss = u32::try_from(num_sub_stripes_per_stripe)
            .map_err(|e| PartitionError::InvalidParameters(e.to_string()))?;

        let stripe_height = 180.0 / f64::from(ns);
        let sub_stripe_height = 180.0 / (f64::from(ns) * f64::from(nss));
        let mut num_chunks = Vec::with_capacity(ns as usize);
        let mut num_sub_chunks = Vec::with_capacity(ns as usize * nss as usize);
        for stripe in 0..ns {
            let (lat_min, lat_max) = split(-90.0, 90.0, stripe, ns);
            let nc = segments(lat_min, lat_max, stripe_height);
            num_chunks.push(nc);
            for y in 0..nss {
                let (sub_min, sub_max) = split(lat_min, lat_max, y, nss);
                num_sub_chunks.push((segments(sub_min, sub_max, sub_stripe_height) / nc).max(1));
            }
        }
        let max_sub_chunks = num_sub_chunks.iter().copied().max().unwrap_or(1);
        if u64::from(nss) * u64::from(max_sub_chunks) > u64::from(u32::MAX) {
            return Err(PartitionError::InvalidParameters(format!(
                "{nss} sub-stripes of up to {max_sub_chunks} sub-chunks overflow the sub-chunk id space"
            )));
        }

        let map = Self {
            num_stripes: ns,
            num_sub_stripes_per_stripe: nss,
            stripe_height,
            sub_stripe_height,
            num_chunks,
            num_sub_chunks,
            max_sub_chunks,
        };
        debug!(
            total_chunks = map.total_chunks(),
            max_sub_chunks, "partition map built"
        );
        Ok(map)
    }

    pub fn from_config(config: &PartitionConfig) -> Result<Self> {
        Self::new(config.num_stripes, config.num_sub_stripes)
    }

    pub fn num_stripes(&self) -> u32 {
        self.num_stripes
    }

    pub fn num_sub_stripes_per_stripe(&self) -> u32 {
        self.num_sub_stripes_per_stripe
    }

    /// Height of a stripe in degrees of latitude.
    pub fn stripe_height(&self) -> f64 {
        self.stripe_height
    }

    pub fn sub_stripe_height(&self) -> f64 {
        self.sub_stripe_height
    }

    /// Chunks in `stripe`, or `None` past the last stripe.
    pub fn num_chunks(&self, stripe: u32) -> Option<u32> {
        self.num_chunks.get(stripe as usize).copied()
    }

    /// Sub-chunks per chunk in the global sub-stripe `sub_stripe`.
    pub fn num_sub_chunks(&self, sub_stripe: u32) -> Option<u32> {
        self.num_sub_chunks.get(sub_stripe as usize).copied()
    }

    pub fn max_sub_chunks_per_chunk(&self) -> u32 {
        self.max_sub_chunks
    }

    pub fn total_chunks(&self) -> u64 {
        self.num_chunks.iter().map(|&n| u64::from(n)).sum()
    }

    pub fn chunk_id(&self, stripe: u32, chunk: u32) -> u32 {
        stripe * 2 * self.num_stripes + chunk
    }

    pub fn sub_chunk_id(&self, sub_stripe_in_stripe: u32, sub_chunk: u32) -> u32 {
        sub_stripe_in_stripe * self.max_sub_chunks + sub_chunk
    }

    /// `(stripe, chunk)` of a valid chunk id.
    fn split_chunk_id(&self, chunk_id: u32) -> Result<(u32, u32)> {
        let stride = 2 * self.num_stripes;
        let (stripe, chunk) = (chunk_id / stride, chunk_id % stride);
        match self.num_chunks(stripe) {
            Some(nc) if chunk < nc => Ok((stripe, chunk)),
            _ => Err(PartitionError::InvalidChunkId { chunk_id }),
        }
    }

    pub fn is_valid_chunk(&self, chunk_id: u32) -> bool {
        self.split_chunk_id(chunk_id).is_ok()
    }

    /// `(chunk_id, sub_chunk_id)` of the cell holding `(lon, lat)`.
    ///
    /// Every point maps to exactly one cell: cells own their lower
    /// boundaries, and the north pole and `lon = 360` fold into the last
    /// stripe and first chunk respectively.
    pub fn locate(&self, lon: f64, lat: f64) -> (u32, u32) {
        let lon = reduce_lon(lon);
        let lat = clamp_phi(lat);
        let stripe = index(lat, -90.0, 90.0, self.num_stripes);
        let chunk = index(lon, 0.0, 360.0, self.num_chunks[stripe as usize]);
        let (lon_min, lon_max, lat_min, lat_max) = self.chunk_bounds(stripe, chunk);
        let y = index(lat, lat_min, lat_max, self.num_sub_stripes_per_stripe);
        let nsc = self.num_sub_chunks[(stripe * self.num_sub_stripes_per_stripe + y) as usize];
        let x = index(lon, lon_min, lon_max, nsc);
        (self.chunk_id(stripe, chunk), self.sub_chunk_id(y, x))
    }

    pub fn chunk_bounding_box(&self, chunk_id: u32) -> Result<SphericalBox> {
        let (stripe, chunk) = self.split_chunk_id(chunk_id)?;
        Ok(self.chunk_box(stripe, chunk))
    }

    pub fn sub_chunk_bounding_box(&self, chunk_id: u32, sub_chunk_id: u32) -> Result<SphericalBox> {
        let (stripe, chunk) = self.split_chunk_id(chunk_id)?;
        let (y, x) = (sub_chunk_id / self.max_sub_chunks, sub_chunk_id % self.max_sub_chunks);
        let valid = y < self.num_sub_stripes_per_stripe
            && x < self.num_sub_chunks[(stripe * self.num_sub_stripes_per_stripe + y) as usize];
        if !valid {
            return Err(PartitionError::InvalidSubChunkId { chunk_id, sub_chunk_id });
        }
        Ok(self.sub_chunk_box(stripe, chunk, y, x))
    }

    /// `(lon_min, lon_max, lat_min, lat_max)` of a chunk.
    fn chunk_bounds(&self, stripe: u32, chunk: u32) -> (f64, f64, f64, f64) {
        let (lat_min, lat_max) = split(-90.0, 90.0, stripe, self.num_stripes);
        let (lon_min, lon_max) = split(0.0, 360.0, chunk, self.num_chunks[stripe as usize]);
        (lon_min, lon_max, lat_min, lat_max)
    }

    pub(crate) fn chunk_box(&self, stripe: u32, chunk: u32) -> SphericalBox {
        let (lon_min, lon_max, lat_min, lat_max) = self.chunk_bounds(stripe, chunk);
        SphericalBox::from_raw(lon_min, lon_max, lat_min, lat_max)
    }

    /// Sub-chunk `(y, x)` cut out of its chunk's bounds, so cells share
    /// their edges exactly with the chunk that holds them.
    pub(crate) fn sub_chunk_box(&self, stripe: u32, chunk: u32, y: u32, x: u32) -> SphericalBox {
        let (lon_min, lon_max, lat_min, lat_max) = self.chunk_bounds(stripe, chunk);
        let nsc = self.num_sub_chunks[(stripe * self.num_sub_stripes_per_stripe + y) as usize];
        let (sub_lat_min, sub_lat_max) = split(lat_min, lat_max, y, self.num_sub_stripes_per_stripe);
        let (sub_lon_min, sub_lon_max) = split(lon_min, lon_max, x, nsc);
        SphericalBox::from_raw(sub_lon_min, sub_lon_max, sub_lat_min, sub_lat_max)
    }

    /// Every chunk in increasing id order, each with its sub-chunk ids.
    pub fn iterate(&self) -> Chunks<'_> {
        Chunks::new(self)
    }

    /// Chunks and sub-chunks touched by the union of `regions`.
    ///
    /// Each yielded sub-chunk comes with the regions that still need a
    /// per-row test there: empty when some region contains the whole cell,
    /// otherwise the regions that intersect it. Cells no region touches are
    /// skipped.
    ///
    /// Classification runs lazily inside an `intersect` span that the
    /// returned iterators re-enter on every step.
    pub fn intersect<'a>(&'a self, regions: &'a [Region]) -> IntersectChunks<'a> {
        IntersectChunks::new(self, regions)
    }

    /// [`Self::intersect`] for a single region.
    pub fn intersect_region<'a>(&'a self, region: &'a Region) -> IntersectChunks<'a> {
        self.intersect(std::slice::from_ref(region))
    }
}

/// Piece `i` of `[lo, hi]` cut into `n` equal pieces; the last piece ends
/// exactly at `hi`.
fn split(lo: f64, hi: f64, i: u32, n: u32) -> (f64, f64) {
    let step = (hi - lo) / f64::from(n);
    let end = if i + 1 == n { hi } else { lo + f64::from(i + 1) * step };
    (lo + f64::from(i) * step, end)
}

/// Index of the piece of `[lo, hi]` cut into `n` that holds `value`,
/// clamped to `[0, n - 1]`.
fn index(value: f64, lo: f64, hi: f64, n: u32) -> u32 {
    let step = (hi - lo) / f64::from(n);
    let i = ((value - lo) / step).floor().max(0.0) as u32;
    i.min(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn segments_rule() {
        assert_eq!(segments(-90.0, 90.0, 180.0), 1);
        assert_eq!(segments(80.0, 90.0, 10.0), 1);
        assert_eq!(segments(0.0, 10.0, 10.0), 35);
        assert_eq!(segments(0.0, 1.0, 1.0), 359);
        // Narrower chunks near the equator, wider near the poles.
        assert!(segments(0.0, 5.0, 5.0) > segments(70.0, 75.0, 5.0));
        assert_eq!(segments(0.0, 0.0, 0.0), segments(0.0, 0.0, DEG_PER_ARCSEC));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(PartitionMap::new(0, 1), Err(PartitionError::InvalidParameters(_))));
        assert!(matches!(PartitionMap::new(1, 0), Err(PartitionError::InvalidParameters(_))));
        assert!(matches!(PartitionMap::new(-3, 2), Err(PartitionError::InvalidParameters(_))));
    }

    #[test]
    fn chunk_layout_for_18_stripes() {
        let map = PartitionMap::new(18, 10).unwrap();
        assert_abs_diff_eq!(map.stripe_height(), 10.0);
        assert_abs_diff_eq!(map.sub_stripe_height(), 1.0);
        assert_eq!(map.num_chunks(9), Some(35));
        assert_eq!(map.num_chunks(0), Some(1));
        assert_eq!(map.num_chunks(18), None);
        assert_eq!(map.num_sub_chunks(90), Some(10));
        assert_eq!(map.chunk_id(9, 0), 324);
        assert!(map.is_valid_chunk(324));
        assert!(!map.is_valid_chunk(324 + 35));
        assert!(!map.is_valid_chunk(18 * 36));
    }

    #[test]
    fn bounding_boxes() {
        let map = PartitionMap::new(18, 10).unwrap();
        let b = map.chunk_bounding_box(324).unwrap();
        assert_eq!(b.lon_min(), 0.0);
        assert_abs_diff_eq!(b.lon_max(), 360.0 / 35.0, epsilon = 1e-12);
        assert_eq!((b.lat_min(), b.lat_max()), (0.0, 10.0));

        let s = map.sub_chunk_bounding_box(324, 0).unwrap();
        assert_abs_diff_eq!(s.lon_max(), 360.0 / 350.0, epsilon = 1e-12);
        assert_eq!((s.lat_min(), s.lat_max()), (0.0, 1.0));
        assert!(b.contains_box(&s));
        assert_eq!(map.sub_chunk_bounding_box(324, 0).unwrap(), s);

        let polar = map.chunk_bounding_box(map.chunk_id(17, 0)).unwrap();
        assert!(polar.is_full_lon());
        assert_eq!(polar.lat_max(), 90.0);

        assert_eq!(
            map.chunk_bounding_box(5),
            Err(PartitionError::InvalidChunkId { chunk_id: 5 })
        );
        assert_eq!(
            map.sub_chunk_bounding_box(324, 10 * map.max_sub_chunks_per_chunk()),
            Err(PartitionError::InvalidSubChunkId {
                chunk_id: 324,
                sub_chunk_id: 10 * map.max_sub_chunks_per_chunk()
            })
        );
    }

    #[test]
    fn chunk_boxes_tile_the_sphere() {
        let map = PartitionMap::new(12, 3).unwrap();
        let mut area = 0.0;
        for (chunk_id, subs) in map.iterate() {
            let chunk = map.chunk_bounding_box(chunk_id).unwrap();
            assert!(!chunk.is_empty());
            area += chunk.area();
            let mut sub_area = 0.0;
            for sub in subs {
                let cell = map.sub_chunk_bounding_box(chunk_id, sub).unwrap();
                assert!(chunk.contains_box(&cell), "{chunk_id}/{sub}");
                sub_area += cell.area();
            }
            assert_abs_diff_eq!(sub_area, chunk.area(), epsilon = 1e-12);
        }
        assert_abs_diff_eq!(area, 4.0 * std::f64::consts::PI, epsilon = 1e-9);
    }

    #[test]
    fn locate_matches_bounding_boxes() {
        let map = PartitionMap::new(18, 10).unwrap();
        assert_eq!(map.locate(0.5, 0.5), (324, 0));
        for &(lon, lat) in &[(0.0, 0.0), (359.999, -0.5), (123.4, 56.7), (10.0, 89.9), (200.0, -90.0), (45.0, 90.0)] {
            let (chunk, sub) = map.locate(lon, lat);
            let b = map.sub_chunk_bounding_box(chunk, sub).unwrap();
            assert!(b.contains_lon_lat(lon, lat), "({lon}, {lat}) not in {b:?}");
        }
    }
}
