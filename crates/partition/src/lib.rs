//! Sky partitioning: a fixed grid of latitude stripes, chunks and
//! sub-chunks, with lookup of the cells a set of regions touches.
//!
//! ```
//! use sky_partition::PartitionMap;
//!
//! let map = PartitionMap::new(18, 10).unwrap();
//! assert_eq!(map.locate(0.5, 0.5), (324, 0));
//! ```

pub mod config;
pub mod error;
pub mod iter;
pub mod map;

pub use config::PartitionConfig;
pub use error::{PartitionError, Result};
pub use iter::{Chunks, IntersectChunks, IntersectSubChunks, SubChunks};
pub use map::{PartitionMap, segments};
