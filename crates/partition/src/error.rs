use sky_geometry::GeometryError;

/// Errors raised while building or addressing a partition map.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartitionError {
    #[error("invalid partitioning parameters: {0}")]
    InvalidParameters(String),

    #[error("chunk {chunk_id} does not exist")]
    InvalidChunkId { chunk_id: u32 },

    #[error("sub-chunk {sub_chunk_id} does not exist in chunk {chunk_id}")]
    InvalidSubChunkId { chunk_id: u32, sub_chunk_id: u32 },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("failed to parse partitioning config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PartitionError>;
