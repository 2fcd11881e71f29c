use serde::{Deserialize, Serialize};

use crate::error::{PartitionError, Result};

/// Partitioning parameters shared by the data loader and query workers.
///
/// Accepts the partitioner's spellings (`part.num-stripes`,
/// `part.num-sub-stripes`, either dotted or nested under `part`) and the
/// metadata store's (`nStripes`, `nSubStripes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    #[serde(alias = "part.num-stripes", alias = "nStripes")]
    pub num_stripes: i64,
    #[serde(alias = "part.num-sub-stripes", alias = "nSubStripes")]
    pub num_sub_stripes: i64,
}

/// `{"part": {"num-stripes": .., "num-sub-stripes": ..}}`
#[derive(Debug, Deserialize)]
struct NestedConfig {
    part: PartSection,
}

#[derive(Debug, Deserialize)]
struct PartSection {
    #[serde(rename = "num-stripes")]
    num_stripes: i64,
    #[serde(rename = "num-sub-stripes")]
    num_sub_stripes: i64,
}

impl PartitionConfig {
    pub fn new(num_stripes: i64, num_sub_stripes: i64) -> Self {
        Self {
            num_stripes,
            num_sub_stripes,
        }
    }

    /// Parse a JSON document and validate the parameters.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| PartitionError::Config(e.to_string()))?;
        let config = if value.get("part").is_some_and(serde_json::Value::is_object) {
            let nested: NestedConfig =
                serde_json::from_value(value).map_err(|e| PartitionError::Config(e.to_string()))?;
            Self::new(nested.part.num_stripes, nested.part.num_sub_stripes)
        } else {
            serde_json::from_value(value).map_err(|e| PartitionError::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Both counts must be positive and small enough for chunk ids to fit
    /// in 32 bits.
    pub fn validate(&self) -> Result<()> {
        if self.num_stripes <= 0 {
            return Err(PartitionError::InvalidParameters(format!(
                "number of stripes must be positive, got {}",
                self.num_stripes
            )));
        }
        if self.num_sub_stripes <= 0 {
            return Err(PartitionError::InvalidParameters(format!(
                "number of sub-stripes per stripe must be positive, got {}",
                self.num_sub_stripes
            )));
        }
        if self.num_stripes > i64::from(u16::MAX) || 2 * self.num_stripes * self.num_stripes > i64::from(u32::MAX) {
            return Err(PartitionError::InvalidParameters(format!(
                "{} stripes overflow the chunk id space",
                self.num_stripes
            )));
        }
        let sub_stripes = self.num_stripes.checked_mul(self.num_sub_stripes);
        if sub_stripes.is_none_or(|n| n > i64::from(u32::MAX) / 2) {
            return Err(PartitionError::InvalidParameters(format!(
                "{} stripes of {} sub-stripes overflow the sub-chunk id space",
                self.num_stripes, self.num_sub_stripes
            )));
        }
        Ok(())
    }
}
