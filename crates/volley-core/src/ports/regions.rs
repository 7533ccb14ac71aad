//! RegionOracle port - "is this region provisioned?"
//!
//! Returns the full deployed set so a rejection can name both the missing
//! regions and the available ones.

use async_trait::async_trait;

use crate::domain::{Region, VolleyError};

#[async_trait]
pub trait RegionOracle: Send + Sync {
    async fn deployed_regions(&self) -> Result<Vec<Region>, VolleyError>;
}
