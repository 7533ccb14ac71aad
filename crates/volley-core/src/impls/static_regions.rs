//! Fixed-set region oracle for local and single-region deployments.

use async_trait::async_trait;

use crate::domain::{Region, VolleyError};
use crate::ports::RegionOracle;

pub struct StaticRegionOracle {
    regions: Vec<Region>,
}

impl StaticRegionOracle {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }
}

#[async_trait]
impl RegionOracle for StaticRegionOracle {
    async fn deployed_regions(&self) -> Result<Vec<Region>, VolleyError> {
        Ok(self.regions.clone())
    }
}
