//! Company profile: display name and market capitalization.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub company_name: String,
    pub market_cap: f64,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

impl CompanyProfile {
    pub fn meets_cap(&self, min_market_cap: f64) -> bool {
        self.market_cap >= min_market_cap
    }
}
