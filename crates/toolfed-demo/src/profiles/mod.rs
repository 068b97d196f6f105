//! Demo tool servers, one per profile.
//!
//! All data is static and in memory. Writes (leave requests, meeting notes,
//! restock orders) last only as long as the server process.

mod diagnostics;
mod hr_policy;
mod sales_crm;
mod supply_chain;
mod weather;

pub use diagnostics::Diagnostics;
pub use hr_policy::HrPolicy;
pub use sales_crm::SalesCrm;
pub use supply_chain::SupplyChain;
pub use weather::Weather;

use crate::protocol::{
    Args, ResourceSpec, ResourceTemplateSpec, ResourceText, ToolError, ToolOutput, ToolSpec,
};

/// Profile names accepted on the command line.
pub const PROFILE_NAMES: &[&str] = &[
    "weather",
    "hr-policy",
    "sales-crm",
    "supply-chain",
    "diagnostics",
];

/// The tools and resources one demo server exposes.
pub trait Profile: Send {
    /// Reported as `serverInfo.name`.
    fn server_name(&self) -> &'static str;

    fn tools(&self) -> Vec<ToolSpec>;

    fn call_tool(&mut self, name: &str, args: &Args) -> Result<ToolOutput, ToolError>;

    fn resources(&self) -> Vec<ResourceSpec> {
        Vec::new()
    }

    fn resource_templates(&self) -> Vec<ResourceTemplateSpec> {
        Vec::new()
    }

    /// `None` for URIs this profile does not serve.
    fn read_resource(&self, _uri: &str) -> Option<ResourceText> {
        None
    }
}

/// Build the profile called `name`.
pub fn by_name(name: &str) -> Option<Box<dyn Profile>> {
    let profile: Box<dyn Profile> = match name {
        "weather" => Box::new(Weather::new()),
        "hr-policy" => Box::new(HrPolicy::new()),
        "sales-crm" => Box::new(SalesCrm::new()),
        "supply-chain" => Box::new(SupplyChain::new()),
        "diagnostics" => Box::new(Diagnostics),
        _ => return None,
    };
    Some(profile)
}
