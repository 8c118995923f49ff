pub mod analysis;
pub mod entitlement;
pub mod orders;
pub mod pricing;
