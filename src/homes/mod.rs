pub mod cooldown;
pub mod eligibility;
pub mod host;
pub mod presenter;
pub mod service;
pub mod store;
pub mod teleport;

#[cfg(test)]
mod testing;
