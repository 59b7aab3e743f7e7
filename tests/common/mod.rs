pub mod engines;
pub mod fixtures;
pub mod payloads;
