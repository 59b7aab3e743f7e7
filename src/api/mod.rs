pub mod catalog;
pub mod derivation;
pub mod foundation;
pub mod interaction;
pub mod tooling;

pub use catalog::*;
pub use derivation::*;
pub use foundation::*;
pub use interaction::*;
pub use tooling::*;
