pub mod hazard;
pub mod normalize;
pub mod payload;

pub use hazard::*;
pub use normalize::*;
pub use payload::*;
