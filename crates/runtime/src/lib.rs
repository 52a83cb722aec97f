pub mod generation;
pub mod notices;
pub mod phase;

pub use generation::*;
pub use notices::*;
pub use phase::*;
