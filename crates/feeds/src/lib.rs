pub mod classify;
pub mod config;
pub mod protocol;
pub mod source;

pub use classify::*;
pub use config::*;
pub use protocol::*;
pub use source::*;
