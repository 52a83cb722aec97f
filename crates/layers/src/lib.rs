pub mod config;
pub mod controller;
pub mod geolocation;
pub mod interaction;
pub mod layer;
pub mod manager;
pub mod provider;
pub mod pulse;
pub mod registry;
pub mod render;
pub mod symbology;

pub use config::*;
pub use controller::*;
pub use geolocation::*;
pub use interaction::*;
pub use layer::*;
pub use manager::*;
pub use provider::*;
pub use pulse::*;
pub use registry::*;
pub use render::*;
pub use symbology::*;
