pub mod messages;
pub mod settings;
pub mod sweep;

pub use messages::*;
pub use settings::*;
pub use sweep::*;
