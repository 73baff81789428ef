pub mod config;
pub mod node;
pub mod task;
pub mod timer;

pub use config::*;
pub use node::*;
pub use task::*;
pub use timer::*;
