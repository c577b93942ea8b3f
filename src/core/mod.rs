pub mod commands;
pub mod config;
pub mod error;
pub mod input_loop;
pub mod render_loop;
pub mod scheduler;
pub mod session;

pub use config::Config;
pub use scheduler::Scheduler;
pub use session::Session;
