pub mod handler;
pub mod registry;
pub mod server;

pub use handler::SessionHandler;
pub use registry::{Registry, Session};
pub use server::Tracker;
