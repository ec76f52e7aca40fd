pub mod config;
pub mod protocol;

pub use config::{PeerConfig, TrackerConfig};
pub use protocol::{Request, Response, TrackerReply};
