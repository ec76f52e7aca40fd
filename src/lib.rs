//! Mini Share Library
//!
//! A tracker-coordinated peer-to-peer file sharing overlay. The tracker keeps
//! peer membership and per-peer file catalogs; peers fetch whole files from
//! each other over a direct transfer connection located via the tracker.

pub mod core;
pub mod network;
pub mod peer;
pub mod tracker;
pub mod transfer;
pub mod utils;

// Re-export main types
pub use crate::core::{PeerConfig, TrackerConfig};
pub use peer::{FileDirectory, PeerClient, RegexValidator};
pub use tracker::{Registry, Tracker};
pub use transfer::{TransferClient, TransferServer};
pub use utils::error::{Result, ShareError};
