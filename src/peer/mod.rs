pub mod directory;
pub mod session;
pub mod validator;

pub use directory::{FileDirectory, MemoryDirectory, PeerDirectory};
pub use session::PeerClient;
pub use validator::{CommandValidator, RegexValidator};
