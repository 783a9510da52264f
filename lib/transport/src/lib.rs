//! The signal-channel transport (§4.2) and file-transfer plumbing (§4.6)
//! shared by the manager, workers, and nodes.

mod client;
pub use client::*;

mod errors;
pub use errors::*;

mod file_transfer;
pub use file_transfer::*;

mod server;
pub use server::*;
