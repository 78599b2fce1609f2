//! Command implementations for the ndoc CLI.

pub mod decode;
pub mod inspect;
pub mod seal;

pub use decode::{DecodeArgs, cmd_decode};
pub use inspect::cmd_inspect;
pub use seal::{cmd_seal, parse_key};
