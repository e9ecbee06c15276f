//! the command line surface of the image tool
pub mod cli_struct;
pub use cli_struct::*;
