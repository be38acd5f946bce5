// store

mod session_store;

pub use session_store::*;

// collaborators

mod id_generator;
mod identity_directory;

pub use id_generator::*;
pub use identity_directory::*;
