mod identity_directory_memory;
mod session_store_memory;

pub use identity_directory_memory::*;
pub use session_store_memory::*;
