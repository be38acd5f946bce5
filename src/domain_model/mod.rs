mod expiry;
mod session;
mod token;
mod user;

pub use expiry::*;
pub use session::*;
pub use token::*;
pub use user::*;
