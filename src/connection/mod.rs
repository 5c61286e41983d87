//! Connected sessions.

mod session;

pub use session::Session;
