mod session;
mod writer;

pub use session::*;
pub use writer::*;
