pub mod diagnostics;
pub mod display;
pub mod language;
pub mod options;
pub mod runtime;
pub mod session;

pub use options::Options;
pub use session::{Error, Session};

#[cfg(test)]
mod tests;
