pub mod convert;
pub mod dice;
pub mod distribution;
pub mod environment;
pub mod error;
pub mod import;
pub mod interpreter;
pub mod records;
pub mod value;

pub use interpreter::Interpreter;
