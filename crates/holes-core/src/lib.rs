pub mod config;
pub mod discovery;
pub mod error;
pub mod gate;
pub mod graph;
pub mod hole;
pub mod io;
pub mod mark;
pub mod parser;
pub mod paths;
pub mod process;
pub mod propagate;
pub mod report;
pub mod resolution;
pub mod runner;
pub mod types;

pub use error::{HolesError, Result};
