pub mod error;
pub mod io;
pub mod outdated;
pub mod probe;
pub mod process;
pub mod reconcile;
pub mod registry;
pub mod rules;
pub mod verify;

pub use error::{Result, VersyncError};
