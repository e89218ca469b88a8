pub mod registry;
pub mod sync;
pub mod verify;
