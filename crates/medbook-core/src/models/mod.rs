//! Domain models for the medbook system.

mod doctor;
mod library;
mod patient;
mod visit;

pub use doctor::*;
pub use library::*;
pub use patient::*;
pub use visit::*;

/// A record stored in an id-keyed collection.
pub trait Record {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}
