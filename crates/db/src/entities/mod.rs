//! Database entities.

pub mod complaint;

pub use complaint::Entity as Complaint;
