//! Repositories wrapping database access.

pub mod complaint;

pub use complaint::{ComplaintRepository, NewComplaint};
