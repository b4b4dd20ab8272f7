//! Test support: mock implementations of external collaborators.

pub mod mocks;

pub use mocks::{MockTransport, PublishedMessage};
