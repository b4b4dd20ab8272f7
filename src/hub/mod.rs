//! Hub protocol core: connection state, message dispatch, and the polling loop.

mod controller;
mod runner;

pub use controller::HubController;
pub use runner::HubRunner;
