#![warn(missing_docs)]
//! ENet transport endpoints for both proxy legs.

mod endpoint;

pub use endpoint::{Endpoint, TransportEvent};
