#![warn(missing_docs)]

//! HTTPS bootstrap surface: the local `server_data.php` endpoint and
//! DNS-over-HTTPS resolution.

pub mod resolver;
pub mod server;

mod client;
mod tls;

pub use resolver::{DnsProvider, DnsResolver, DnsStatus};
pub use server::{serve, RedirectTarget, WebConfig};
