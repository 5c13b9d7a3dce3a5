//! Delegated builds: the client side used by midtier/edge hosts and the HTTP
//! server that runs those builds next to AWX.

pub mod client;
pub mod server;
pub mod wire;

pub use client::RelayClient;
pub use server::{router, serve};
