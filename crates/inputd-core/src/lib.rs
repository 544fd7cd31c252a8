// Protocol dispatcher, capability resolution, and the loopback command server.

pub mod capability;
pub mod capture;
pub mod connection;
pub mod inject;
pub mod protocol;
pub mod registry;
pub mod server;
