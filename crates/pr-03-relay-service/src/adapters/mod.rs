//! Adapters connecting the relay to its transports.

pub mod bus;

pub use bus::RelayListener;
