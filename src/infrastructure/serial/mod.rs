// Serial module - Serial port links
pub mod client;

pub use client::{list_ports, PortInfo, SerialLink, SerialOpener};
