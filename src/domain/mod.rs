//! Domain layer: payment value types, status rules and the ports the
//! application layer drives.

pub mod notice;
pub mod payment;
pub mod ports;
