//! Infrastructure layer: persistence, delivery seams, audit, and the
//! invoice application service.

pub mod audit;
pub mod comms;
pub mod service;
pub mod store;
