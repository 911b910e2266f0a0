//! Message passing between ranks and the byte layout of what they exchange.

pub mod communicator;
pub mod wire;

pub use communicator::{Communicator, RayonComm, Wait};
