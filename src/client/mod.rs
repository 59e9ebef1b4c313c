//! Client side of a remote grid: request state, transports and the purely
//! local behaviours (frozen rows, responsive columns, redraw batching,
//! reactive data).

pub mod frozen;
pub mod reactive;
pub mod redraw;
pub mod request_builder;
pub mod responsive;
pub mod session;
pub mod transport;
