//! Device transports: real HTTP endpoints and a scripted simulation.
pub mod error;
pub mod http;
pub mod sim;

pub use http::HttpTransport;
pub use sim::SimulatedTransport;
