pub mod client;
pub mod endpoint;
pub mod singleflight;
pub mod transport;

pub use client::UpstreamClient;
pub use endpoint::{EndpointPhase, UpstreamEndpoint};
pub use singleflight::Singleflight;
