//! Sampler implementations.

pub mod remote;
pub mod replay;
pub mod synthetic;

pub use remote::RemoteSampler;
pub use replay::ReplaySampler;
pub use synthetic::SyntheticSampler;
