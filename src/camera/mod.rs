pub mod overlay;
pub mod sampler;
pub mod session;
