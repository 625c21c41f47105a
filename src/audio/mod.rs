//! Audio decode/encode, the pure signal chain, and the spectral transform.

pub mod chain;
pub mod spectrum;
pub mod wav;
