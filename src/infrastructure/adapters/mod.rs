//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod normalizer;
pub mod player;
pub mod resolver;

pub use normalizer::*;
pub use player::*;
pub use resolver::*;
