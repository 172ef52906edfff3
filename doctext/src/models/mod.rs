mod common;
mod extraction;

pub use common::*;
pub use extraction::*;
