#![allow(dead_code)]

pub mod builders;
pub mod stores;
pub mod strategies;

pub use builders::*;
pub use stores::*;
pub use strategies::*;
