mod tracker;

pub mod time;

pub use tracker::*;
