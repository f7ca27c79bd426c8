//! File persistence adapters

mod local;

pub use local::LocalFileStore;
