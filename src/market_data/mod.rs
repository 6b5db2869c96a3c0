pub mod feed;
pub mod snapshot;
pub mod stream;
pub mod types;
