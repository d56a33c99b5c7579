pub mod listening;
pub mod messages;
pub mod snapshot;

pub use snapshot::StoreError;
