pub mod database;
pub mod error;
pub mod gateway;

pub use database::{format_timestamp, now_timestamp, Database};
pub use error::{Result, StoreError};
pub use gateway::{CounterField, Store};
