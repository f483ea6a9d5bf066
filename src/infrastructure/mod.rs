pub mod clock;
pub mod in_memory;
pub mod random;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
