pub mod kv;
pub mod pool;
pub mod repo;
pub mod schema;
