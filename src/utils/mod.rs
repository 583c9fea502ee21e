pub mod keyed_lock;
pub mod username_cache;
