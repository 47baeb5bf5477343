pub mod clock;
pub mod ttl_cache;
