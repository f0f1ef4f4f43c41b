pub mod melt;
pub mod melt_pool;
