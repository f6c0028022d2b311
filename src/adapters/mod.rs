pub mod amap;

pub use amap::AmapClient;
