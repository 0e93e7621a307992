pub mod company;
pub mod proxy;
pub mod stats;
