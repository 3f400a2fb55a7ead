pub mod analysis;
pub mod modules;
pub mod types;
pub mod utils;
