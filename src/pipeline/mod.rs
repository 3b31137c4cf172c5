// Batch pipeline: bronze -> silver cleaning, silver -> gold warehouse load

pub mod gold;
pub mod processing;
pub mod silver;

pub use gold::{GoldLoader, GoldReport};
pub use silver::{SilverPipeline, SilverReport};
