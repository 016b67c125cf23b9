pub mod delivery;
pub mod quotes;
pub mod usage;
