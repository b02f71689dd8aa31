pub mod regions;
pub mod seasons;
