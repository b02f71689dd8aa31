pub mod archive;
pub mod dashboard;
pub mod league;
pub mod player;
