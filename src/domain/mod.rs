pub mod difficulty;
pub mod grid;
pub mod target;
