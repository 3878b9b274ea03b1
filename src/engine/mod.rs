pub mod assignments;
pub mod export;
pub mod overlap;
