pub mod assignment;
pub mod driver;
pub mod report;
pub mod vehicle;
