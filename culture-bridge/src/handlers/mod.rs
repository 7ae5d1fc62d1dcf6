pub mod hub;
pub mod page;
