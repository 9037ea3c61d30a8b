pub mod converter;
pub mod staging;
