pub mod elements;
pub mod fields;
