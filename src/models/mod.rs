pub mod elements;
pub mod pages;
pub mod qrs;
pub mod users;
