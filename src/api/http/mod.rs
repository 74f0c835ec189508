pub mod auth;
pub mod files;
pub mod pages;
pub mod public;
pub mod qrs;
