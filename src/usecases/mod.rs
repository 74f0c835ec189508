pub mod auth;
pub mod files;
pub mod ownership;
pub mod pages;
pub mod public;
pub mod qrs;
