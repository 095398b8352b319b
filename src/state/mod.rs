//! Observable state stores shared between services

pub mod store;

pub use store::Store;
