//! Storage layer.
//!
//! The rest of the system treats persistence as a collaborator exposing
//! simple CRUD by id and by (user, time-range). `Db` is the in-process
//! implementation of that contract.

pub mod memory;

pub use memory::Db;
