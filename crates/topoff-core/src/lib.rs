pub mod brew;
pub mod collaborators;
pub mod execution;
pub mod models;
pub mod orchestration;
pub mod persistence;
pub mod sqlite;
