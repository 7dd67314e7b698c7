pub mod classify;
pub mod exec;
pub mod restore;
