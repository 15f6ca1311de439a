//! Domain model module declarations.

pub mod command;
pub mod cuelist;
pub mod state;
