pub mod command;
pub mod session;
