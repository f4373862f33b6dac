pub mod import;
pub mod roster;
pub mod user;
