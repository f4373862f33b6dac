pub mod roster;
pub mod users;
