pub mod capabilities;
pub mod identity;
pub mod profile;
pub mod team;
