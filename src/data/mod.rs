pub mod invite;
pub mod plan;
pub mod quiz;
pub mod student;
pub mod user;
