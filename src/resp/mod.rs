pub mod jwt;
pub mod problem;
pub mod session;
pub mod util;
