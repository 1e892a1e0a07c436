pub mod role;
pub mod session;
pub mod task;
pub mod user;
pub mod worklog;
