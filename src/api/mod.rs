pub mod employee;
pub mod report;
pub mod session;
pub mod task;
pub mod worklog;
