pub mod activity_log;
pub mod employee;
pub mod timesheet;
