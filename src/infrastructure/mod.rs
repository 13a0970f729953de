pub mod notifications;
pub mod persistence;
pub mod sensors;
