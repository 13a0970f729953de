pub mod composite;
pub mod log_file;
pub mod webhook;

pub use composite::CompositeNotifier;
pub use log_file::LogFileNotifier;
pub use webhook::WebhookNotifier;
