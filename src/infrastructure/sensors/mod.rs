pub mod procfs;
pub mod sysinfo_source;

pub use sysinfo_source::SysinfoSource;
