pub mod daemon;

pub use daemon::DaemonClient;
