mod alerts;
mod capacity;
mod database;
mod janitor;
mod logging;
mod queue;

pub use alerts::{load_smtp_password_env, AlertsConfig, AlertsConfigLayer, SmtpConfig, SmtpConfigLayer};
pub use capacity::{CapacityConfig, CapacityConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use janitor::{JanitorConfig, JanitorConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use queue::{QueueConfig, QueueConfigLayer};
