//! Capacity admission control, the Job/Monitor dispatchers, and heartbeat
//! ingress: the layer that turns queued execution tasks into probes and
//! subprocess test runs (`spec.md` §4.4/§4.6/§4.9, §6).

pub mod capacity;
pub mod error;
pub mod executor;
pub mod heartbeat;
pub mod job;
pub mod monitor;
pub mod outcome;

pub use capacity::Capacity;
pub use error::{DispatchError, Result};
pub use heartbeat::HeartbeatReceiver;
pub use job::{JobDispatcher, JobDispatcherConfig, JobExecutionPayload};
pub use monitor::{MonitorDispatcher, MonitorExecutionPayload};
pub use outcome::{JobOutcomeSink, MonitorOutcomeSink, NoopOutcomeSink};
