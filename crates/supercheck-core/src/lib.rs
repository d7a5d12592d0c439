//! Domain entities, id newtypes, and the error taxonomy shared by every
//! crate in the scheduler/monitor execution core.

pub mod alert;
pub mod error;
pub mod ids;
pub mod job;
pub mod monitor;
pub mod monitor_result;
pub mod provider;
pub mod queue_names;
pub mod report;
pub mod run;

pub use alert::{AlertConfig, AlertHistory, AlertKind, AlertStatus, Severity, TargetKind};
pub use error::{Result, SupercheckError};
pub use ids::{AlertId, JobId, MonitorId, MonitorResultId, ProviderId, RunId, TestScriptId};
pub use job::{Job, JobStatus, TestScript};
pub use monitor::{
	AuthConfig, AuthType, HeartbeatMonitorConfig, HttpMethod, HttpMonitorConfig, Monitor,
	MonitorConfig, MonitorStatus, MonitorType, PingMonitorConfig, PortMonitorConfig, PortProtocol,
};
pub use monitor_result::{
	HeartbeatProbeDetails, HttpProbeDetails, MonitorResult, MonitorResultDetails,
	PingProbeDetails, PortProbeDetails, ProbeResult, ProbeStatus, SslCertificateSummary,
};
pub use provider::{
	DiscordProviderConfig, EmailProviderConfig, NotificationProvider, ProviderConfig,
	ProviderType, SlackProviderConfig, TelegramProviderConfig, WebhookProviderConfig,
};
pub use queue_names::{
	JOB_EXECUTION_QUEUE, JOB_SCHEDULER_QUEUE, MONITOR_EXECUTION_QUEUE, MONITOR_SCHEDULER_QUEUE,
	TEST_EXECUTION_QUEUE,
};
pub use report::{EntityType, Report};
pub use run::{Run, RunArtifact, RunStatus, Trigger};
