//! Canonical queue names shared by the scheduler, dispatcher, and capacity
//! admission control so none of them stringly-type the same constant twice.

/// Repeatable-entry queue the `JobScheduler` reconciles into; firing an
/// entry here enqueues a `JobExecutionTask` onto [`JOB_EXECUTION_QUEUE`].
pub const JOB_SCHEDULER_QUEUE: &str = "job-scheduler";

/// Execution queue `JobDispatcher` consumes. One of the two queues whose
/// combined active count `Capacity` reads.
pub const JOB_EXECUTION_QUEUE: &str = "job-execution";

/// The second queue counted towards `runningCapacity`; reserved for
/// per-script execution tasks a future executor collaborator may enqueue.
pub const TEST_EXECUTION_QUEUE: &str = "test-execution";

/// Repeatable-entry queue the `MonitorScheduler` reconciles into.
pub const MONITOR_SCHEDULER_QUEUE: &str = "monitor-scheduler";

/// Execution queue `MonitorDispatcher` consumes.
pub const MONITOR_EXECUTION_QUEUE: &str = "monitor-execution";
