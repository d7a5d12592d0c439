//! Supercheck scheduler/dispatcher/alerting worker process.
//!
//! Boots the shared SQLite pool, reconciles `jobs`/`monitors` into queue
//! repeatable entries, and runs the worker pools that turn firings into
//! probes and subprocess test runs, with an `AlertEngine` wired in as the
//! outcome sink for both dispatchers and a `Janitor` sweeping queue
//! residue in the background.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use supercheck_alerts::{AlertEngine, TransportNotifier};
use supercheck_core::{
	JOB_EXECUTION_QUEUE, JOB_SCHEDULER_QUEUE, MONITOR_EXECUTION_QUEUE, MONITOR_SCHEDULER_QUEUE,
};
use supercheck_db::{create_pool, SqliteRepo};
use supercheck_dispatch::{Capacity, JobDispatcher, JobDispatcherConfig, MonitorDispatcher};
use supercheck_janitor::Janitor;
use supercheck_queue::{Queue, Worker};
use supercheck_scheduler::{JobScheduler, JobSchedulerProcessor, MonitorScheduler, MonitorSchedulerProcessor};
use supercheck_smtp::SmtpClient;

mod version;

/// Gap between two reconcile passes — `jobs`/`monitors` mutations made
/// through a future API layer only take effect on the next pass, since
/// there's no mutation-hook to reconcile eagerly on.
const RECONCILE_INTERVAL: Duration = Duration::from_secs(30);

/// Bound on how long shutdown waits for in-flight work before giving up
/// on a clean join (`spec.md` §5's default 30s grace period).
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "supercheck-server", about = "Supercheck scheduling and alerting worker", version)]
struct Args {
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();
	let config = supercheck_config::load_config()?;

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(database = %config.database.url, "starting supercheck-server");

	// One pool serves both the domain schema (`supercheck-db`, applied by
	// `create_pool`) and the queue schema (`supercheck-queue`, applied
	// explicitly below). Both migration sets use `CREATE TABLE IF NOT
	// EXISTS` against disjoint table names, so sharing a single SQLite
	// file keeps the deployment to one binary and one file.
	let pool = create_pool(&config.database.url).await?;
	supercheck_queue::migrations::run_migrations(&pool).await?;

	let repo = Arc::new(SqliteRepo::new(pool.clone()));
	let queue = Queue::new(pool.clone());

	let job_scheduler = Arc::new(JobScheduler::new(Arc::clone(&repo), queue.clone()));
	let monitor_scheduler = Arc::new(MonitorScheduler::new(Arc::clone(&repo), queue.clone()));

	job_scheduler.reconcile().await?;
	monitor_scheduler.reconcile().await?;

	let capacity = Arc::new(Capacity::new(queue.clone(), config.capacity.running));

	let smtp = match &config.smtp {
		Some(smtp_config) => Some(SmtpClient::new(supercheck_smtp::SmtpConfig {
			host: smtp_config.host.clone(),
			port: smtp_config.port,
			username: smtp_config.username.clone(),
			password: smtp_config.password.clone(),
			from_address: smtp_config.from_address.clone(),
			from_name: smtp_config.from_name.clone(),
			use_tls: smtp_config.use_tls,
		})?),
		None => None,
	};
	let notifier = Arc::new(TransportNotifier::new(supercheck_http::new_client(), smtp));
	let alert_engine = Arc::new(AlertEngine::new(Arc::clone(&repo), notifier, config.alerts.clone()));

	let job_dispatcher = Arc::new(JobDispatcher::new(
		Arc::clone(&repo),
		Arc::clone(&capacity),
		alert_engine.clone(),
		JobDispatcherConfig::default(),
	));
	let monitor_dispatcher = Arc::new(MonitorDispatcher::new(Arc::clone(&repo), alert_engine.clone()));

	let janitor = Arc::new(Janitor::new(Arc::clone(&repo), queue.clone(), config.janitor.clone()));

	let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
	let poll_interval = Duration::from_millis(config.queue.poll_interval_ms);

	let mut handles: Vec<JoinHandle<()>> = Vec::new();

	handles.push(
		Worker::new(queue.clone(), JOB_SCHEDULER_QUEUE, Arc::new(JobSchedulerProcessor::new(Arc::clone(&repo), queue.clone())), 4)
			.with_poll_interval(poll_interval)
			.spawn(shutdown_tx.subscribe()),
	);
	handles.push(
		Worker::new(queue.clone(), JOB_EXECUTION_QUEUE, job_dispatcher, config.queue.job_execution_concurrency as usize)
			.with_poll_interval(poll_interval)
			.spawn(shutdown_tx.subscribe()),
	);
	handles.push(
		Worker::new(queue.clone(), MONITOR_SCHEDULER_QUEUE, Arc::new(MonitorSchedulerProcessor::new(queue.clone())), 8)
			.with_poll_interval(poll_interval)
			.spawn(shutdown_tx.subscribe()),
	);
	handles.push(
		Worker::new(queue.clone(), MONITOR_EXECUTION_QUEUE, monitor_dispatcher, config.queue.monitor_execution_concurrency as usize)
			.with_poll_interval(poll_interval)
			.spawn(shutdown_tx.subscribe()),
	);
	handles.push(spawn_reconcile_loop(Arc::clone(&job_scheduler), Arc::clone(&monitor_scheduler), shutdown_tx.subscribe()));
	handles.push(janitor.spawn(shutdown_tx.subscribe()));

	tracing::info!("supercheck-server ready");
	tokio::signal::ctrl_c().await?;
	tracing::info!("shutdown signal received, draining in-flight work");

	let _ = shutdown_tx.send(());
	let join_all = futures_join_all(handles);
	if tokio::time::timeout(SHUTDOWN_GRACE, join_all).await.is_err() {
		tracing::warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "shutdown grace period elapsed with workers still in flight");
	}

	tracing::info!("supercheck-server shutdown complete");
	Ok(())
}

/// Re-reconciles `jobs`/`monitors` into queue repeatable entries on a
/// fixed interval — the only trigger available without a mutation-hook
/// from an API layer, which is out of scope here.
fn spawn_reconcile_loop<R: supercheck_db::Repo + 'static>(
	job_scheduler: Arc<JobScheduler<R>>,
	monitor_scheduler: Arc<MonitorScheduler<R>>,
	mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		loop {
			tokio::select! {
				_ = tokio::time::sleep(RECONCILE_INTERVAL) => {
					if let Err(e) = job_scheduler.reconcile().await {
						tracing::warn!(error = %e, "job reconcile pass failed");
					}
					if let Err(e) = monitor_scheduler.reconcile().await {
						tracing::warn!(error = %e, "monitor reconcile pass failed");
					}
				}
				_ = shutdown.recv() => break,
			}
		}
	})
}

async fn futures_join_all(handles: Vec<JoinHandle<()>>) {
	for handle in handles {
		let _ = handle.await;
	}
}
