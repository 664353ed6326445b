pub mod daemon_path;
pub mod insight;
pub mod process;
pub mod stats;
pub mod visibility;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use insight::{process_insight_command, InsightCommand};
use process::{daemon_executable, kill_previous_servers, restart_server};
use stats::{process_stats_command, StatsCommand};
use tracing::level_filters::LevelFilter;
use visibility::{process_visibility_command, VisibilityCommand};

use crate::{
    daemon::{args::DaemonArgs, start_daemon, storage::snapshot_storage::SnapshotStorageImpl, SNAPSHOT_DIR},
    remote::client::{HttpRemoteApi, RemoteApi},
    stats::source::StatsSource,
    utils::{
        config::Settings,
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Clarity", version, long_about = None)]
#[command(about = "Focus tracking with a Pomodoro timer", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application, replacing a running one")]
    Init {},
    #[command(
        about = "Run a daemon directly in current console. Handy with --pomodoro and --interactive"
    )]
    Serve {
        #[command(flatten)]
        daemon: ServeArgs,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Show focus and distraction stats")]
    Stats {
        #[command(flatten)]
        command: StatsCommand,
    },
    #[command(about = "Written feedback about a day")]
    Insight {
        #[command(flatten)]
        command: InsightCommand,
    },
    #[command(about = "Report whether the tracked surface is in the foreground")]
    Visibility {
        #[command(subcommand)]
        command: VisibilityCommand,
    },
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    #[arg(long)]
    pomodoro: Option<crate::timer::durations::TimerDurations>,
    #[arg(long, default_value_t = crate::timer::state::DEFAULT_CYCLES)]
    cycles: u32,
    #[arg(long)]
    interactive: bool,
}

/// What every command needs: where the data lives and how to reach the remote service.
pub struct CliContext {
    pub app_dir: PathBuf,
    pub settings: Settings,
}

impl CliContext {
    pub fn new(app_dir: PathBuf) -> Result<Self> {
        let settings = Settings::read(&app_dir)?;
        Ok(Self { app_dir, settings })
    }

    pub fn storage(&self) -> Result<SnapshotStorageImpl> {
        Ok(SnapshotStorageImpl::new(self.app_dir.join(SNAPSHOT_DIR))?)
    }

    /// `None` when no remote is configured or `enabled` is false.
    pub fn remote(&self, enabled: bool) -> Result<Option<Arc<dyn RemoteApi>>> {
        match self.settings.remote.as_ref().filter(|_| enabled) {
            Some(remote) => Ok(Some(Arc::new(HttpRemoteApi::new(remote)?))),
            None => Ok(None),
        }
    }

    pub fn stats_source(&self, remote: bool) -> Result<StatsSource<SnapshotStorageImpl>> {
        let timeout = self
            .settings
            .remote
            .as_ref()
            .map(|v| v.timeout())
            .unwrap_or(std::time::Duration::from_secs(5));
        Ok(StatsSource::new(self.storage()?, self.remote(remote)?, timeout))
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();
    let app_dir = match args.dir.clone() {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    match args.commands {
        Commands::Init {} => restart_server(args.dir.as_deref()),
        Commands::Stop {} => {
            let killed = kill_previous_servers(&daemon_executable()?)?;
            println!("Stopped {killed} daemon(s)");
            Ok(())
        }
        Commands::Serve { daemon } => {
            start_daemon(
                app_dir,
                DaemonArgs {
                    force: true,
                    dir: args.dir,
                    log_console: args.log,
                    log: logging_level,
                    pomodoro: daemon.pomodoro,
                    cycles: daemon.cycles,
                    interactive: daemon.interactive,
                },
            )
            .await
        }
        Commands::Stats { command } => {
            process_stats_command(&CliContext::new(app_dir)?, command).await
        }
        Commands::Insight { command } => {
            process_insight_command(&CliContext::new(app_dir)?, command).await
        }
        Commands::Visibility { command } => {
            process_visibility_command(&CliContext::new(app_dir)?, command).await
        }
    }
}
