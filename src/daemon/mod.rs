use std::{
    io::BufRead,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use collection::{
    collector::DataCollectionModule,
    usage_event::UsageEvent,
    visibility::{StateFileVisibility, VisibilitySource},
};
use processing::{usage::UsageProcessor, ProcessingModule};
use storage::snapshot_storage::SnapshotStorageImpl;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    fs::operations::acquire_instance_lock,
    insights::service::InsightService,
    remote::{
        client::{HttpRemoteApi, RemoteApi},
        session::{DistractionReport, RemoteSessionModule},
    },
    stats::{refresh::StatsRefreshModule, source::StatsSource},
    timer::{
        durations::TimerDurations,
        module::{TimerCommand, TimerModule, TimerReadout, DEFAULT_TICK_INTERVAL},
        presentation::PresentationModule,
        state::{FocusMode, TimerState},
    },
    utils::{
        clock::{Clock, DefaultClock},
        config::{Settings, TrackingSettings},
    },
};

use args::DaemonArgs;

pub mod args;
pub mod collection;
pub mod processing;
pub mod shutdown;
pub mod storage;

pub const SNAPSHOT_DIR: &str = "snapshots";
pub const LOCK_FILE_NAME: &str = "daemon.lock";

const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Represents the starting point for the daemon
pub async fn start_daemon(app_dir: PathBuf, args: DaemonArgs) -> Result<()> {
    let _lock = acquire_instance_lock(&app_dir.join(LOCK_FILE_NAME)).await?;
    let settings = read_settings(&app_dir);
    std::env::set_current_dir("/")?;

    let shutdown_token = CancellationToken::new();
    let storage = Arc::new(SnapshotStorageImpl::new(app_dir.join(SNAPSHOT_DIR))?);
    let remote = create_remote(&settings);
    let insights = Arc::new(InsightService::from_settings(&settings.insights));

    let (event_sender, event_receiver) = mpsc::channel::<UsageEvent>(10);
    let (focus_sender, focus_receiver) = watch::channel(FocusMode::default());
    let (notification_sender, _) = broadcast::channel(16);
    let (stats_sender, stats_receiver) = watch::channel(None);
    let (distraction_sender, distraction_receiver) = mpsc::channel::<DistractionReport>(16);

    let collector = create_collector(
        event_sender,
        StateFileVisibility::new(&app_dir),
        &shutdown_token,
        DefaultClock,
    );

    let processor = create_processor(
        storage.clone(),
        event_receiver,
        &settings.tracking,
        focus_receiver,
        remote.as_ref().map(|_| distraction_sender),
        &DefaultClock,
    )
    .await;

    let sessions = remote.clone().map(|api| {
        RemoteSessionModule::new(
            api,
            notification_sender.subscribe(),
            distraction_receiver,
            shutdown_token.clone(),
        )
    });

    let refresh = StatsRefreshModule::new(
        StatsSource::new(
            storage,
            remote,
            settings
                .remote
                .as_ref()
                .map_or(DEFAULT_REMOTE_TIMEOUT, |v| v.timeout()),
        ),
        None,
        stats_sender,
        shutdown_token.clone(),
        settings.refresh_interval(),
        Arc::new(DefaultClock),
    );

    let timer_enabled = args.pomodoro.is_some() || args.interactive;
    let durations = args.pomodoro.unwrap_or_default();
    let state = TimerState::new(durations, args.cycles.max(1));
    let (readout_sender, readout_receiver) = watch::channel(TimerReadout::from(&state));
    let (command_sender, command_receiver) = mpsc::channel(8);

    let presentation = PresentationModule::new(
        notification_sender.subscribe(),
        timer_enabled.then_some(readout_receiver),
        Some(stats_receiver),
        insights,
        shutdown_token.clone(),
        std::io::stdout(),
    );

    let timer = timer_enabled.then(|| {
        info!("Pomodoro timer set to {durations} for {} cycles", state.cycles());
        TimerModule::new(
            state,
            command_receiver,
            notification_sender,
            focus_sender,
            readout_sender,
            shutdown_token.clone(),
            DEFAULT_TICK_INTERVAL,
            Box::new(DefaultClock),
        )
    });

    if args.pomodoro.is_some() {
        command_sender.try_send(TimerCommand::Start)?;
    }
    if args.interactive {
        spawn_command_reader(command_sender, durations, shutdown_token.clone());
    }

    let (
        _,
        collection_result,
        processing_result,
        timer_result,
        session_result,
        refresh_result,
        presentation_result,
    ) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        collector.run(),
        processor.run(),
        async {
            match timer {
                Some(timer) => timer.run().await,
                None => Ok(()),
            }
        },
        async {
            match sessions {
                Some(sessions) => sessions.run().await,
                None => Ok(()),
            }
        },
        refresh.run(),
        presentation.run(),
    );

    for (name, result) in [
        ("Collection", collection_result),
        ("Processing", processing_result),
        ("Timer", timer_result),
        ("Remote session", session_result),
        ("Stats refresh", refresh_result),
        ("Presentation", presentation_result),
    ] {
        if let Err(e) = result {
            error!("{name} module got an error {e:?}");
        }
    }

    Ok(())
}

/// A broken settings file never stops the daemon, defaults are used instead.
fn read_settings(app_dir: &Path) -> Settings {
    Settings::read(app_dir).unwrap_or_else(|e| {
        error!("Couldn't read settings, using defaults {e:?}");
        Settings::default().with_overrides(|key| std::env::var(key).ok())
    })
}

fn create_remote(settings: &Settings) -> Option<Arc<dyn RemoteApi>> {
    let remote = settings.remote.as_ref()?;
    match HttpRemoteApi::new(remote) {
        Ok(api) => {
            info!("Using remote service at {}", remote.base_url);
            Some(Arc::new(api))
        }
        Err(e) => {
            error!("Couldn't create remote client, continuing locally {e}");
            None
        }
    }
}

/// `set` accepts a preset or `focus/break`. An invalid side keeps its previous value.
fn parse_command(line: &str, durations: &mut TimerDurations) -> Option<TimerCommand> {
    match line.trim() {
        "s" | "start" => Some(TimerCommand::Start),
        "p" | "pause" => Some(TimerCommand::Toggle),
        "r" | "reset" => Some(TimerCommand::Reset),
        other => {
            let value = other.strip_prefix("set ")?.trim();
            *durations = match TimerDurations::preset(value) {
                Some(preset) => preset,
                None => {
                    let (focus, break_) = value.split_once('/')?;
                    durations.updated(focus, break_)
                }
            };
            Some(TimerCommand::SetDurations(*durations))
        }
    }
}

/// Stdin is read on a plain thread so a pending read never holds up shutdown.
fn spawn_command_reader(
    commands: mpsc::Sender<TimerCommand>,
    mut durations: TimerDurations,
    shutdown: CancellationToken,
) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if matches!(line.trim(), "q" | "quit") {
                shutdown.cancel();
                break;
            }
            match parse_command(&line, &mut durations) {
                Some(command) => {
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                None => warn!("Unknown command {line:?}"),
            }
        }
    });
}

fn create_collector(
    sender: mpsc::Sender<UsageEvent>,
    source: impl VisibilitySource + 'static,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> DataCollectionModule {
    DataCollectionModule::new(
        sender,
        Box::new(source),
        shutdown_token.clone(),
        DEFAULT_COLLECTION_INTERVAL,
        Box::new(clock),
    )
}

async fn create_processor(
    storage: Arc<SnapshotStorageImpl>,
    receiver: mpsc::Receiver<UsageEvent>,
    settings: &TrackingSettings,
    focus_mode: watch::Receiver<FocusMode>,
    distractions: Option<mpsc::Sender<DistractionReport>>,
    clock: &dyn Clock,
) -> ProcessingModule<UsageProcessor<Arc<SnapshotStorageImpl>>> {
    let processor = UsageProcessor::load(storage, clock, settings, focus_mode, distractions).await;
    ProcessingModule::new(receiver, processor)
}
