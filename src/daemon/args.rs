use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use crate::timer::durations::TimerDurations;

#[derive(Parser, Debug, Clone)]
pub struct DaemonArgs {
    /// Run in the current process instead of detaching.
    #[arg(long)]
    pub force: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    #[arg(
        long,
        help = "Run a Pomodoro timer. Either a preset (\"test\", \"25/5\", \"50/10\") or \"focus/break\" like \"45m/15m\""
    )]
    pub pomodoro: Option<TimerDurations>,
    #[arg(long, help = "Number of focus/break cycles", default_value_t = crate::timer::state::DEFAULT_CYCLES)]
    pub cycles: u32,
    #[arg(
        long,
        help = "Read timer commands from stdin: s to start, p to pause or resume, r to reset, q to quit"
    )]
    pub interactive: bool,
}
