use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use super::daemon_path::to_daemon_path;

/// Stops every process started from `name`, except this one and its children. Returns how many
/// were stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid {e}"))?;
    let mut killed = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping daemon {pid}");
            // This will forcefully terminate the process on Windows. The daemon flushes on
            // Ctrl-C only.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            killed += 1;
        }
    }
    Ok(killed)
}

pub fn daemon_executable() -> Result<PathBuf> {
    let current = env::current_exe().map_err(|e| anyhow!("Can't operate without an executable {e}"))?;
    Ok(to_daemon_path(current))
}

/// Stops the running daemon and starts a new one. The daemon detaches by itself.
pub fn restart_server(dir: Option<&Path>) -> Result<()> {
    let daemon = daemon_executable()?;
    kill_previous_servers(&daemon)?;
    let mut command = std::process::Command::new(&daemon);
    if let Some(dir) = dir {
        command.arg("--dir").arg(dir);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    println!("Spawning {daemon:?}");
    let status = command.status()?;
    if !status.success() {
        return Err(anyhow!("Daemon exited with {status}"));
    }
    println!("Success");
    Ok(())
}
