use anyhow::Result;
use clap::Subcommand;
use tracing::warn;

use crate::{
    daemon::collection::visibility::{write_visibility, VisibilityState},
    remote::entities::ActivityLog,
    tracking::classifier::DistractionList,
};

use super::CliContext;

#[derive(Debug, Subcommand)]
pub enum VisibilityCommand {
    #[command(about = "The tracked surface is in the foreground")]
    Show {
        #[arg(long, help = "Active domain or window, e.g. github.com")]
        context: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
    #[command(about = "The tracked surface went to the background")]
    Hide {},
}

/// What the remote service is told about a visibility change.
fn activity_for(command: &VisibilityCommand, distractions: &DistractionList) -> ActivityLog {
    match command {
        VisibilityCommand::Show {
            context,
            url,
            title,
        } => ActivityLog {
            kind: "page_view".into(),
            url: url.clone(),
            title: title.clone(),
            domain: context.clone(),
            is_distraction: context.as_deref().map(|v| distractions.is_distraction(v)),
        },
        VisibilityCommand::Hide {} => ActivityLog {
            kind: "tab_switch".into(),
            url: None,
            title: None,
            domain: None,
            is_distraction: None,
        },
    }
}

/// Writes the state the daemon polls, then logs the change remotely when a service is configured.
/// A remote failure doesn't fail the command.
pub async fn process_visibility_command(
    context: &CliContext,
    command: VisibilityCommand,
) -> Result<()> {
    let state = match &command {
        VisibilityCommand::Show { context, .. } => VisibilityState {
            visible: true,
            context: context.clone(),
        },
        VisibilityCommand::Hide {} => VisibilityState {
            visible: false,
            context: None,
        },
    };
    write_visibility(&context.app_dir, &state).await?;

    if let Some(remote) = context.remote(true)? {
        let distractions = DistractionList::new(
            context
                .settings
                .tracking
                .distraction_domains
                .iter()
                .map(String::as_str),
        );
        if let Err(e) = remote
            .log_activity(&activity_for(&command, &distractions))
            .await
        {
            warn!("Couldn't log activity remotely {e}");
        }
    }
    Ok(())
}
