//! Chat command surface
//!
//! Turns a line of user input into a coordinator call and renders the reply.

use stormwatch::tracker::{TrackOutcome, TrackingCoordinator, UntrackOutcome};
use stormwatch::utils::capitalize;

/// Context id used for commands typed on the console
pub const CONSOLE_CONTEXT: &str = "console";

pub const HELP_TEXT: &str = "**National Hurricane Center Storm Tracker**\n\
Scans the NHC's basin feed every 6 hours and automatically tracks any active storms found\n\
`help` - displays this help prompt\n\
`track <storm name>` - manually tracks storm (if not tracked already) and subscribes you to advisory updates for it\n\
`untrack <storm name>` - manually untracks storm\n\
`init` - moves storm updates to the channel this command was sent in\n\
`debug` - lists tracked and blacklisted cyclones";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Track(String),
    Untrack(String),
    Init,
    Debug,
    Help,
}

impl ChatCommand {
    /// Parse one input line; anything unrecognized is a help request
    ///
    /// A leading `!nhc` is accepted and ignored.
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace().peekable();
        if words.peek().is_some_and(|w| w.eq_ignore_ascii_case("!nhc")) {
            words.next();
        }

        let Some(sub) = words.next().map(str::to_lowercase) else {
            return Self::Help;
        };
        let arg = words.next().map(str::to_string);

        match (sub.as_str(), arg) {
            ("track", Some(name)) => Self::Track(name),
            ("untrack", Some(name)) => Self::Untrack(name),
            ("init", _) => Self::Init,
            ("debug", _) => Self::Debug,
            _ => Self::Help,
        }
    }
}

/// Execute a command on behalf of `context_id` and return the reply
pub async fn execute(
    coordinator: &TrackingCoordinator,
    command: &ChatCommand,
    context_id: &str,
) -> String {
    match command {
        ChatCommand::Track(raw) => match coordinator.track_by_name(raw).await {
            Ok(TrackOutcome::Tracked { name, .. }) => {
                format!("Now tracking Cyclone {}", capitalize(&name))
            }
            Ok(TrackOutcome::AlreadyTracked { name }) => {
                format!("Cyclone {name} already tracked!")
            }
            Ok(TrackOutcome::NotFound { .. }) => {
                format!("Could not find \"{raw}\" in the basin")
            }
            Err(e) => {
                tracing::warn!(name = %raw, error = %e, "Track request failed");
                "Could not reach the basin feed, try again later".to_string()
            }
        },
        ChatCommand::Untrack(raw) => match coordinator.untrack_by_name(raw).await {
            UntrackOutcome::Untracked { name, .. } => {
                format!("Cyclone {} has been untracked", capitalize(&name))
            }
            UntrackOutcome::NotFound { .. } => format!("Could not find \"{raw}\""),
        },
        ChatCommand::Init => {
            coordinator.set_destination(context_id);
            "NHC Storm Tracker updates will now be sent to this channel".to_string()
        }
        ChatCommand::Debug => coordinator.debug_snapshot().await.to_string(),
        ChatCommand::Help => HELP_TEXT.to_string(),
    }
}
