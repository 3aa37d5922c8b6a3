use tracker_core::{ControlAction, Msg};

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Msg),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{command}` needs a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
}

pub const HELP: &str = "\
commands:
  start | pause | resume | cancel | retry   control the batch
  refresh                                   reload the snapshot
  reconnect                                 retry the stream after it gave up
  watch <job> | unwatch <job>               follow a job on its own channel
  open <batch> | close                      switch or drop the tracked batch
  help | quit";

/// Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, InputError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next().map(str::to_string);
    let require = |command: &'static str, argument: &'static str| {
        arg.clone()
            .ok_or(InputError::MissingArgument { command, argument })
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "start" => Command::Send(Msg::ControlRequested(ControlAction::Start)),
        "pause" => Command::Send(Msg::ControlRequested(ControlAction::Pause)),
        "resume" => Command::Send(Msg::ControlRequested(ControlAction::Resume)),
        "cancel" => Command::Send(Msg::ControlRequested(ControlAction::Cancel)),
        "retry" => Command::Send(Msg::ControlRequested(ControlAction::Retry)),
        "refresh" | "r" => Command::Send(Msg::RefreshRequested),
        "reconnect" => Command::Send(Msg::ReconnectRequested),
        "watch" => Command::Send(Msg::WatchJob(require("watch", "job id")?)),
        "unwatch" => Command::Send(Msg::UnwatchJob(require("unwatch", "job id")?)),
        "open" => Command::Send(Msg::OpenBatch {
            batch_id: require("open", "batch id")?,
        }),
        "close" => Command::Send(Msg::CloseBatch),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(InputError::Unknown(head.to_string())),
    };
    Ok(Some(command))
}
