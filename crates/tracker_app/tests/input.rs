use pretty_assertions::assert_eq;
use tracker_app::{parse_command, Command, InputError};
use tracker_core::{ControlAction, Msg};

#[test]
fn control_words_map_to_control_requests() {
    let cases = [
        ("start", ControlAction::Start),
        ("pause", ControlAction::Pause),
        (" Resume ", ControlAction::Resume),
        ("cancel", ControlAction::Cancel),
        ("retry", ControlAction::Retry),
    ];
    for (line, action) in cases {
        assert_eq!(
            parse_command(line),
            Ok(Some(Command::Send(Msg::ControlRequested(action))))
        );
    }
}

#[test]
fn job_watching_needs_an_id() {
    assert_eq!(
        parse_command("watch job7"),
        Ok(Some(Command::Send(Msg::WatchJob("job7".to_string()))))
    );
    assert_eq!(
        parse_command("unwatch job7"),
        Ok(Some(Command::Send(Msg::UnwatchJob("job7".to_string()))))
    );
    assert_eq!(
        parse_command("watch"),
        Err(InputError::MissingArgument {
            command: "watch",
            argument: "job id"
        })
    );
}

#[test]
fn session_commands() {
    assert_eq!(parse_command(""), Ok(None));
    assert_eq!(parse_command("   "), Ok(None));
    assert_eq!(parse_command("q"), Ok(Some(Command::Quit)));
    assert_eq!(parse_command("help"), Ok(Some(Command::Help)));
    assert_eq!(
        parse_command("refresh"),
        Ok(Some(Command::Send(Msg::RefreshRequested)))
    );
    assert_eq!(
        parse_command("reconnect"),
        Ok(Some(Command::Send(Msg::ReconnectRequested)))
    );
    assert_eq!(
        parse_command("open b2"),
        Ok(Some(Command::Send(Msg::OpenBatch {
            batch_id: "b2".to_string()
        })))
    );
    assert_eq!(
        parse_command("close"),
        Ok(Some(Command::Send(Msg::CloseBatch)))
    );
}

#[test]
fn unknown_words_are_rejected() {
    assert_eq!(
        parse_command("explode now"),
        Err(InputError::Unknown("explode".to_string()))
    );
}
