use super::*;

#[test]
fn slash_commands_are_recognised() {
    assert_eq!(Input::parse("/start"), Input::Start);
    assert_eq!(Input::parse(" /end "), Input::End);
    assert_eq!(Input::parse("/status"), Input::Status);
    assert_eq!(Input::parse("/quit"), Input::Quit);
    assert_eq!(Input::parse("/exit"), Input::Quit);
}

#[test]
fn other_input_is_chat_and_blank_is_ignored() {
    assert_eq!(Input::parse("  Is it a dog?  "), Input::Chat("Is it a dog?"));
    assert_eq!(Input::parse("/unknown"), Input::Chat("/unknown"));
    assert_eq!(Input::parse("   "), Input::Blank);
}

#[test]
fn cli_parses_join_with_transport_override() {
    let cli = Cli::try_parse_from(["qbattle-cli", "--transport", "poll", "join", "AB12CD", "--name", "Alice"])
        .expect("parse");
    assert_eq!(cli.transport, "poll");
    assert!(matches!(cli.command, Command::Join { ref code, name: Some(ref n) } if code == "AB12CD" && n == "Alice"));
}

#[test]
fn saved_clips_are_numbered_mp3_files() {
    let dir = std::env::temp_dir().join(format!("qbattle-cli-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("dir");
    let mut ui = TerminalUi::new(Some(dir.clone()));

    let first = ui.save_clip(&dir, "SUQzBA==").expect("first");
    let second = ui.save_clip(&dir, "SUQzBA==").expect("second");

    assert!(first.ends_with("clip-001.mp3"));
    assert!(second.ends_with("clip-002.mp3"));
    assert_eq!(std::fs::read(&first).expect("read"), b"ID3\x04");
    assert!(ui.save_clip(&dir, "not base64!").is_err());
    std::fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn status_without_session_says_so() {
    assert_eq!(status_lines(None, None), vec!["(no session)".to_owned()]);
}

#[test]
fn status_lists_session_then_snapshot_details() {
    let session =
        Session::new(qbattle::RoomCode::parse("AB12CD").expect("code"), PlayerName::parse("Alice").expect("name"));
    let game = GameSnapshot::new(serde_json::json!({
        "type": "game_update",
        "data": {
            "players": ["Alice", "Bob"],
            "admin": "Alice",
            "timer": 42,
            "winner": "Bob",
            "waiting_for_ai": true
        }
    }));

    let lines = status_lines(Some(&session), Some(&game));

    assert_eq!(lines[0], "room_id = AB12CD");
    assert_eq!(
        &lines[lines.len() - 5..],
        ["players = Alice, Bob", "admin = Alice", "timer = 42s", "winner = Bob", "waiting for the assistant..."]
    );
}

#[test]
fn status_skips_absent_snapshot_fields() {
    let session =
        Session::new(qbattle::RoomCode::parse("AB12CD").expect("code"), PlayerName::parse("Bob").expect("name"));
    let game = GameSnapshot::new(serde_json::json!({"game_status": "not_started"}));

    let with_game = status_lines(Some(&session), Some(&game));
    let without = status_lines(Some(&session), None);

    assert_eq!(with_game, without);
    assert!(!with_game.iter().any(|l| l.starts_with("players") || l.starts_with("winner")));
}
