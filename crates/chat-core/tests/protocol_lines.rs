//! Integration tests for the chat-core public protocol API.
//!
//! These tests exercise command parsing and line formatting together, the
//! same way the server turns an inbound command into an outbound line.

use chat_core::{
    parse_command, parse_identity, ClientCommand, CommandError, ServerLine, Timestamp,
    TransferDescriptor, IDENTITY_PROMPT,
};

fn noon() -> Timestamp {
    Timestamp::from_hms(12, 0, 0).expect("valid time")
}

#[test]
fn test_chat_command_becomes_global_line() {
    // Arrange
    let cmd = parse_command("hi").expect("chat always parses");
    let ClientCommand::Chat(text) = cmd else {
        panic!("expected chat, got {cmd:?}");
    };

    // Act
    let line = ServerLine::Chat {
        at: noon(),
        from: "alice".to_string(),
        text,
    };

    // Assert
    assert_eq!(line.to_string(), "[12:00:00] [Global] alice: hi");
}

#[test]
fn test_private_command_becomes_private_line() {
    let cmd = parse_command("/private bob lunch?").expect("valid private");
    let ClientCommand::Private { target, body } = cmd else {
        panic!("expected private, got {cmd:?}");
    };

    let line = ServerLine::Private {
        at: noon(),
        from: "alice".to_string(),
        to: target,
        text: body,
    };

    assert_eq!(line.to_string(), "[12:00:00] [Private] alice -> bob: lunch?");
}

#[test]
fn test_client_rendered_commands_parse_back() {
    // The client builds command lines with Display; the server parses them.
    let commands = [
        ClientCommand::Chat("plain words".to_string()),
        ClientCommand::Private {
            target: "carol".to_string(),
            body: "two  spaces".to_string(),
        },
        ClientCommand::Image(TransferDescriptor::new("pic.jpg", 4096)),
    ];

    for cmd in commands {
        assert_eq!(parse_command(&cmd.to_string()), Ok(cmd));
    }
}

#[test]
fn test_malformed_commands_map_to_notices() {
    let private_err = parse_command("/private").unwrap_err();
    let image_err = parse_command("/image x").unwrap_err();

    assert_eq!(private_err, CommandError::InvalidPrivate);
    assert_eq!(image_err, CommandError::InvalidImage);
    // The error text is what the server sends back verbatim.
    assert_eq!(
        ServerLine::Notice(image_err.to_string()).to_string(),
        "Invalid image message format."
    );
}

#[test]
fn test_prompt_and_identity_handshake() {
    assert_eq!(ServerLine::parse(IDENTITY_PROMPT), ServerLine::Prompt);
    assert_eq!(parse_identity("alice"), Some("alice"));
    assert_eq!(parse_identity(""), None);
}
