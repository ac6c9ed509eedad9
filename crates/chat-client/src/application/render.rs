//! Terminal rendering of server lines.

use chat_core::ServerLine;

/// Text to print for `line`, or `None` when nothing should be shown.
///
/// The identity prompt is answered automatically and never printed.  A
/// `/users` snapshot becomes an "online" list that leaves out `own_name`
/// and empty entries.
pub fn render_line(line: &ServerLine, own_name: &str) -> Option<String> {
    match line {
        ServerLine::Prompt => None,
        ServerLine::Users(users) => Some(render_online(users, own_name)),
        ServerLine::ImageAvailable { at, path } => Some(format!("{at} [Image] {path}")),
        other => Some(other.to_string()),
    }
}

fn render_online(users: &[String], own_name: &str) -> String {
    let others: Vec<&str> = users
        .iter()
        .map(String::as_str)
        .filter(|u| !u.is_empty() && *u != own_name)
        .collect();
    if others.is_empty() {
        "Online: (nobody else)".to_string()
    } else {
        format!("Online: {}", others.join(", "))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn users(names: &[&str]) -> ServerLine {
        ServerLine::Users(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_prompt_is_not_printed() {
        assert_eq!(render_line(&ServerLine::Prompt, "alice"), None);
    }

    #[test]
    fn test_online_list_skips_self_and_empty_entries() {
        let line = users(&["alice", "", "bob", "carol"]);
        assert_eq!(
            render_line(&line, "alice").as_deref(),
            Some("Online: bob, carol")
        );
    }

    #[test]
    fn test_online_list_when_alone() {
        assert_eq!(
            render_line(&users(&["alice"]), "alice").as_deref(),
            Some("Online: (nobody else)")
        );
    }

    #[test]
    fn test_server_users_line_with_trailing_comma() {
        // Arrange: a server that terminates the list with a comma
        let line = ServerLine::parse("/users alice,bob,");

        // Act
        let text = render_line(&line, "bob");

        // Assert
        assert_eq!(text.as_deref(), Some("Online: alice"));
    }

    #[test]
    fn test_chat_and_notice_lines_print_verbatim() {
        let chat = ServerLine::parse("[10:11:12] [Global] bob: hi");
        let notice = ServerLine::parse("User dave not found.");

        assert_eq!(
            render_line(&chat, "alice").as_deref(),
            Some("[10:11:12] [Global] bob: hi")
        );
        assert_eq!(
            render_line(&notice, "alice").as_deref(),
            Some("User dave not found.")
        );
    }

    #[test]
    fn test_image_notice_is_labelled() {
        let line = ServerLine::parse("[10:11:12] /image /srv/chat_images/cat.png");
        assert_eq!(
            render_line(&line, "alice").as_deref(),
            Some("[10:11:12] [Image] /srv/chat_images/cat.png")
        );
    }
}
