use invlight_parser::{IflParserError, Position, parse_expression, parse_rule, rule_files};

fn syntax_position(input: &str) -> Position {
    match parse_expression(input).unwrap_err() {
        IflParserError::Syntax { line, column, .. } => Position::new(line, column),
        other => panic!("expected Syntax error for {input:?}, got: {other}"),
    }
}

#[test]
fn empty_text_is_rejected() {
    assert!(parse_rule("").is_err());
    assert!(parse_rule("   \n// only a comment\n").is_err());
}

#[test]
fn trailing_operator_fails_with_location() {
    let pos = syntax_position(r#"Rarity == "Rare" and"#);
    assert_eq!(pos.line, 1);
    assert!(pos.column > 1, "column should point past the start: {pos}");
}

#[test]
fn unmatched_parens_fail() {
    let err = parse_expression("(IsCorrupted and IsMirrored").unwrap_err();
    assert!(
        matches!(err, IflParserError::Syntax { .. }),
        "expected Syntax error for unmatched paren, got: {err}"
    );
}

#[test]
fn double_operator_fails() {
    let err = parse_expression("IsCorrupted and or IsMirrored").unwrap_err();
    assert!(
        matches!(err, IflParserError::Syntax { .. }),
        "expected Syntax error for 'and or', got: {err}"
    );
}

#[test]
fn unterminated_string_fails() {
    assert!(parse_expression(r#"Name == "Grim"#).is_err());
}

#[test]
fn keyword_cannot_be_attribute() {
    assert!(parse_expression("and == 1").is_err());
    assert!(parse_expression("true").is_err());
}

#[test]
fn error_on_second_line_reports_line_two() {
    let pos = syntax_position("ItemLevel > 1\nand > 2");
    assert_eq!(pos.line, 2);
}

#[test]
fn error_message_uses_readable_rule_names() {
    let err = parse_expression("ItemLevel >").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("syntax error at line 1"), "got: {msg}");
    assert!(!msg.contains("rule_text"), "internal rule names leaked: {msg}");
}

#[test]
fn unknown_escape_is_rejected() {
    assert!(parse_expression(r#"Name == "bad \q escape""#).is_err());
}

#[test]
fn list_requires_literals() {
    assert!(parse_expression("ClassName in [Ring]").is_err());
    assert!(parse_expression("ClassName in [\"Ring\",]").is_err());
}

#[test]
fn rule_files_missing_directory_is_io_error() {
    assert!(rule_files(std::path::Path::new("/nonexistent/invlight/rules")).is_err());
}
