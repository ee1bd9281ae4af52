use unicode_id::UnicodeID;

/// Returns true if `c` may start a JavaScript identifier.
pub fn is_valid_start(c: char) -> bool {
    match c {
        '$' | '_' => true,
        c if c.is_ascii() => c.is_ascii_alphabetic(),
        c => UnicodeID::is_id_start(c),
    }
}

/// Returns true if `c` may continue a JavaScript identifier.
pub fn is_valid_continue(c: char) -> bool {
    match c {
        '$' | '_' | '\u{200c}' | '\u{200d}' => true,
        c if c.is_ascii() => c.is_ascii_alphanumeric(),
        c => UnicodeID::is_id_continue(c),
    }
}

/// Returns the identifier `text` starts with, if any.
pub fn leading_identifier(text: &str) -> Option<&str> {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, c)) if is_valid_start(c) => {}
        _ => return None,
    }
    let end = chars
        .find(|&(_, c)| !is_valid_continue(c))
        .map_or(text.len(), |(idx, _)| idx);
    Some(&text[..end])
}

#[test]
fn test_leading_identifier() {
    assert_eq!(leading_identifier("foo "), Some("foo"));
    assert_eq!(leading_identifier("foo_$123+1"), Some("foo_$123"));
    assert_eq!(leading_identifier("f _hi"), Some("f"));
    assert_eq!(leading_identifier("foo.bar"), Some("foo"));
    assert_eq!(leading_identifier("c);"), Some("c"));
    assert_eq!(leading_identifier("ünïcödé()"), Some("ünïcödé"));
    assert_eq!(leading_identifier("1abc"), None);
    assert_eq!(leading_identifier("[foo,bar]"), None);
    assert_eq!(leading_identifier(" foo"), None);
}
