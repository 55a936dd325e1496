use super::*;

#[test]
fn collapses_blank_lines() {
    assert_eq!(sanitize("Hello\n\n\nWorld"), "Hello\nWorld");
    assert_eq!(sanitize("a\n\nb\nc\n\n\n\nd"), "a\nb\nc\nd");
}

#[test]
fn removes_unwanted_characters() {
    assert_eq!(sanitize("#1 price: 5€ @ store"), "1 price: 5  store");
    assert_eq!(sanitize("@@##€€"), "");
}

#[test]
fn removal_can_create_newline_runs() {
    assert_eq!(sanitize("first\n#\nsecond"), "first\nsecond");
}

#[test]
fn leaves_clean_text_alone() {
    let text = "Plain text\nwith single newlines\r\nand $ signs";
    assert_eq!(sanitize(text), text);
}

#[test]
fn sanitize_is_idempotent() {
    let samples = [
        "",
        "\n\n",
        "Hello\n\n\nWorld",
        "tags: #rust @team\n\n\n€10\n\n",
        "\n#\n@\n€\n",
        "no changes here",
        "ends with newline\n",
    ];

    for sample in samples {
        let once = sanitize(sample);
        assert_eq!(sanitize(&once), once, "not idempotent for {:?}", sample);
    }
}
