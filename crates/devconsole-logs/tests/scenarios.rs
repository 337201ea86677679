use devconsole_logs::{Console, ConsoleConfig, EntryKind, Filter, MaxEntries};
use serde_json::json;

fn texts(console: &Console) -> Vec<String> {
    console.entries().map(|e| e.text()).collect()
}

#[test]
fn test_three_identical_logs_collapse() {
    let mut console = Console::default();
    for _ in 0..3 {
        console.log(vec![json!("a")]);
    }

    assert_eq!(console.len(), 1);
    assert_eq!(console.entries().next().map(|e| e.count()), Some(3));
    assert!(console.markup().contains(r#"<span class="console-count">3</span>"#));
    assert_eq!(console.text(), "(3) a");
}

#[test]
fn test_limit_keeps_newest_in_order() {
    let mut console = Console::default();
    console.max_entries(MaxEntries::from_count(2));
    console
        .log(vec![json!("x")])
        .log(vec![json!("y")])
        .log(vec![json!("z")]);

    assert_eq!(texts(&console), vec!["y", "z"]);
    assert_eq!(console.text(), "y\nz");
}

#[test]
fn test_group_renders_one_scope() {
    let mut console = Console::default();
    console
        .group(vec![json!("g1")])
        .log(vec![json!("inner")])
        .group_end();

    assert_eq!(console.group_depth(), 0);
    assert_eq!(console.renderer().tree().depth(), 0);

    let markup = console.markup();
    assert_eq!(markup.matches(r#"<ul class="console-logs console-group-container">"#).count(), 1);
    let open = markup.find("<ul").unwrap();
    let close = markup.find("</ul>").unwrap();
    let inner = markup.find("inner").unwrap();
    assert!(open < inner && inner < close);
    assert_eq!(console.text(), "v g1\n  inner");
}

#[test]
fn test_type_filter_hides_but_keeps_entries() {
    let mut console = Console::default();
    console.filter(Filter::from_tag("error").unwrap());
    console.warn(vec![json!("careful")]).error(vec![json!("boom")]);

    assert_eq!(console.len(), 2);
    assert_eq!(console.text(), "[error] boom");
    assert!(!console.markup().contains("careful"));
}

#[test]
fn test_slash_input_sets_literal_filter() {
    let mut console = Console::default();
    console.input("/abc");

    match console.active_filter() {
        Filter::Pattern(re) => assert!(re.is_match("abc")),
        other => panic!("unexpected filter {:?}", other),
    }

    console.log(vec![json!("abcd")]).log(vec![json!("xyz")]);
    assert_eq!(console.len(), 2);
    assert_eq!(console.text(), "abcd");
}

#[test]
fn test_collapsed_group_starts_hidden() {
    let mut console = Console::default();
    console
        .group_collapsed(vec![json!("details")])
        .log(vec![json!("one")])
        .log(vec![json!("two")])
        .group_end()
        .log(vec![json!("after")]);

    assert!(console.markup().contains("console-hidden"));
    assert_eq!(console.renderer().tree().visible_rows(), 2);
    assert_eq!(console.text(), "> details\nafter");
}

#[test]
fn test_eviction_of_open_group_falls_back_to_root() {
    let mut console = Console::new(ConsoleConfig {
        max_entries: MaxEntries::from_count(3),
        ..ConsoleConfig::default()
    });
    console
        .group(vec![json!("open")])
        .log(vec![json!("a")])
        .log(vec![json!("b")]);
    assert_eq!(console.renderer().tree().depth(), 1);

    console.log(vec![json!("c")]);
    assert!(console.is_empty());
    assert_eq!(console.group_depth(), 0);
    assert_eq!(console.renderer().tree().depth(), 0);
    assert_eq!(console.markup(), "");

    // the late close of the evicted group is ignored
    console.group_end().log(vec![json!("d")]);
    assert_eq!(texts(&console), vec!["d"]);
    assert_eq!(console.text(), "d");
}

#[test]
fn test_closed_group_evicted_with_children() {
    let mut console = Console::new(ConsoleConfig {
        max_entries: MaxEntries::from_count(4),
        ..ConsoleConfig::default()
    });
    console
        .group(vec![json!("g")])
        .log(vec![json!("in")])
        .group_end()
        .log(vec![json!("out1")])
        .log(vec![json!("out2")]);

    assert_eq!(texts(&console), vec!["out1", "out2"]);
    assert!(!console.markup().contains("<ul"));
}

#[test]
fn test_shrinking_limit_rerenders() {
    let mut console = Console::default();
    for text in ["a", "b", "c"] {
        console.log(vec![json!(text)]);
    }
    console.max_entries(MaxEntries::from_count(1));
    assert_eq!(console.text(), "c");

    console.max_entries(MaxEntries::Unbounded);
    console.log(vec![json!("d")]);
    assert_eq!(console.len(), 2);
}

#[test]
fn test_scroll_sticks_to_bottom_only_when_there() {
    let mut console = Console::new(ConsoleConfig {
        viewport_height: 2,
        ..ConsoleConfig::default()
    });
    for i in 0..5 {
        console.log(vec![json!(i)]);
    }
    assert!(console.renderer().is_at_bottom());
    assert_eq!(console.renderer().viewport().offset(), 3);

    console.scroll_up(2);
    console.log(vec![json!("new")]);
    assert_eq!(console.renderer().viewport().offset(), 1);
    assert!(!console.renderer().is_at_bottom());

    // a full render always returns to the bottom
    console.render();
    assert!(console.renderer().is_at_bottom());
}

#[test]
fn test_filter_does_not_affect_structure_depth() {
    let mut console = Console::default();
    console.filter(Filter::Kind(EntryKind::Error));
    console.group(vec![json!("g")]).warn(vec![json!("w")]);
    assert_eq!(console.renderer().tree().depth(), 1);

    console.error(vec![json!("e")]).group_end();
    assert_eq!(console.renderer().tree().depth(), 0);
    assert_eq!(console.text(), "  [error] e");
}

#[test]
fn test_repeat_rechecks_filter() {
    // the badge turns "a" into "2a" for the pattern
    let mut console = Console::default();
    console.filter(Filter::pattern("^a").unwrap());
    console.log(vec![json!("a")]);
    assert_eq!(console.text(), "a");

    console.log(vec![json!("a")]);
    assert_eq!(console.text(), "");
    let incremental = console.markup();
    console.render();
    assert_eq!(console.markup(), incremental);

    let mut console = Console::default();
    console.filter(Filter::pattern("^2").unwrap());
    console.log(vec![json!("a")]);
    assert_eq!(console.text(), "");

    console.log(vec![json!("a")]);
    assert_eq!(console.text(), "(2) a");
    let incremental = console.markup();
    console.render();
    assert_eq!(console.markup(), incremental);
}

#[test]
fn test_oversized_slash_input_is_reported() {
    let mut console = Console::default();
    console.input(&format!("/{}", "ab(".repeat(2_000_000)));

    assert!(console.active_filter().is_all());
    let last = console.entries().last().unwrap();
    assert_eq!(last.kind(), EntryKind::Error);
    assert!(last.text().starts_with("Invalid filter: "));
}
