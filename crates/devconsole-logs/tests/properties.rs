use devconsole_logs::{Console, ConsoleConfig, EntryKind, Filter, MaxEntries};
use proptest::prelude::*;
use serde_json::json;

#[derive(Clone, Debug)]
enum Op {
    Log(u8),
    Warn(u8),
    Group,
    GroupCollapsed,
    GroupEnd,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..3).prop_map(Op::Log),
        2 => (0u8..3).prop_map(Op::Warn),
        1 => Just(Op::Group),
        1 => Just(Op::GroupCollapsed),
        2 => Just(Op::GroupEnd),
    ]
}

fn apply(console: &mut Console, op: &Op) {
    match op {
        Op::Log(n) => console.log(vec![json!(format!("log {}", n))]),
        Op::Warn(n) => console.warn(vec![json!(format!("warn {}", n))]),
        Op::Group => console.group(vec![json!("g")]),
        Op::GroupCollapsed => console.group_collapsed(vec![json!("c")]),
        Op::GroupEnd => console.group_end(),
    };
}

fn bounded_console(max: usize) -> Console {
    Console::new(ConsoleConfig {
        max_entries: MaxEntries::from_count(max),
        ..ConsoleConfig::default()
    })
}

/// Open groups left after walking the entries; None if a close has no open
fn open_groups(console: &Console) -> Option<usize> {
    let mut depth = 0usize;
    for entry in console.entries() {
        match entry.kind() {
            EntryKind::Group | EntryKind::GroupCollapsed => depth += 1,
            EntryKind::GroupEnd => depth = depth.checked_sub(1)?,
            _ => {}
        }
    }
    Some(depth)
}

proptest! {
    #[test]
    fn repeats_collapse_into_one_entry(n in 1u32..40, text in "[a-z]{1,8}") {
        let mut console = Console::default();
        for _ in 0..n {
            console.info(vec![json!(text.clone())]);
        }
        prop_assert_eq!(console.len(), 1);
        prop_assert_eq!(console.entries().next().map(|e| e.count()), Some(n));
    }

    #[test]
    fn retention_bound_holds(max in 1usize..8, ops in prop::collection::vec(op(), 0..60)) {
        let mut console = bounded_console(max);
        for op in &ops {
            apply(&mut console, op);
            prop_assert!(console.len() <= max);
        }
    }

    #[test]
    fn groups_stay_balanced_under_eviction(max in 1usize..8, ops in prop::collection::vec(op(), 0..60)) {
        let mut console = bounded_console(max);
        for op in &ops {
            apply(&mut console, op);

            let open = open_groups(&console);
            prop_assert_eq!(open, Some(console.group_depth()));
            prop_assert_eq!(console.renderer().tree().depth(), console.group_depth());

            let markup = console.markup();
            prop_assert_eq!(markup.matches("<ul").count(), markup.matches("</ul>").count());
        }
    }

    #[test]
    fn filter_round_trip_reproduces_output(
        max in 0usize..10,
        ops in prop::collection::vec(op(), 0..60),
    ) {
        let mut console = bounded_console(max);
        for op in &ops {
            apply(&mut console, op);
        }

        let markup = console.markup();
        let before: Vec<_> = console.entries().map(|e| (e.id(), e.count())).collect();

        console.filter(Filter::Kind(EntryKind::Warn));
        console.filter(Filter::pattern("log 1").unwrap());
        let during: Vec<_> = console.entries().map(|e| (e.id(), e.count())).collect();
        prop_assert_eq!(&during, &before);

        console.filter(Filter::All);
        prop_assert_eq!(console.markup(), markup);
    }
}
