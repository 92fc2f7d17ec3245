// api_test.rs - Integration tests for the idiomatic Rust API.

use ferrule::api::{Rule, RuleBuilder};
use ferrule::error::RuleError;
use ferrule::prelude::*;

fn word_pair(f: &NodeFactory) -> Node {
    // (.+) "=" \1 end
    f.sequence(vec![
        f.group(1, f.any_char().quantified(1, None, true)),
        f.literal(b"="),
        f.backref(1),
        f.pattern_end(),
    ])
}

// === Rule::new ===

#[test]
fn simple_rule() {
    let f = NodeFactory::new();
    let rule = Rule::new(&f.concat(f.literal(b"123"), f.pattern_end())).unwrap();
    let m = rule.find("abc 123 def").unwrap();
    assert_eq!(m.as_str(), "123");
}

#[test]
fn no_match_returns_none() {
    let f = NodeFactory::new();
    let rule = Rule::new(&f.concat(f.literal(b"xyz"), f.pattern_end())).unwrap();
    assert!(rule.find("abc").is_none());
}

#[test]
fn empty_rule() {
    let f = NodeFactory::new();
    let rule = Rule::new(&f.concat(f.null(), f.pattern_end())).unwrap();
    let m = rule.find("hello").unwrap();
    assert_eq!(m.start(), 0);
    assert_eq!(m.end(), 0);
    assert!(m.is_empty());
}

#[test]
fn invalid_quantifier_error() {
    let f = NodeFactory::new();
    let root = f.concat(f.literal(b"a").quantified(3, Some(1), true), f.pattern_end());
    let err = Rule::new(&root).unwrap_err();
    assert!(matches!(err, RuleError::InvalidQuantifier { min: 3, max: 1, .. }));
    assert!(err.is_compile_error());
}

#[test]
fn duplicate_node_id_error() {
    let f = NodeFactory::new();
    let a = Node::new(7, NodeInner::AnyChar);
    let b = Node::new(7, NodeInner::PatternEnd);
    let root = f.concat(a, b);
    assert!(matches!(Rule::new(&root), Err(RuleError::DuplicateNodeId(7))));
}

#[test]
fn rule_debug_mentions_blocks() {
    let f = NodeFactory::new();
    let rule = Rule::new(&f.concat(f.literal(b"a"), f.pattern_end())).unwrap();
    let dbg = format!("{:?}", rule);
    assert!(dbg.starts_with("Rule {"));
    assert!(dbg.contains("blocks"));
}

// === RuleBuilder ===

#[test]
fn builder_default_is_untraced() {
    let f = NodeFactory::new();
    let rule = RuleBuilder::new()
        .build(&f.concat(f.literal(b"a"), f.pattern_end()))
        .unwrap();
    assert!(!rule.program().is_traced());
    assert!(!rule.text().windows(6).any(|w| w == b"trace("));
}

#[test]
fn builder_trace_changes_text_not_results() {
    let f = NodeFactory::new();
    let root = word_pair(&f);
    let plain = Rule::new(&root).unwrap();
    let traced = Rule::builder().trace(true).build(&root).unwrap();
    assert_ne!(plain.text(), traced.text());

    let subject = "key: ab=ab";
    let a: Vec<_> = plain.find_iter(subject).map(|m| m.range()).collect();
    let b: Vec<_> = traced.find_iter(subject).map(|m| m.range()).collect();
    assert_eq!(a, b);
    assert!(!a.is_empty());
}

#[test]
fn builder_option_flags() {
    let f = NodeFactory::new();
    let rule = Rule::builder()
        .option(RuleOptions::TRACE)
        .build(&f.concat(f.any_char(), f.pattern_end()))
        .unwrap();
    assert_eq!(rule.program().options(), RuleOptions::TRACE);
}

#[test]
fn builder_retry_limit_surfaces_in_exec() {
    let f = NodeFactory::new();
    // (a|a)* then "b" against a run of a's backtracks exponentially.
    let root = f.sequence(vec![
        f.group(-1, f.alt(f.literal(b"a"), f.literal(b"a")))
            .quantified(0, None, true),
        f.literal(b"b"),
        f.pattern_end(),
    ]);
    let rule = Rule::builder().retry_limit(1000).build(&root).unwrap();
    let subject = [b'a'; 40];
    assert_eq!(
        rule.exec(&subject).unwrap_err(),
        RuleError::RetryLimitInMatchOver
    );
    assert!(rule.find_bytes(&subject).is_none());
}

// === Match ===

#[test]
fn match_groups() {
    let f = NodeFactory::new();
    let rule = Rule::new(&word_pair(&f)).unwrap();
    let m = rule.find("key: ab=ab").unwrap();
    assert_eq!(m.as_str(), "ab=ab");
    assert_eq!(m.group(1), Some(&b"ab"[..]));
    assert_eq!(m.group(2), None);
    assert_eq!(m.captures().repetitions(1), Some(1));
}

#[test]
fn match_bytes() {
    let f = NodeFactory::new();
    let rule = Rule::new(&f.concat(f.literal(b"\xff\x00"), f.pattern_end())).unwrap();
    let text = b"ab\xff\x00cd";
    let m = rule.find_bytes(text).unwrap();
    assert_eq!(m.as_bytes(), b"\xff\x00");
    assert_eq!(m.range(), 2..4);
}

// === exec / MatchCursor ===

#[test]
fn cursor_reports_every_alternative() {
    let f = NodeFactory::new();
    let root = f.concat(f.any_char().quantified(1, Some(2), false), f.pattern_end());
    let rule = Rule::new(&root).unwrap();
    let mut cur = rule.exec(b"ab").unwrap();
    let mut seen = vec![cur.get().unwrap().range()];
    while let Some(m) = cur.advance().unwrap() {
        seen.push(m.range());
    }
    assert_eq!(seen, vec![0..1, 0..2, 1..2]);
    assert!(cur.get().is_none());
    assert!(cur.into_handle().is_exhausted());
}

#[test]
fn exec_at_does_not_scan() {
    let f = NodeFactory::new();
    let rule = Rule::new(&f.concat(f.literal(b"b"), f.pattern_end())).unwrap();
    assert!(rule.exec_at(b"ab", 0).unwrap().get().is_none());
    assert_eq!(rule.exec_at(b"ab", 1).unwrap().into_match().unwrap().range(), 1..2);
}

#[test]
fn exec_bounded_treats_end_as_subject_end() {
    let f = NodeFactory::new();
    let root = f.sequence(vec![
        f.literal(b"b"),
        f.anchor(AnchorType::EndString),
        f.pattern_end(),
    ]);
    let rule = Rule::new(&root).unwrap();
    assert!(rule.find("abc").is_none());
    let cur = rule.exec_bounded(b"abc", None, 2).unwrap();
    assert_eq!(cur.into_match().unwrap().range(), 1..2);
}

// === find_iter ===

#[test]
fn find_iter_collects_all() {
    let f = NodeFactory::new();
    let rule = Rule::new(&f.concat(f.literal(b"o"), f.pattern_end())).unwrap();
    let starts: Vec<usize> = rule.find_iter("foo boo").map(|m| m.start()).collect();
    assert_eq!(starts, vec![1, 2, 5, 6]);
}

#[test]
fn find_iter_is_fused() {
    let f = NodeFactory::new();
    let rule = Rule::new(&f.concat(f.literal(b"x"), f.pattern_end())).unwrap();
    let mut it = rule.find_iter("x");
    assert!(it.next().is_some());
    assert!(it.next().is_none());
    assert!(it.next().is_none());
}

// === Thread safety ===

#[test]
fn compile_in_parallel() {
    let texts: Vec<Vec<u8>> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let f = NodeFactory::new();
                    Rule::new(&word_pair(&f)).unwrap().text().to_vec()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    assert!(texts.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn shared_rule_across_threads() {
    let f = NodeFactory::new();
    let rule = Rule::new(&word_pair(&f)).unwrap();
    std::thread::scope(|s| {
        for subject in ["a=a", "xy=xy", "q=r"] {
            let rule = &rule;
            s.spawn(move || {
                let found = rule.is_match(subject);
                assert_eq!(found, subject != "q=r");
            });
        }
    });
}
