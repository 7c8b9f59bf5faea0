use ipld_data_model::{Format, Kind, Link, Node, Path};
use ipld_format_json::DagJson;
use ipld_selector::{
    MemoryLoader, ParseError, Selector, VisitReason, WalkConfig, Walker, parse, parse_json, walk,
    walk_matching,
};

fn data(source: &str) -> Node {
    DagJson.decode(source, "data.json").unwrap()
}

fn matches(selector: &str, source: &str) -> Vec<String> {
    let selector = parse_json(selector).unwrap();
    let mut found = Vec::new();
    walk_matching(&data(source), &selector, |progress, node| {
        found.push(format!("/{} {}", progress.path(), DagJson.encode(node)));
        Ok(())
    })
    .unwrap();
    found
}

fn transcript(selector: &Selector, root: &Node) -> Vec<String> {
    let mut events = Vec::new();
    walk(root, selector, |progress, _, reason| {
        events.push(format!("{reason} /{}", progress.path()));
        Ok(())
    })
    .unwrap();
    events
}

#[test]
fn test_explore_all_matches_every_child() {
    let selector = r#"{"a":{">":{".":{}}}}"#;
    assert_eq!(matches(selector, "[1,2,3]"), ["/0 1", "/1 2", "/2 3"]);
    assert_eq!(matches(selector, r#"{"x":1}"#), ["/x 1"]);
}

#[test]
fn test_explore_index_matches_one_element() {
    let selector = parse_json(r#"{"i":{"i":2,">":{".":{}}}}"#).unwrap();
    let events = transcript(&selector, &data("[9,8,7,6]"));
    assert_eq!(events, ["explored /", "matched /2"]);
    assert_eq!(matches(r#"{"i":{"i":2,">":{".":{}}}}"#, "[9,8,7,6]"), ["/2 7"]);
}

#[test]
fn test_recursion_stops_at_depth_limit() {
    let selector =
        parse_json(r#"{"R":{"d":{"d":2},":>":{"f":{"f>":{"Parents":{"a":{">":{"@":{}}}}}}}}}"#)
            .unwrap();
    let root = data(
        r#"{"Parents": [
            {"Parents": [
                {"Parents": [{"Parents": []}]}
            ]}
        ]}"#,
    );
    insta::assert_snapshot!(transcript(&selector, &root).join("\n"), @r"
    explored /
    explored /Parents
    explored /Parents/0
    explored /Parents/0/Parents
    ");
}

#[test]
fn test_recursion_without_edge_is_rejected() {
    let err = parse_json(r#"{"R":{"d":{"d":2},":>":{"f":{"f>":{"Parents":{"a":{">":{".":{}}}}}}}}}"#)
        .unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"selector spec parse rejected: ExploreRecursive must have at least one ExploreRecursiveEdge"
    );
}

#[test]
fn test_explore_range_is_half_open() {
    assert_eq!(
        matches(r#"{"r":{"^":1,"$":3,">":{".":{}}}}"#, r#"["a","b","c","d"]"#),
        [r#"/1 "b""#, r#"/2 "c""#]
    );
    let err = parse_json(r#"{"r":{"^":3,"$":3,">":{".":{}}}}"#).unwrap_err();
    assert!(err.to_string().contains("ExploreRange"));
}

#[test]
fn test_range_to_the_end_of_i64_walks_only_existing_elements() {
    let source = "[1, 2]";
    assert_eq!(
        matches(r#"{"r":{"^":0,"$":9223372036854775807,">":{".":{}}}}"#, source),
        ["/0 1", "/1 2"]
    );
    assert_eq!(
        matches(r#"{"r":{"^":1,"$":2147483648,">":{".":{}}}}"#, source),
        ["/1 2"]
    );
    assert_eq!(
        matches(
            r#"{"|":[{"f":{"f>":{"x":{".":{}}}}},{"r":{"^":0,"$":9223372036854775807,">":{".":{}}}}]}"#,
            source
        ),
        ["/0 1", "/1 2"]
    );
    assert!(matches(r#"{"r":{"^":5,"$":9223372036854775807,">":{".":{}}}}"#, source).is_empty());
}

#[test]
fn test_depth_zero_and_one_do_not_recurse() {
    let root = data("[[[1]]]");
    for depth in [0, 1] {
        let selector = parse_json(&format!(
            r#"{{"R":{{"d":{{"d":{depth}}},":>":{{"|":[{{".":{{}}}},{{"a":{{">":{{"@":{{}}}}}}}}]}}}}}}"#
        ))
        .unwrap();
        // the root is matched, the edge under it is dropped
        assert_eq!(transcript(&selector, &root), ["matched /"], "depth {depth}");
    }

    let selector =
        parse_json(r#"{"R":{"d":{"d":2},":>":{"|":[{".":{}},{"a":{">":{"@":{}}}}]}}}"#).unwrap();
    assert_eq!(transcript(&selector, &root), ["matched /", "matched /0"]);
}

#[test]
fn test_unbounded_recursion_covers_finite_graph() {
    let selector =
        parse_json(r#"{"R":{"d":{"none":{}},":>":{"|":[{".":{}},{"a":{">":{"@":{}}}}]}}}"#).unwrap();
    let root = data(r#"{"a":[1,{"b":null}],"c":"x"}"#);
    assert_eq!(
        transcript(&selector, &root),
        [
            "matched /",
            "matched /a",
            "matched /a/0",
            "matched /a/1",
            "matched /a/1/b",
            "matched /c",
        ]
    );
}

#[test]
fn test_serialized_selectors_compile_to_the_same_tree() {
    let sources = [
        r#"{".":{}}"#,
        r#"{"a":{">":{"i":{"i":0,">":{".":{}}}}}}"#,
        r#"{"f":{"f>":{"b":true,"a":{"r":{"^":0,"$":5,">":{".":{}}}}}}}"#,
        r#"{"|":[{".":{}},{"f":{"f>":{"x":{".":{}}}}}]}"#,
        r#"{"R":{"l":{"depth":3},":>":{"|":[{".":{}},{"a":{">":{"@":{}}}}]}}}"#,
        r#"{"R":{"d":{"none":{}},":>":{"f":{"f>":{"next":{"R":{"d":{"d":1},":>":{"a":{">":{"@":{}}}}}},"loop":{"@":{}}}}}}}"#,
    ];
    for source in sources {
        let selector = parse_json(source).unwrap();
        let reparsed = parse(&selector.to_node()).unwrap();
        assert_eq!(reparsed, selector, "{source}");
        let text = DagJson.encode(&selector.to_node());
        assert_eq!(parse_json(&text).unwrap(), selector, "{text}");
    }
}

#[test]
fn test_malformed_data_does_not_panic() {
    let selector = parse_json(r#"{"R":{"d":{"none":{}},":>":{"|":[{".":{}},{"i":{"i":1,">":{"@":{}}}},{"f":{"f>":{"k":{"@":{}}}}}]}}}"#)
        .unwrap();
    for source in [
        "null",
        "1.5",
        r#"{"/":"bafy"}"#,
        r#"{"/":{"bytes":"AAEC"}}"#,
        r#"{"k":[0,{"k":[]}],"1":2}"#,
        "[[],[[]],{}]",
    ] {
        let events = transcript(&selector, &data(source));
        assert_eq!(events.first().map(String::as_str), Some("matched /"), "{source}");
    }
}

#[test]
fn test_interests_never_change_results() {
    let root = data(r#"[{"a":1,"b":2},{"a":3},[4,5,6],{"c":{"a":7}}]"#);
    let selectors = [
        r#"{"a":{">":{"f":{"f>":{"a":{".":{}},"c":{"f":{"f>":{"a":{".":{}}}}}}}}}}"#,
        r#"{"|":[{"i":{"i":2,">":{"a":{">":{".":{}}}}}},{"r":{"^":0,"$":2,">":{"f":{"f>":{"b":true}}}}}]}"#,
        r#"{"R":{"d":{"d":3},":>":{"|":[{"f":{"f>":{"a":{".":{}}}}},{"a":{">":{"@":{}}}}]}}}"#,
    ];
    for source in selectors {
        let selector = parse_json(source).unwrap();
        let events = transcript(&selector, &root);
        let brute = brute_force(&selector, &root, String::new());
        assert_eq!(events, brute, "{source}");
    }
}

/// Full enumeration with explore on every child, for comparison.
fn brute_force(selector: &Selector, node: &Node, path: String) -> Vec<String> {
    let reason = if selector.decide(node) {
        VisitReason::Matched
    } else {
        VisitReason::Explored
    };
    let mut events = vec![format!("{reason} /{path}")];
    for (segment, child) in node.entries() {
        if let Some(next) = selector.explore(node, &segment) {
            let child_path = if path.is_empty() {
                segment.to_string()
            } else {
                format!("{path}/{segment}")
            };
            events.extend(brute_force(&next, child, child_path));
        }
    }
    events
}

#[test]
fn test_recursion_through_links() {
    let loader = MemoryLoader::new()
        .with_block("bafyParent", data(r#"{"name":"grandparent","Parents":[]}"#))
        .with_block(
            "bafyChild",
            data(r#"{"name":"parent","Parents":[{"/":"bafyParent"}]}"#),
        );
    let root = data(r#"{"name":"child","Parents":[{"/":"bafyChild"}]}"#);
    let config = WalkConfig::new().loader(loader);
    let selector = parse_json(
        r#"{"R":{"d":{"none":{}},":>":{"f":{"f>":{"name":true,"Parents":{"a":{">":{"@":{}}}}}}}}}"#,
    )
    .unwrap();

    let mut names = Vec::new();
    Walker::new(&config)
        .walk_matching(&root, &selector, |progress, node| {
            let block = progress.last_block().map(|b| b.link.to_string());
            names.push((node.as_str().unwrap_or_default().to_owned(), block));
            Ok(())
        })
        .unwrap();
    assert_eq!(
        names,
        [
            ("child".to_owned(), None),
            ("parent".to_owned(), Some("bafyChild".to_owned())),
            ("grandparent".to_owned(), Some("bafyParent".to_owned())),
        ]
    );
    assert_eq!(
        Walker::new(&config)
            .get(&root, &Path::parse("Parents/0/Parents/0/name"))
            .unwrap(),
        Node::from("grandparent")
    );
}

#[test]
fn test_compile_errors_are_values() {
    let not_a_map = Node::list([Node::Link(Link::new("bafy"))]);
    assert_eq!(
        parse(&not_a_map),
        Err(ParseError::NotAMap {
            found: Kind::List
        })
    );
}
