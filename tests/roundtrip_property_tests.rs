use proptest::prelude::*;
use resfilter::formats::key_path::{PathSegment, decode_path, encode_path};
use resfilter::formats::properties::{EscapeSpace, escape, unescape};
use resfilter::{Bundle, BundleBuilder, ResourceString, default_registry};
use std::collections::BTreeMap;

fn key_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("valid key regex")
}

fn value_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z]([A-Za-z0-9 _\\-\\.,!\\?]{0,28}[A-Za-z0-9])?")
        .expect("valid value regex")
}

fn dataset_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 1..8)
}

fn segment_strategy() -> impl Strategy<Value = PathSegment> {
    prop_oneof![
        json_name_strategy().prop_map(PathSegment::Name),
        (0usize..20).prop_map(PathSegment::Index),
    ]
}

fn json_name_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("[A-Za-z0-9 ._'\\[\\]$-]{0,8}")
        .expect("valid name regex")
        .boxed()
}

fn yaml_name_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("[a-z][a-z0-9]{0,5}")
        .expect("valid name regex")
        .boxed()
}

/// A nested document without empty containers.
#[derive(Debug, Clone)]
enum Node {
    Leaf(String),
    Object(BTreeMap<String, Node>),
    Array(Vec<Node>),
}

fn document_strategy(names: BoxedStrategy<String>) -> impl Strategy<Value = BTreeMap<String, Node>> {
    let member_names = names.clone();
    let node = value_strategy()
        .prop_map(Node::Leaf)
        .prop_recursive(3, 16, 3, move |inner| {
            prop_oneof![
                prop::collection::btree_map(member_names.clone(), inner.clone(), 1..3).prop_map(Node::Object),
                prop::collection::vec(inner, 1..3).prop_map(Node::Array),
            ]
        });
    prop::collection::btree_map(names, node, 1..4)
}

fn collect_leaves(node: &Node, path: &mut Vec<PathSegment>, out: &mut Vec<(Vec<PathSegment>, String)>) {
    match node {
        Node::Leaf(value) => out.push((path.clone(), value.clone())),
        Node::Object(members) => {
            for (name, child) in members {
                path.push(PathSegment::Name(name.clone()));
                collect_leaves(child, path, out);
                path.pop();
            }
        }
        Node::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                collect_leaves(child, path, out);
                path.pop();
            }
        }
    }
}

fn leaves(document: &BTreeMap<String, Node>) -> Vec<(Vec<PathSegment>, String)> {
    let mut out = Vec::new();
    collect_leaves(&Node::Object(document.clone()), &mut Vec::new(), &mut out);
    out
}

/// `menu.items[0]` style keys.
fn dotted_key(path: &[PathSegment]) -> String {
    let mut key = String::new();
    for segment in path {
        match segment {
            PathSegment::Name(name) => {
                if !key.is_empty() {
                    key.push('.');
                }
                key.push_str(name);
            }
            PathSegment::Index(index) => key.push_str(&format!("[{}]", index)),
        }
    }
    key
}

fn build_bundle(values: &BTreeMap<String, String>) -> Bundle {
    let mut builder = BundleBuilder::new(true);
    builder.embedded_language_code("fr");
    for (key, value) in values {
        builder.add(key.as_str(), value.as_str());
    }
    builder.build()
}

fn value_pairs(bundle: &Bundle) -> BTreeMap<String, String> {
    bundle
        .resource_strings
        .iter()
        .map(|rs| (rs.key.clone(), rs.value.clone()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn properties_unescape_reverses_escape(s in ".*", utf8 in any::<bool>()) {
        for mode in [EscapeSpace::All, EscapeSpace::LeadingOnly, EscapeSpace::None] {
            prop_assert_eq!(unescape(&escape(&s, mode, utf8)).unwrap(), s.clone());
        }
    }

    #[test]
    fn key_path_decode_reverses_encode(segments in prop::collection::vec(segment_strategy(), 1..5)) {
        let key = encode_path(&segments);
        prop_assert_eq!(decode_path(&key), segments);
    }

    #[test]
    fn sorted_order_puts_known_sequence_numbers_first(
        entries in prop::collection::vec((key_strategy(), prop::option::of(0u32..10)), 0..12),
        unknown_first in any::<bool>(),
    ) {
        let mut builder = BundleBuilder::new(false);
        for (key, seq) in &entries {
            let mut rs = ResourceString::new(key.as_str(), "v");
            if let Some(seq) = seq {
                rs = rs.with_sequence_number(*seq);
            }
            builder.add_resource_string(rs).unwrap();
        }
        let bundle = builder.build();
        let sorted = bundle.sorted_resource_strings_with(unknown_first);
        prop_assert_eq!(sorted.len(), bundle.len());
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            match (a.sequence_number, b.sequence_number) {
                (Some(x), Some(y)) => prop_assert!(x < y || (x == y && a.key <= b.key)),
                (None, None) => prop_assert!(a.key <= b.key),
                (None, Some(_)) => prop_assert!(unknown_first),
                (Some(_), None) => prop_assert!(!unknown_first),
            }
        }
    }

    #[test]
    fn single_bundle_formats_round_trip(values in dataset_strategy()) {
        let bundle = build_bundle(&values);
        let registry = default_registry();
        for id in ["AMDJS", "ANDROID", "IOS", "JAVA", "JAVAUTF8", "JSON", "PO", "XLIFF", "YML"] {
            let filter = registry.get_single_filter(id).unwrap();
            let written = filter.write_bytes(&bundle, None).unwrap();
            let parsed = filter.parse_bytes(&written, None).unwrap();
            prop_assert_eq!(value_pairs(&parsed), values.clone(), "format {}", id);
        }
    }

    #[test]
    fn json_nested_key_paths_round_trip(document in document_strategy(json_name_strategy())) {
        let values: BTreeMap<String, String> = leaves(&document)
            .into_iter()
            .map(|(path, value)| (encode_path(&path), value))
            .collect();
        let bundle = build_bundle(&values);
        let json = default_registry().get_single_filter("JSON").unwrap();
        let written = json.write_bytes(&bundle, None).unwrap();
        let parsed = json.parse_bytes(&written, None).unwrap();
        prop_assert_eq!(value_pairs(&parsed), values);
    }

    #[test]
    fn yaml_nested_keys_round_trip(document in document_strategy(yaml_name_strategy())) {
        let values: BTreeMap<String, String> = leaves(&document)
            .into_iter()
            .map(|(path, value)| (dotted_key(&path), value))
            .collect();
        let bundle = build_bundle(&values);
        let yaml = default_registry().get_single_filter("YML").unwrap();
        let written = yaml.write_bytes(&bundle, None).unwrap();
        let parsed = yaml.parse_bytes(&written, None).unwrap();
        prop_assert_eq!(value_pairs(&parsed), values);
    }
}
