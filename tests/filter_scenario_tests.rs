use indoc::indoc;
use resfilter::formats::{CsvFilterProvider, FormatId};
use resfilter::wrap::MAX_COLUMNS;
use resfilter::{
    BundleBuilder, Error, FilterKind, FilterOptions, FilterProvider, FilterRegistry, default_registry,
};
use std::sync::Arc;

#[test]
fn default_registry_lists_builtin_formats() {
    let ids = default_registry().list_format_ids();
    let expected: Vec<String> = FormatId::ALL.iter().map(|id| id.as_str().to_string()).collect();
    assert_eq!(ids.len(), expected.len());
    for id in &expected {
        assert!(default_registry().get_single_filter(id).is_some(), "{}", id);
        assert!(default_registry().get_single_filter(&id.to_lowercase()).is_some(), "{}", id);
    }
    assert!(default_registry().get_single_filter("CSV").is_none());
    assert!(matches!(
        default_registry().filter_for("NOPE"),
        Err(Error::UnknownFormat(id)) if id == "NOPE"
    ));
}

#[test]
fn external_provider_adds_csv() {
    let registry = FilterRegistry::with_providers([Arc::new(CsvFilterProvider) as Arc<dyn FilterProvider>]);
    assert_eq!(registry.list_format_ids().len(), FormatId::ALL.len() + 2);
    assert_eq!(registry.filter_info("csv-multi").unwrap().kind, FilterKind::Multi);

    let csv = registry.filter_for("CSV").unwrap();
    let bundle = csv.parse_bytes(b"key,value\ngreeting,Hello\n", None).unwrap();
    let json = registry.filter_for("JSON").unwrap();
    let written = json.write_bytes(&bundle, None).unwrap();
    assert_eq!(json.parse_bytes(&written, None).unwrap().get("greeting").unwrap().value, "Hello");
}

#[test]
fn properties_merge_replaces_value_in_place() {
    let base = indoc! {"
        # Greetings
        greeting = Hello
        farewell = Bye
    "};
    let mut builder = BundleBuilder::new(true);
    builder.add("greeting", "Bonjour");
    let java = default_registry().filter_for("JAVA").unwrap();
    let merged = java.merge_bytes(base.as_bytes(), &builder.build(), None).unwrap();
    assert_eq!(
        String::from_utf8(merged).unwrap(),
        indoc! {"
            # Greetings
            greeting = Bonjour
            farewell = Bye
        "}
    );
}

#[test]
fn json_keys_follow_nesting() {
    let json = default_registry().filter_for("json").unwrap();
    let bundle = json
        .parse_bytes(br#"{"title": "T", "a": {"b": "x"}, "list": ["p", "q"]}"#, None)
        .unwrap();
    let keys: Vec<&str> = bundle.resource_strings.iter().map(|rs| rs.key.as_str()).collect();
    assert_eq!(keys, vec!["title", "$.a.b", "$.list[0]", "$.list[1]"]);
}

#[test]
fn long_properties_value_wraps_within_columns() {
    let value = "lorem ipsum dolor sit amet ".repeat(8);
    let value = value.trim_end();
    assert!(value.len() > 200);
    let mut builder = BundleBuilder::new(true);
    builder.add("long", value);
    let bundle = builder.build();

    let java = default_registry().filter_for("JAVAUTF8").unwrap();
    let written = String::from_utf8(java.write_bytes(&bundle, None).unwrap()).unwrap();
    let entry_lines: Vec<&str> = written.lines().filter(|l| !l.starts_with('#')).collect();
    assert!(entry_lines.len() > 2);
    assert!(entry_lines.iter().all(|l| l.chars().count() <= MAX_COLUMNS), "{}", written);
    assert_eq!(java.parse_bytes(written.as_bytes(), None).unwrap().get("long").unwrap().value, value);
}

#[test]
fn invalid_options_are_rejected() {
    let options = FilterOptions::new().with_content_locale(Some("!!".to_string()));
    let mut builder = BundleBuilder::new(true);
    builder.add("long", "word ".repeat(40));
    let java = default_registry().filter_for("JAVA").unwrap();
    let result = java.write_bytes(&builder.build(), Some(&options));
    assert!(matches!(result, Err(Error::InvalidOptions(_))));
}

#[test]
fn filters_read_and_write_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messages.strings");

    let mut builder = BundleBuilder::new(true);
    builder.add("greeting", "Hello \"world\"").add("lines", "one\ntwo");
    let bundle = builder.build();

    let ios = default_registry().filter_for("IOS").unwrap();
    ios.write_file(&path, &bundle, None).unwrap();
    assert_eq!(ios.parse_file(&path, None).unwrap(), bundle);

    let missing = dir.path().join("missing.strings");
    assert!(matches!(ios.parse_file(&missing, None), Err(Error::Io(_))));
}

#[test]
fn parse_errors_are_format_errors() {
    let cases: [(&str, &[u8]); 4] = [
        ("JSON", b"[1, 2]"),
        ("XLIFF", b"<root/>"),
        ("ANDROID", b"<resources><string>no name</string></resources>"),
        ("PO", b"msgid \"a\"\nbogus \"b\"\n"),
    ];
    for (id, input) in cases {
        let filter = default_registry().filter_for(id).unwrap();
        let err = filter.parse_bytes(input, None).unwrap_err();
        assert!(err.is_format_error(), "{}: {:?}", id, err);
    }
}
