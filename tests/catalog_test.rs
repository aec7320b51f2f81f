use schemagen::catalog::{schema_file_path, EntityEscaper, SchemaKind, XmlEntityEscaper};
use schemagen::error::Error;
use schemagen::{AttributeMap, SchemaParser};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> AttributeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn write_schema(root: &Path, kind: SchemaKind, name: &str, body: &str) {
    let dir = root.join(kind.dir_name());
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.sch", name)), body).unwrap();
}

#[test]
fn test_schema_file_path_convention() {
    let root = Path::new("/srv/schemas");
    assert_eq!(
        schema_file_path(root, SchemaKind::Sql, "table"),
        root.join("sql").join("table.sch")
    );
    assert_eq!(
        schema_file_path(root, SchemaKind::Xml, "view"),
        root.join("xml").join("view.sch")
    );
}

#[test]
fn test_expand_sql_object() {
    let temp_dir = TempDir::new().unwrap();
    write_schema(
        temp_dir.path(),
        SchemaKind::Sql,
        "table",
        "CREATE$sp TABLE$sp {name};$br",
    );

    let mut parser = SchemaParser::new();
    let output = parser
        .expand_object(
            temp_dir.path(),
            "table",
            &env(&[("name", "users")]),
            SchemaKind::Sql,
        )
        .unwrap();
    assert_eq!(output, "CREATE TABLE users;\n");
}

#[test]
fn test_expand_object_injects_version_attribute() {
    let temp_dir = TempDir::new().unwrap();
    write_schema(
        temp_dir.path(),
        SchemaKind::Sql,
        "versioned",
        "[-- server ]{pgsql-version}$br",
    );

    let mut parser = SchemaParser::new();
    parser.set_version("9.6").unwrap();
    let output = parser
        .expand_object(
            temp_dir.path(),
            "versioned",
            &AttributeMap::new(),
            SchemaKind::Sql,
        )
        .unwrap();
    assert_eq!(output, "-- server 9.6\n");
}

#[test]
fn test_expand_file_injects_version_attribute() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("loose.sch");
    fs::write(&path, "{pgsql-version}$br").unwrap();

    let mut parser = SchemaParser::new();
    let output = parser.expand_file(&path, &AttributeMap::new()).unwrap();
    assert_eq!(output, "10.0\n");
}

#[test]
fn test_expand_xml_object_escapes_attribute_values() {
    let temp_dir = TempDir::new().unwrap();
    write_schema(
        temp_dir.path(),
        SchemaKind::Xml,
        "view",
        "[<view name=\"]{name}[\" query=\"a < b\"/>]$br",
    );

    let mut parser = SchemaParser::new();
    let output = parser
        .expand_object(
            temp_dir.path(),
            "view",
            &env(&[("name", "v1")]),
            SchemaKind::Xml,
        )
        .unwrap();
    assert_eq!(output, "<view name=\"v1\" query=\"a &lt; b\"/>\n");
}

#[test]
fn test_expand_missing_object() {
    let temp_dir = TempDir::new().unwrap();
    let mut parser = SchemaParser::new();
    let result = parser.expand_object(
        temp_dir.path(),
        "absent",
        &AttributeMap::new(),
        SchemaKind::Sql,
    );
    assert!(matches!(result, Err(Error::FileNotAccessible { .. })));
}

#[test]
fn test_escaper_rewrites_special_characters() {
    let escaper = XmlEntityEscaper;
    assert_eq!(
        escaper.escape("<col name=\"a<b\"/>"),
        "<col name=\"a&lt;b\"/>\n"
    );
    assert_eq!(
        escaper.escape("<col name=\"x > y\"/>"),
        "<col name=\"x &gt; y\"/>\n"
    );
    assert_eq!(
        escaper.escape("<col name=\"Tom & Jerry\"/>"),
        "<col name=\"Tom &amp; Jerry\"/>\n"
    );
}

#[test]
fn test_escaper_leaves_plain_values_alone() {
    let escaper = XmlEntityEscaper;
    assert_eq!(
        escaper.escape("<col name=\"plain\" type=\"text\"/>"),
        "<col name=\"plain\" type=\"text\"/>\n"
    );
}

#[test]
fn test_escaper_keeps_existing_entities() {
    let escaper = XmlEntityEscaper;
    assert_eq!(
        escaper.escape("<col name=\"a&amp;b\"/>"),
        "<col name=\"a&amp;b\"/>\n"
    );
}

#[test]
fn test_escaper_skips_xml_header() {
    let escaper = XmlEntityEscaper;
    let header = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
    assert_eq!(escaper.escape(header), format!("{}\n", header));
}

#[test]
fn test_escaper_skips_comment_blocks() {
    let escaper = XmlEntityEscaper;
    let input = "<!-- a < b\nstill < inside -->";
    assert_eq!(escaper.escape(input), "<!-- a < b\nstill < inside -->\n");
}
