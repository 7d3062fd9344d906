use super::*;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
struct TestData {
    name: String,
    value: i32,
}

impl Formattable for TestData {
    fn format_pretty(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }
}

#[derive(Debug, Serialize, Tabled)]
struct Row {
    #[tabled(rename = "URI")]
    uri: String,
    #[tabled(rename = "SIZE")]
    size: String,
}

fn rows() -> Vec<Row> {
    vec![
        Row {
            uri: "labs/tool:latest".to_string(),
            size: "14 B".to_string(),
        },
        Row {
            uri: "labs/other:1.0".to_string(),
            size: "-".to_string(),
        },
    ]
}

#[test]
fn test_output_format_from_string() {
    assert_eq!(OutputFormat::from("pretty"), OutputFormat::Pretty);
    assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
    assert_eq!(OutputFormat::from("yml"), OutputFormat::Yaml);
    assert_eq!(OutputFormat::from("invalid"), OutputFormat::Pretty);
}

#[test]
fn test_color_choice_from_string() {
    assert_eq!(ColorChoice::from("always"), ColorChoice::Always);
    assert_eq!(ColorChoice::from("never"), ColorChoice::Never);
    assert_eq!(ColorChoice::from("auto"), ColorChoice::Auto);
    assert_eq!(ColorChoice::from("bogus"), ColorChoice::Auto);
}

#[test]
fn test_color_choice_forced() {
    assert!(ColorChoice::Always.enabled());
    assert!(!ColorChoice::Never.enabled());
}

#[test]
fn test_format_pretty() {
    let data = TestData {
        name: "test".to_string(),
        value: 42,
    };
    assert_eq!(format_output(&data, OutputFormat::Pretty).unwrap(), "test: 42");
}

#[test]
fn test_format_json() {
    let data = TestData {
        name: "test".to_string(),
        value: 42,
    };
    let output = format_output(&data, OutputFormat::Json).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["name"], "test");
    assert_eq!(json["value"], 42);
}

#[test]
fn test_format_yaml() {
    let data = TestData {
        name: "test".to_string(),
        value: 42,
    };
    let output = format_output(&data, OutputFormat::Yaml).unwrap();
    assert!(output.contains("name: test"));
    assert!(output.contains("value: 42"));
}

#[test]
fn test_format_table_pretty() {
    let output = format_table(&rows(), OutputFormat::Pretty, "nothing").unwrap();

    assert!(output.contains("URI"));
    assert!(output.contains("SIZE"));
    assert!(output.contains("labs/tool:latest"));
    assert!(output.contains("labs/other:1.0"));
}

#[test]
fn test_format_table_empty() {
    let empty: Vec<Row> = Vec::new();
    assert_eq!(
        format_table(&empty, OutputFormat::Pretty, "No containers found.").unwrap(),
        "No containers found."
    );
    assert_eq!(format_table(&empty, OutputFormat::Json, "unused").unwrap(), "[]");
}

#[test]
fn test_format_table_json() {
    let output = format_table(&rows(), OutputFormat::Json, "nothing").unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json[0]["uri"], "labs/tool:latest");
    assert_eq!(json[1]["size"], "-");
}

#[test]
fn test_plain_spinner_is_hidden() {
    let spinner = PlainFormatter.spinner("Pushing");
    assert!(spinner.is_hidden());
    PlainFormatter.finish_spinner(spinner);
}
