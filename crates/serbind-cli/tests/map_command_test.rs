use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const SCHEMAS: &str = r#"
schemas:
  - name: Person
    properties:
      id: integer
      first: string
      last: string
      address: Address
  - name: Address
    properties:
      city: string
      zip: string
  - name: AddressView
    serialized_from: Address
    fields:
      - { name: city, type: string, public: true }
      - { name: zip, type: string, public: true }
  - name: PersonView
    serialized_from: Person
    fields:
      - { name: id, type: integer, public: true }
      - { name: fullName, type: string, public: true }
      - name: home
        type: AddressView
        public: true
        from_field: address
        with_serializer: { fields: [city] }
    methods:
      - name: makeFullName
        params: [string, string]
        returns: string
        format: "{0} {1}"
        synthesized: { target: fullName, from: [first, last] }
"#;

const PEOPLE: &str = r#"[
  {"id": 1, "first": "Ada", "last": "Lovelace", "address": {"city": "London", "zip": "N1"}},
  null
]"#;

fn cargo_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_serbind"))
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temporary directory");
        fs::write(dir.path().join("people.yaml"), SCHEMAS).expect("write schemas");
        fs::write(dir.path().join("people.json"), PEOPLE).expect("write input");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).expect("write fixture file");
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        let schemas = self.path("people.yaml");
        Command::new(cargo_bin())
            .arg("--schema")
            .arg(&schemas)
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("run serbind")
    }
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("UTF-8 path")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "expected success; stdout: {}; stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn plan_command_prints_bindings() {
    let fixture = Fixture::new();

    let plan = stdout_json(&fixture.run(&["plan", "PersonView"]));

    assert_eq!(plan["target"], "PersonView");
    assert_eq!(plan["source"], "Person");
    let fields: Vec<&str> = plan["bindings"]
        .as_array()
        .expect("bindings array")
        .iter()
        .map(|step| step["field"].as_str().expect("field name"))
        .collect();
    assert_eq!(fields, ["fullName", "id", "home"]);
    assert_eq!(plan["bindings"][0]["kind"], "synthetic");
    assert_eq!(plan["bindings"][0]["readers"], json!(["getFirst", "getLast"]));
    assert_eq!(plan["bindings"][2]["chained"]["default_filter"], json!(["city"]));
}

#[test]
fn map_command_writes_ordered_mappings() {
    let fixture = Fixture::new();
    let input = fixture.path("people.json");

    let output = fixture.run(&["map", "PersonView", arg(&input)]);
    let mapped = stdout_json(&output);

    assert_eq!(
        mapped,
        json!([
            {"fullName": "Ada Lovelace", "home": {"city": "London"}, "id": 1},
            {}
        ])
    );
    let text = String::from_utf8_lossy(&output.stdout);
    let full_name = text.find("fullName").expect("fullName key");
    let id = text.find("\"id\"").expect("id key");
    assert!(full_name < id, "keys should be sorted: {text}");
}

#[test]
fn map_command_applies_field_filter_to_single_object() {
    let fixture = Fixture::new();
    let input = fixture.write(
        "one.json",
        r#"{"id": 5, "first": "Grace", "last": "Hopper", "address": null}"#,
    );

    let mapped = stdout_json(&fixture.run(&["map", "PersonView", arg(&input), "--fields", "id,home"]));

    assert_eq!(mapped, json!({"home": {}, "id": 5}));
}

#[test]
fn map_command_writes_instances_to_output_file() {
    let fixture = Fixture::new();
    let input = fixture.path("people.json");
    let output_path = fixture.path("out.json");

    let output = fixture.run(&[
        "map",
        "PersonView",
        arg(&input),
        "--instance",
        "--output",
        arg(&output_path),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output_path).expect("output file")).expect("JSON");
    assert_eq!(
        written,
        json!([
            {
                "id": 1,
                "fullName": "Ada Lovelace",
                "home": {"city": "London", "zip": null}
            },
            null
        ])
    );
}

#[test]
fn config_file_supplies_schema_paths() {
    let fixture = Fixture::new();
    let config = fixture.write("serbind.yaml", "schema_paths:\n  - people.yaml\nlog_level: info\n");

    let output = Command::new(cargo_bin())
        .args(["--config", arg(&config), "plan", "AddressView"])
        .env_remove("RUST_LOG")
        .output()
        .expect("run serbind");

    let plan = stdout_json(&output);
    assert_eq!(plan["source"], "Address");
}

#[test]
fn compile_errors_fail_the_command() {
    let fixture = Fixture::new();

    let output = fixture.run(&["plan", "Person"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a serializer"), "stderr: {stderr}");
    assert!(stderr.contains("Person"), "stderr: {stderr}");
}

#[test]
fn mismatched_input_is_rejected() {
    let fixture = Fixture::new();
    let input = fixture.write("bad.json", r#"{"id": "one"}"#);

    let output = fixture.run(&["map", "PersonView", arg(&input)]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Person"), "stderr: {stderr}");
}
