use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_notepad"))
}

/// An isolated home: its own database, config and data directories.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir should be created"),
        }
    }

    fn database(&self) -> PathBuf {
        self.dir.path().join("data").join("notes.db")
    }

    fn config_home(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(bin());
        cmd.args(args)
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.config_home())
            .env("XDG_DATA_HOME", self.dir.path().join("xdg-data"))
            .env("NOTEPAD_DB", self.database())
            .env_remove("NOTEPAD_CONFIG")
            .env_remove("NOTEPAD_PASSWORD")
            .env_remove("NOTEPAD_NEW_PASSWORD")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null());
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("notepad should run")
    }

    fn run_with_password(&self, password: &str, args: &[&str]) -> Output {
        self.command(args)
            .env("NOTEPAD_PASSWORD", password)
            .output()
            .expect("notepad should run")
    }

    fn write_config(&self, contents: &str) {
        let path = self.config_home().join("notepad").join("config.toml");
        std::fs::create_dir_all(path.parent().expect("config parent"))
            .expect("create config dir");
        std::fs::write(path, contents).expect("write config");
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn json(output: &Output) -> serde_json::Value {
    assert_success(output);
    serde_json::from_slice(&output.stdout).expect("output should be JSON")
}

fn added_id(output: &Output) -> String {
    assert_success(output);
    stdout(output)
}

#[test]
fn test_database_created_with_unfiled() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["categories", "list"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "0\tUnfiled\t0");
    assert!(sandbox.database().exists());
}

#[test]
fn test_category_lifecycle() {
    let sandbox = Sandbox::new();
    let id = added_id(&sandbox.run(&["-q", "categories", "add", "Work"]));
    assert_eq!(id, "1");

    assert_success(&sandbox.run(&["categories", "rename", "Work", "Office"]));
    let note = added_id(&sandbox.run(&["-q", "notes", "add", "standup", "--category", "Office"]));

    // Listed by name: "Office" sorts before "Unfiled".
    let categories = json(&sandbox.run(&["categories", "list", "--json"]));
    assert_eq!(categories[0]["id"], 1);
    assert_eq!(categories[0]["name"], "Office");
    assert_eq!(categories[0]["notes"], 1);
    assert_eq!(categories[1]["name"], "Unfiled");

    assert_success(&sandbox.run(&["categories", "delete", "1"]));
    let shown = json(&sandbox.run(&["notes", "show", &note, "--json"]));
    assert_eq!(shown["category_id"], 0);
    assert_eq!(shown["category"], "Unfiled");
}

#[test]
fn test_duplicate_category_is_invalid_input() {
    let sandbox = Sandbox::new();
    assert_success(&sandbox.run(&["categories", "add", "Work"]));
    let output = sandbox.run(&["categories", "add", "Work"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_unfiled_cannot_be_deleted() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["categories", "delete", "0"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_private_notes_hidden_by_default() {
    let sandbox = Sandbox::new();
    assert_success(&sandbox.run(&["notes", "add", "groceries"]));
    assert_success(&sandbox.run(&["notes", "add", "diary", "--private"]));

    let public = json(&sandbox.run(&["notes", "list", "--json", "--sort", "_id"]));
    let public = public.as_array().expect("array");
    assert_eq!(public.len(), 1);
    assert_eq!(public[0]["text"], "groceries");

    let all = json(&sandbox.run(&["notes", "list", "--private", "--json", "--sort", "_id"]));
    let texts: Vec<_> = all
        .as_array()
        .expect("array")
        .iter()
        .map(|n| n["text"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(texts, vec!["groceries", "diary"]);
}

#[test]
fn test_sort_flag_orders_notes() {
    let sandbox = Sandbox::new();
    for text in ["banana", "Apple", "cherry"] {
        assert_success(&sandbox.run(&["notes", "add", text]));
    }
    let listed = json(&sandbox.run(&["notes", "list", "--json", "--sort", "note desc"]));
    let texts: Vec<_> = listed
        .as_array()
        .expect("array")
        .iter()
        .map(|n| n["text"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(texts, vec!["cherry", "banana", "Apple"]);
}

#[test]
fn test_invalid_sort_is_invalid_input() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["notes", "list", "--sort", "colour"]);
    assert_eq!(output.status.code(), Some(4));
    let output = sandbox.run(&["notes", "list", "--sort", "created sideways"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_missing_note_is_not_found() {
    let sandbox = Sandbox::new();
    assert_eq!(sandbox.run(&["notes", "show", "42"]).status.code(), Some(3));
    assert_eq!(sandbox.run(&["notes", "delete", "42"]).status.code(), Some(3));
}

#[test]
fn test_edit_note_text_and_privacy() {
    let sandbox = Sandbox::new();
    let id = added_id(&sandbox.run(&["-q", "notes", "add", "draft"]));
    assert_success(&sandbox.run(&["notes", "edit", &id, "--text", "final", "--private"]));

    let shown = json(&sandbox.run(&["notes", "show", &id, "--json"]));
    assert_eq!(shown["text"], "final");
    assert_eq!(shown["privacy"], "private");
    assert!(shown["modified"].as_i64() >= shown["created"].as_i64());
}

#[test]
fn test_encrypted_note_flow() {
    let sandbox = Sandbox::new();
    assert_success(&sandbox.run_with_password("hunter2", &["password", "set"]));

    let id = added_id(&sandbox.run_with_password(
        "hunter2",
        &["-q", "notes", "add", "bank pin 0000", "--encrypt"],
    ));

    // Listed without a password: ciphertext stays hidden.
    let listed = json(&sandbox.run(&["notes", "list", "--private", "--json"]));
    assert_eq!(listed[0]["privacy"], "encrypted");
    assert_eq!(listed[0]["text"], serde_json::Value::Null);

    // Showing needs the password.
    let locked = sandbox.run(&["notes", "show", &id]);
    assert_eq!(locked.status.code(), Some(5));
    let wrong = sandbox.run_with_password("nope", &["notes", "show", &id]);
    assert_eq!(wrong.status.code(), Some(5));

    let shown = json(&sandbox.run_with_password("hunter2", &["notes", "show", &id, "--json"]));
    assert_eq!(shown["text"], "bank pin 0000");

    let status = json(&sandbox.run(&["password", "status", "--json"]));
    assert_eq!(status["password_set"], true);
    assert_eq!(status["encrypted_notes"], 1);
}

#[test]
fn test_password_check_and_change() {
    let sandbox = Sandbox::new();
    assert_success(&sandbox.run_with_password("old", &["password", "set"]));
    let id = added_id(&sandbox.run_with_password(
        "old",
        &["-q", "notes", "add", "secret", "--encrypt"],
    ));

    assert_success(&sandbox.run_with_password("old", &["password", "check"]));
    assert_eq!(
        sandbox
            .run_with_password("bad", &["password", "check"])
            .status
            .code(),
        Some(5)
    );

    let changed = sandbox
        .command(&["password", "change"])
        .env("NOTEPAD_PASSWORD", "old")
        .env("NOTEPAD_NEW_PASSWORD", "new")
        .output()
        .expect("notepad should run");
    assert_success(&changed);

    assert_eq!(
        sandbox
            .run_with_password("old", &["notes", "show", &id])
            .status
            .code(),
        Some(5)
    );
    let shown = json(&sandbox.run_with_password("new", &["notes", "show", &id, "--json"]));
    assert_eq!(shown["text"], "secret");
}

#[test]
fn test_password_set_twice_is_rejected() {
    let sandbox = Sandbox::new();
    assert_success(&sandbox.run_with_password("pw", &["password", "set"]));
    let again = sandbox.run_with_password("pw", &["password", "set"]);
    assert_eq!(again.status.code(), Some(4));
}

#[test]
fn test_password_remove_decrypts_notes() {
    let sandbox = Sandbox::new();
    assert_success(&sandbox.run_with_password("pw", &["password", "set"]));
    let id = added_id(&sandbox.run_with_password(
        "pw",
        &["-q", "notes", "add", "kept safe", "--encrypt"],
    ));

    assert_eq!(
        sandbox.run(&["password", "remove"]).status.code(),
        Some(5),
        "removal needs the password"
    );
    assert_success(&sandbox.run_with_password("pw", &["password", "remove"]));

    let shown = json(&sandbox.run(&["notes", "show", &id, "--json"]));
    assert_eq!(shown["privacy"], "private");
    assert_eq!(shown["text"], "kept safe");

    let status = json(&sandbox.run(&["password", "status", "--json"]));
    assert_eq!(status["password_set"], false);
}

#[test]
fn test_encrypt_without_password_fails() {
    let sandbox = Sandbox::new();
    let output = sandbox.run_with_password("pw", &["notes", "add", "x", "--encrypt"]);
    assert_eq!(output.status.code(), Some(5));
    let stats = json(&sandbox.run(&["stats", "--json"]));
    assert_eq!(stats["notes"], 0);
}

#[test]
fn test_delete_all_requires_confirmation() {
    let sandbox = Sandbox::new();
    assert_success(&sandbox.run(&["notes", "add", "one"]));
    assert_success(&sandbox.run(&["categories", "add", "Work"]));

    assert_eq!(
        sandbox.run(&["notes", "delete-all"]).status.code(),
        Some(4)
    );
    assert_success(&sandbox.run(&["notes", "delete-all", "--yes"]));
    assert_success(&sandbox.run(&["categories", "delete-all", "-y"]));

    let stats = json(&sandbox.run(&["stats", "--json"]));
    assert_eq!(stats["notes"], 0);
    assert_eq!(stats["categories"], 1);
}

#[test]
fn test_config_sets_unfiled_name_and_show_private() {
    let sandbox = Sandbox::new();
    sandbox.write_config(
        "[display]\nsort = \"_id\"\nshow_private = true\nunfiled_name = \"Misc\"\n",
    );
    assert_success(&sandbox.run(&["notes", "add", "hidden", "--private"]));

    assert_eq!(stdout(&sandbox.run(&["categories", "list"])), "0\tMisc\t1");
    let listed = json(&sandbox.run(&["notes", "list", "--json"]));
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[test]
fn test_config_database_path() {
    let sandbox = Sandbox::new();
    let configured = sandbox.dir.path().join("elsewhere.db");
    sandbox.write_config(&format!(
        "[database]\npath = \"{}\"\n",
        configured.to_string_lossy()
    ));

    let output = sandbox
        .command(&["notes", "add", "here"])
        .env_remove("NOTEPAD_DB")
        .output()
        .expect("notepad should run");
    assert_success(&output);
    assert!(Path::new(&configured).exists());
    assert!(!sandbox.database().exists());
}

#[test]
fn test_stats_counts() {
    let sandbox = Sandbox::new();
    assert_success(&sandbox.run(&["notes", "add", "a"]));
    assert_success(&sandbox.run(&["notes", "add", "b", "--private"]));
    let stats = json(&sandbox.run(&["stats", "--json"]));
    assert_eq!(stats["notes"], 2);
    assert_eq!(stats["private_notes"], 1);
    assert_eq!(stats["encrypted_notes"], 0);
    assert_eq!(stats["password_set"], false);
}
