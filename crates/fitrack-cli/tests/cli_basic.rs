//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with a throwaway HOME so every test gets
//! its own config and database.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

struct Sandbox {
    home: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
        }
    }

    /// Sandbox with the in-memory backend enabled.
    fn offline() -> Self {
        let sandbox = Self::new();
        sandbox.success(&["config", "set", "sync.offline", "true"]);
        sandbox
    }

    fn path(&self) -> &Path {
        self.home.path()
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_fitrack-cli"))
            .args(args)
            .env("HOME", self.path())
            .env_remove("FITRACK_ENV")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        (stdout, stderr, code)
    }

    fn success(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        stdout
    }

    fn json(&self, args: &[&str]) -> Value {
        serde_json::from_str(&self.success(args)).expect("Failed to parse JSON output")
    }

    fn write_routine(&self) -> String {
        let path = self.path().join("routine.json");
        std::fs::write(
            &path,
            r#"{"id":"r-legs","name":"Leg Day","exercises":[
                {"id":"squat","name":"Squat","planned_sets":3,"planned_reps":5}
            ]}"#,
        )
        .unwrap();
        path.to_string_lossy().into_owned()
    }
}

#[test]
fn test_config_set_get_roundtrip() {
    let sandbox = Sandbox::new();
    sandbox.success(&["config", "set", "sync.max_attempts", "9"]);
    assert_eq!(sandbox.success(&["config", "get", "sync.max_attempts"]).trim(), "9");

    let list = sandbox.success(&["config", "list"]);
    assert!(list.contains("sync.base_url = http://localhost:8080/api/"));

    sandbox.success(&["config", "reset"]);
    assert_eq!(sandbox.success(&["config", "get", "sync.max_attempts"]).trim(), "5");
}

#[test]
fn test_config_empty_value_unsets_optional_number() {
    let sandbox = Sandbox::new();
    sandbox.success(&["config", "set", "analytics.utc_offset_minutes", "60"]);
    assert_eq!(
        sandbox.success(&["config", "get", "analytics.utc_offset_minutes"]).trim(),
        "60"
    );

    sandbox.success(&["config", "set", "analytics.utc_offset_minutes", ""]);
    assert_eq!(
        sandbox.success(&["config", "get", "analytics.utc_offset_minutes"]).trim(),
        ""
    );
}

#[test]
fn test_config_rejects_unknown_key() {
    let sandbox = Sandbox::new();
    let (_, stderr, code) = sandbox.run(&["config", "set", "sync.colour", "red"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_offline_session_lifecycle() {
    let sandbox = Sandbox::offline();
    let routine = sandbox.write_routine();

    let started = sandbox.json(&["session", "start", "--routine", &routine]);
    assert_eq!(started["event"]["type"], "SessionStarted");
    assert_eq!(started["event"]["remote_id"], "mem-1");

    let (_, stderr, code) = sandbox.run(&["session", "start", "--routine", &routine]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already in progress"));

    sandbox.json(&["session", "set", "--exercise", "0", "--reps", "5", "--weight", "80"]);
    let paused = sandbox.json(&["session", "pause", "--reason", "equipment"]);
    assert_eq!(paused["event"]["reason"], "equipment");
    assert_eq!(paused["event"]["sync"], "pending");
    assert_eq!(paused["delivery"]["delivered"], 1);
    assert_eq!(paused["delivery"]["remaining"], 0);

    let status = sandbox.json(&["session", "status"]);
    assert_eq!(status["session"]["status"], "paused");
    assert_eq!(status["session"]["exercises"][0]["sets"][0]["reps"], 5);

    sandbox.json(&["session", "resume"]);
    let done = sandbox.json(&[
        "session", "complete", "--intensity", "7", "--energy", "6", "--mood", "good",
    ]);
    assert_eq!(done["event"]["type"], "SessionCompleted");
    assert_eq!(done["delivery"]["delivered"], 1);

    // Terminal and synced: nothing left to resume.
    let (_, stderr, code) = sandbox.run(&["session", "status"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no active workout"));

    let history = sandbox.json(&["history", "show"]);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["status"], "completed");

    let stats = sandbox.json(&["stats"]);
    assert_eq!(stats["completed_sessions"], 1);
    assert_eq!(stats["best_streak_days"], 1);
}

#[test]
fn test_invalid_transition_exits_with_error() {
    let sandbox = Sandbox::offline();
    let routine = sandbox.write_routine();
    sandbox.json(&["session", "start", "--routine", &routine]);

    let (_, stderr, code) = sandbox.run(&["session", "resume"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("cannot resume a session that is in progress"));

    let (_, stderr, code) = sandbox.run(&["session", "pause", "--reason", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("pause reason is required"));

    let abandoned = sandbox.json(&["session", "abandon"]);
    assert_eq!(abandoned["event"]["type"], "SessionAbandoned");
}

#[test]
fn test_start_fails_when_backend_unreachable() {
    let sandbox = Sandbox::new();
    sandbox.success(&["config", "set", "sync.base_url", "http://127.0.0.1:9/api/"]);
    sandbox.success(&["config", "set", "sync.timeout_secs", "2"]);
    let routine = sandbox.write_routine();

    let (_, stderr, code) = sandbox.run(&["session", "start", "--routine", &routine]);
    assert_eq!(code, 1);
    assert!(stderr.contains("could not start workout"));

    let (_, stderr, _) = sandbox.run(&["session", "status"]);
    assert!(stderr.contains("no active workout"));
}

#[test]
fn test_history_pull_keeps_unsynced_workout() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/api/workout-sessions")
        .with_status(201)
        .with_body(r#"{"id": "ws-1"}"#)
        .create();
    server
        .mock("POST", "/api/workout-sessions/ws-1/complete")
        .with_status(503)
        .create();
    server
        .mock("GET", "/api/workout-sessions/history")
        .with_status(200)
        .with_body("[]")
        .create();

    let sandbox = Sandbox::new();
    let base_url = format!("{}/api/", server.url());
    sandbox.success(&["config", "set", "sync.base_url", &base_url]);
    let routine = sandbox.write_routine();
    sandbox.json(&["session", "start", "--routine", &routine]);

    let done = sandbox.json(&[
        "session", "complete", "--intensity", "6", "--energy", "5", "--mood", "okay",
    ]);
    assert_eq!(done["delivery"]["failed"], 1);
    assert_eq!(done["delivery"]["remaining"], 1);

    let pulled = sandbox.success(&["history", "pull"]);
    assert_eq!(pulled.trim(), "pulled 0 sessions");

    let history = sandbox.json(&["history", "show"]);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["status"], "completed");

    let stats = sandbox.json(&["stats"]);
    assert_eq!(stats["completed_sessions"], 1);
}

#[test]
fn test_stats_from_file() {
    let sandbox = Sandbox::new();
    let file = sandbox.path().join("history.json");
    std::fs::write(
        &file,
        r#"{"sessions": [
            {"status": "completed", "ended_at": "2026-05-10T08:00:00Z", "effective_seconds": 1200},
            {"status": "completed", "ended_at": "2026-05-09T08:00:00Z", "duration": "600"},
            {"status": "completed", "ended_at": "2026-05-08T08:00:00Z"},
            {"status": "abandoned", "ended_at": "2026-05-07T08:00:00Z"}
        ]}"#,
    )
    .unwrap();
    sandbox.success(&["config", "set", "analytics.utc_offset_minutes", "0"]);

    let stats = sandbox.json(&[
        "stats",
        "--file",
        &file.to_string_lossy(),
        "--today",
        "2026-05-11",
    ]);
    assert_eq!(stats["total_sessions"], 4);
    assert_eq!(stats["completed_sessions"], 3);
    assert_eq!(stats["total_effective_seconds"], 1800);
    assert_eq!(stats["current_streak_days"], 3);
    assert_eq!(stats["best_streak_days"], 3);
}

#[test]
fn test_stats_with_empty_cache_is_zero() {
    let sandbox = Sandbox::new();
    let stats = sandbox.json(&["stats", "--today", "2026-01-01"]);
    assert_eq!(stats["total_sessions"], 0);
    assert_eq!(stats["avg_sessions_per_week"], 0.0);
}
