//! Integration tests for the `kvk` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper function to build a `kvk` invocation isolated from any user
/// configuration.
fn kvk(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kvk").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("KVK_PREFIX")
        .env_remove("KVK_WORKERS")
        .env_remove("KVK_LOG_LEVEL");
    cmd
}

#[test]
fn test_one_shot_echo() {
    let home = TempDir::new().unwrap();
    kvk(&home).args(["echo", "hello", "world"]).assert().success().stdout("hello world\n");
}

#[test]
fn test_echo_flags() {
    let home = TempDir::new().unwrap();
    kvk(&home).args(["echo", "-u", "--times", "2", "hi"]).assert().success().stdout("HI\nHI\n");
}

#[test]
fn test_echo_keeps_lone_dash() {
    let home = TempDir::new().unwrap();
    kvk(&home).args(["echo", "a", "-", "b"]).assert().success().stdout("a - b\n");
}

#[test]
fn test_unknown_command_suggests_alias() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .args(["ecko", "hi"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Error: Command not found: ecko"))
        .stdout(predicate::str::contains("Did you mean 'echo'?"));
}

#[test]
fn test_parse_error_shows_position_and_usage() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .args(["dice", "x"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Error: Expected an integer, but input 'x' was not"))
        .stdout(predicate::str::contains("x\n^"))
        .stdout(predicate::str::contains("Usage: dice <to> [<from>]"));
}

#[test]
fn test_dice_bounds() {
    let home = TempDir::new().unwrap();
    kvk(&home).args(["dice", "3", "3"]).assert().success().stdout("Rolled 3 (3..3)\n");
    kvk(&home)
        .args(["roll", "1", "5"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("The lower bound 5 is above the upper bound 1"))
        .stdout(predicate::str::contains("Usage: roll <to> [<from>]"));
}

#[test]
fn test_admin_hidden_without_permission() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .args(["admin", "ping"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Command not found: admin"))
        .stdout(predicate::str::contains("Did you mean").not());
}

#[test]
fn test_admin_children() {
    let home = TempDir::new().unwrap();
    kvk(&home).args(["--permission", "kvk.admin", "admin", "ping"]).assert().success().stdout("pong\n");
    kvk(&home)
        .args(["--permission", "kvk.admin", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Admin commands"));
    kvk(&home)
        .args(["--as", "alice", "--permission", "kvk.admin", "admin", "announce", "hello", "there"])
        .assert()
        .success()
        .stdout("[alice] hello there\n");
}

#[test]
fn test_admin_bad_child_reports_path() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .args(["--permission", "kvk.admin", "admin", "reboot"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Input command reboot was not a valid subcommand!"))
        .stdout(predicate::str::contains("Usage: admin ping|say"));
}

#[test]
fn test_help_lists_visible_commands() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .arg("help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Available commands:"))
        .stdout(predicate::str::contains("echo"))
        .stdout(predicate::str::contains("admin").not());

    kvk(&home)
        .args(["help", "dice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: dice <to> [<from>]"))
        .stdout(predicate::str::contains("Rolls a random number"))
        .stdout(predicate::str::contains("Aliases: roll"));
}

#[test]
fn test_stdin_lines_with_prefix() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .args(["--workers", "1"])
        .write_stdin("-echo one\nnot a command\n-echo two\n-\n")
        .assert()
        .success()
        .stdout("one\ntwo\n");
}

#[test]
fn test_stdin_errors_do_not_stop_processing() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .args(["--workers", "1"])
        .write_stdin("-nope\n-echo still here\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Command not found: nope"))
        .stdout(predicate::str::contains("still here"));
}

#[test]
fn test_local_config_sets_prefix() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".kvkrc"), "prefix = \"!\"\nworkers = 1\n").unwrap();
    kvk(&home).write_stdin("!echo yes\n-echo no\n").assert().success().stdout("yes\n");
}

#[test]
fn test_explicit_config_grants_permissions() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("admin.toml");
    std::fs::write(&config, "[requester]\nname = \"ops\"\npermissions = [\"kvk.admin\"]\n").unwrap();
    kvk(&home)
        .arg("--config")
        .arg(&config)
        .args(["admin", "say", "hi"])
        .assert()
        .success()
        .stdout("[ops] hi\n");
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .args(["--config", "missing.toml", "echo", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_invalid_worker_count_from_env() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .env("KVK_WORKERS", "lots")
        .args(["echo", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KVK_WORKERS must be a number"));
}

#[test]
fn test_timer_replies_after_delay() {
    let home = TempDir::new().unwrap();
    kvk(&home)
        .args(["timer", "1s", "tea", "is", "ready"])
        .assert()
        .success()
        .stdout("Timer set for 1s\nTime is up: tea is ready\n");
}
