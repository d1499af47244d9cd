//! Integration tests for katana-builders
//!
//! These tests drive the CLI against snapshot files on disk.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
  "builders": [
    {"name": "Windows 10", "url": "/builders/win", "tags": ["ABV", "Trunk"],
     "latestBuild": {"number": 4, "results": 0, "times": [100.0, 400.0]}},
    {"name": "Linux 2", "url": "/builders/linux2", "tags": ["Nightly"],
     "latestBuild": {"number": 9, "results": 2, "times": [50.0, 60.0]}},
    {"name": "Docs", "url": "/builders/docs", "tags": null},
    {"name": "Linux 10", "url": "/builders/linux10", "tags": ["Trunk-Nightly", "WIP"],
     "latestBuild": {"number": 1, "results": 4, "times": [10.0, 20.0]}},
    {"name": "Mac 4.6", "url": "/builders/mac46", "tags": ["4.6", "4.6-Nightly"]}
  ],
  "latestRevisions": {},
  "comparisonURL": "/compare"
}"#;

/// Helper to create a katana-builders Command isolated from the caller's
/// environment
fn katana() -> Command {
    let mut cmd = cargo_bin_cmd!("katana-builders");
    cmd.env_remove("KATANA_MAIN_CODEBASE")
        .env_remove("KATANA_URL_DEBOUNCE_MS")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a temporary project holding a snapshot file
fn create_project() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("builders.json");
    fs::write(&snapshot, SNAPSHOT).unwrap();
    (dir, snapshot)
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        katana()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("filter"));
    }

    #[test]
    fn test_version() {
        katana().arg("--version").assert().success();
    }
}

// =============================================================================
// Branch Classification Tests
// =============================================================================

mod branch {
    use super::*;

    #[test]
    fn test_release_branch() {
        katana()
            .args(["branch", "--codebase", "unity_branch=release/4.6/foo"])
            .assert()
            .success()
            .stdout("4.6\n");
    }

    #[test]
    fn test_encoded_codebase_value() {
        katana()
            .args(["branch", "--codebase", "unity_branch=2017.1%2Fstaging"])
            .assert()
            .success()
            .stdout("2017.1\n");
    }

    #[test]
    fn test_trunk_from_query() {
        katana()
            .args(["branch", "--query", "unity_branch=trunk&tag=ABV"])
            .assert()
            .success()
            .stdout("trunk\n");
    }

    #[test]
    fn test_unrecognised_main_branch_falls_back_to_trunk() {
        katana()
            .args(["branch", "--codebase", "unity_branch=feature/shiny"])
            .assert()
            .success()
            .stdout("trunk\n");
    }

    #[test]
    fn test_no_codebases() {
        katana().arg("branch").assert().success().stdout("none\n");
    }

    #[test]
    fn test_main_codebase_flag() {
        katana()
            .args([
                "branch",
                "--main-codebase",
                "editor_branch",
                "--codebase",
                "unity_branch=feature/shiny",
            ])
            .assert()
            .success()
            .stdout("none\n");
    }

    #[test]
    fn test_main_codebase_env() {
        katana()
            .env("KATANA_MAIN_CODEBASE", "editor_branch")
            .args(["branch", "--codebase", "editor_branch=feature/shiny"])
            .assert()
            .success()
            .stdout("trunk\n");
    }

    #[test]
    fn test_snapshot_confirms_branch_tag() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .args(["branch", "--codebase", "unity_branch=release/4.6/foo"])
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success()
            .stdout("4.6\n");

        katana()
            .current_dir(dir.path())
            .args(["branch", "--codebase", "unity_branch=2017.1/staging"])
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success()
            .stdout("trunk\n");
    }

    #[test]
    fn test_malformed_codebase_arg() {
        katana()
            .args(["branch", "--codebase", "unity_branch"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("CODEBASE=BRANCH"));
    }
}

// =============================================================================
// Tag Catalog Tests
// =============================================================================

mod tags {
    use super::*;

    #[test]
    fn test_tags_without_branch() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("tags")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("Trunk-Nightly\n"))
            .stdout(predicate::str::contains("ABV && Trunk\n"))
            .stdout(predicate::str::contains("No Tag\n"));
    }

    #[test]
    fn test_tags_scoped_to_trunk() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("tags")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--query", "unity_branch=trunk"])
            .assert()
            .success()
            .stdout("ABV\nNightly\nNightly && WIP\nNo Tag\nWIP\n");
    }

    #[test]
    fn test_tags_json() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("tags")
            .arg("--snapshot")
            .arg(&snapshot)
            .arg("--json")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"results\""))
            .stdout(predicate::str::contains("\"id\": \"No Tag\""));
    }
}

// =============================================================================
// Filter Tests
// =============================================================================

mod filter {
    use super::*;

    #[test]
    fn test_all_rows_sorted_by_name() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success()
            .stdout("Docs\nLinux 2\nLinux 10\nMac 4.6\nWindows 10\n");
    }

    #[test]
    fn test_selected_tag_on_trunk() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--query", "unity_branch=trunk", "--tags", "Nightly"])
            .assert()
            .success()
            .stdout("Linux 2\nLinux 10\n");
    }

    #[test]
    fn test_branch_scoping_hides_other_branches() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--codebase", "unity_branch=release/4.6/foo"])
            .assert()
            .success()
            .stdout("Docs\nLinux 2\nMac 4.6\n");
    }

    #[test]
    fn test_hide_unstable() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--query", "unity_branch=trunk", "--hide-unstable"])
            .assert()
            .success()
            .stdout("Docs\nLinux 2\nWindows 10\n");
    }

    #[test]
    fn test_search_and_sort() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--search", "linux", "--sort", "name:desc"])
            .assert()
            .success()
            .stdout("Linux 10\nLinux 2\n");
    }

    #[test]
    fn test_sort_by_status_desc() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--sort", "status:desc"])
            .assert()
            .success()
            .stdout("Linux 10\nWindows 10\nLinux 2\nDocs\nMac 4.6\n");
    }

    #[test]
    fn test_print_url() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--query", "unity_branch=trunk", "--tags", "Nightly", "--print-url"])
            .assert()
            .success()
            .stdout(predicate::str::ends_with(
                "?unity_branch=trunk&tag=Nightly&hide_unstable=false\n",
            ));
    }

    #[test]
    fn test_json_rows() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--query", "unity_branch=trunk", "--tags", "ABV", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"name\": \"Windows 10\""))
            .stdout(predicate::str::contains("\"status\": \"success\""))
            .stdout(predicate::str::contains("Linux").not());
    }

    #[test]
    fn test_project_config_hides_unstable() {
        let (dir, snapshot) = create_project();
        fs::create_dir_all(dir.path().join(".katana")).unwrap();
        fs::write(
            dir.path().join(".katana/builders.toml"),
            "[page]\nhide_unstable = true\n",
        )
        .unwrap();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--query", "unity_branch=trunk"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Linux 10").not());
    }

    #[test]
    fn test_missing_snapshot() {
        let (dir, _) = create_project();

        katana()
            .current_dir(dir.path())
            .args(["filter", "--snapshot", "missing.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load snapshot"));
    }

    #[test]
    fn test_unknown_sort_column() {
        let (dir, snapshot) = create_project();

        katana()
            .current_dir(dir.path())
            .arg("filter")
            .arg("--snapshot")
            .arg(&snapshot)
            .args(["--sort", "owner"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown column 'owner'"));
    }
}

// =============================================================================
// Comparator Tests
// =============================================================================

mod sort {
    use super::*;

    #[test]
    fn test_natural() {
        katana()
            .args(["sort", "--type", "natural", "b10", "b9", "a"])
            .assert()
            .success()
            .stdout("a\nb9\nb10\n");
    }

    #[test]
    fn test_builder_status() {
        katana()
            .args([
                "sort",
                "--type",
                "builder-status",
                "none",
                "success",
                "exception",
                "failure",
            ])
            .assert()
            .success()
            .stdout("failure\nsuccess\nexception\nnone\n");
    }

    #[test]
    fn test_number_ignore_zero_desc() {
        katana()
            .args(["sort", "--type", "number-ignore-zero", "--desc", "0", "5", "12"])
            .assert()
            .success()
            .stdout("12\n5\n0\n");
    }

    #[test]
    fn test_unknown_type() {
        katana()
            .args(["sort", "--type", "fuzzy", "a"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown sort type 'fuzzy'"));
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();

        katana()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using default configuration"))
            .stdout(predicate::str::contains("main_codebase = \"unity_branch\""));
    }

    #[test]
    fn test_config_init_creates_toml() {
        let dir = TempDir::new().unwrap();

        katana()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created builders.toml"));

        assert!(dir.path().join(".katana/builders.toml").exists());

        katana()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_no_config() {
        let dir = TempDir::new().unwrap();

        katana()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using defaults (valid)"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".katana")).unwrap();
        fs::write(
            dir.path().join(".katana/builders.toml"),
            "[table]\ndefault_sort_column = \"owner\"\n",
        )
        .unwrap();

        katana()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("owner"));
    }

    #[test]
    fn test_config_show_env_override() {
        let dir = TempDir::new().unwrap();

        katana()
            .current_dir(dir.path())
            .env("KATANA_URL_DEBOUNCE_MS", "250")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("url_debounce_ms = 250"));
    }
}
