//! Integration tests for Polybuild

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Isolated environment: config and history live under `home`
    fn polybuild(home: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("polybuild");
        cmd.env("POLYBUILD_CONFIG", home.path().join("config.toml"))
            .env("POLYBUILD_STATE_DIR", home.path().join("state"))
            .arg("--plain");
        cmd
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        polybuild(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage: polybuild"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        polybuild(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("polybuild"));
    }

    #[test]
    fn config_path_honours_env() {
        let home = TempDir::new().unwrap();
        polybuild(&home)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let home = TempDir::new().unwrap();
        polybuild(&home)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[build]"));
    }

    #[test]
    fn signature_prints_truncated_digests() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(project.path(), "a.txt", "hello");

        polybuild(&home)
            .arg("signature")
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("2cf24dba5fb0a30e  a.txt"));
    }

    #[test]
    fn signature_missing_project_fails() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        polybuild(&home)
            .arg("signature")
            .arg(project.path().join("missing"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Project directory not found"));
    }

    #[test]
    fn info_detects_cargo() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(project.path(), "Cargo.toml", "[package]\nname = \"demo\"\n");
        write(project.path(), "src/main.rs", "fn main() {}\n");

        polybuild(&home)
            .args(["info", "--format", "json"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("\"rust\""))
            .stdout(predicate::str::contains("\"cargo\""));
    }

    #[test]
    fn order_lists_dependencies_first() {
        let home = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        write(dir.path(), "deps.json", r#"{"app": ["lib"], "lib": []}"#);

        polybuild(&home)
            .arg("order")
            .arg(dir.path().join("deps.json"))
            .assert()
            .success()
            .stdout(predicate::str::diff("lib\napp\n"));
    }

    #[test]
    fn order_reports_cycles() {
        let home = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        write(dir.path(), "deps.toml", "a = [\"b\"]\nb = [\"a\"]\n");
        let file = dir.path().join("deps.toml");

        polybuild(&home)
            .arg("order")
            .arg(&file)
            .assert()
            .success()
            .stderr(predicate::str::contains("cycle:"));

        polybuild(&home)
            .args(["order", "--strict"])
            .arg(&file)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Dependency cycle detected"));
    }

    #[test]
    fn order_rejects_malformed_file() {
        let home = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        write(dir.path(), "deps.json", "not json");

        polybuild(&home)
            .arg("order")
            .arg(dir.path().join("deps.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid dependency file"));
    }

    #[test]
    fn cache_clear_on_empty_project() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        polybuild(&home)
            .args(["cache", "clear", "-y", "--project"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries to clear"));
    }

    #[test]
    fn build_without_units_fails_with_hint() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(project.path(), "README", "nothing to build");

        polybuild(&home)
            .arg("build")
            .arg(project.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("No build tools detected"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[cfg(unix)]
    #[test]
    fn build_twice_reuses_cache() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(
            project.path(),
            ".polybuild.toml",
            "[build.units.hello]\ncommands = [\"echo hello\"]\n",
        );

        polybuild(&home)
            .args(["build", "--strategy", "incremental"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("hello built"));

        polybuild(&home)
            .args(["build", "--strategy", "incremental"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("hello up to date"));

        polybuild(&home)
            .args(["cache", "list", "--format", "plain", "--project"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("build/hello"));

        polybuild(&home)
            .args(["stats", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("builds 2"));
    }

    #[cfg(unix)]
    #[test]
    fn failed_unit_blocks_dependents() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(
            project.path(),
            ".polybuild.toml",
            r#"
[build.dependencies]
app = ["lib"]

[build.units.lib]
commands = ["exit 2"]

[build.units.app]
commands = ["echo app"]
"#,
        );

        polybuild(&home)
            .args(["build", "--strategy", "dependency_graph"])
            .arg(project.path())
            .assert()
            .failure()
            .stdout(predicate::str::contains("app not run"))
            .stderr(predicate::str::contains("Build failed: lib"));
    }

    #[cfg(unix)]
    #[test]
    fn dependency_on_missing_unit_is_ignored() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(
            project.path(),
            ".polybuild.toml",
            r#"
[build.dependencies]
app = ["make"]

[build.units.app]
commands = ["echo app"]
"#,
        );

        polybuild(&home)
            .args(["build", "--strategy", "dependency_graph"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("app built"));
    }

    #[test]
    fn init_creates_local_config() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        polybuild(&home)
            .args(["init", "--path"])
            .arg(project.path())
            .assert()
            .success();

        assert!(project.path().join(".polybuild.toml").is_file());

        polybuild(&home)
            .args(["init", "--path"])
            .arg(project.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn completions_bash() {
        let home = TempDir::new().unwrap();
        polybuild(&home)
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("polybuild"));
    }
}
