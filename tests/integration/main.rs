//! Integration tests for stagecache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A build directory, a config pointing at it and a private state dir
    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let build = dir.path().join("build");
            fs::create_dir_all(build.join("assets")).unwrap();
            fs::write(build.join("index.html"), "<html>app</html>").unwrap();
            fs::write(build.join("main.dart.js"), "main(){}").unwrap();
            fs::write(build.join("flutter_bootstrap.js"), "boot()").unwrap();
            fs::write(build.join("assets/logo.png"), "png").unwrap();

            let config = format!(
                "[general]\nstate_dir = '{}'\n\n[origin]\nurl = 'http://127.0.0.1:9'\n\n[bundle]\nresources = '{}'\n",
                dir.path().join("state").display(),
                dir.path().join("resources.json").display(),
            );
            fs::write(dir.path().join("config.toml"), config).unwrap();

            Self { dir }
        }

        fn build(&self) -> PathBuf {
            self.dir.path().join("build")
        }

        fn config(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        /// Command reading assets from the build directory
        fn cmd(&self) -> Command {
            let mut cmd = self.offline_cmd();
            cmd.arg("--from-dir").arg(self.build());
            cmd
        }

        /// Command using the (unreachable) configured origin
        fn offline_cmd(&self) -> Command {
            let mut cmd = stagecache();
            cmd.env("STAGECACHE_CONFIG", self.config())
                .current_dir(self.dir.path());
            cmd
        }

        fn scan(&self) {
            self.cmd()
                .arg("scan")
                .arg(self.build())
                .assert()
                .success()
                .stdout(predicate::str::contains("5 resources (3 shell)"));
        }

        fn path(&self, relative: &str) -> PathBuf {
            self.dir.path().join(relative)
        }
    }

    fn stagecache() -> Command {
        cargo_bin_cmd!("stagecache")
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn help_displays() {
        stagecache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("versioned offline asset cache"));
    }

    #[test]
    fn version_displays() {
        stagecache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("stagecache"));
    }

    #[test]
    fn config_path() {
        let ws = Workspace::new();
        ws.offline_cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new();
        ws.offline_cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[stores]"))
            .stdout(predicate::str::contains("app-cache"));
    }

    #[test]
    fn scan_writes_resource_table() {
        let ws = Workspace::new();
        ws.scan();

        let table = read(&ws.path("resources.json"));
        assert!(table.contains("\"/\""));
        assert!(table.contains("assets/logo.png"));
    }

    #[test]
    fn install_activate_serve() {
        let ws = Workspace::new();
        ws.scan();

        ws.cmd()
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("3 shell files staged"));

        ws.cmd()
            .arg("activate")
            .assert()
            .success()
            .stdout(predicate::str::contains("First activation"))
            .stdout(predicate::str::contains("Merged:   3"));

        ws.cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("active"))
            .stdout(predicate::str::contains("Missing: 2"));

        let out = ws.path("main.js.out");
        ws.cmd()
            .args(["fetch", "/main.dart.js?v=7", "--out"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("main.dart.js cache 200"));
        assert_eq!(read(&out), "main(){}");

        ws.cmd()
            .args(["fetch", "/?v=42"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/ network 200"));

        ws.cmd()
            .args(["fetch", "/unknown.txt"])
            .assert()
            .success()
            .stdout(predicate::str::contains("not intercepted"));
    }

    #[test]
    fn cached_entry_survives_offline() {
        let ws = Workspace::new();
        ws.scan();
        ws.cmd().arg("update").assert().success();

        ws.offline_cmd()
            .args(["fetch", "/flutter_bootstrap.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cache"));

        ws.offline_cmd()
            .args(["fetch", "/assets/logo.png"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn sync_downloads_missing_once() {
        let ws = Workspace::new();
        ws.scan();
        ws.cmd().arg("update").assert().success();

        ws.cmd()
            .arg("sync")
            .assert()
            .success()
            .stdout(predicate::str::contains("Downloaded 2 resources"));

        ws.cmd()
            .arg("sync")
            .assert()
            .success()
            .stdout(predicate::str::contains("already cached"));
    }

    #[test]
    fn update_evicts_changed_assets() {
        let ws = Workspace::new();
        ws.scan();
        ws.cmd().arg("update").assert().success();

        ws.cmd().arg("sync").assert().success();
        fs::write(ws.build().join("main.dart.js"), "main(){v2}").unwrap();
        ws.scan();

        ws.cmd()
            .arg("update")
            .assert()
            .success()
            .stdout(predicate::str::contains("Evicted:  1"))
            .stdout(predicate::str::contains("Retained: 4"));
    }

    #[test]
    fn activate_before_install_fails() {
        let ws = Workspace::new();
        ws.scan();

        ws.cmd()
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn install_from_unreachable_origin_fails() {
        let ws = Workspace::new();
        ws.scan();

        ws.offline_cmd()
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("active version is untouched"));
    }

    #[test]
    fn missing_resource_table_is_reported() {
        let ws = Workspace::new();

        ws.cmd()
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("resources.json"));
    }
}
