//! CLI tests for the `perl-migrate-modules` binary.
//!
//! Spawns the binary and checks exit codes and output. Full runs download the
//! installer from a one-shot loopback HTTP server configured via `--config`.

use std::path::Path;
use std::process::{Command, Output};

use migrate::exit_codes;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_perl-migrate-modules"))
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("run perl-migrate-modules")
}

#[test]
fn help_exits_zero_without_running() {
    let out = run(bin().arg("--help"));
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("--include-core"));
    assert!(stdout.contains("--from"));
}

#[test]
fn short_version_flag_prints_version() {
    let out = run(bin().arg("-v"));
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_destination_is_a_usage_error() {
    let out = run(bin().arg("--notest"));
    assert_eq!(out.status.code(), Some(exit_codes::USAGE));
}

#[test]
fn unknown_option_is_a_usage_error() {
    let out = run(bin().args(["--frobnicate", "/opt/perl"]));
    assert_eq!(out.status.code(), Some(exit_codes::USAGE));
}

#[test]
fn unresolvable_perl_fails_before_download() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("no-such-perl");
    let out = run(bin().arg(&missing).current_dir(temp.path()));
    assert_eq!(out.status.code(), Some(exit_codes::FAILURE));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("not found"));
    assert!(stderr.contains(&missing.display().to_string()));
    assert!(out.stdout.is_empty());
}

#[test]
fn invalid_config_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "connect_timeout_secs = 0\n").expect("write config");
    let out = run(bin().arg("--config").arg(&config).arg("/opt/perl"));
    assert_eq!(out.status.code(), Some(exit_codes::FAILURE));
    assert!(String::from_utf8_lossy(&out.stderr).contains("connect_timeout_secs"));
}

#[cfg(unix)]
mod full_run {
    use super::*;
    use migrate::test_support::{FakePerl, FakePerlSpec, serve_once};

    const CPANM_RESPONSE: &str =
        "HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\n# cpanm\n";

    fn write_config(dir: &Path) -> std::path::PathBuf {
        let url = serve_once(CPANM_RESPONSE).expect("serve");
        let path = dir.join("config.toml");
        std::fs::write(&path, format!("installer_url = \"{url}\"\n")).expect("write config");
        path
    }

    #[test]
    fn search_path_variables_reach_only_the_installer() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source = FakePerl::create(
            &temp.path().join("old"),
            &FakePerlSpec::listing(&["Foo::Bar", "Baz"]),
        )
        .expect("source");
        let destination =
            FakePerl::create(&temp.path().join("new"), &FakePerlSpec::default()).expect("dest");
        let config = write_config(temp.path());

        let out = run(bin()
            .arg("--config")
            .arg(&config)
            .arg("old")
            .arg("new")
            .current_dir(temp.path())
            .env("PERL5LIB", "/ambient/lib"));

        assert_eq!(
            out.status.code(),
            Some(exit_codes::OK),
            "stderr: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        assert_eq!(
            source.lister_perl5lib().expect("read"),
            Some("<unset>".to_string())
        );
        assert_eq!(
            destination.installer_perl5lib().expect("read"),
            Some("/ambient/lib".to_string())
        );
        assert_eq!(
            destination.installer_stdin().expect("read"),
            Some("Foo::Bar\nBaz\n".to_string())
        );
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.contains(&format!(
            "Migrating modules from {} to {}",
            source.executable().display(),
            destination.executable().display()
        )));
    }

    #[test]
    fn listing_failure_exit_code_is_propagated() {
        let temp = tempfile::tempdir().expect("tempdir");
        FakePerl::create(
            &temp.path().join("old"),
            &FakePerlSpec {
                lister_exit: 2,
                ..FakePerlSpec::listing(&["Foo"])
            },
        )
        .expect("source");
        let destination =
            FakePerl::create(&temp.path().join("new"), &FakePerlSpec::default()).expect("dest");
        let config = write_config(temp.path());

        let out = run(bin()
            .arg("--config")
            .arg(&config)
            .args(["old", "new"])
            .current_dir(temp.path()));

        assert_eq!(out.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("failed to retrieve module list"));
        assert!(!stderr.contains("failed to install"));
        assert_eq!(
            destination.installer_stdin().expect("read"),
            Some("Foo\n".to_string())
        );
    }

    #[test]
    fn http_error_aborts_before_children() {
        let temp = tempfile::tempdir().expect("tempdir");
        let perl =
            FakePerl::create(&temp.path().join("perl"), &FakePerlSpec::listing(&["Foo"]))
                .expect("perl");
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .expect("serve");
        let config = temp.path().join("config.toml");
        std::fs::write(&config, format!("installer_url = \"{url}\"\n")).expect("write config");

        let out = run(bin()
            .arg("--config")
            .arg(&config)
            .arg(perl.install_dir()));

        assert_eq!(out.status.code(), Some(exit_codes::FAILURE));
        assert!(String::from_utf8_lossy(&out.stderr).contains("404 Not Found"));
        assert_eq!(perl.lister_args().expect("read"), None);
        assert_eq!(perl.installer_stdin().expect("read"), None);
    }
}
