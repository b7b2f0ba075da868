//! Test-only fixtures: a fake perl installation, scripted fetchers and registries.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result, anyhow};

use crate::error::MigrateError;
use crate::io::fetch::Fetcher;
use crate::io::registry::CoreRegistry;

/// Behaviour of a [`FakePerl`].
#[derive(Debug, Clone)]
pub struct FakePerlSpec {
    /// First line printed by the lister; `None` prints nothing at all.
    pub version: Option<String>,
    /// Modules found through the standard `@INC` search.
    pub standard: Vec<String>,
    pub lister_exit: i32,
    pub installer_exit: i32,
}

impl Default for FakePerlSpec {
    fn default() -> Self {
        Self {
            version: Some("5.036000".to_string()),
            standard: Vec::new(),
            lister_exit: 0,
            installer_exit: 0,
        }
    }
}

impl FakePerlSpec {
    pub fn listing(modules: &[&str]) -> Self {
        Self {
            standard: modules.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// A perl installation directory whose `bin/perl` is a shell script.
///
/// As a lister it mimics `ExtUtils::Installed`: it prints the version, then the
/// standard modules unless override paths were given, then `packages.txt` of
/// every override/extra path. As an installer it records argv and stdin.
/// `Perl` is not filtered, so callers can check the relay drops it.
#[derive(Debug, Clone)]
pub struct FakePerl {
    root: PathBuf,
}

#[cfg(unix)]
impl FakePerl {
    pub fn create(root: &Path, spec: &FakePerlSpec) -> Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        let bin = root.join("bin");
        fs::create_dir_all(&bin).with_context(|| format!("create {}", bin.display()))?;
        if let Some(version) = &spec.version {
            fs::write(root.join("version.txt"), format!("{version}\n"))?;
        }
        fs::write(root.join("standard.txt"), lines(&spec.standard))?;

        let script = format!(
            r#"#!/bin/sh
root='{root}'
if [ "$1" = "-MExtUtils::Installed" ]; then
  shift 4
  printf '%s\n' "$@" > "$root/lister.args"
  printf '%s\n' "${{PERL5LIB-<unset>}}" > "$root/lister.perl5lib"
  n=$1
  shift
  if [ -f "$root/version.txt" ]; then cat "$root/version.txt"; fi
  if [ "$n" -eq 0 ]; then cat "$root/standard.txt"; fi
  for dir in "$@"; do
    if [ -f "$dir/packages.txt" ]; then cat "$dir/packages.txt"; fi
  done
  exit {lister_exit}
fi
printf '%s\n' "$@" > "$root/installer.args"
printf '%s\n' "${{PERL5LIB-<unset>}}" > "$root/installer.perl5lib"
cat > "$root/installer.stdin"
exit {installer_exit}
"#,
            root = root.display(),
            lister_exit = spec.lister_exit,
            installer_exit = spec.installer_exit,
        );
        let perl = bin.join("perl");
        fs::write(&perl, script).with_context(|| format!("write {}", perl.display()))?;
        fs::set_permissions(&perl, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("chmod {}", perl.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn install_dir(&self) -> &Path {
        &self.root
    }

    pub fn executable(&self) -> PathBuf {
        self.root.join("bin").join("perl")
    }

    /// Bytes the installer read from stdin, if it ran.
    pub fn installer_stdin(&self) -> Result<Option<String>> {
        read_optional(&self.root.join("installer.stdin"))
    }

    /// Installer argv (script path and flags), if it ran.
    pub fn installer_args(&self) -> Result<Option<Vec<String>>> {
        Ok(read_optional(&self.root.join("installer.args"))?.map(split_lines))
    }

    /// Lister argv after `--` (count, override paths, extra paths), if it ran.
    pub fn lister_args(&self) -> Result<Option<Vec<String>>> {
        Ok(read_optional(&self.root.join("lister.args"))?.map(split_lines))
    }

    /// `PERL5LIB` as seen by the lister (`<unset>` when removed).
    pub fn lister_perl5lib(&self) -> Result<Option<String>> {
        Ok(read_optional(&self.root.join("lister.perl5lib"))?.map(|s| s.trim_end().to_string()))
    }

    /// `PERL5LIB` as seen by the installer.
    pub fn installer_perl5lib(&self) -> Result<Option<String>> {
        Ok(read_optional(&self.root.join("installer.perl5lib"))?
            .map(|s| s.trim_end().to_string()))
    }
}

/// Create a module directory whose `packages.txt` lists `modules`.
pub fn module_dir(path: &Path, modules: &[&str]) -> Result<PathBuf> {
    fs::create_dir_all(path).with_context(|| format!("create {}", path.display()))?;
    let modules: Vec<String> = modules.iter().map(|m| m.to_string()).collect();
    fs::write(path.join("packages.txt"), lines(&modules))?;
    Ok(path.to_path_buf())
}

fn lines(items: &[String]) -> String {
    items.iter().map(|item| format!("{item}\n")).collect()
}

fn split_lines(contents: String) -> Vec<String> {
    contents.lines().map(str::to_string).collect()
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(Some(contents))
}

/// Canned result for a [`ScriptedFetcher`].
#[derive(Debug, Clone)]
pub enum ScriptedFetch {
    /// Write this content as the downloaded installer.
    Script(String),
    Http { status: u16, reason: String },
    Transport(String),
}

/// Fetcher returning the same canned result for every call.
#[derive(Debug)]
pub struct ScriptedFetcher {
    response: ScriptedFetch,
    calls: Cell<usize>,
    last_dest: RefCell<Option<PathBuf>>,
}

impl ScriptedFetcher {
    pub fn new(response: ScriptedFetch) -> Self {
        Self {
            response,
            calls: Cell::new(0),
            last_dest: RefCell::new(None),
        }
    }

    pub fn script() -> Self {
        Self::new(ScriptedFetch::Script("# cpanm\n".to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn last_dest(&self) -> Option<PathBuf> {
        self.last_dest.borrow().clone()
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        *self.last_dest.borrow_mut() = Some(dest.to_path_buf());
        match &self.response {
            ScriptedFetch::Script(contents) => {
                fs::write(dest, contents).with_context(|| format!("write {}", dest.display()))
            }
            ScriptedFetch::Http { status, reason } => Err(MigrateError::Http {
                url: url.to_string(),
                status: *status,
                reason: reason.clone(),
            }
            .into()),
            ScriptedFetch::Transport(message) => Err(MigrateError::Transport {
                url: url.to_string(),
                message: message.clone(),
            }
            .into()),
        }
    }
}

/// In-memory version → core module registry.
#[derive(Debug, Default)]
pub struct FixtureRegistry {
    versions: BTreeMap<String, Vec<String>>,
    lookups: RefCell<Vec<String>>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: &str, modules: &[&str]) -> Self {
        self.versions.insert(
            version.to_string(),
            modules.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    /// Versions looked up so far, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.borrow().clone()
    }

    pub fn assert_unused(&self) -> Result<()> {
        let lookups = self.lookups.borrow();
        if lookups.is_empty() {
            return Ok(());
        }
        Err(anyhow!("unexpected registry lookups: {:?}", *lookups))
    }
}

impl CoreRegistry for FixtureRegistry {
    fn core_modules(&self, version: &str) -> Result<Option<Vec<String>>> {
        self.lookups.borrow_mut().push(version.to_string());
        Ok(self.versions.get(version).cloned())
    }
}

/// Serve exactly one raw HTTP response on a loopback port; returns its URL.
pub fn serve_once(response: &'static str) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind loopback listener")?;
    let addr = listener.local_addr().context("listener address")?;
    thread::spawn(move || -> std::io::Result<()> {
        let (mut stream, _) = listener.accept()?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut line = String::new();
        while reader.read_line(&mut line)? > 0 {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }
        stream.write_all(response.as_bytes())
    });
    Ok(format!("http://{addr}/cpanm"))
}
