//! Running the external build tool.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::artifact::GeneratedArtifact;
use crate::errors::{Error, Result};
use crate::verify::fixture::{BuildFlags, EntryMode, MapMode};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What to build.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    /// directory the entries are relative to
    pub input_dir: &'a Path,
    pub entries: &'a [String],
    /// directory the artifacts are written to
    pub out_dir: &'a Path,
    pub flags: BuildFlags,
}

impl<'a> BuildRequest<'a> {
    /// Returns the entry passed on stdin, if the flags ask for it.
    pub fn stdin_entry(&self) -> Option<&'a str> {
        match self.flags.entry_mode {
            EntryMode::Stdin => self.entries.first().map(|x| &x[..]),
            EntryMode::File => None,
        }
    }
}

/// Produces generated artifacts from fixture inputs.
///
/// Invokers are shared between the worker threads of a run.
pub trait BuildInvoker: Sync {
    /// Builds the request and returns every generated artifact.
    fn build(&self, request: &BuildRequest<'_>) -> Result<Vec<GeneratedArtifact>>;
}

/// Loads every artifact written to `out_dir`, sorted by path.
///
/// Map files are skipped; they are reached through their artifacts.
pub fn collect_artifacts(out_dir: &Path) -> Result<Vec<GeneratedArtifact>> {
    let mut paths = vec![];
    for entry in fs::read_dir(out_dir)? {
        let path = entry?.path();
        let is_artifact = path.extension().map_or(false, |ext| {
            ext == "js" || ext == "mjs" || ext == "cjs" || ext == "css"
        });
        if is_artifact && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    paths.into_iter().map(GeneratedArtifact::load).collect()
}

/// Invokes a command line build tool.
///
/// Flags are passed in the `--name=value` style:
/// `<entries> --outdir=<dir> --sourcemap[=inline] [--bundle] [--minify]
/// [--splitting --format=esm]`.  Stdin entries use `--sourcefile=<name>`
/// and `--outfile=<path>` instead of entries and `--outdir`.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandInvoker {
    /// Creates an invoker for `program` with a per-build timeout.
    pub fn new<P: Into<PathBuf>>(program: P, timeout: Duration) -> CommandInvoker {
        CommandInvoker {
            program: program.into(),
            args: vec![],
            timeout,
        }
    }

    /// Adds an argument passed before all generated flags.
    pub fn arg<S: Into<String>>(mut self, arg: S) -> CommandInvoker {
        self.args.push(arg.into());
        self
    }

    /// Returns the arguments for a request.
    pub fn command_args(&self, request: &BuildRequest<'_>) -> Vec<String> {
        let flags = request.flags;
        let mut rv = self.args.clone();
        match request.stdin_entry() {
            Some(entry) => {
                let file_name = Path::new(entry)
                    .file_name()
                    .map(|x| x.to_string_lossy().into_owned())
                    .unwrap_or_else(|| entry.to_string());
                rv.push(format!("--sourcefile={}", entry));
                rv.push(format!(
                    "--outfile={}",
                    request.out_dir.join(file_name).display()
                ));
            }
            None => {
                rv.extend(request.entries.iter().cloned());
                rv.push(format!("--outdir={}", request.out_dir.display()));
            }
        }
        rv.push(match flags.sourcemap {
            MapMode::Linked => "--sourcemap".to_string(),
            MapMode::Inline => "--sourcemap=inline".to_string(),
        });
        if flags.bundle {
            rv.push("--bundle".into());
        }
        if flags.minify {
            rv.push("--minify".into());
        }
        if flags.code_splitting {
            rv.push("--splitting".into());
            rv.push("--format=esm".into());
        }
        rv
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            if let Err(err) = child.kill() {
                warn!(error = %err, "failed to kill timed out build");
            }
            child.wait().ok();
            return Err(Error::BuildTimeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl BuildInvoker for CommandInvoker {
    fn build(&self, request: &BuildRequest<'_>) -> Result<Vec<GeneratedArtifact>> {
        fs::create_dir_all(request.out_dir)?;
        let args = self.command_args(request);
        debug!(program = %self.program.display(), ?args, "invoking build");

        let stdin_text = match request.stdin_entry() {
            Some(entry) => Some(fs::read(request.input_dir.join(entry))?),
            None => None,
        };

        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(request.input_dir)
            .stdin(if stdin_text.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()?;

        // written from a thread so a tool that does not drain stdin
        // cannot block the timeout
        let writer = match (stdin_text, child.stdin.take()) {
            (Some(text), Some(mut stdin)) => {
                Some(thread::spawn(move || stdin.write_all(&text)))
            }
            _ => None,
        };

        let status = wait_with_timeout(&mut child, self.timeout)?;
        if let Some(writer) = writer {
            if let Ok(Err(err)) = writer.join() {
                debug!(error = %err, "build tool closed stdin early");
            }
        }
        if !status.success() {
            return Err(Error::BuildFailed(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )));
        }

        collect_artifacts(request.out_dir)
    }
}

#[test]
fn test_command_args() {
    let entries = vec!["a.js".to_string()];
    let mut request = BuildRequest {
        input_dir: Path::new("/w/in"),
        entries: &entries,
        out_dir: Path::new("/w/out"),
        flags: BuildFlags {
            bundle: true,
            code_splitting: true,
            ..BuildFlags::default()
        },
    };
    let invoker = CommandInvoker::new("esbuild", Duration::from_secs(5)).arg("--log-level=warning");
    assert_eq!(
        invoker.command_args(&request),
        vec![
            "--log-level=warning",
            "a.js",
            "--outdir=/w/out",
            "--sourcemap",
            "--bundle",
            "--splitting",
            "--format=esm",
        ]
    );

    request.flags = BuildFlags {
        entry_mode: EntryMode::Stdin,
        sourcemap: MapMode::Inline,
        minify: true,
        ..BuildFlags::default()
    };
    assert_eq!(
        invoker.command_args(&request),
        vec![
            "--log-level=warning",
            "--sourcefile=a.js",
            "--outfile=/w/out/a.js",
            "--sourcemap=inline",
            "--minify",
        ]
    );
}
