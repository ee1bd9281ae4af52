use std::path::PathBuf;
use std::process;
use std::time::Duration;

use argh::FromArgs;
use sourcemap_verify::verify::{CommandInvoker, Fixture, Verifier, VerifyOptions};
use sourcemap_verify::{
    Composer, ContentResolver, GeneratedArtifact, MapDocument, SourceView, TrackedArtifacts,
};
use tracing::info;

/// Utility for verifying the source maps of build tools.
#[derive(FromArgs, Debug)]
pub struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Verify(VerifyArgs),
    Lookup(LookupArgs),
}

/// Run the fixtures of a manifest through a build tool.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "verify")]
struct VerifyArgs {
    /// the JSON fixture manifest
    #[argh(option, short = 'm')]
    manifest: PathBuf,
    /// the build tool executable
    #[argh(option, short = 't')]
    tool: PathBuf,
    /// an extra argument passed to the build tool (repeatable)
    #[argh(option)]
    tool_arg: Vec<String>,
    /// directory for the per-run work directories
    #[argh(option, short = 'w', default = "std::env::temp_dir().join(\"sourcemap-verify\")")]
    work_dir: PathBuf,
    /// number of concurrent runs, 0 means one per core
    #[argh(option, short = 'j', default = "0")]
    jobs: usize,
    /// seconds a single build may take
    #[argh(option, default = "60")]
    timeout_secs: u64,
    /// keep the work directories of passing runs
    #[argh(switch)]
    keep: bool,
}

/// Look up a generated position of an artifact.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "lookup")]
struct LookupArgs {
    /// the generated file with an attached source map
    #[argh(positional)]
    artifact: PathBuf,
    /// the 0 indexed line number
    #[argh(option, short = 'L')]
    line0: Option<u32>,
    /// the 1 indexed line number
    #[argh(option, short = 'l')]
    line: Option<u32>,
    /// the 0 indexed column number
    #[argh(option, short = 'C')]
    column0: Option<u32>,
    /// the 1 indexed column number
    #[argh(option, short = 'c')]
    column: Option<u32>,
    /// an earlier build output the map should be composed through (repeatable)
    #[argh(option)]
    track: Vec<PathBuf>,
    /// print the result as JSON
    #[argh(switch)]
    json: bool,
}

impl LookupArgs {
    /// Returns the zero indexed position
    fn lookup_pos(&self) -> Option<(u32, u32)> {
        Some((
            self.line0
                .unwrap_or_else(|| self.line.map_or(0, |x| x.saturating_sub(1))),
            self.column0
                .or_else(|| self.column.map(|x| x.saturating_sub(1)))?,
        ))
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_verify(args: VerifyArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let fixtures = Fixture::load_manifest(&args.manifest)?;
    let mut invoker = CommandInvoker::new(&args.tool, Duration::from_secs(args.timeout_secs));
    for arg in args.tool_arg {
        invoker = invoker.arg(arg);
    }
    let verifier = Verifier::new(
        invoker,
        VerifyOptions {
            work_dir: args.work_dir,
            jobs: args.jobs,
            keep_passing: args.keep,
        },
    );
    let report = verifier.run(&fixtures)?;
    print!("{}", report);
    Ok(!report.has_failures())
}

fn print_source_line(doc: &MapDocument, src_id: u32, line: u32) {
    let mut contents = ContentResolver::new();
    match contents.resolve(doc, src_id) {
        Ok((text, origin)) => {
            let view = SourceView::new(&text);
            match view.get_line(line) {
                Some(source_line) => {
                    println!("  source line ({:?}):", origin);
                    println!("    {}", source_line.trim());
                }
                None => println!("  cannot find source line"),
            }
        }
        Err(err) => println!("  cannot find source: {}", err),
    }
}

fn run_lookup(args: LookupArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let artifact = GeneratedArtifact::load(&args.artifact)?;
    let doc = if args.track.is_empty() {
        artifact.document().clone()
    } else {
        let mut tracked = TrackedArtifacts::new();
        for path in &args.track {
            tracked.track(path);
        }
        let mut composer = Composer::new(tracked);
        composer.compose_artifact(artifact.document(), artifact.path())?
    };
    info!(
        embedding = %artifact.embedding(),
        tokens = doc.get_token_count(),
        sources = doc.get_source_count(),
        "loaded source map"
    );

    let (line, column) = match args.lookup_pos() {
        Some(pos) => pos,
        None => {
            println!("embedding: {}", artifact.embedding());
            if let Some(path) = artifact.map_path() {
                println!("source map path: {:?}", path);
            }
            for source in doc.sources() {
                println!("  source: {}", source);
            }
            return Ok(true);
        }
    };

    let token = match doc.lookup_token(line, column) {
        Some(token) => token,
        None => {
            println!("lookup line: {}, column: {}: no match", line, column);
            return Ok(false);
        }
    };

    if args.json {
        let value = serde_json::json!({
            "generated": { "line": token.get_dst_line(), "column": token.get_dst_col() },
            "source": token.get_source(),
            "line": token.get_source().map(|_| token.get_src_line()),
            "column": token.get_source().map(|_| token.get_src_col()),
            "name": token.get_name(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(token.has_source());
    }

    println!("lookup line: {}, column: {}:", line, column);
    match token.get_source() {
        Some(source) => println!("  source file: {:?}", source),
        None => {
            println!("  source file: not mapped");
            return Ok(false);
        }
    }
    match token.get_name() {
        Some(name) => println!("  name: {:?}", name),
        None => println!("  name: not found"),
    }
    println!("  source line: {}", token.get_src_line());
    println!("  source column: {}", token.get_src_col());
    println!("  generated line: {}", token.get_dst_line());
    println!("  generated column: {}", token.get_dst_col());
    print_source_line(&doc, token.get_src_id(), token.get_src_line());
    Ok(true)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Cli = argh::from_env();
    init_tracing();

    let ok = match args.command {
        Command::Verify(args) => run_verify(args)?,
        Command::Lookup(args) => run_lookup(args)?,
    };
    if !ok {
        process::exit(1);
    }
    Ok(())
}
