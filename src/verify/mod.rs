//! Verification of build tool output against fixtures.
//!
//! A `Verifier` writes every fixture into its own directory, builds it
//! under each flag combination of the fixture's matrix and checks the
//! generated artifacts and their documents.  Runs are independent and
//! execute on a bounded worker pool.
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::artifact::{Embedding, GeneratedArtifact};
use crate::compose::{Composer, TrackedArtifacts};
use crate::content::ContentResolver;
use crate::errors::{Error, Result};
use crate::index::SegmentIndex;

mod checks;
mod fixture;
mod invoker;
mod report;

pub use self::checks::{
    check_associativity, check_chain_hits, check_contents, check_coverage,
    check_marker_attribution, check_names, check_round_trip, check_uniqueness, MarkerHit,
};
pub use self::fixture::{
    BuildFlags, ChainOrder, ChainSetup, EntryMode, ExtraFile, Fixture, FixtureFile, LineEnding,
    MapMode, Marker, Matrix, WrittenFixture,
};
pub use self::invoker::{collect_artifacts, BuildInvoker, BuildRequest, CommandInvoker};
pub use self::report::{CheckKind, Failure, FixtureOutcome, Report};

/// Settings of a verification run.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// directory the per-run directories are created in
    pub work_dir: PathBuf,
    /// number of worker threads, `0` picks one per core
    pub jobs: usize,
    /// keep the directories of passing runs
    pub keep_passing: bool,
}

impl VerifyOptions {
    pub fn new<P: Into<PathBuf>>(work_dir: P) -> VerifyOptions {
        VerifyOptions {
            work_dir: work_dir.into(),
            jobs: 0,
            keep_passing: false,
        }
    }
}

/// Runs fixtures through a build invoker and checks the results.
pub struct Verifier<B> {
    invoker: B,
    options: VerifyOptions,
    next_dir: AtomicU64,
}

fn display_name(artifact: &GeneratedArtifact, root: &Path) -> String {
    artifact
        .path()
        .strip_prefix(root)
        .unwrap_or_else(|_| artifact.path())
        .to_string_lossy()
        .replace('\\', "/")
}

impl<B: BuildInvoker> Verifier<B> {
    /// Creates a verifier.
    pub fn new(invoker: B, options: VerifyOptions) -> Verifier<B> {
        Verifier {
            invoker,
            options,
            next_dir: AtomicU64::new(0),
        }
    }

    /// Runs every permutation of every fixture.
    ///
    /// Failing checks end up in the report; an `Err` means the run could
    /// not be executed at all.
    pub fn run(&self, fixtures: &[Fixture]) -> Result<Report> {
        fs::create_dir_all(&self.options.work_dir)?;
        let jobs: Vec<_> = fixtures
            .iter()
            .flat_map(|fixture| {
                fixture
                    .permutations()
                    .into_iter()
                    .map(move |flags| (fixture, flags))
            })
            .collect();
        info!(
            fixtures = fixtures.len(),
            runs = jobs.len(),
            "starting verification"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()
            .map_err(|err| Error::WorkerPool(err.to_string()))?;
        let outcomes = pool.install(|| {
            jobs.par_iter()
                .map(|&(fixture, flags)| self.run_one(fixture, flags))
                .collect::<Vec<_>>()
        });

        let report = Report { outcomes };
        info!(
            failed = report.failed().count(),
            failures = report.failure_count(),
            "verification finished"
        );
        Ok(report)
    }

    /// Creates a fresh run directory, skipping ones left by earlier runs.
    fn allocate_dir(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.options.work_dir)?;
        loop {
            let id = self.next_dir.fetch_add(1, Ordering::SeqCst);
            let dir = self.options.work_dir.join(format!("fixture-{}", id));
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(dir),
                Err(ref err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(dir = %dir.display(), "skipping existing work directory");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Runs one fixture under one flag combination.
    pub fn run_one(&self, fixture: &Fixture, flags: BuildFlags) -> FixtureOutcome {
        let dir = match self.allocate_dir() {
            Ok(dir) => dir,
            Err(err) => {
                let mut outcome = FixtureOutcome::new(
                    &fixture.name,
                    fixture.kind(),
                    flags,
                    self.options.work_dir.clone(),
                );
                warn!(fixture = %fixture.name, %flags, error = %err, "no work directory");
                outcome.abort(&err);
                outcome.retained = true;
                return outcome;
            }
        };
        let mut outcome = FixtureOutcome::new(&fixture.name, fixture.kind(), flags, dir.clone());
        debug!(fixture = %fixture.name, %flags, dir = %dir.display(), "running fixture");

        if let Err(err) = self.verify(fixture, flags, &dir, &mut outcome) {
            warn!(fixture = %fixture.name, %flags, error = %err, "fixture run aborted");
            outcome.abort(&err);
        }

        if outcome.passed() && !self.options.keep_passing {
            if let Err(err) = fs::remove_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %err, "failed to remove work directory");
                outcome.retained = true;
            }
        } else {
            outcome.retained = true;
        }
        outcome
    }

    fn verify(
        &self,
        fixture: &Fixture,
        flags: BuildFlags,
        dir: &Path,
        outcome: &mut FixtureOutcome,
    ) -> Result<()> {
        let input_dir = dir.join("in");
        let out_dir = dir.join("out");
        let files = fixture.write_to(&input_dir, flags.line_ending)?;
        let artifacts = self.invoker.build(&BuildRequest {
            input_dir: &input_dir,
            entries: &fixture.entries,
            out_dir: &out_dir,
            flags,
        })?;
        if artifacts.is_empty() {
            return Err(Error::BuildFailed("build produced no artifacts".into()));
        }

        let mut all_hits = BTreeSet::new();
        let mut primary_hits = vec![];
        for artifact in &artifacts {
            let context = display_name(artifact, dir);
            let doc = artifact.document();
            let index = SegmentIndex::build(doc);
            let code = artifact.code();

            outcome.extend(&context, check_uniqueness(doc));
            let (hits, failures) = check_round_trip(code, &index, fixture, &files);
            outcome.extend(&context, failures);
            if !flags.bundle {
                outcome.extend(&context, check_coverage(code, doc));
            }
            outcome.extend(&context, check_names(code, &index, fixture, &files));
            let mut contents = ContentResolver::new();
            outcome.extend(&context, check_contents(doc, &mut contents, &files));

            all_hits.extend(hits.iter().cloned());
            primary_hits.push(hits);
        }
        outcome.extend("all artifacts", check_marker_attribution(fixture, &files, &all_hits));

        let chain = match fixture.chain {
            Some(ref chain) => chain,
            None => return Ok(()),
        };
        // re-bundling takes a single self-contained artifact
        if !flags.bundle || flags.code_splitting {
            debug!(fixture = %fixture.name, %flags, "skipping chain for unbundled output");
            return Ok(());
        }
        for (idx, (artifact, hits)) in artifacts.iter().zip(primary_hits.iter()).enumerate() {
            for &embedding in &chain.embeddings {
                for &order in &chain.orders {
                    let chain_dir = dir.join(format!("chain-{}-{}-{}", idx, embedding, order));
                    self.verify_chain(
                        fixture, flags, chain, artifact, hits, &files, &chain_dir, outcome,
                        (embedding, order),
                    )?;
                }
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn verify_chain(
        &self,
        fixture: &Fixture,
        flags: BuildFlags,
        chain: &ChainSetup,
        artifact: &GeneratedArtifact,
        primary_hits: &BTreeSet<MarkerHit>,
        files: &WrittenFixture,
        chain_dir: &Path,
        outcome: &mut FixtureOutcome,
        (embedding, order): (Embedding, ChainOrder),
    ) -> Result<()> {
        fs::create_dir_all(chain_dir)?;
        let input_name = "input.js";
        let input = artifact.write_to(&chain_dir.join(input_name), embedding)?;
        fs::write(
            chain_dir.join(&chain.extra.name),
            flags.line_ending.apply(&chain.extra.text),
        )?;
        let entry = match order.entry_source(input_name, &chain.extra.name) {
            Some(text) => {
                fs::write(chain_dir.join("entry.js"), flags.line_ending.apply(&text))?;
                "entry.js".to_string()
            }
            None => input_name.to_string(),
        };
        debug!(fixture = %fixture.name, %embedding, %order, "re-bundling artifact");

        let entries = vec![entry];
        let out_dir = chain_dir.join("out");
        let artifacts = self.invoker.build(&BuildRequest {
            input_dir: chain_dir,
            entries: &entries,
            out_dir: &out_dir,
            flags: BuildFlags {
                entry_mode: EntryMode::File,
                bundle: true,
                code_splitting: false,
                ..flags
            },
        })?;

        let mut tracked = TrackedArtifacts::new();
        tracked.track(input.path());
        let mut chained_hits = BTreeSet::new();
        let root = chain_dir.parent().unwrap_or(chain_dir);

        for secondary in &artifacts {
            let context = format!("{} ({})", display_name(secondary, root), embedding);
            let outer = secondary.document();
            let mut composer = Composer::new(tracked.clone());
            let composed = composer.compose_artifact(outer, secondary.path())?;
            let index = SegmentIndex::build(&composed);
            let code = secondary.code();

            outcome.extend(&context, check_uniqueness(&composed));
            let (hits, failures) = check_round_trip(code, &index, fixture, files);
            outcome.extend(&context, failures);
            outcome.extend(&context, check_names(code, &index, fixture, files));
            outcome.extend(&context, check_contents(&composed, composer.contents(), files));
            outcome.extend(
                &context,
                check_associativity(outer, &composed, composer.resolver()),
            );
            chained_hits.extend(hits);
        }

        outcome.extend(
            &format!("chain {} {}", embedding, order),
            check_chain_hits(primary_hits, &chained_hits),
        );
        Ok(())
    }
}
