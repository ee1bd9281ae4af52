use std::fmt;
use std::path::PathBuf;

use crate::errors::{Error, ErrorCategory};
use crate::verify::fixture::BuildFlags;

/// The check that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    RoundTrip,
    Coverage,
    NameFidelity,
    Chain,
    Content,
    Associativity,
    Uniqueness,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            CheckKind::RoundTrip => "round-trip",
            CheckKind::Coverage => "coverage",
            CheckKind::NameFidelity => "name-fidelity",
            CheckKind::Chain => "chain",
            CheckKind::Content => "content",
            CheckKind::Associativity => "associativity",
            CheckKind::Uniqueness => "uniqueness",
        })
    }
}

/// A single failed assertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub check: CheckKind,
    pub message: String,
    pub expected: Option<String>,
    pub observed: Option<String>,
    /// the artifact and chain step the assertion ran against
    pub context: Option<String>,
}

impl Failure {
    pub fn new<S: Into<String>>(check: CheckKind, message: S) -> Failure {
        Failure {
            check,
            message: message.into(),
            expected: None,
            observed: None,
            context: None,
        }
    }

    pub fn expected<S: fmt::Display>(mut self, expected: S) -> Failure {
        self.expected = Some(expected.to_string());
        self
    }

    pub fn observed<S: fmt::Display>(mut self, observed: S) -> Failure {
        self.observed = Some(observed.to_string());
        self
    }

    pub fn in_context<S: Into<String>>(mut self, context: S) -> Failure {
        self.context = Some(context.into());
        self
    }
}

/// The result of running one fixture under one flag combination.
#[derive(Debug, Clone)]
pub struct FixtureOutcome {
    pub fixture: String,
    pub kind: String,
    pub flags: BuildFlags,
    pub failures: Vec<Failure>,
    /// an error that stopped the run before all checks completed
    pub error: Option<(ErrorCategory, String)>,
    pub work_dir: PathBuf,
    pub retained: bool,
}

impl FixtureOutcome {
    pub fn new(fixture: &str, kind: &str, flags: BuildFlags, work_dir: PathBuf) -> FixtureOutcome {
        FixtureOutcome {
            fixture: fixture.to_string(),
            kind: kind.to_string(),
            flags,
            failures: vec![],
            error: None,
            work_dir,
            retained: false,
        }
    }

    /// Records an error that aborted the run.
    pub fn abort(&mut self, err: &Error) {
        self.error = Some((err.category(), err.to_string()));
    }

    /// Adds failures, tagged with where they were observed.
    pub fn extend<I: IntoIterator<Item = Failure>>(&mut self, context: &str, failures: I) {
        self.failures
            .extend(failures.into_iter().map(|f| f.in_context(context)));
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.error.is_none()
    }
}

impl fmt::Display for FixtureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((ref category, ref message)) = self.error {
            writeln!(
                f,
                "[{}] {} ({}): {} error: {}",
                self.kind, self.fixture, self.flags, category, message
            )?;
        }
        for failure in &self.failures {
            write!(
                f,
                "[{}] {} ({}) {}",
                self.kind, self.fixture, self.flags, failure.check
            )?;
            if let Some(ref context) = failure.context {
                write!(f, " in {}", context)?;
            }
            writeln!(f, ": {}", failure.message)?;
            if let Some(ref expected) = failure.expected {
                writeln!(f, "    - expected: {}", expected)?;
            }
            if let Some(ref observed) = failure.observed {
                writeln!(f, "    + observed: {}", observed)?;
            }
        }
        if self.retained && !self.passed() {
            writeln!(f, "    files kept in {}", self.work_dir.display())?;
        }
        Ok(())
    }
}

/// The collected outcomes of a verification run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub outcomes: Vec<FixtureOutcome>,
}

impl Report {
    /// Checks if any run failed.
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.passed())
    }

    /// Returns the number of failed assertions and aborted runs.
    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| o.failures.len() + o.error.is_some() as usize)
            .sum()
    }

    /// Iterates over the runs that did not pass.
    pub fn failed(&self) -> impl Iterator<Item = &FixtureOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in self.failed() {
            write!(f, "{}", outcome)?;
        }
        let failed = self.failed().count();
        writeln!(
            f,
            "{} of {} runs passed, {} failures",
            self.outcomes.len() - failed,
            self.outcomes.len(),
            self.failure_count()
        )
    }
}

#[test]
fn test_outcome_display() {
    let mut outcome = FixtureOutcome::new("a-b-c", "bundle", BuildFlags::default(), PathBuf::new());
    outcome.extend(
        "out/a.js",
        vec![Failure::new(CheckKind::RoundTrip, "marker `\"x0\"` resolved elsewhere")
            .expected("a.js:1:12")
            .observed("b.js:1:12")],
    );
    assert!(!outcome.passed());
    assert_eq!(
        outcome.to_string(),
        "[bundle] a-b-c (linked) round-trip in out/a.js: marker `\"x0\"` resolved elsewhere\n    \
         - expected: a.js:1:12\n    + observed: b.js:1:12\n"
    );
}
