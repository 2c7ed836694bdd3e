//! Offline trust review of a source registry of skill manifests.
//!
//! Each skill folder carries a `skill.toml` describing the package and its
//! provenance, next to its `SKILL.md`. The review validates the required
//! fields, recomputes the trust score with the shared engine and either
//! checks the stored `[computed]` table against it or rewrites it. A
//! per-manifest `review.min_trust_required` (default 50) gates the score.

use crate::archive::policy::validate_path;
use log::debug;
use skillpack_common::{TRUSTED_THRESHOLD, TrustComputation, TrustSignals, compute_trust_score};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::{Table, Value};

/// File name of a source manifest.
pub const MANIFEST_FILE_NAME: &str = "skill.toml";

const SUPPORTED_SCHEMA_VERSION: i64 = 1;
const DEFAULT_SKILL_MD: &str = "SKILL.md";
const LOG_TARGET: &str = "skillpack::review";

/// Whether the review compares or rewrites the computed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    /// Fail when the stored `[computed]` table is stale.
    Check,
    /// Rewrite `[computed]`, `[review]` and `trust_inputs.has_skill_md`.
    Write,
}

impl ReviewMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Write => "write",
        }
    }
}

/// Errors that stop the review as a whole.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// No manifests were found under the registry root.
    #[error("no skill manifests found under {}", .root.display())]
    NoManifests {
        /// The searched root.
        root: PathBuf,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A rewritten manifest could not be serialised.
    #[error("failed to serialise {}: {source}", .path.display())]
    Serialize {
        /// Manifest path.
        path: PathBuf,
        /// Underlying error.
        source: toml::ser::Error,
    },
}

/// One reviewed manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    /// Declared slug, or the folder name when the slug is missing.
    pub slug: String,
    /// Recomputed trust score.
    pub score: u8,
    /// Minimum score required by the manifest.
    pub threshold: u8,
    /// Whether the score reaches the trusted threshold.
    pub trusted: bool,
}

impl ReviewRow {
    /// Return true when the score meets the manifest's threshold.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.score >= self.threshold
    }
}

/// Outcome of reviewing a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewReport {
    /// Mode the review ran in.
    pub mode: ReviewMode,
    /// One row per manifest that could be parsed.
    pub rows: Vec<ReviewRow>,
    /// Human-readable failures, prefixed with the manifest they concern.
    pub failures: Vec<String>,
}

impl ReviewReport {
    /// Return true when no failure was recorded.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Render the report as Markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# Skill Trust Review ({})\n\n", self.mode.as_str());
        out.push_str("| slug | score | threshold | trusted | status |\n");
        out.push_str("|---|---:|---:|---|---|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                row.slug,
                row.score,
                row.threshold,
                if row.trusted { "yes" } else { "no" },
                if row.passed() { "pass" } else { "fail" },
            ));
        }
        out.push('\n');
        if self.failures.is_empty() {
            out.push_str("All skill manifests passed trust validation.\n");
        } else {
            out.push_str("## Failures\n");
            for failure in &self.failures {
                out.push_str(&format!("- {failure}\n"));
            }
        }
        out.push_str("\nTo refresh computed trust fields locally:\n");
        out.push_str("`skillpack-review-trust --write`");
        out
    }
}

/// Find every `skill.toml` below `root`, sorted by path.
///
/// A missing root yields an empty list.
///
/// # Errors
///
/// Returns [`ReviewError::Io`] if an existing directory cannot be read.
pub fn find_manifests(root: &Path) -> Result<Vec<PathBuf>, ReviewError> {
    let mut found = Vec::new();
    if root.is_dir() {
        walk(root, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), ReviewError> {
    let io_error = |source| ReviewError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let file_type = entry.file_type().map_err(io_error)?;
        let path = entry.path();
        if file_type.is_dir() {
            walk(&path, found)?;
        } else if file_type.is_file() && entry.file_name() == MANIFEST_FILE_NAME {
            found.push(path);
        }
    }
    Ok(())
}

/// Review every manifest below `root`.
///
/// Validation failures are collected in the report; only I/O problems and
/// an empty registry abort the review.
///
/// # Errors
///
/// Returns [`ReviewError`] if no manifests exist or a file cannot be read
/// or rewritten.
pub fn review_registry(root: &Path, mode: ReviewMode) -> Result<ReviewReport, ReviewError> {
    let manifests = find_manifests(root)?;
    if manifests.is_empty() {
        return Err(ReviewError::NoManifests {
            root: root.to_path_buf(),
        });
    }

    let mut report = ReviewReport {
        mode,
        rows: Vec::new(),
        failures: Vec::new(),
    };
    for path in &manifests {
        review_manifest(root, path, mode, &mut report)?;
    }
    Ok(report)
}

fn review_manifest(
    root: &Path,
    path: &Path,
    mode: ReviewMode,
    report: &mut ReviewReport,
) -> Result<(), ReviewError> {
    let display = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");
    debug!(target: LOG_TARGET, "reviewing {display}");

    let text = fs::read_to_string(path).map_err(|source| ReviewError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut manifest: Table = match toml::from_str(&text) {
        Ok(table) => table,
        Err(err) => {
            report.failures.push(format!("{display}: invalid TOML ({})", err.message()));
            return Ok(());
        }
    };

    let folder = path
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let slug = non_blank(manifest.get("slug")).map(str::to_owned);
    let mut failures = Failures {
        prefix: format!("{display} ({})", slug.as_deref().unwrap_or("unknown")),
        sink: &mut report.failures,
    };

    let verified = check_required_fields(&manifest, slug.as_deref(), &folder, &mut failures);
    let threshold = min_trust_required(&manifest, &mut failures);
    let skill_md_exists = locate_skill_md(path, &manifest, &mut failures);

    let inputs = manifest.get("trust_inputs").and_then(Value::as_table);
    let input_flag = |key: &str| inputs.and_then(|t| t.get(key)).and_then(Value::as_bool);
    let computed = compute_trust_score(&TrustSignals {
        license_spdx: non_blank(manifest.get("license_spdx")).map(str::to_owned),
        repo_url: non_blank(manifest.get("repo_url")).map(str::to_owned),
        homepage_url: non_blank(manifest.get("homepage_url")).map(str::to_owned),
        publisher_verified: verified.unwrap_or(false),
        has_manifest_file: input_flag("has_skill_md").unwrap_or(skill_md_exists),
        has_license_file: input_flag("has_license_file").unwrap_or(false),
        signed_release: input_flag("signed_release").unwrap_or(false),
    });
    let expected = computed_table(&computed);

    if mode == ReviewMode::Check && !computed_matches(manifest.get("computed"), &expected) {
        failures.push("computed trust fields are outdated; run skillpack-review-trust --write");
    }
    if computed.score < threshold {
        failures.push(format_args!(
            "trust_score {} below min_trust_required {threshold}",
            computed.score
        ));
    }

    report.rows.push(ReviewRow {
        slug: slug.unwrap_or(folder),
        score: computed.score,
        threshold,
        trusted: computed.trusted,
    });

    if mode == ReviewMode::Write {
        rewrite_manifest(path, &mut manifest, expected, threshold, skill_md_exists)?;
    }
    Ok(())
}

/// Failures for one manifest, each prefixed with its path and slug.
struct Failures<'a> {
    prefix: String,
    sink: &'a mut Vec<String>,
}

impl Failures<'_> {
    fn push(&mut self, message: impl std::fmt::Display) {
        self.sink.push(format!("{}: {message}", self.prefix));
    }
}

/// Check the required identity fields, returning `publisher.verified` when
/// it is a boolean.
fn check_required_fields(
    manifest: &Table,
    slug: Option<&str>,
    folder: &str,
    failures: &mut Failures<'_>,
) -> Option<bool> {
    if manifest.get("schema_version").and_then(Value::as_integer) != Some(SUPPORTED_SCHEMA_VERSION) {
        failures.push("schema_version must be 1");
    }
    match slug {
        None => failures.push("slug is required"),
        Some(slug) if slug != folder => {
            failures.push(format_args!("slug must match folder name ({folder})"));
        }
        Some(_) => {}
    }
    for field in ["name", "summary", "repo_url"] {
        if non_blank(manifest.get(field)).is_none() {
            failures.push(format_args!("{field} is required"));
        }
    }
    let publisher = manifest.get("publisher").and_then(Value::as_table);
    if non_blank(publisher.and_then(|p| p.get("handle"))).is_none() {
        failures.push("publisher.handle is required");
    }
    let verified = publisher
        .and_then(|p| p.get("verified"))
        .and_then(Value::as_bool);
    if verified.is_none() {
        failures.push("publisher.verified must be boolean");
    }
    verified
}

fn min_trust_required(manifest: &Table, failures: &mut Failures<'_>) -> u8 {
    let Some(value) = manifest
        .get("review")
        .and_then(Value::as_table)
        .and_then(|review| review.get("min_trust_required"))
    else {
        return TRUSTED_THRESHOLD;
    };
    match value.as_integer().and_then(|v| u8::try_from(v).ok()) {
        Some(threshold) if threshold <= 100 => threshold,
        _ => {
            failures.push("review.min_trust_required must be an integer between 0 and 100");
            TRUSTED_THRESHOLD
        }
    }
}

/// Return true when the `SKILL.md` artifact exists next to the manifest.
fn locate_skill_md(path: &Path, manifest: &Table, failures: &mut Failures<'_>) -> bool {
    let skill_md = artifact_path(manifest);
    let exists = match validate_path(skill_md) {
        Ok(()) => path
            .parent()
            .is_some_and(|dir| dir.join(skill_md).is_file()),
        Err(err) => {
            failures.push(format_args!(
                "artifacts.skill_md is not a safe relative path ({err})"
            ));
            false
        }
    };
    if !exists {
        failures.push(format_args!("missing artifacts.skill_md file ({skill_md})"));
    }
    exists
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn artifact_path(manifest: &Table) -> &str {
    manifest
        .get("artifacts")
        .and_then(Value::as_table)
        .and_then(|artifacts| non_blank(artifacts.get("skill_md")))
        .unwrap_or(DEFAULT_SKILL_MD)
}

fn computed_table(computed: &TrustComputation) -> Table {
    let rules: Table = computed
        .breakdown
        .rules
        .iter()
        .map(|(rule, points)| (rule.as_str().to_owned(), Value::Integer(i64::from(*points))))
        .collect();

    let mut breakdown = Table::new();
    breakdown.insert("rules".to_owned(), Value::Table(rules));
    breakdown.insert(
        "total".to_owned(),
        Value::Integer(i64::from(computed.breakdown.total)),
    );
    breakdown.insert(
        "tier".to_owned(),
        Value::String(computed.breakdown.tier.as_str().to_owned()),
    );
    breakdown.insert("trusted".to_owned(), Value::Boolean(computed.breakdown.trusted));

    let mut table = Table::new();
    table.insert("trust_score".to_owned(), Value::Integer(i64::from(computed.score)));
    table.insert(
        "trust_tier".to_owned(),
        Value::String(computed.tier.as_str().to_owned()),
    );
    table.insert("trusted".to_owned(), Value::Boolean(computed.trusted));
    table.insert("breakdown".to_owned(), Value::Table(breakdown));
    table
}

/// Compare only the keys the review owns, so extra bookkeeping keys in
/// `[computed]` do not count as drift.
fn computed_matches(existing: Option<&Value>, expected: &Table) -> bool {
    let Some(existing) = existing.and_then(Value::as_table) else {
        return false;
    };
    expected
        .iter()
        .all(|(key, value)| existing.get(key) == Some(value))
}

fn rewrite_manifest(
    path: &Path,
    manifest: &mut Table,
    computed: Table,
    threshold: u8,
    skill_md_exists: bool,
) -> Result<(), ReviewError> {
    manifest.insert("computed".to_owned(), Value::Table(computed));

    let mut review = Table::new();
    review.insert(
        "min_trust_required".to_owned(),
        Value::Integer(i64::from(threshold)),
    );
    manifest.insert("review".to_owned(), Value::Table(review));

    let mut inputs = manifest
        .get("trust_inputs")
        .and_then(Value::as_table)
        .cloned()
        .unwrap_or_default();
    inputs.insert("has_skill_md".to_owned(), Value::Boolean(skill_md_exists));
    manifest.insert("trust_inputs".to_owned(), Value::Table(inputs));

    let text = toml::to_string_pretty(&*manifest).map_err(|source| ReviewError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| ReviewError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `report` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`ReviewError::Io`] if the file cannot be written.
pub fn write_report_file(path: &Path, report: &ReviewReport) -> Result<(), ReviewError> {
    let io_error = |source| ReviewError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut text = report.to_markdown();
    text.push('\n');
    fs::write(path, text).map_err(io_error)
}

/// One-line summary of the failure count, for stderr.
#[must_use]
pub fn failure_summary(report: &ReviewReport) -> String {
    let count = report.failures.len();
    let noun = if count == 1 { "failure" } else { "failures" };
    format!("{count} trust review {noun}")
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
