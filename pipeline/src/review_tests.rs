//! Tests for the offline trust review.

use super::*;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const COMPLETE: &str = r#"
schema_version = 1
slug = "pdf-tools"
name = "PDF tools"
summary = "Split and merge PDFs"
repo_url = "https://example.com/pdf-tools"
license_spdx = "MIT"

[publisher]
handle = "acme"
verified = true

[trust_inputs]
has_license_file = true
"#;

#[fixture]
fn registry() -> TempDir {
    tempfile::tempdir().expect("temp dir")
}

fn add_skill(root: &Path, folder: &str, manifest: &str, with_skill_md: bool) -> PathBuf {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).expect("mkdir");
    if with_skill_md {
        fs::write(dir.join("SKILL.md"), "# Skill").expect("write SKILL.md");
    }
    let path = dir.join(MANIFEST_FILE_NAME);
    fs::write(&path, manifest).expect("write manifest");
    path
}

#[rstest]
fn empty_registry_is_an_error(registry: TempDir) {
    assert!(matches!(
        review_registry(registry.path(), ReviewMode::Check),
        Err(ReviewError::NoManifests { .. })
    ));
}

#[rstest]
fn finds_manifests_recursively_in_order(registry: TempDir) {
    add_skill(registry.path(), "b/nested", COMPLETE, true);
    add_skill(registry.path(), "a", COMPLETE, true);
    fs::write(registry.path().join("a/notes.toml"), "").expect("write");

    let found = find_manifests(registry.path()).expect("find");
    assert_eq!(found.len(), 2);
    assert!(found[0].ends_with("a/skill.toml"));
}

#[rstest]
fn write_then_check_passes(registry: TempDir) {
    let path = add_skill(registry.path(), "pdf-tools", COMPLETE, true);

    let written = review_registry(registry.path(), ReviewMode::Write).expect("write");
    assert!(written.passed(), "failures: {:?}", written.failures);
    // 10 licence + 10 repo + 20 verified + 15 SKILL.md + 15 licence file
    assert_eq!(written.rows[0].score, 70);

    let rewritten: Table = toml::from_str(&fs::read_to_string(&path).expect("read")).expect("toml");
    let computed = rewritten["computed"].as_table().expect("computed table");
    assert_eq!(computed["trust_tier"].as_str(), Some("silver"));
    assert_eq!(rewritten["review"]["min_trust_required"].as_integer(), Some(50));
    assert_eq!(rewritten["trust_inputs"]["has_skill_md"].as_bool(), Some(true));

    let checked = review_registry(registry.path(), ReviewMode::Check).expect("check");
    assert!(checked.passed(), "failures: {:?}", checked.failures);
}

#[rstest]
fn stale_computed_table_fails_check(registry: TempDir) {
    let stale = format!("{COMPLETE}\n[computed]\ntrust_score = 10\n");
    add_skill(registry.path(), "pdf-tools", &stale, true);

    let report = review_registry(registry.path(), ReviewMode::Check).expect("check");
    assert!(!report.passed());
    assert!(report.failures.iter().any(|f| f.contains("outdated")));
}

#[rstest]
#[case::slug_mismatch("other-name", "slug must match folder name (other-name)")]
fn folder_must_match_slug(registry: TempDir, #[case] folder: &str, #[case] expected: &str) {
    add_skill(registry.path(), folder, COMPLETE, true);
    let report = review_registry(registry.path(), ReviewMode::Write).expect("review");
    assert!(
        report.failures.iter().any(|f| f.contains(expected)),
        "failures: {:?}",
        report.failures
    );
}

#[rstest]
fn missing_fields_are_each_reported(registry: TempDir) {
    add_skill(
        registry.path(),
        "bare",
        "schema_version = 2\n[publisher]\nverified = \"yes\"\n",
        false,
    );
    let report = review_registry(registry.path(), ReviewMode::Write).expect("review");

    for expected in [
        "schema_version must be 1",
        "slug is required",
        "name is required",
        "summary is required",
        "repo_url is required",
        "publisher.handle is required",
        "publisher.verified must be boolean",
        "missing artifacts.skill_md file (SKILL.md)",
        "trust_score 0 below min_trust_required 50",
    ] {
        assert!(
            report.failures.iter().any(|f| f.contains(expected)),
            "missing failure {expected:?} in {:?}",
            report.failures
        );
    }
    assert_eq!(report.rows[0].slug, "bare");
}

#[rstest]
fn custom_threshold_gates_score(registry: TempDir) {
    let strict = format!("{COMPLETE}\n[review]\nmin_trust_required = 90\n");
    add_skill(registry.path(), "pdf-tools", &strict, true);
    let report = review_registry(registry.path(), ReviewMode::Write).expect("review");
    assert!(!report.rows[0].passed());
    assert!(report
        .failures
        .iter()
        .any(|f| f.contains("below min_trust_required 90")));
}

#[rstest]
fn artifact_path_may_not_escape(registry: TempDir) {
    let escaping = format!("{COMPLETE}\n[artifacts]\nskill_md = \"../../SKILL.md\"\n");
    add_skill(registry.path(), "pdf-tools", &escaping, true);
    let report = review_registry(registry.path(), ReviewMode::Write).expect("review");
    assert!(report.failures.iter().any(|f| f.contains("not a safe relative path")));
}

#[rstest]
fn invalid_toml_is_a_failure_not_an_abort(registry: TempDir) {
    add_skill(registry.path(), "broken", "slug = ", true);
    add_skill(registry.path(), "pdf-tools", COMPLETE, true);
    let report = review_registry(registry.path(), ReviewMode::Write).expect("review");
    assert_eq!(report.rows.len(), 1);
    assert!(report.failures.iter().any(|f| f.contains("invalid TOML")));
}

#[test]
fn markdown_report_lists_rows_and_failures() {
    let report = ReviewReport {
        mode: ReviewMode::Check,
        rows: vec![ReviewRow {
            slug: "demo".to_owned(),
            score: 40,
            threshold: 50,
            trusted: false,
        }],
        failures: vec!["demo/skill.toml (demo): trust_score 40 below min_trust_required 50".to_owned()],
    };
    let markdown = report.to_markdown();
    assert!(markdown.starts_with("# Skill Trust Review (check)"));
    assert!(markdown.contains("| demo | 40 | 50 | no | fail |"));
    assert!(markdown.contains("## Failures"));
    assert_eq!(failure_summary(&report), "1 trust review failure");
}

#[rstest]
fn report_file_is_written_with_parents(registry: TempDir) {
    let report = ReviewReport {
        mode: ReviewMode::Write,
        rows: Vec::new(),
        failures: Vec::new(),
    };
    let target = registry.path().join("out/report.md");
    write_report_file(&target, &report).expect("write report");
    let text = fs::read_to_string(target).expect("read");
    assert!(text.contains("All skill manifests passed trust validation."));
}
