//! Unit tests for safe extraction.

use super::*;
use crate::test_utils::TarballBuilder;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Workspace {
    _temp: TempDir,
    archive: PathBuf,
    dest: PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let temp = tempfile::tempdir().expect("temp dir");
    let archive = temp.path().join("skill.tgz");
    let dest = temp.path().join("out");
    fs::create_dir_all(&dest).expect("create dest");
    Workspace {
        _temp: temp,
        archive,
        dest,
    }
}

fn extract(ws: &Workspace, builder: TarballBuilder) -> Result<ExtractionReport, ArchiveError> {
    builder.write_to(&ws.archive);
    TarballExtractor::default().extract(&ws.archive, &ws.dest)
}

#[rstest]
fn extracts_files_and_directories(workspace: Workspace) {
    let report = extract(
        &workspace,
        TarballBuilder::gzip()
            .dir("./")
            .file("./SKILL.md", "hello")
            .dir("./docs/")
            .file("./docs/guide.md", "guide"),
    )
    .expect("extract");

    assert_eq!(report.files_written, 2);
    assert_eq!(report.directories_created, 1);
    assert_eq!(
        fs::read_to_string(workspace.dest.join("SKILL.md")).expect("read"),
        "hello"
    );
    assert_eq!(
        fs::read_to_string(workspace.dest.join("docs/guide.md")).expect("read"),
        "guide"
    );
}

#[rstest]
fn creates_missing_parents_for_files(workspace: Workspace) {
    extract(
        &workspace,
        TarballBuilder::zstd().file("a/b/c/file.txt", "deep"),
    )
    .expect("extract");
    assert!(workspace.dest.join("a/b/c/file.txt").is_file());
}

#[rstest]
#[case::forward("../../escape.txt")]
#[case::backslash("..\\escape.txt")]
#[case::absolute("/tmp/escape.txt")]
fn unsafe_paths_abort_extraction(workspace: Workspace, #[case] bad_path: &str) {
    let err = extract(
        &workspace,
        TarballBuilder::gzip()
            .file("SKILL.md", "hello")
            .file(bad_path, "evil")
            .file("after.txt", "never"),
    )
    .expect_err("unsafe path");

    assert!(matches!(err, ArchiveError::UnsafePath(_)));
    assert_eq!(err.offending_entry(), Some(bad_path.replace('\\', "/").as_str()));
    assert!(!workspace.dest.join("after.txt").exists());
    let parent = workspace.dest.parent().expect("parent");
    assert!(!parent.join("escape.txt").exists());
}

#[rstest]
fn symlinks_and_hard_links_are_skipped(workspace: Workspace) {
    let report = extract(
        &workspace,
        TarballBuilder::gzip()
            .file("SKILL.md", "hello")
            .symlink("link", "/etc/passwd")
            .hard_link("hard", "SKILL.md"),
    )
    .expect("extract");

    assert_eq!(report.files_written, 1);
    assert_eq!(report.skipped, vec!["link".to_owned(), "hard".to_owned()]);
    assert!(fs::symlink_metadata(workspace.dest.join("link")).is_err());
    assert!(fs::symlink_metadata(workspace.dest.join("hard")).is_err());
}

#[cfg(unix)]
#[rstest]
fn refuses_to_write_through_existing_symlink(workspace: Workspace) {
    let outside = workspace.dest.parent().expect("parent").join("outside");
    fs::create_dir_all(&outside).expect("create outside");
    std::os::unix::fs::symlink(&outside, workspace.dest.join("docs")).expect("symlink");

    let err = extract(
        &workspace,
        TarballBuilder::gzip().file("docs/pwned.txt", "evil"),
    )
    .expect_err("through symlink");

    assert!(matches!(
        err,
        ArchiveError::UnsafePath(PathError::ThroughSymlink { .. })
    ));
    assert!(!outside.join("pwned.txt").exists());
}

#[rstest]
fn corrupt_archive_is_a_format_error(workspace: Workspace) {
    fs::write(&workspace.archive, b"plain text, not a tarball").expect("write");
    let err = TarballExtractor::default()
        .extract(&workspace.archive, &workspace.dest)
        .expect_err("corrupt");
    assert!(matches!(err, ArchiveError::Format { .. }));
}

#[rstest]
fn pax_sized_body_is_written_in_full_within_the_ceiling(workspace: Workspace) {
    let report = extract(
        &workspace,
        TarballBuilder::gzip().pax_sized_file("data.bin", vec![7_u8; 4096]),
    )
    .expect("extract");

    assert_eq!(report.files_written, 1);
    let written = fs::read(workspace.dest.join("data.bin")).expect("read");
    assert_eq!(written.len(), 4096);
}

#[rstest]
fn pax_sized_body_over_the_ceiling_is_never_written(workspace: Workspace) {
    TarballBuilder::gzip()
        .file("SKILL.md", "hello")
        .pax_sized_file("bomb.bin", vec![0_u8; 4096])
        .write_to(&workspace.archive);
    let limits = ArchiveLimits {
        max_total_bytes: 1024,
        ..ArchiveLimits::default()
    };

    let err = TarballExtractor::new(limits)
        .extract(&workspace.archive, &workspace.dest)
        .expect_err("over ceiling");

    assert!(matches!(
        err,
        ArchiveError::ArchiveTooLarge { total: 4101, max: 1024, ref path } if path == "bomb.bin"
    ));
    assert!(!workspace.dest.join("bomb.bin").exists());
}
