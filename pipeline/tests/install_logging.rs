//! Log output of the install pipeline.
//!
//! Kept in its own test binary because `logtest` installs a process-wide
//! logger.

use log::Level;
use logtest::Logger;
use skillpack::archive::{ArchiveLimits, TarballExtractor};
use skillpack::fetch::StoreFetcher;
use skillpack::install::{InstallContext, InstallError, install_release};
use skillpack::package::{PackageSlug, ReleaseVersion};
use skillpack::registry::ReleaseRecord;
use skillpack::storage::{PackageKey, PackageStore};
use skillpack::test_utils::{MemoryPackageStore, TarballBuilder};
use skillpack_common::{TrustTier, digest_bytes};

#[test]
fn integrity_mismatch_logs_a_warning() {
    let mut logger = Logger::start();
    let temp = tempfile::tempdir().expect("temp dir");
    let store = MemoryPackageStore::new();
    let published = TarballBuilder::gzip().file("SKILL.md", "hello").build();
    let served = TarballBuilder::gzip().file("SKILL.md", "tampered").build();

    let package = PackageSlug::try_from("demo").expect("slug");
    let version = ReleaseVersion::try_from("1.0.0").expect("version");
    let locator = store
        .store(&PackageKey::new(package.clone(), version.clone()), &served)
        .expect("store");
    let release = ReleaseRecord {
        package,
        version,
        digest: digest_bytes(&published),
        size_bytes: published.len() as u64,
        locator,
        trust_score: 15,
        trust_tier: TrustTier::Community,
    };

    let limits = ArchiveLimits::default();
    let fetcher = StoreFetcher::new(&store);
    let extractor = TarballExtractor::new(limits);
    let err = install_release(
        &release,
        &temp.path().join("demo"),
        false,
        InstallContext {
            fetcher: &fetcher,
            extractor: &extractor,
            limits: &limits,
        },
    )
    .expect_err("tampered bytes must be rejected");
    assert!(matches!(err, InstallError::Integrity { .. }));

    let mut warned = false;
    while let Some(record) = logger.pop() {
        if record.level() == Level::Warn
            && record.target() == "skillpack::install"
            && record.args().to_string().contains("sha256 mismatch for demo@1.0.0")
        {
            warned = true;
            break;
        }
    }
    assert!(warned, "expected integrity mismatch warning to be logged");
}
