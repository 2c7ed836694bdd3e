//! CLI argument definitions for `skillpack`.
//!
//! The binary in `main.rs` only orchestrates; argument parsing and the
//! CLI-level error type live here so they can be tested in isolation.

use crate::archive::error::ArchiveError;
use crate::archive::pack::PackError;
use crate::config::ConfigError;
use crate::error::FailureDisposition;
use crate::install::InstallError;
use crate::manifest::ManifestError;
use crate::package::MetadataError;
use crate::publish::PublishError;
use crate::registry::RegistryError;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use skillpack_common::TrustSignals;
use thiserror::Error;

/// Publish, install and score skill packages.
#[derive(Parser, Debug)]
#[command(name = "skillpack")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Publish a skill directory into the local registry:\n",
    "    $ skillpack publish ./pdf-tools --manifest pdf-tools.json\n\n",
    "  Install the latest release into $CODEX_HOME/skills:\n",
    "    $ skillpack install pdf-tools\n\n",
    "  Check an archive against the safety policy:\n",
    "    $ skillpack inspect pdf-tools-1.0.0.tgz\n\n",
    "  Score provenance signals:\n",
    "    $ skillpack trust --license MIT --repo-url https://example.com/repo --has-skill-md",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file [default: platform-specific].
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pack a skill directory and publish it into the registry.
    Publish(PublishArgs),

    /// Install a published skill.
    Install(InstallArgs),

    /// Inspect an archive against the safety policy without extracting.
    Inspect(InspectArgs),

    /// Compute a trust score from provenance signals.
    Trust(TrustArgs),

    /// Show or change the registry location.
    #[command(subcommand)]
    Registry(RegistryCommand),
}

/// Arguments for `publish`.
#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    /// Skill directory containing `SKILL.md`.
    #[arg(value_name = "DIR")]
    pub dir: Utf8PathBuf,

    /// JSON manifest describing the release.
    #[arg(short, long, value_name = "FILE")]
    pub manifest: Utf8PathBuf,

    /// Mark the publisher as verified.
    #[arg(long)]
    pub publisher_verified: bool,

    /// Mark the release as signed.
    #[arg(long)]
    pub signed: bool,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `install`.
#[derive(Parser, Debug, Clone)]
pub struct InstallArgs {
    /// Package slug.
    #[arg(value_name = "SLUG")]
    pub slug: String,

    /// Version to install [default: latest recorded release].
    #[arg(long = "version", value_name = "VERSION")]
    pub release: Option<String>,

    /// Install root; the package lands in `<DIR>/<SLUG>`.
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<Utf8PathBuf>,

    /// Replace an existing installation.
    #[arg(short, long)]
    pub force: bool,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `inspect`.
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// Archive to inspect (`.tgz` or `.tar.zst`).
    #[arg(value_name = "ARCHIVE")]
    pub archive: Utf8PathBuf,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `trust`.
#[derive(Parser, Debug, Clone, Default)]
pub struct TrustArgs {
    /// Declared licence identifier.
    #[arg(long, value_name = "SPDX")]
    pub license: Option<String>,

    /// Source repository URL.
    #[arg(long, value_name = "URL")]
    pub repo_url: Option<String>,

    /// Homepage URL.
    #[arg(long, value_name = "URL")]
    pub homepage_url: Option<String>,

    /// The publisher is verified.
    #[arg(long)]
    pub publisher_verified: bool,

    /// The archive contains `SKILL.md`.
    #[arg(long)]
    pub has_skill_md: bool,

    /// The archive contains a licence file.
    #[arg(long)]
    pub has_license_file: bool,

    /// The release is signed.
    #[arg(long)]
    pub signed: bool,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

impl TrustArgs {
    /// Signals described by these arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use skillpack::cli::TrustArgs;
    ///
    /// let args = TrustArgs { signed: true, ..TrustArgs::default() };
    /// assert!(args.signals().signed_release);
    /// ```
    #[must_use]
    pub fn signals(&self) -> TrustSignals {
        TrustSignals {
            license_spdx: self.license.clone(),
            repo_url: self.repo_url.clone(),
            homepage_url: self.homepage_url.clone(),
            publisher_verified: self.publisher_verified,
            has_manifest_file: self.has_skill_md,
            has_license_file: self.has_license_file,
            signed_release: self.signed,
        }
    }
}

/// Subcommands of `registry`.
#[derive(Subcommand, Debug, Clone)]
pub enum RegistryCommand {
    /// Print the registry root.
    Get,
    /// Persist a new registry root in the configuration file.
    Set {
        /// New registry root.
        #[arg(value_name = "DIR")]
        value: Utf8PathBuf,
    },
}

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or saved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The skill directory could not be packed.
    #[error(transparent)]
    Pack(#[from] PackError),

    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Input {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The publish manifest is invalid.
    #[error("invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    /// A command-line identifier is invalid.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Publishing failed.
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),

    /// Installing failed.
    #[error("install failed: {0}")]
    Install(#[from] InstallError),

    /// Inspection rejected the archive.
    #[error("inspection failed: {0}")]
    Archive(#[from] ArchiveError),

    /// The registry index could not be read.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl CliError {
    /// How a caller should react to this error.
    #[must_use]
    pub fn disposition(&self) -> FailureDisposition {
        match self {
            Self::Config(ConfigError::Read { .. } | ConfigError::Write { .. })
            | Self::Pack(PackError::Io(_))
            | Self::Registry(_) => FailureDisposition::Transient,
            Self::Config(_)
            | Self::Pack(_)
            | Self::Input { .. }
            | Self::Manifest(_)
            | Self::Metadata(_) => FailureDisposition::FixInput,
            Self::Publish(err) => err.disposition(),
            Self::Install(err) => err.disposition(),
            Self::Archive(err) => err.disposition(),
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.disposition().exit_code()
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
