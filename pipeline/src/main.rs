//! `skillpack` CLI entrypoint.
//!
//! Publishes skill directories into a local registry, installs releases from
//! it (or from a download base URL), and exposes inspection and trust
//! scoring as standalone commands. Results go to stdout; progress and errors
//! go to stderr.

use camino::Utf8Path;
use clap::Parser;
use skillpack::archive::{TarballExtractor, inspect, pack_directory};
use skillpack::cli::{
    Cli, CliError, Command, InspectArgs, InstallArgs, PublishArgs, RegistryCommand, TrustArgs,
};
use skillpack::config::Config;
use skillpack::dirs::{BaseDirs, SystemBaseDirs};
use skillpack::fetch::{ArchiveFetcher, HttpFetcher, StoreFetcher};
use skillpack::install::{InstallContext, InstallRequest, install};
use skillpack::manifest::parse_manifest;
use skillpack::output::{
    format_inspection_human, format_install_human, format_json, format_publish_human,
    format_trust_human, write_stderr_line,
};
use skillpack::package::{PackageSlug, ReleaseVersion};
use skillpack::publish::{PublishRequest, publish};
use skillpack::registry::FileRegistry;
use skillpack::storage::LocalPackageStore;
use skillpack_common::compute_trust_score;
use std::io::Write;

type Result<T> = std::result::Result<T, CliError>;

struct RunContext<'a> {
    cli: &'a Cli,
    config: Config,
    dirs: &'a dyn BaseDirs,
}

fn main() {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &SystemBaseDirs, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(
    cli: &Cli,
    dirs: &dyn BaseDirs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path.as_std_path())?,
        None => Config::load(dirs)?,
    };
    let context = RunContext { cli, config, dirs };

    match &cli.command {
        Command::Publish(args) => run_publish(&context, args, stdout, stderr),
        Command::Install(args) => run_install(&context, args, stdout, stderr),
        Command::Inspect(args) => run_inspect(&context, args, stdout),
        Command::Trust(args) => {
            run_trust(args, stdout);
            Ok(())
        }
        Command::Registry(command) => run_registry(&context, command, stdout),
    }
}

/// Packs the directory and publishes it into the local registry.
fn run_publish(
    context: &RunContext<'_>,
    args: &PublishArgs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let manifest_text = read_input(&args.manifest)?;
    let manifest = parse_manifest(&manifest_text)?;

    if !context.cli.quiet {
        write_stderr_line(
            stderr,
            format!("Packing {} as {}@{}...", args.dir, manifest.slug, manifest.version),
        );
    }
    let archive = pack_directory(args.dir.as_std_path())?;

    let root = context.config.registry_root(context.dirs)?;
    let store = LocalPackageStore::new(&root);
    let registry = FileRegistry::new(&root);
    let request = PublishRequest {
        archive: &archive,
        manifest: &manifest,
        publisher_verified: args.publisher_verified,
        signed_release: args.signed,
    };
    let outcome = publish(&request, &store, &registry, &context.config.limits)?;

    let rendered = if args.json {
        format_json(&outcome)
    } else {
        format_publish_human(&outcome)
    };
    write_stdout(stdout, rendered.trim_end());
    Ok(())
}

/// Resolves and installs a release.
fn run_install(
    context: &RunContext<'_>,
    args: &InstallArgs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let package = PackageSlug::try_from(args.slug.as_str())?;
    let version = args
        .release
        .as_deref()
        .map(ReleaseVersion::try_from)
        .transpose()?;
    let install_root = args
        .dir
        .as_ref()
        .map_or_else(|| context.config.install_root(), |dir| dir.as_std_path().to_path_buf());
    let request = InstallRequest {
        destination: install_root.join(package.as_str()),
        package,
        version,
        overwrite: args.force,
    };

    let root = context.config.registry_root(context.dirs)?;
    let store = LocalPackageStore::new(&root);
    let registry = FileRegistry::new(&root);
    let store_fetcher = StoreFetcher::new(&store);
    let http_fetcher = context
        .config
        .download_base_url
        .as_deref()
        .map(|url| HttpFetcher::new(url, context.config.http_timeout()));
    let fetcher: &dyn ArchiveFetcher = match &http_fetcher {
        Some(fetcher) => fetcher,
        None => &store_fetcher,
    };
    let extractor = TarballExtractor::new(context.config.limits);

    if !context.cli.quiet {
        write_stderr_line(
            stderr,
            format!("Installing {} into {}...", request.package, request.destination.display()),
        );
    }
    let outcome = install(
        &request,
        &registry,
        InstallContext {
            fetcher,
            extractor: &extractor,
            limits: &context.config.limits,
        },
    )?;

    let rendered = if args.json {
        format_json(&outcome)
    } else {
        format_install_human(&outcome)
    };
    write_stdout(stdout, rendered);
    Ok(())
}

/// Inspects an archive without extracting it.
fn run_inspect(context: &RunContext<'_>, args: &InspectArgs, stdout: &mut dyn Write) -> Result<()> {
    let evidence = inspect(args.archive.as_std_path(), &context.config.limits)?;
    let rendered = if args.json {
        format_json(&evidence)
    } else {
        format_inspection_human(&evidence)
    };
    write_stdout(stdout, rendered);
    Ok(())
}

/// Scores the signals given on the command line.
fn run_trust(args: &TrustArgs, stdout: &mut dyn Write) {
    let trust = compute_trust_score(&args.signals());
    let rendered = if args.json {
        format_json(&trust)
    } else {
        format_trust_human(&trust)
    };
    write_stdout(stdout, rendered.trim_end());
}

/// Reads or persists the registry root.
fn run_registry(
    context: &RunContext<'_>,
    command: &RegistryCommand,
    stdout: &mut dyn Write,
) -> Result<()> {
    match command {
        RegistryCommand::Get => {
            let root = context.config.registry_root(context.dirs)?;
            write_stdout(stdout, root.display());
        }
        RegistryCommand::Set { value } => {
            let mut config = context.config.clone();
            config.registry = Some(value.as_std_path().to_path_buf());
            match &context.cli.config {
                Some(path) => config.save_to(path.as_std_path())?,
                None => {
                    config.save(context.dirs)?;
                }
            }
            write_stdout(stdout, value);
        }
    }
    Ok(())
}

fn read_input(path: &Utf8Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Input {
        path: path.to_owned(),
        source,
    })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            write_stderr_line(stderr, format!("hint: {}", err.disposition()));
            err.exit_code()
        }
    }
}

fn write_stdout(stdout: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stdout, "{message}").is_err() {
        // Best-effort output; a closed pipe is not an error worth reporting.
    }
}
