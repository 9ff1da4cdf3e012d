//! Command-line interface for pkpass.
//!
//! Generates one signed wallet pass per recipient of a roster file, and checks
//! finished archives.

use clap::{Args, Parser, Subcommand, ValueEnum};
use pkpass::pass::Roster;
use pkpass::{ErrorClass, ManifestDigest, PassBuilder, SignerBackend};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pkpass")]
#[command(about = "Generate signed wallet passes from a template and a recipient roster")]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one .pkpass archive per recipient
    Generate(GenerateArgs),
    /// Check the manifest and signature of a .pkpass archive
    Verify(VerifyArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Template directory containing pass.json and static assets
    #[arg(short, long, default_value = "wallet_pass")]
    template: PathBuf,

    /// Recipient roster (JSON)
    #[arg(short, long)]
    recipients: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Private key file (PEM format)
    #[arg(short = 'k', long, default_value = "certificates/key.pem")]
    key: PathBuf,

    /// Signer certificate file (PEM format)
    #[arg(short = 'c', long, default_value = "certificates/certificate.pem")]
    cert: PathBuf,

    /// Authority (WWDR) certificate file (PEM format)
    #[arg(short = 'w', long, default_value = "certificates/wwdr.pem")]
    wwdr: PathBuf,

    /// Password for the private key
    #[arg(long, env = "PKPASS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Signing implementation
    #[arg(long, value_enum, default_value_t = Backend::default())]
    backend: Backend,

    /// Seconds to wait for the external signing process (smime backend)
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Manifest digest algorithm
    #[arg(long, value_enum, default_value = "sha1")]
    digest: Digest,

    /// Thumbnail side in pixels
    #[arg(long, default_value = "180")]
    thumbnail_size: u32,

    /// ZIP compression level (0-9, default: 6)
    /// 0 = stored, 9 = maximum compression
    #[arg(short = 'z', long, default_value = "6")]
    zip_level: u32,
}

#[derive(Args)]
struct VerifyArgs {
    /// Archive to check
    file: PathBuf,

    /// Authority (WWDR) certificate file (PEM format)
    #[arg(short = 'w', long, default_value = "certificates/wwdr.pem")]
    wwdr: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Native,
    Smime,
    PureRust,
}

impl Default for Backend {
    fn default() -> Self {
        match SignerBackend::default() {
            SignerBackend::Native => Backend::Native,
            SignerBackend::Smime => Backend::Smime,
            SignerBackend::PureRust => Backend::PureRust,
        }
    }
}

impl From<Backend> for SignerBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Native => SignerBackend::Native,
            Backend::Smime => SignerBackend::Smime,
            Backend::PureRust => SignerBackend::PureRust,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Digest {
    Sha1,
    Sha256,
}

impl From<Digest> for ManifestDigest {
    fn from(digest: Digest) -> Self {
        match digest {
            Digest::Sha1 => ManifestDigest::Sha1,
            Digest::Sha256 => ManifestDigest::Sha256,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Command::Generate(args) => generate(args),
        Command::Verify(args) => verify(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.class() {
                ErrorClass::Precondition => eprintln!("Error: {}", e),
                ErrorClass::StageFatal => eprintln!("Error: pass generation aborted: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn generate(args: GenerateArgs) -> pkpass::Result<()> {
    let mut builder = PassBuilder::new()
        .template_dir(&args.template)
        .output_dir(&args.out)
        .private_key(&args.key)
        .certificate(&args.cert)
        .authority_certificate(&args.wwdr)
        .backend(args.backend.into())
        .signing_timeout(Duration::from_secs(args.timeout_secs))
        .digest(args.digest.into())
        .thumbnail_size(args.thumbnail_size)
        .compression_level(args.zip_level);

    if let Some(password) = args.password {
        builder = builder.password(password);
    }

    let pipeline = builder.build()?;
    let roster = Roster::load(&args.recipients)?;
    tracing::info!(recipients = roster.recipients.len(), roster = %args.recipients.display(), "roster loaded");

    let mut created = 0;
    for record in &roster.recipients {
        let path = pipeline.generate(record, &roster.vcard)?;
        println!("Created {}", path.display());
        created += 1;
    }
    println!("Successfully generated {} pass(es)", created);
    Ok(())
}

fn verify(args: VerifyArgs) -> pkpass::Result<()> {
    #[cfg(feature = "openssl-backend")]
    let contents = {
        let authority = std::fs::read(&args.wwdr)?;
        pkpass::pass::verify_pkpass(&args.file, &authority)?
    };

    #[cfg(not(feature = "openssl-backend"))]
    let contents = {
        tracing::warn!(wwdr = %args.wwdr.display(), "built without openssl-backend, signature not checked");
        pkpass::pass::check_pkpass_contents(&args.file)?
    };

    println!(
        "{}: {} manifest entries verified",
        args.file.display(),
        contents.manifest.len()
    );
    Ok(())
}
