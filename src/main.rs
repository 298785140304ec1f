use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use gcx::{
    BatchOptions, BatchReport, HeaderBinding, Request, decrypt, decrypt_dir, encrypt, encrypt_dir,
    inspect,
};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Treat PATH as a directory and process every eligible file below it
    #[arg(short, long)]
    recursive: bool,

    /// Authenticate the container header as well as the contents
    #[arg(long, env = "GCX_BIND_HEADER")]
    bind_header: bool,

    /// Worker threads for recursive runs (default: one per CPU)
    #[arg(short, long, env = "GCX_JOBS", default_value_t = 0)]
    jobs: usize,
}

impl RunArgs {
    fn binding(&self) -> HeaderBinding {
        if self.bind_header {
            HeaderBinding::Authenticated
        } else {
            HeaderBinding::Prefix
        }
    }

    fn batch_options(&self, overwrite: bool) -> BatchOptions {
        BatchOptions {
            jobs: self.jobs,
            overwrite,
            binding: self.binding(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "gcx")]
#[command(
    version,
    about = "Encrypt files into password-protected .gcx containers and back."
)]
struct Cli {
    /// Log filter, e.g. `info` or `gcx=debug`
    #[arg(long, global = true, value_name = "FILTER", env = "GCX_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a file into <name>.gcx
    #[command(arg_required_else_help = true)]
    Encrypt {
        path: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Decrypts a .gcx container
    #[command(arg_required_else_help = true)]
    Decrypt {
        path: PathBuf,

        /// Replace an existing plaintext instead of writing <name>-decrypt.<ext>
        #[arg(long, env = "GCX_OVERWRITE")]
        overwrite: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Shows the header of a .gcx container without decrypting it
    #[command(arg_required_else_help = true)]
    Inspect {
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

fn print_report(verb: &str, report: &BatchReport) -> Result<()> {
    for (input, output) in report.succeeded() {
        println!("{verb} '{}' -> '{}'", input.display(), output.display());
    }
    for (input, err) in report.failed() {
        eprintln!("failed '{}': {err}", input.display());
    }
    if !report.is_success() {
        bail!(
            "{} of {} files failed",
            report.failed().len(),
            report.len()
        );
    }
    if report.is_empty() {
        println!("no eligible files found");
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_tracing(&args.log);

    match args.command {
        Commands::Encrypt { path, run } => {
            let password = auth::read_new_password_with_confirmation()?;
            if run.recursive {
                let report = encrypt_dir(&password, &path, run.batch_options(false))?;
                print_report("encrypted", &report)?;
            } else {
                let request = Request::new(&password, &path).binding(run.binding());
                let output = encrypt(&request)
                    .with_context(|| format!("failed to encrypt '{}'", path.display()))?;
                println!("encrypted '{}' -> '{}'", path.display(), output.display());
            }
        }
        Commands::Decrypt {
            path,
            overwrite,
            run,
        } => {
            let password = auth::read_password()?;
            if run.recursive {
                let report = decrypt_dir(&password, &path, run.batch_options(overwrite))?;
                print_report("decrypted", &report)?;
            } else {
                let request = Request::new(&password, &path)
                    .overwrite(overwrite)
                    .binding(run.binding());
                let output = decrypt(&request)
                    .with_context(|| format!("failed to decrypt '{}'", path.display()))?;
                println!("decrypted '{}' -> '{}'", path.display(), output.display());
            }
        }
        Commands::Inspect { path, json } => {
            let info = inspect(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{info}");
            }
        }
    }

    Ok(())
}
