use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use erdgen::{GenerateOptions, UndeclaredEntities, Vocabulary};

#[derive(Parser)]
#[command(
    name = "erdgen",
    about = "Generate CSV test data, SQL DDL and UML XMI from a PlantUML ER diagram"
)]
struct Cli {
    /// Input file (reads from stdin if not provided)
    file: Option<PathBuf>,

    /// Output directory
    #[arg(long, short = 'o', default_value = "out")]
    out: PathBuf,

    /// Rows generated per entity and join table
    #[arg(long, short = 'n', default_value_t = erdgen::datagen::DEFAULT_ROWS)]
    rows: usize,

    /// Seed for reproducible data
    #[arg(long)]
    seed: Option<u64>,

    /// Artifacts to produce (all when omitted)
    #[arg(long, short = 'f', value_enum, value_delimiter = ',')]
    format: Vec<Format>,

    /// Fail on entities that are only named in relationships
    #[arg(long)]
    strict: bool,

    /// Log debug diagnostics to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Ddl,
    Xmi,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let input = match &cli.file {
        Some(path) => std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("ERROR: failed to read {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
                eprintln!("ERROR: failed to read stdin: {e}");
                std::process::exit(1);
            });
            buf
        }
    };

    let files = render_all(&cli, &input).unwrap_or_else(|e| {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    });

    if let Err(e) = write_all(&cli.out, &files) {
        eprintln!("ERROR: failed to write {}: {e}", cli.out.display());
        std::process::exit(1);
    }
    tracing::info!(files = files.len(), out = %cli.out.display(), "done");
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "erdgen=debug" } else { "erdgen=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Renders every requested artifact in memory, so nothing is written when
/// any of them fails.
fn render_all(cli: &Cli, input: &str) -> Result<Vec<(String, String)>, erdgen::Error> {
    let undeclared = if cli.strict {
        UndeclaredEntities::Reject
    } else {
        UndeclaredEntities::Synthesize
    };
    let plan = erdgen::build_with_options(input, undeclared)?;
    let wants = |format: Format| cli.format.is_empty() || cli.format.contains(&format);

    let mut files = Vec::new();
    if wants(Format::Csv) {
        let mut rng = match cli.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let options = GenerateOptions { rows: cli.rows };
        files.extend(plan.csv_files(&options, &Vocabulary::default(), &mut rng)?);
    }
    if wants(Format::Ddl) {
        files.push(("schema.sql".to_string(), plan.ddl()));
    }
    if wants(Format::Xmi) {
        files.push(("model.xmi".to_string(), plan.xmi(&model_name(cli.file.as_deref()))?));
    }
    Ok(files)
}

fn model_name(file: Option<&Path>) -> String {
    file.and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

fn write_all(out: &Path, files: &[(String, String)]) -> std::io::Result<()> {
    std::fs::create_dir_all(out)?;
    for (name, contents) in files {
        let path = out.join(name);
        std::fs::write(&path, contents)?;
        tracing::debug!(path = %path.display(), "wrote");
    }
    Ok(())
}
