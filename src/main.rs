use std::path::PathBuf;

use anyhow::{format_err, Context as _};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gtfs2sqlite::{Db, ImportConfig, Importer, DEFAULT_BATCH_SIZE};

/// Load a directory of GTFS files into an SQLite database.
///
/// Each table is built under a staging name and swapped in only once it is
/// completely loaded, so readers never see a half-filled table.
#[derive(StructOpt)]
struct Opt {
    /// SQLite database to write to.
    db_filename: PathBuf,
    /// Directory containing the GTFS files.
    #[structopt(long = "gtfs-dir", default_value = "gtfs_to_import")]
    gtfs_dir: PathBuf,
    /// JSON file with the table mapping and column types to use instead of
    /// the built-in ones.
    #[structopt(long = "config")]
    config: Option<PathBuf>,
    /// Number of rows per insert batch.
    #[structopt(long = "batch-size")]
    batch_size: Option<usize>,
    /// Exit with status 1 when any file failed to import.
    #[structopt(long = "exit-code")]
    exit_code: bool,
}

impl Opt {
    fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    fn import_config(&self) -> anyhow::Result<ImportConfig> {
        match &self.config {
            Some(path) => Ok(ImportConfig::from_file(path)?),
            None => Ok(ImportConfig::gtfs()),
        }
    }
}

fn run(opt: &Opt) -> anyhow::Result<i32> {
    if !opt.gtfs_dir.is_dir() {
        return Err(format_err!(
            "GTFS directory not found: {}",
            opt.gtfs_dir.display()
        ));
    }
    let importer = Importer::new(opt.import_config()?).batch_size(opt.batch_size());
    info!("GTFS directory: {}", opt.gtfs_dir.display());
    info!("opening database {}", opt.db_filename.display());
    let mut db = Db::open(&opt.db_filename)?;
    let summary = importer
        .run(&mut db, &opt.gtfs_dir)
        .context("import aborted")?;
    let rc = if opt.exit_code && !summary.is_complete() {
        1
    } else {
        0
    };
    Ok(rc)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let opt = Opt::from_args();
    let rc = match run(&opt) {
        Ok(rc) => rc,
        Err(e) => {
            for (i, e) in e.chain().enumerate() {
                if i == 0 {
                    eprintln!("{}", e);
                } else {
                    eprintln!("caused by: {}", e);
                }
            }
            1
        }
    };
    std::process::exit(rc);
}
