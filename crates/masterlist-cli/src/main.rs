//! Masterlist Binary
//!
//! Removes duplicates from catalogues and merges them into master lists.
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use masterlist_core::{
    astrometric_offsets, merge_catalogues, remove_duplicates, Angle, DedupeOptions,
    MasterlistConfig, MergeConfig, MergeOptions,
};
use masterlist_io::{read_catalogue, write_csv};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "masterlist")]
#[command(about = "Cross-match astronomical source catalogues")]
struct Cli {
    /// Pipeline configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove duplicated sources from a catalogue
    Dedupe {
        input: PathBuf,
        output: PathBuf,
        /// Duplicate radius in arcsec
        #[arg(long)]
        radius: Option<f64>,
        /// Column to sort by before removal (repeatable)
        #[arg(long = "sort")]
        sort_keys: Vec<String>,
        /// Reverse the row order after sorting
        #[arg(long)]
        reverse: bool,
        #[arg(long)]
        ra_col: Option<String>,
        #[arg(long)]
        dec_col: Option<String>,
        /// Name of the flag column
        #[arg(long)]
        flag_name: Option<String>,
    },

    /// Merge a second catalogue into a master catalogue
    Merge {
        master: PathBuf,
        other: PathBuf,
        output: PathBuf,
        /// Association radius in arcsec
        #[arg(long)]
        radius: Option<f64>,
        /// Right ascension column of the second catalogue
        #[arg(long)]
        ra_col_2: Option<String>,
        /// Declination column of the second catalogue
        #[arg(long)]
        dec_col_2: Option<String>,
    },

    /// Report positional offsets between two catalogues
    Offsets {
        master: PathBuf,
        other: PathBuf,
        /// Matching radius in arcsec
        #[arg(long)]
        radius: Option<f64>,
        #[arg(long)]
        ra_col_2: Option<String>,
        #[arg(long)]
        dec_col_2: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<MasterlistConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => MasterlistConfig::from_toml(&std::fs::read_to_string(path)?)?,
        None => MasterlistConfig::default(),
    };
    Ok(config)
}

/// Command-line values win over the `[merge]` section
fn override_merge(
    merge: &mut MergeConfig,
    radius: Option<f64>,
    ra_col_2: Option<String>,
    dec_col_2: Option<String>,
) {
    if let Some(radius) = radius {
        merge.radius_arcsec = radius;
    }
    if let Some(ra_col_2) = ra_col_2 {
        merge.ra_col_2 = ra_col_2;
    }
    if let Some(dec_col_2) = dec_col_2 {
        merge.dec_col_2 = dec_col_2;
    }
}

fn path_str(path: &Path) -> Result<&str, Box<dyn std::error::Error>> {
    path.to_str()
        .ok_or_else(|| format!("path is not valid UTF-8: {}", path.display()).into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Dedupe {
            input,
            output,
            radius,
            sort_keys,
            reverse,
            ra_col,
            dec_col,
            flag_name,
        } => {
            let dedupe = &mut config.dedupe;
            if let Some(radius) = radius {
                dedupe.radius_arcsec = radius;
            }
            if !sort_keys.is_empty() {
                dedupe.sort_keys = sort_keys;
            }
            dedupe.reverse |= reverse;
            if let Some(ra_col) = ra_col {
                dedupe.ra_col = ra_col;
            }
            if let Some(dec_col) = dec_col {
                dedupe.dec_col = dec_col;
            }
            if let Some(flag_name) = flag_name {
                dedupe.flag_name = flag_name;
            }
            config.validate()?;

            let table = read_catalogue(path_str(&input)?)?;
            let outcome = remove_duplicates(&table, &DedupeOptions::from(&config.dedupe))?;
            write_csv(&outcome.catalogue, path_str(&output)?)?;
            info!(
                output = %output.display(),
                rows = outcome.catalogue.len(),
                removed = outcome.removed,
                "wrote cleaned catalogue"
            );
        }

        Commands::Merge {
            master,
            other,
            output,
            radius,
            ra_col_2,
            dec_col_2,
        } => {
            override_merge(&mut config.merge, radius, ra_col_2, dec_col_2);
            config.validate()?;

            let cat_1 = read_catalogue(path_str(&master)?)?;
            let cat_2 = read_catalogue(path_str(&other)?)?;
            let outcome = merge_catalogues(&cat_1, &cat_2, &MergeOptions::from(&config.merge))?;
            write_csv(&outcome.catalogue, path_str(&output)?)?;
            info!(
                output = %output.display(),
                rows = outcome.catalogue.len(),
                matched = outcome.matches.len(),
                "wrote merged catalogue"
            );
        }

        Commands::Offsets {
            master,
            other,
            radius,
            ra_col_2,
            dec_col_2,
        } => {
            override_merge(&mut config.merge, radius, ra_col_2, dec_col_2);
            config.validate()?;

            let merge = &config.merge;
            let cat_1 = read_catalogue(path_str(&master)?)?;
            let cat_2 = read_catalogue(path_str(&other)?)?;
            let offsets = astrometric_offsets(
                &cat_1,
                &cat_2,
                &merge.ra_col_2,
                &merge.dec_col_2,
                Angle::from_arcsec(merge.radius_arcsec),
            )?;
            println!("counterparts: {}", offsets.pairs.len());
            println!(
                "dRA*cos(dec): median {:+.4}\" sigma {:.4}\"",
                offsets.dra.median,
                offsets.dra.sigma()
            );
            println!(
                "dDec:         median {:+.4}\" sigma {:.4}\"",
                offsets.ddec.median,
                offsets.ddec.sigma()
            );
        }
    }

    Ok(())
}
