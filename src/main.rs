//! tidyranges CLI entry point
//!
//! Joins, coordinate arithmetic and summaries over BED files.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tidyranges::core::expr::{col, map, mean, n, sum};
use tidyranges::core::{
    count_overlaps, join, Anchor, GenomeInfo, IntervalStore, JoinKind, JoinOptions,
    OverlapOptions, Value,
};
use tidyranges::formats::{self, read_chrom_sizes};

#[derive(Parser)]
#[command(name = "tidyranges")]
#[command(about = "Genomic interval joins and arithmetic over BED files")]
#[command(version)]
struct Cli {
    /// Chromosome sizes file; inputs are validated against it
    #[arg(short = 'g', long, global = true)]
    genome: Option<PathBuf>,

    /// Number of threads (0: number of CPUs)
    #[arg(short = 't', long, global = true, default_value = "0")]
    threads: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Inner,
    Left,
    Intersect,
    Nearest,
    Follow,
    Precede,
}

impl From<KindArg> for JoinKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Inner => JoinKind::Inner,
            KindArg::Left => JoinKind::Left,
            KindArg::Intersect => JoinKind::Intersect,
            KindArg::Nearest => JoinKind::Nearest,
            KindArg::Follow => JoinKind::Follow,
            KindArg::Precede => JoinKind::Precede,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnchorArg {
    Start,
    End,
    Center,
    #[value(name = "5p")]
    FivePrime,
    #[value(name = "3p")]
    ThreePrime,
}

impl From<AnchorArg> for Anchor {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::Start => Anchor::Start,
            AnchorArg::End => Anchor::End,
            AnchorArg::Center => Anchor::Center,
            AnchorArg::FivePrime => Anchor::FivePrime,
            AnchorArg::ThreePrime => Anchor::ThreePrime,
        }
    }
}

/// Side of an interval, on the coordinate axis or relative to strand
#[derive(Clone, Copy, Debug, ValueEnum)]
enum SideArg {
    Left,
    Right,
    Upstream,
    Downstream,
}

#[derive(clap::Args)]
struct OverlapArgs {
    /// Only match intervals on the same strand
    #[arg(short = 's', long)]
    directed: bool,
    /// Require the query to lie within the subject
    #[arg(long)]
    within: bool,
    /// Intervals this many bases apart still count as overlapping
    #[arg(long, default_value = "0")]
    slack: u64,
    /// Minimum number of shared bases
    #[arg(long, default_value = "1")]
    min_overlap: u64,
}

impl OverlapArgs {
    fn options(&self) -> OverlapOptions {
        let mut opts = OverlapOptions::default()
            .with_slack(self.slack)
            .with_min_overlap(self.min_overlap);
        if self.directed {
            opts = opts.directed();
        }
        if self.within {
            opts = opts.within();
        }
        opts
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Join query intervals to subject intervals
    Join {
        /// Query BED file
        query: PathBuf,
        /// Subject BED file
        subject: PathBuf,
        /// Output file (optional, stdout if not specified)
        output: Option<PathBuf>,
        #[arg(short = 'k', long, default_value = "inner")]
        kind: KindArg,
        #[command(flatten)]
        overlap: OverlapArgs,
        /// Suffixes for clashing query / subject columns
        #[arg(long, num_args = 2, value_names = ["QUERY", "SUBJECT"], default_values = [".x", ".y"])]
        suffixes: Vec<String>,
        /// Add a distance column (proximity joins)
        #[arg(long)]
        distance: Option<String>,
    },
    /// Count subject overlaps per query interval
    Count {
        query: PathBuf,
        subject: PathBuf,
        output: Option<PathBuf>,
        #[command(flatten)]
        overlap: OverlapArgs,
        /// Name of the count column
        #[arg(long, default_value = "count")]
        column: String,
    },
    /// Generate flanking intervals
    Flank {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(short = 'w', long)]
        width: i64,
        #[arg(long, default_value = "upstream")]
        side: SideArg,
    },
    /// Move intervals
    Shift {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(short = 'o', long, allow_hyphen_values = true)]
        offset: i64,
        #[arg(long, default_value = "right")]
        side: SideArg,
    },
    /// Set every interval to a fixed width
    Resize {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(short = 'w', long)]
        width: i64,
        #[arg(short = 'a', long, default_value = "start")]
        anchor: AnchorArg,
    },
    /// Grow or shrink intervals around an anchor
    Stretch {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(short = 'e', long, allow_hyphen_values = true)]
        extend: i64,
        #[arg(short = 'a', long, default_value = "center")]
        anchor: AnchorArg,
    },
    /// Per-group interval counts and widths as TSV
    Summarise {
        input: PathBuf,
        output: Option<PathBuf>,
        /// Grouping columns
        #[arg(short = 'b', long, value_delimiter = ',', default_value = "seqname")]
        by: Vec<String>,
        /// Numeric attribute to sum and average per group
        #[arg(long)]
        score: Option<String>,
    },
}

fn load(path: &Path, genome: Option<&GenomeInfo>) -> anyhow::Result<IntervalStore> {
    let start = Instant::now();
    eprintln!("Loading BED file: {:?}", path);
    let store = formats::read_bed(path, None)
        .with_context(|| format!("Failed to load {:?}", path))?;
    let store = match genome {
        Some(g) => store.with_genome(g.clone())?,
        None => store,
    };
    eprintln!(
        "Loaded {} intervals in {:.2}s",
        store.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(store)
}

/// Run `write` against the output file, or stdout when no path is given
fn emit<F>(path: Option<&Path>, write: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut dyn Write) -> tidyranges::Result<()>,
{
    match path {
        Some(p) => {
            let mut out = tidyranges::core::open_writer(p)
                .with_context(|| format!("Failed to create {}", p.display()))?;
            write(&mut out)?;
            out.finish()?;
        }
        None => {
            let mut out = std::io::BufWriter::new(std::io::stdout().lock());
            write(&mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn write_store(store: &IntervalStore, path: Option<&Path>) -> anyhow::Result<()> {
    emit(path, |out| formats::write_bed(store, out))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to create thread pool")?;
    }

    let genome = match &cli.genome {
        Some(path) => Some(read_chrom_sizes(path, None)?),
        None => None,
    };
    let genome = genome.as_ref();

    let rows = match cli.command {
        Commands::Join {
            query,
            subject,
            output,
            kind,
            overlap,
            suffixes,
            distance,
        } => {
            let query = load(&query, genome)?;
            let subject = load(&subject, genome)?;
            let mut opts = JoinOptions::default()
                .with_overlap(overlap.options())
                .with_suffixes(&suffixes[0], &suffixes[1]);
            if let Some(name) = &distance {
                opts = opts.with_distance(name);
            }
            let joined = join(&query, &subject, kind.into(), &opts)?;
            write_store(&joined, output.as_deref())?;
            joined.len()
        }

        Commands::Count {
            query,
            subject,
            output,
            overlap,
            column,
        } => {
            let query = load(&query, genome)?;
            let subject = load(&subject, genome)?;
            let counts = count_overlaps(&query, &subject, &overlap.options())?;
            let counted = query.mutate(
                &column,
                map(move |row| Ok(Value::from(counts[row.index()] as u64))),
            )?;
            write_store(&counted, output.as_deref())?;
            counted.len()
        }

        Commands::Flank {
            input,
            output,
            width,
            side,
        } => {
            let store = load(&input, genome)?;
            let flanks = match side {
                SideArg::Left => store.flank_left(width)?,
                SideArg::Right => store.flank_right(width)?,
                SideArg::Upstream => store.flank_upstream(width)?,
                SideArg::Downstream => store.flank_downstream(width)?,
            };
            write_store(&flanks, output.as_deref())?;
            flanks.len()
        }

        Commands::Shift {
            input,
            output,
            offset,
            side,
        } => {
            let store = load(&input, genome)?;
            let shifted = match side {
                SideArg::Left => store.shift_left(offset)?,
                SideArg::Right => store.shift_right(offset)?,
                SideArg::Upstream => store.shift_upstream(offset)?,
                SideArg::Downstream => store.shift_downstream(offset)?,
            };
            write_store(&shifted, output.as_deref())?;
            shifted.len()
        }

        Commands::Resize {
            input,
            output,
            width,
            anchor,
        } => {
            let store = load(&input, genome)?;
            let resized = store.anchor(anchor.into()).resize(width)?;
            write_store(&resized, output.as_deref())?;
            resized.len()
        }

        Commands::Stretch {
            input,
            output,
            extend,
            anchor,
        } => {
            let store = load(&input, genome)?;
            let stretched = store.anchor(anchor.into()).stretch(extend)?;
            write_store(&stretched, output.as_deref())?;
            stretched.len()
        }

        Commands::Summarise {
            input,
            output,
            by,
            score,
        } => {
            let store = load(&input, genome)?;
            let keys: Vec<&str> = by.iter().map(String::as_str).collect();
            let grouped = store.group_by(&keys)?;

            let mut aggregations = vec![
                ("n".to_string(), n()),
                ("total_width".to_string(), sum(col("width"))),
                ("mean_width".to_string(), mean(col("width"))),
            ];
            if let Some(score) = &score {
                aggregations.push((format!("{}_sum", score), sum(col(score))));
                aggregations.push((format!("{}_mean", score), mean(col(score))));
            }
            let table = grouped.summarise(
                aggregations
                    .iter()
                    .map(|(name, e)| (name.as_str(), e.clone())),
            )?;

            emit(output.as_deref(), |out| table.write_tsv(out))?;
            table.len()
        }
    };

    eprintln!("\n=== Statistics ===");
    eprintln!("Output rows:     {}", rows);
    eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
