use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};

/// Write a synthetic two-arm trial as a cumulative-incidence series.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Participants per arm
    #[arg(long, default_value_t = 15_000)]
    n: usize,

    /// Daily event hazard in the treatment arm
    #[arg(long, default_value_t = 0.0002)]
    treatment_rate: f64,

    /// Daily event hazard in the placebo arm
    #[arg(long, default_value_t = 0.0008)]
    placebo_rate: f64,

    /// Last day of follow-up
    #[arg(long, default_value_t = 112)]
    days: u32,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Directory for data_twister.csv and data_twister.parquet
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

const Z: f64 = 1.96;

/// One row of the output: day, risk difference and risk ratio with limits.
struct Row {
    t: f64,
    rd: [Option<f64>; 3],
    rr: [Option<f64>; 3],
}

const COLUMNS: [&str; 7] = ["t", "RD", "RD_LCL", "RD_UCL", "RR", "RR_LCL", "RR_UCL"];

impl Row {
    fn values(&self) -> [Option<f64>; 7] {
        let [rd, rd_l, rd_u] = self.rd;
        let [rr, rr_l, rr_u] = self.rr;
        [Some(self.t), rd, rd_l, rd_u, rr, rr_l, rr_u]
    }
}

/// Sorted event days for `n` participants with exponential time to event.
fn event_days(n: usize, rate: f64, rng: &mut StdRng) -> Result<Vec<f64>> {
    let dist = Exp::new(rate).with_context(|| format!("event rate {rate}"))?;
    let mut days: Vec<f64> = (0..n).map(|_| dist.sample(rng)).collect();
    days.sort_by(f64::total_cmp);
    Ok(days)
}

fn cases_by(days: &[f64], t: f64) -> usize {
    days.partition_point(|&d| d <= t)
}

fn row(t: f64, cases_treat: usize, cases_placebo: usize, n: usize) -> Row {
    let nf = n as f64;
    let p1 = cases_treat as f64 / nf;
    let p0 = cases_placebo as f64 / nf;

    let rd = p1 - p0;
    let se = (p1 * (1.0 - p1) / nf + p0 * (1.0 - p0) / nf).sqrt();
    let rd_limits = [Some(rd), Some(rd - Z * se), Some(rd + Z * se)];

    // Undefined until both arms have a case.
    let rr_limits = if cases_treat == 0 || cases_placebo == 0 {
        [None; 3]
    } else {
        let rr = p1 / p0;
        let se_ln = (1.0 / cases_treat as f64 - 1.0 / nf + 1.0 / cases_placebo as f64 - 1.0 / nf)
            .max(0.0)
            .sqrt();
        [
            Some(rr),
            Some((rr.ln() - Z * se_ln).exp()),
            Some((rr.ln() + Z * se_ln).exp()),
        ]
    };

    Row {
        t,
        rd: rd_limits,
        rr: rr_limits,
    }
}

fn write_csv(rows: &[Row], path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(COLUMNS)?;
    for r in rows {
        writer.write_record(
            r.values()
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(
        COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, *name != "t"))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = (0..COLUMNS.len())
        .map(|col| {
            let values: Vec<Option<f64>> = rows.iter().map(|r| r.values()[col]).collect();
            Arc::new(Float64Array::from(values)) as ArrayRef
        })
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let treatment = event_days(args.n, args.treatment_rate, &mut rng)?;
    let placebo = event_days(args.n, args.placebo_rate, &mut rng)?;

    let rows: Vec<Row> = (0..=args.days)
        .map(|day| {
            let t = day as f64;
            row(t, cases_by(&treatment, t), cases_by(&placebo, t), args.n)
        })
        .collect();

    std::fs::create_dir_all(&args.out_dir)?;
    let csv_path = args.out_dir.join("data_twister.csv");
    let parquet_path = args.out_dir.join("data_twister.parquet");
    write_csv(&rows, &csv_path)?;
    write_parquet(&rows, &parquet_path)?;

    log::info!(
        "{} cases on treatment, {} on placebo by day {}",
        cases_by(&treatment, args.days as f64),
        cases_by(&placebo, args.days as f64),
        args.days
    );
    println!(
        "Wrote {} days to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
