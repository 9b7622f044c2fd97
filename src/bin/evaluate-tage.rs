
use std::fs;
use std::process;
use std::time::Instant;

use clap::{ Parser, ValueEnum };
use log::warn;

use ramus::*;
use ramus::stats::*;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Tage,
    NeuralTage,
}
impl From<Kind> for PredictorKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Tage => PredictorKind::Tage,
            Kind::NeuralTage => PredictorKind::NeuralTage,
        }
    }
}

/// Run a branch trace through a TAGE predictor.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Binary trace file
    trace: String,

    /// Preset configuration
    #[arg(short, long, value_enum, default_value = "tage")]
    kind: Kind,

    /// JSON configuration (overrides the preset)
    #[arg(short, long)]
    config: Option<String>,

    /// Seed for the predictor's generator (overrides the configuration)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Only simulate the first N records
    #[arg(short, long)]
    limit: Option<usize>,

    /// Number of low hit-rate branches to print
    #[arg(long, default_value_t = 8)]
    low_rate: usize,
}

fn build_predictor(args: &Args) -> Result<TAGEPredictor, Error> {
    let mut cfg = match &args.config {
        Some(path) => TAGEConfig::from_json(&fs::read_to_string(path)?)?,
        None => PredictorKind::from(args.kind).preset(),
    };
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    Ok(cfg.build()?)
}

fn print_config(tage: &TAGEPredictor) {
    println!("[*] {} configuration:", tage.kind().name());
    println!("      Entries (in total): {}", tage.cfg.total_entries());
    println!("        {} entries (base component)", tage.cfg.base.size);
    for (idx, comp) in tage.cfg.comp.iter().enumerate() {
        println!("        {} entries (tagged component {}, {} history bits)",
            comp.size, idx, comp.history_len
        );
    }
    if let Some(neural) = &tage.cfg.neural {
        println!("        {} perceptrons x {} weights, threshold {}",
            neural.num_neurons, neural.num_weights, neural.threshold
        );
    }
    let storage_bits = tage.cfg.storage_bits();
    println!("      Storage bits: {}b, {:.2}KiB",
        storage_bits, storage_bits as f64 / 1024.0 / 8.0
    );
    println!("      Global History Register (GHR) length: {} bits",
        tage.ghr.len()
    );
}

fn run(args: Args) -> Result<(), Error> {
    let trace = BinaryTrace::from_file(&args.trace)?;
    let limit = args.limit.unwrap_or(usize::MAX);
    println!("[*] Loaded {} records from {}", trace.num_entries(), args.trace);

    let mut tage = build_predictor(&args)?;
    print_config(&tage);

    let mut stats = BranchStats::new();
    let start = Instant::now();
    for record in trace.as_slice().iter().take(limit) {
        // Only conditional branches are predicted. Everything else is
        // invisible to the predictor.
        let kind = match record.kind() {
            Some(kind) => kind,
            None => {
                warn!("skipping record with bad flags {:#x} at {:#x}",
                    record.flags.0, record.pc
                );
                continue;
            },
        };
        if !kind.is_conditional() {
            continue;
        }

        let predicted = tage.predict(record.pc);
        stats.update(record, Outcome::from(predicted));
        tage.resolve(record.pc, record.tgt, record.outcome().into(), kind);
    }
    let done = start.elapsed();
    println!("[*] ... simulated in {:.3?}", done);
    println!();

    println!("[*] Global statistics:");
    println!("      Unique branches: {}", stats.num_unique_branches());
    println!("      Global hit rate: {}/{} ({:.2}% correct) ({} misses)",
        stats.global_hits, stats.global_brns, stats.hit_rate() * 100.0,
        stats.global_miss()
    );
    println!("      Average MPKB:    {:.2} miss/kbrn", stats.average_mpkb());
    println!();

    println!("[*] Per-component statistics:");
    println!("      Base component:");
    println!("        {} misses, {} hits",
        tage.stat.base_miss, tage.stat.base_hits
    );
    for (idx, comp) in tage.comp.iter().enumerate() {
        println!("      Component[{:1}] ({} history bits):",
            idx, comp.history_len()
        );
        println!("        {} misses, {} hits",
            tage.stat.comp_miss[idx], tage.stat.comp_hits[idx]
        );
        println!("        {:.2}% utilization", comp.utilization());
    }
    println!("      {} allocations ({} failed), {} 'useful' resets",
        tage.stat.alcs, tage.stat.failed_alcs, tage.stat.resets
    );
    if tage.neural.is_some() {
        println!("      {} neural overrides ({} correct)",
            tage.stat.neural_overrides, tage.stat.neural_override_hits
        );
    }
    println!();

    println!("[*] Low hit-rate branches:");
    for (pc, data) in stats.low_rate_branches(args.low_rate, 100, 0.55) {
        println!("  {:016x} {:8}/{:8} {:.4} {}",
            pc, data.hits, data.occ, data.hit_rate(), data.pattern(32)
        );
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("[!] {}", e);
        process::exit(1);
    }
}
