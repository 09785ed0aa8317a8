//! Runs one organism on the virtual CPU until it divides.
//!
//! # Usage
//! ```text
//! evo-run <instset> <genome> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `instset`: instruction-set file, one `name [cost=N] [prob_fail=P]` per line
//! - `genome`: genome file, instruction names separated by whitespace
//!
//! # Options
//! - `-c, --config <file>`: `KEY value` configuration file
//! - `-n, --cycles <n>`: cycle budget (defaults to 10000)
//! - `-s, --seed <n>`: seed for the world's random numbers (defaults to 1)
//! - `-t, --trace`: log every executed instruction
//! - `--status`: print the final status dump
//!
//! # Examples
//! ```text
//! evo-run demos/instset.cfg demos/ancestor.org
//! evo-run demos/instset.cfg demos/ancestor.org -c demos/engine.cfg --trace
//! ```

use evo_cpu::hardware::config::EngineConfig;
use evo_cpu::hardware::errors::HardwareError;
use evo_cpu::hardware::inst_set::InstSet;
use evo_cpu::hardware::loader::{describe_error, parse_genome};
use evo_cpu::hardware::profile::ExecProfile;
use evo_cpu::hardware::{
    BasicOrganism, ExecContext, Hardware, HardwareKind, Organism, SeededWorld, create_hardware,
};
use evo_cpu::utils::log::{Level, set_max_level};
use evo_cpu::{error, info, warn};
use std::env;
use std::fs;
use std::process;
use std::sync::Arc;

const DEFAULT_CYCLES: u64 = 10_000;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        let asked = args.len() >= 2 && (args[1] == "--help" || args[1] == "-h");
        process::exit(if asked { 0 } else { 1 });
    }

    let inst_set_path = &args[1];
    let genome_path = &args[2];
    let mut config_path: Option<String> = None;
    let mut cycles = DEFAULT_CYCLES;
    let mut seed = 1u64;
    let mut trace = false;
    let mut status = false;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--config" | "-c") => {
                config_path = Some(value_of(&args, i, k).to_string());
                i += 2;
            }
            k @ ("--cycles" | "-n") => {
                let v = value_of(&args, i, k);
                cycles = v.parse::<u64>().unwrap_or_else(|_| {
                    error!("Invalid cycle budget: '{}' is not a valid number", v);
                    process::exit(1);
                });
                i += 2;
            }
            k @ ("--seed" | "-s") => {
                let v = value_of(&args, i, k);
                seed = v.parse::<u64>().unwrap_or_else(|_| {
                    error!("Invalid seed: '{}' is not a valid number", v);
                    process::exit(1);
                });
                i += 2;
            }
            "--trace" | "-t" => {
                trace = true;
                i += 1;
            }
            "--status" => {
                status = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let inst_set = Arc::new(load(inst_set_path, InstSet::parse));
    let genome = load(genome_path, |source| parse_genome(&inst_set, source));
    let mut config = match &config_path {
        Some(path) => load(path, EngineConfig::parse),
        None => EngineConfig::default(),
    };
    if trace {
        config.trace = true;
        set_max_level(Level::Debug);
    }

    info!(
        "Loaded {} ({} instructions) and {} ({} lines, fingerprint {})",
        inst_set_path,
        inst_set.len(),
        genome_path,
        genome.len(),
        genome.fingerprint()
    );

    let mut hardware = create_hardware(HardwareKind::default(), inst_set.clone(), config, &genome)
        .unwrap_or_else(|e| {
            error!("{e}");
            process::exit(1)
        });

    let mut organism = BasicOrganism::default();
    let mut world = SeededWorld::new(seed);
    let mut run = 0u64;
    while run < cycles && organism.offspring.is_empty() && !organism.is_dead() {
        let mut ctx = ExecContext::new(&mut organism, &mut world);
        hardware.single_process(&mut ctx);
        run += 1;
    }

    match organism.offspring.first() {
        Some(child) => {
            let note = if *child == genome { "identical to parent" } else { "mutated" };
            info!(
                "Offspring after {} cycles: {} lines, {}, fingerprint {}",
                run,
                child.len(),
                note,
                child.fingerprint()
            );
            println!("{}", child.to_names(&inst_set));
        }
        None if organism.is_dead() => warn!("Organism died after {} cycles", run),
        None => warn!("No offspring within {} cycles", run),
    }
    for failure in &organism.failures {
        warn!("Divide failed: {}", failure);
    }
    if !organism.outputs.is_empty() {
        info!("Outputs: {:?}", organism.outputs);
    }

    print_profile(hardware.profile());

    if status {
        println!("{}", hardware.status_text());
    }
}

/// Reads `path` and parses it, printing a located diagnostic on failure.
fn load<T>(path: &str, parse: impl FnOnce(&str) -> Result<T, HardwareError>) -> T {
    let source = fs::read_to_string(path).unwrap_or_else(|e| {
        error!("Failed to read {}: {}", path, e);
        process::exit(1);
    });
    parse(&source).unwrap_or_else(|e| {
        error!("{}", describe_error(path, &source, &e));
        process::exit(1);
    })
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => {
            error!("{flag} requires an argument");
            process::exit(1);
        }
    }
}

fn print_profile(profile: &ExecProfile) {
    let total = profile.total_executed();
    let cat_w = 2 + profile
        .iter()
        .map(|(c, _, _)| c.as_str().len())
        .max()
        .unwrap_or(0)
        .max("total".len());
    let num_w = total.to_string().len().max("executed".len());
    let dash_w = cat_w + 2 * (num_w + 1) + "( 100.0%)".len() + 1;

    println!("Execution Profile:");
    println!("{:<cat_w$} {:>num_w$} {:>num_w$}", "", "executed", "failed");
    println!("{}", "-".repeat(dash_w));
    for (category, executed, failed) in profile.iter() {
        if executed == 0 {
            continue;
        }
        let percent = if total > 0 {
            executed as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        println!(
            "{:<cat_w$} {:>num_w$} {:>num_w$} ({:>5.1}%)",
            category.as_str(),
            executed,
            failed,
            percent
        );
    }
    println!("{}", "-".repeat(dash_w));
    println!(
        "{:<cat_w$} {:>num_w$} {:>num_w$}",
        "total",
        total,
        profile.total_failed()
    );
}

const USAGE: &str = "\
Virtual CPU runner

USAGE:
    {program} <instset> <genome> [OPTIONS]

ARGS:
    <instset>    Instruction-set file
    <genome>     Genome file (instruction names)

OPTIONS:
    -c, --config <file>   Engine configuration file
    -n, --cycles <n>      Cycle budget (defaults to 10000)
    -s, --seed <n>        World random seed (defaults to 1)
    -t, --trace           Log every executed instruction
        --status          Print the final status dump
    -h, --help            Print this help message

EXAMPLES:
    # Run the demo ancestor until it divides
    {program} demos/instset.cfg demos/ancestor.org

    # Same, with a custom configuration and a full trace
    {program} demos/instset.cfg demos/ancestor.org -c demos/engine.cfg --trace
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
