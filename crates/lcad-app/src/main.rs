//! Terminal driver: evaluate one `.lcad` script and print the resulting
//! model, or the accumulated error trail.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lcad_lang::{compile, Entry, EvalOptions, Model};

#[derive(Parser)]
#[command(name = "lcad", about = "Evaluate an lcad brick-model script", version)]
struct Args {
    /// Source file (.lcad).
    source: PathBuf,

    /// Value exposed to the script as `time-index` (drives animations).
    #[arg(long, default_value_t = 0)]
    time_index: i64,

    /// Additional module search directory; may be given more than once.
    #[arg(long = "library-path", value_name = "DIR")]
    library_paths: Vec<PathBuf>,

    /// Fixed seed for `rand-uniform` / `rand-int`.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let source = match std::fs::read_to_string(&args.source) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", args.source.display());
            return ExitCode::FAILURE;
        }
    };

    let file = args.source.display().to_string();
    let script = match compile(&source, &file) {
        Ok(script) => script,
        Err(errors) => {
            for error in &errors {
                eprintln!("{error}");
            }
            return ExitCode::FAILURE;
        }
    };
    for warning in script.warnings() {
        eprintln!("{warning}");
    }

    let mut options = EvalOptions::default();
    options.time_index = args.time_index;
    options.seed = args.seed;
    if let Some(dir) = args.source.parent() {
        options.search_paths.insert(0, dir.to_path_buf());
    }
    options.search_paths.extend(args.library_paths);

    match script.evaluate(&options) {
        Ok(model) => {
            print_model(&model);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn print_model(model: &Model) {
    for group in model.groups() {
        println!("group {} — {} parts", group.name(), group.part_count());
        for line in group.header() {
            println!("  0 {line}");
        }
        for entry in group.entries_ordered() {
            match entry {
                Entry::Part(part) => {
                    let pos = part.matrix.w_axis;
                    println!(
                        "  [step {}] part {} color {} at ({}, {}, {})",
                        part.step, part.part, part.color, pos.x, pos.y, pos.z
                    );
                }
                Entry::Primitive(prim) => {
                    let points = prim
                        .points
                        .iter()
                        .map(|p| format!("({}, {}, {})", p.x, p.y, p.z))
                        .collect::<Vec<_>>()
                        .join(" ");
                    println!(
                        "  [step {}] {:?} color {} {points}",
                        prim.step,
                        prim.kind,
                        prim.color
                    );
                }
                Entry::Comment(text) => println!("  ; {text}"),
            }
        }
    }
}
