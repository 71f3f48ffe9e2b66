use std::{
    fs::File,
    path::{Path, PathBuf},
    process::ExitCode,
    thread,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use jarscope_class_file::{ClassFile, DecodeOptions};
use jarscope_jar::{EntryOutcome, JarArchive, JarError};
use memmap::Mmap;

#[derive(Parser)]
#[command(name = "jarscope")]
#[command(about = "Lists the classes, members and dependencies inside JAR files")]
#[command(version)]
struct Cli {
    /// JAR or ZIP files to inspect
    #[arg(value_name = "JAR", required = true)]
    jars: Vec<PathBuf>,

    /// Number of classes decoded in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// List fields and methods of every class
    #[arg(short, long)]
    members: bool,

    /// List the classes every class refers to
    #[arg(short, long)]
    deps: bool,

    /// Keep the raw bytecode of every method
    #[arg(long)]
    capture_bytecode: bool,

    /// Keep local variable tables
    #[arg(long)]
    capture_locals: bool,

    /// Accept Dynamic, Module and Package constant pool entries
    #[arg(long)]
    lenient_tags: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let options = DecodeOptions {
        capture_raw_bytecode: cli.capture_bytecode,
        capture_local_variable_tables: cli.capture_locals,
        fail_fast_on_unknown_tag: !cli.lenient_tags,
    };
    let jobs = cli.jobs.unwrap_or_else(|| {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let mut failures = 0;
    for path in &cli.jars {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("mapping {}", path.display()))?;

        let archive = JarArchive::new(&mmap)
            .with_context(|| format!("reading archive {}", path.display()))?;
        let outcomes = archive.decode_all(&options, jobs)?;
        log::info!("{}: {} classes", path.display(), outcomes.len());

        for outcome in &outcomes {
            match &outcome.result {
                Ok(class_file) => print_class(&cli, class_file)?,
                Err(e) => {
                    failures += 1;
                    report_failure(path, outcome, e);
                }
            }
        }
    }

    if failures > 0 {
        eprintln!("{} classes could not be decoded", failures);
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_class(cli: &Cli, class_file: &ClassFile) -> Result<()> {
    if cli.format == Format::Json {
        println!("{}", serde_json::to_string(class_file)?);
        return Ok(());
    }

    println!(
        "{} [{}.{}]: {}",
        class_file.name, class_file.major_version, class_file.minor_version, class_file.size
    );

    if cli.members {
        if let Some(super_class) = &class_file.super_class {
            println!("    extends {}", super_class);
        }
        for interface in &class_file.interfaces {
            println!("    implements {}", interface);
        }
        for field in &class_file.fields {
            println!(
                "    field {}{} {}",
                modifiers(&field.access_flags.modifiers()),
                field.name,
                field.descriptor
            );
        }
        for method in &class_file.methods {
            println!(
                "    method {}{}{}",
                modifiers(&method.access_flags.modifiers()),
                method.name,
                method.descriptor
            );
        }
    }

    if cli.deps {
        for dependency in &class_file.referenced_classes {
            if *dependency != class_file.name {
                println!("    uses {}", dependency);
            }
        }
    }

    Ok(())
}

fn modifiers(modifiers: &[&str]) -> String {
    modifiers.iter().map(|m| format!("{} ", m)).collect()
}

fn report_failure(path: &Path, outcome: &EntryOutcome, e: &JarError) {
    match e.decode_kind() {
        Some(kind) => eprintln!(
            "{}!{} ({}): {}: {}",
            path.display(),
            outcome.entry.name,
            outcome.class_name(),
            kind,
            e
        ),
        None => eprintln!("{}!{}: {}", path.display(), outcome.entry.name, e),
    }
}
