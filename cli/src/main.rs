//! note2tex CLI - Markdown notes to LaTeX

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

use note2tex::convert::{CompileOutcome, Converter, LatexCompiler};
use note2tex::store::DocumentStore;
use note2tex::{FsStore, Settings, TablePackage};

#[derive(Parser)]
#[command(name = "note2tex")]
#[command(version)]
#[command(about = "Convert Markdown notes to LaTeX documents", long_about = None)]
struct Cli {
    /// Note to convert, relative to the vault root
    #[arg(value_name = "NOTE")]
    input: Option<String>,

    #[command(flatten)]
    vault: VaultArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct VaultArgs {
    /// Vault root directory
    #[arg(long, global = true, env = "NOTE2TEX_VAULT", default_value = ".")]
    vault: PathBuf,

    /// Settings file (JSON)
    #[arg(long, global = true, env = "NOTE2TEX_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert notes and write `.tex` files under the writing path
    Convert {
        /// Notes to convert, relative to the vault root
        #[arg(value_name = "NOTE", required = true)]
        inputs: Vec<String>,

        /// Table environment
        #[arg(long, value_enum)]
        table_package: Option<TableMode>,

        /// Omit the table of contents
        #[arg(long)]
        no_toc: bool,

        /// Compile each written file
        #[arg(long, conflicts_with = "no_compile")]
        compile: bool,

        /// Skip compilation even if enabled in settings
        #[arg(long)]
        no_compile: bool,

        /// Print a JSON summary instead of the file listing
        #[arg(long)]
        report: bool,
    },

    /// Print the LaTeX for a note to stdout
    Print {
        /// Note to render
        #[arg(value_name = "NOTE")]
        input: String,

        /// Table environment
        #[arg(long, value_enum)]
        table_package: Option<TableMode>,
    },

    /// List generated `.tex` files under the writing path
    List,

    /// Compile a `.tex` file (the most recent one if omitted)
    Compile {
        /// File relative to the vault root
        #[arg(value_name = "FILE")]
        file: Option<String>,
    },

    /// Show the effective settings as JSON
    Config,

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum TableMode {
    /// tabularx inside a table float
    Tabularx,
    /// longtable spanning pages
    Longtable,
    /// Plain tabular inside a table float
    Tabular,
}

impl From<TableMode> for TablePackage {
    fn from(mode: TableMode) -> Self {
        match mode {
            TableMode::Tabularx => TablePackage::Tabularx,
            TableMode::Longtable => TablePackage::Longtable,
            TableMode::Tabular => TablePackage::Tabular,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let vault = cli.vault;

    let result = match cli.command {
        Some(Commands::Convert {
            inputs,
            table_package,
            no_toc,
            compile,
            no_compile,
            report,
        }) => load_settings(&vault).and_then(|mut settings| {
            if let Some(mode) = table_package {
                settings = settings.with_table_package(mode.into());
            }
            if no_toc {
                settings = settings.with_table_of_contents(false);
            }
            if compile {
                settings = settings.with_auto_compile(true);
            } else if no_compile {
                settings = settings.with_auto_compile(false);
            }
            cmd_convert(&vault.vault, &inputs, &settings, report)
        }),
        Some(Commands::Print {
            input,
            table_package,
        }) => load_settings(&vault).and_then(|mut settings| {
            if let Some(mode) = table_package {
                settings = settings.with_table_package(mode.into());
            }
            cmd_print(&vault.vault, &input, &settings)
        }),
        Some(Commands::List) => {
            load_settings(&vault).and_then(|settings| cmd_list(&vault.vault, &settings))
        }
        Some(Commands::Compile { file }) => load_settings(&vault)
            .and_then(|settings| cmd_compile(&vault.vault, file.as_deref(), &settings)),
        Some(Commands::Config) => load_settings(&vault).and_then(|settings| cmd_config(&settings)),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if a note is provided
            if let Some(input) = cli.input {
                load_settings(&vault)
                    .and_then(|settings| cmd_convert(&vault.vault, &[input], &settings, false))
            } else {
                println!("{}", "Usage: note2tex <NOTE>".yellow());
                println!("       note2tex --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn load_settings(args: &VaultArgs) -> CliResult<Settings> {
    let settings = match &args.config {
        Some(path) => Settings::from_json_file(path)?,
        None => {
            let default_path = args.vault.join("note2tex.json");
            if default_path.is_file() {
                log::debug!("Using settings from {}", default_path.display());
                Settings::from_json_file(&default_path)?
            } else {
                Settings::default()
            }
        }
    };
    settings.validate()?;
    Ok(settings)
}

fn cmd_convert(vault: &Path, inputs: &[String], settings: &Settings, report: bool) -> CliResult {
    let store = FsStore::new(vault);
    let compiler = LatexCompiler::from_settings(settings);
    let converter = Converter::new(&store, settings).with_compiler(&compiler);

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    if report {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    pb.set_message("Converting...");
    let results = converter.convert_notes_with(inputs, |path, _| {
        pb.set_message(path.to_string());
        pb.inc(1);
    });
    pb.finish_with_message("Done!");

    let mut failures = 0;
    let mut summary = Vec::with_capacity(results.len());
    for (input, result) in inputs.iter().zip(&results) {
        match result {
            Ok(converted) => summary.push(serde_json::to_value(converted)?),
            Err(e) => {
                failures += 1;
                summary.push(json!({ "source": input, "error": e.to_string() }));
            }
        }
    }

    if report {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("\n{}", "Output files:".green().bold());
        let last = results.len().saturating_sub(1);
        for (i, (input, result)) in inputs.iter().zip(&results).enumerate() {
            let branch = if i == last { "└─" } else { "├─" };
            match result {
                Ok(converted) => {
                    let compile = match &converted.compile {
                        Some(outcome) => describe_compile(outcome),
                        None => String::new(),
                    };
                    println!(
                        "  {} {} ({} bytes){}",
                        branch.dimmed(),
                        converted.output_path,
                        converted.content_len(),
                        compile
                    );
                }
                Err(e) => println!("  {} {} {}", branch.dimmed(), input, e.to_string().red()),
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} of {} notes failed to convert", failures, inputs.len()).into());
    }
    Ok(())
}

fn describe_compile(outcome: &CompileOutcome) -> String {
    if outcome.success {
        format!(" {}", "compiled".green())
    } else {
        let reason = outcome.error.as_deref().unwrap_or("unknown error");
        format!(" {} {}", "compile failed:".red(), reason)
    }
}

fn cmd_print(vault: &Path, input: &str, settings: &Settings) -> CliResult {
    let store = FsStore::new(vault);
    let text = store.read(input)?;
    let rendered = Converter::new(&store, settings).render(&text, input);
    println!("{}", rendered.content);
    Ok(())
}

fn cmd_list(vault: &Path, settings: &Settings) -> CliResult {
    let store = FsStore::new(vault);
    let files = Converter::new(&store, settings).find_tex_files()?;

    if files.is_empty() {
        println!("{} {}", "No .tex files in".yellow(), settings.writing_path);
        return Ok(());
    }
    for file in &files {
        println!("{}", file);
    }
    Ok(())
}

fn cmd_compile(vault: &Path, file: Option<&str>, settings: &Settings) -> CliResult {
    let store = FsStore::new(vault);
    let compiler = LatexCompiler::from_settings(settings);
    let converter = Converter::new(&store, settings).with_compiler(&compiler);

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Running {}...", settings.latex_compiler));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let outcome = match file {
        Some(path) => converter.compile(path),
        None => converter.compile_latest(),
    };
    pb.finish_and_clear();

    let outcome = outcome?;
    if outcome.success {
        println!("{}", "Compiled successfully".green().bold());
        Ok(())
    } else {
        let reason = outcome.error.unwrap_or_else(|| "unknown error".to_string());
        Err(format!("compilation failed: {}", reason).into())
    }
}

fn cmd_config(settings: &Settings) -> CliResult {
    println!("{}", settings.to_json()?);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "note2tex".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Markdown notes to LaTeX converter");
    println!();
    println!("License: MIT");
}
