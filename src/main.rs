#![cfg(not(tarpaulin_include))]

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use toolbench::catalog::{self, ToolCategory};
use toolbench::config::Config;
use toolbench::converter::{ConversionKind, Converter, InputFile};
use toolbench::password::{self, GeneratorOptions};
use toolbench::storage::Storage;
use toolbench::{Error, Result, csv_json, history, sitemap, units};

#[derive(Parser)]
#[command(name = "toolbench")]
#[command(author, version, about = "Everyday utility tools from the command line", long_about = None)]
struct Cli {
    /// Configuration file (default: ./toolbench.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a value between two units of a category
    ConvertUnits {
        /// length, mass, volume, area, speed, time, data-storage, temperature or currency
        category: String,
        value: String,
        from: String,
        to: String,
    },
    /// Generate or check passwords
    #[command(subcommand)]
    Password(PasswordCommand),
    /// Convert CSV (file or stdin) to a JSON array
    CsvToJson {
        input: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// Convert a JSON array of objects (file or stdin) to CSV
    JsonToCsv { input: Option<PathBuf> },
    /// Convert a document, e.g. `convert-doc docx-to-pdf report.docx`
    ConvertDoc {
        /// Conversion key
        key: String,
        input: PathBuf,
        /// Directory the result is written to (default: next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the recent conversions of a converter
    History { key: String },
    /// Print the sitemap XML
    Sitemap {
        /// Public URL of the site (default: server.base_url)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// List what the local store holds
    Storage,
    /// List the tool catalog
    Tools {
        #[arg(long)]
        category: Option<String>,
        #[arg(short, long)]
        query: Option<String>,
    },
}

#[derive(Subcommand)]
enum PasswordCommand {
    /// Generate one or more passwords
    Generate(GenerateArgs),
    /// Score a password
    Check { password: String },
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(short, long, default_value_t = 16)]
    length: usize,
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,
    #[arg(long)]
    no_uppercase: bool,
    #[arg(long)]
    no_lowercase: bool,
    #[arg(long)]
    no_numbers: bool,
    #[arg(long)]
    no_symbols: bool,
    #[arg(long)]
    exclude_similar: bool,
    #[arg(long)]
    pronounceable: bool,
}

impl GenerateArgs {
    fn options(&self) -> GeneratorOptions {
        GeneratorOptions {
            length: self.length,
            uppercase: !self.no_uppercase,
            lowercase: !self.no_lowercase,
            numbers: !self.no_numbers,
            symbols: !self.no_symbols,
            exclude_similar: self.exclude_similar,
            pronounceable: self.pronounceable,
        }
    }
}

fn read_input(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    run(cli.command, config)?;
    Ok(())
}

fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::ConvertUnits {
            category,
            value,
            from,
            to,
        } => {
            let conversion = units::convert_input(&category, &value, &from, &to)?;
            println!(
                "{} {} = {} {}",
                conversion.value, conversion.from, conversion.formatted, conversion.to
            );
        }
        Commands::Password(PasswordCommand::Generate(args)) => {
            let batch = password::generate_batch(&args.options(), args.count).map_err(Error::Password)?;
            for password in &batch {
                println!("{password}");
            }
            let mut storage = Storage::open_file(config.storage.store_path())?;
            password::remember_batch(&mut storage, &batch)?;
        }
        Commands::Password(PasswordCommand::Check { password }) => {
            let report = password::evaluate(&password);
            println!("Strength: {} ({}/100)", report.label, report.score);
            println!("Time to crack: {}", report.crack_time);
            for tip in &report.feedback {
                println!("  - {tip}");
            }
        }
        Commands::CsvToJson { input, pretty } => {
            let csv = read_input(input.as_deref())?;
            println!("{}", csv_json::csv_to_json_string(&csv, pretty)?);
        }
        Commands::JsonToCsv { input } => {
            let json = read_input(input.as_deref())?;
            println!("{}", csv_json::json_to_csv(&json)?);
        }
        Commands::ConvertDoc { key, input, output } => {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let file = InputFile::new(name, fs::read(&input)?);

            let mut storage = Storage::open_file(config.storage.store_path())?;
            let converter = Converter::default().with_max_file_size(config.server.max_upload_bytes);
            let converted = converter.convert_and_record(&mut storage, &key, &file)?;

            let dir = output
                .or_else(|| input.parent().map(Path::to_path_buf))
                .unwrap_or_default();
            let target = dir.join(&converted.file_name);
            fs::write(&target, &converted.bytes)?;

            println!("Wrote {}", target.display());
            println!("Note: {}", converted.fidelity_note);
            if let Some(preview) = converted.text_preview {
                println!("\n{preview}");
            }
        }
        Commands::History { key } => {
            let kind = ConversionKind::from_key(&key)
                .ok_or_else(|| Error::Usage(format!("unknown conversion: {key}")))?;
            let storage = Storage::open_file(config.storage.store_path())?;
            let entries = history::load(&storage, kind.key());
            if entries.is_empty() {
                println!("No conversions yet");
            }
            for entry in entries {
                println!(
                    "{}  {:<7}  {} ({} -> {}){}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    format!("{:?}", entry.status).to_lowercase(),
                    entry.file_name,
                    entry.original_format,
                    entry.target_format,
                    entry.message.map(|m| format!(": {m}")).unwrap_or_default()
                );
            }
        }
        Commands::Storage => {
            let storage = Storage::open_file(config.storage.store_path())?;
            let usage = storage.usage();
            if usage.is_empty() {
                println!("Nothing stored yet");
            }
            for (name, size) in usage {
                println!("{name:<40} {size:>8} bytes");
            }
        }
        Commands::Sitemap { base_url } => {
            let base_url = base_url.unwrap_or(config.server.base_url);
            print!("{}", sitemap::build_sitemap(&base_url, Utc::now().date_naive()));
        }
        Commands::Tools { category, query } => {
            let category = match category {
                Some(name) => Some(
                    ToolCategory::parse(&name)
                        .ok_or_else(|| Error::Usage(format!("unknown tool category: {name}")))?,
                ),
                None => None,
            };
            let tools = catalog::filter(query.as_deref(), category);
            for tool in tools {
                let ai = if tool.ai_powered { " [AI]" } else { "" };
                println!("{} {:<22} {}{}", tool.icon.glyph(), tool.id, tool.description, ai);
            }
        }
    }

    Ok(())
}
