use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use toranomaki::config;
use toranomaki::ingest;
use toranomaki::model::Alphabet;
use toranomaki::reader::Reader;
use toranomaki::writer;

#[derive(Parser)]
#[command(name = "toranomaki")]
#[command(about = "Compact binary JMdict dictionary, build/verify/lookup")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Build JMdict.dat from a newline-delimited JSON entries file.
    Build {
        entries_file: PathBuf,
        /// Re-open the written file and check every word round-trips.
        #[arg(long)]
        verify: bool,
    },
    /// Open JMdict.dat and check every word round-trips.
    Verify,
    /// Look up a query and print the best match, if any.
    Lookup { query: String },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> toranomaki::Result<()> {
    match command {
        Command::Build { entries_file, verify } => {
            let entries = ingest::read_entries_jsonl(&entries_file)?;
            let path = config::database_path()?;
            writer::write_to_file(&path, &entries, verify)?;
            println!("wrote {} ({} entries)", path.display(), entries.len());
            Ok(())
        }
        Command::Verify => {
            let path = config::database_path()?;
            let reader = Reader::open(&path)?;
            for alphabet in [Alphabet::Japanese, Alphabet::Latin] {
                for index in 0..reader.word_count(alphabet) {
                    let word = reader.word_at(alphabet, index)?;
                    let found = reader.word_index(alphabet, &word);
                    if found != index as isize {
                        return Err(toranomaki::DictionaryError::OutOfBounds {
                            offset: index,
                            len: reader.word_count(alphabet),
                        });
                    }
                }
            }
            println!("OK: every word round-trips");
            Ok(())
        }
        Command::Lookup { query } => {
            let path = config::database_path()?;
            let reader = Reader::open(&path)?;
            match reader.search_best(&query, 0)? {
                Some(result) => {
                    println!("{} ({})", result.word, result.entry.id);
                    for sense in &result.entry.senses {
                        println!("  {}: {}", sense.language.code(), sense.gloss);
                    }
                }
                None => println!("no match for {query:?}"),
            }
            Ok(())
        }
    }
}
