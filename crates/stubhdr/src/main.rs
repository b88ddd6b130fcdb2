use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use stubhdr_core::collector::collect;
use stubhdr_core::dump::{dump_tree, DumpMode};
use stubhdr_core::emitter::emit;
use stubhdr_core::tree::loader::{load_path, LoadedInput, StubPolicy};
use stubhdr_core::HeaderResult;
use stubhdr_utils::{info, init_logging};

/// Reconstruct a compilable C/C++ header from a stub binary's debug information.
#[derive(Parser, Debug)]
#[command(name = "stubhdr")]
#[command(version)]
#[command(about = "Extract a header file from an ELF/DWARF formatted stub file", long_about = None)]
struct Cli
{
    /// Input stub file (object, archive or shared object)
    input: PathBuf,
    /// Output header file (default: standard output)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print an abbreviated tag-only dump of the debug tree to stderr
    #[arg(long, default_value_t = false)]
    dump_tags: bool,
    /// Print a full raw-attribute dump of the debug tree to stderr
    #[arg(long, default_value_t = false)]
    dump_attrs: bool,
    /// Skip entries that imply an executable body instead of failing
    #[arg(long, default_value_t = false)]
    lenient: bool,
}

fn main()
{
    // Initialize logging (reads from RUST_LOG env var)
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> HeaderResult<()>
{
    let policy = if cli.lenient {
        StubPolicy::Lenient
    } else {
        StubPolicy::Strict
    };

    info!("processing file: {}", cli.input.display());
    let inputs = load_path(&cli.input, policy)?;

    let mut header = String::new();
    for input in &inputs {
        dump_if_requested(cli, input)?;
        let collected = collect(&input.tree);
        header.push_str(&emit(&input.tree, &collected, "stubhdr", &origin_of(cli, input))?);
    }

    match &cli.output {
        Some(path) => write_atomic(path, &header)?,
        None => io::stdout().lock().write_all(header.as_bytes())?,
    }
    Ok(())
}

fn dump_if_requested(cli: &Cli, input: &LoadedInput) -> HeaderResult<()>
{
    // The two modes are independent; requesting both produces both passes.
    let stderr = io::stderr();
    if cli.dump_tags {
        dump_tree(&input.tree, DumpMode::Tags, &mut stderr.lock())?;
    }
    if cli.dump_attrs {
        dump_tree(&input.tree, DumpMode::Attrs, &mut stderr.lock())?;
    }
    Ok(())
}

/// The origin recorded in the header banner: the input path, with the member
/// name appended for archive members.
fn origin_of(cli: &Cli, input: &LoadedInput) -> String
{
    match &input.member {
        Some(member) => format!("{}({member})", cli.input.display()),
        None => cli.input.display().to_string(),
    }
}

/// Write to a sibling temporary file and rename into place, so the output is
/// either complete or absent.
fn write_atomic(path: &Path, text: &str) -> io::Result<()>
{
    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)
}
