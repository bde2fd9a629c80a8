mod compiler;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use datamorph_core::{Document, Engine, MediaType};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::compiler::Compiler;

const LONG_ABOUT: &str = r#"
Datamorph evaluates a transformation script over typed input documents
and writes the result in the requested output format.

Inputs are named; `payload` is the conventional primary input. The
media type of each input is taken from (highest precedence first):
a -t NAME=MEDIATYPE override, the script's `input` header declaration,
or the file extension (.json, .csv, .xml, .yaml, .txt).

EXAMPLES:
  dmorph map.ds -i payload=order.json
  dmorph map.ds -i payload=rows.csv -t payload='application/csv;separator=|'
  dmorph map.ds -i payload=in.json -i rates=rates.json -o application/x-yaml

SCRIPTS:
  A script is a single expression over its inputs, with the `ds`
  standard library in scope:

    /** DataSonnet
    input payload application/json
    output application/json
    */
    {
      id: payload.order.id,
      total: ds.arrays.sumBy(payload.order.lines, function(l) l.price)
    }
"#;

#[derive(Parser)]
#[command(name = "dmorph")]
#[command(version)]
#[command(about = "Transform data between formats with a mapping script")]
#[command(long_about = LONG_ABOUT)]
struct Cli {
    /// Path to the transformation script
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Named input documents, NAME=FILE (repeatable)
    #[arg(short = 'i', long = "input", value_name = "NAME=FILE")]
    inputs: Vec<String>,

    /// Media type overrides, NAME=MEDIATYPE (repeatable)
    #[arg(short = 't', long = "input-type", value_name = "NAME=MEDIATYPE")]
    input_types: Vec<String>,

    /// Output media type (overrides the script's `output` header)
    #[arg(short = 'o', long = "output-type", value_name = "MEDIATYPE")]
    output_type: Option<String>,

    /// Disable colored error output
    #[arg(long, short = 'C')]
    no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG also works
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let level = match cli.verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    if level != LevelFilter::OFF {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{}: {message}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, String> {
    let script = fs::read_to_string(&cli.script)
        .map_err(|e| format!("cannot read {}: {e}", cli.script.display()))?;

    let overrides = parse_pairs(&cli.input_types)?
        .into_iter()
        .map(|(name, value)| {
            MediaType::parse(&value)
                .map(|mt| (name, mt))
                .map_err(|e| e.to_string())
        })
        .collect::<Result<HashMap<_, _>, _>>()?;

    let mut inputs = HashMap::new();
    for (name, path) in parse_pairs(&cli.inputs)? {
        let path = PathBuf::from(path);
        let content =
            fs::read_to_string(&path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let media_type = match overrides.get(&name) {
            Some(mt) => mt.clone(),
            None => media_type_for(&path),
        };
        tracing::debug!(name = %name, media_type = %media_type, "loaded input");
        inputs.insert(name, Document::new(content, media_type));
    }

    let output = cli
        .output_type
        .as_deref()
        .map(MediaType::parse)
        .transpose()
        .map_err(|e| e.to_string())?;

    let engine = Engine::new().with_compiler(Box::new(Compiler));
    engine
        .transform(&script, &inputs, output.as_ref())
        .map(|document| document.content)
        .map_err(|e| e.to_string())
}

fn parse_pairs(raw: &[String]) -> Result<Vec<(String, String)>, String> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| format!("expected NAME=VALUE, got: {pair}"))
        })
        .collect()
}

/// Default media type from the file extension.
fn media_type_for(path: &Path) -> MediaType {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => MediaType::new("application", "json"),
        Some("csv") => MediaType::new("application", "csv"),
        Some("xml") => MediaType::new("application", "xml"),
        Some("yaml" | "yml") => MediaType::new("application", "x-yaml"),
        _ => MediaType::new("text", "plain"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(
            media_type_for(Path::new("a/b/data.JSON")).essence(),
            "application/json"
        );
        assert_eq!(media_type_for(Path::new("x.yml")).essence(), "application/x-yaml");
        assert_eq!(media_type_for(Path::new("notes")).essence(), "text/plain");
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(&["payload=a.json".to_string()]).unwrap();
        assert_eq!(pairs, vec![("payload".to_string(), "a.json".to_string())]);
        assert!(parse_pairs(&["broken".to_string()]).is_err());
    }
}
