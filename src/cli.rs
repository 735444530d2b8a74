use crate::config::{Config, load_config};
use crate::document::{build_document, parse_document};
use crate::hit::Point;
use crate::ids::IdAllocator;
use crate::layout_dump::{DisplayListDump, dump_document};
use crate::model::FlowModel;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

static POINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$").unwrap()
});

#[derive(Parser, Debug)]
#[command(name = "flowkit", version, about = "Lay out a flowchart document and hit-test it")]
pub struct Args {
    /// Input document (JSON or JSON5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "display-list")]
    pub format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Report the topmost node or pad at X,Y (repeatable)
    #[arg(long = "hit", value_name = "X,Y", value_parser = parse_point)]
    pub hits: Vec<Point>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    DisplayList,
    Dump,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;

    let report = execute(&args, &input, &config)?;
    write_output(&report.body, args.output.as_deref())?;
    if !report.hits.is_empty() {
        let mut stdout = io::stdout().lock();
        for hit in &report.hits {
            writeln!(stdout, "{}", serde_json::to_string(hit)?)?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed by an embedding application.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// What a run produces: the formatted document plus one answer per `--hit`.
#[derive(Debug)]
pub struct Report {
    pub body: String,
    pub hits: Vec<Option<String>>,
}

pub fn execute(args: &Args, input: &str, config: &Config) -> Result<Report> {
    let doc = parse_document(input)?;
    let ids = Arc::new(IdAllocator::new());
    let built = build_document(&doc, &ids, config)?;
    info!(nodes = built.nodes.len(), edges = built.edges.len(), "loaded document");

    let model = FlowModel::new(built.layout, config).context("failed to lay out document")?;
    let body = match args.format {
        OutputFormat::DisplayList => {
            serde_json::to_string_pretty(&DisplayListDump::from_display_list(model.display_list()))?
        }
        OutputFormat::Dump => serde_json::to_string_pretty(&dump_document(model.layout()))?,
    };
    let hits = args
        .hits
        .iter()
        .map(|p| model.hit_test(*p).map(|target| target.id().to_string()))
        .collect();

    Ok(Report { body, hits })
}

fn parse_point(value: &str) -> std::result::Result<Point, String> {
    let caps = POINT_RE
        .captures(value)
        .ok_or_else(|| format!("expected X,Y but got '{value}'"))?;
    let coord = |idx: usize| {
        caps[idx]
            .parse::<f64>()
            .map_err(|err| format!("invalid coordinate '{}': {err}", &caps[idx]))
    };
    Ok(Point::new(coord(1)?, coord(2)?))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(body: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, body)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{body}")?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        nodes: [
            { id: "a", x: 0, y: 0, pads: [{ id: "a-out", side: "right" }] },
            { id: "b", x: 400, y: 0, pads: [{ id: "b-in", side: "left" }] },
        ],
        links: [{ from: "a-out", to: "b-in" }],
    }"#;

    #[test]
    fn parses_points() {
        assert_eq!(parse_point("10,20"), Ok(Point::new(10.0, 20.0)));
        assert_eq!(parse_point(" -1.5 , 3 "), Ok(Point::new(-1.5, 3.0)));
        assert!(parse_point("10").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn parses_arguments() {
        let args = Args::parse_from(["flowkit", "-i", "doc.json5", "-f", "dump", "--hit", "1,2", "--hit", "3,4"]);
        assert_eq!(args.format, OutputFormat::Dump);
        assert_eq!(args.hits, vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
        assert_eq!(args.input.as_deref(), Some(Path::new("doc.json5")));
    }

    #[test]
    fn reports_display_list_and_hits() {
        let args = Args::parse_from(["flowkit", "--hit", "0,0", "--hit", "100,0", "--hit", "200,0"]);
        let report = execute(&args, DOC, &Config::default()).expect("run");

        assert_eq!(
            report.hits,
            vec![Some("a".to_string()), Some("a-out".to_string()), None]
        );
        let value: serde_json::Value = serde_json::from_str(&report.body).expect("json");
        assert_eq!(value["commands"].as_array().map(Vec::len), Some(5));
    }

    #[test]
    fn dump_format_reloads() {
        let args = Args::parse_from(["flowkit", "-f", "dump"]);
        let report = execute(&args, DOC, &Config::default()).expect("run");
        let doc = parse_document(&report.body).expect("dump is a document");
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.root.as_deref(), Some("a"));
    }

    #[test]
    fn bad_documents_fail() {
        let args = Args::parse_from(["flowkit"]);
        assert!(execute(&args, "{ nodes: [", &Config::default()).is_err());
    }
}
