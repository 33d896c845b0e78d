use clap::{Parser, Subcommand};
use cssgram_lexer::{Dialect, Scanner};
use cssgram_parser::{Diagnostic, ParseResult};
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cssgram")]
#[command(about = "Error-tolerant CSS, SCSS and LESS parser")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Dialect to parse with (css, scss, less). Defaults to the file extension.
    #[arg(long, global = true)]
    dialect: Option<Dialect>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log parser internals to stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Report diagnostics for one or more stylesheets
    Check {
        /// Input files, `-` for stdin
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the parse tree
    Tree {
        /// Input file, `-` for stdin
        path: String,
    },

    /// Print the token stream
    Tokens {
        /// Input file, `-` for stdin
        path: String,
    },

    /// Print the first node matching a query path
    Query {
        /// Input file, `-` for stdin
        path: String,
        /// Query path such as `rule/declarations/declaration|1/propertyDeclaration`
        query: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Check { paths } => cmd_check(paths, cli.dialect, cli.json),
        Command::Tree { path } => cmd_tree(path, cli.dialect, cli.json),
        Command::Tokens { path } => cmd_tokens(path, cli.dialect, cli.json),
        Command::Query { path, query } => cmd_query(path, query, cli.dialect, cli.json),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_source(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .map_err(|e| format!("reading stdin: {e}"))?;
        return Ok(source);
    }
    let p = Path::new(path);
    if !p.exists() {
        return Err(format!("file not found: {path}"));
    }
    std::fs::read_to_string(p).map_err(|e| format!("reading {path}: {e}"))
}

/// The explicit dialect, else one picked from the file extension.
fn dialect_for(path: &str, explicit: Option<Dialect>) -> Dialect {
    if let Some(dialect) = explicit {
        return dialect;
    }
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(Dialect::Css, Dialect::from_extension)
}

fn parse_file(path: &str, dialect: Option<Dialect>) -> Result<ParseResult, String> {
    let source = read_source(path)?;
    let dialect = dialect_for(path, dialect);
    tracing::debug!(path, %dialect, "parsing");
    Ok(cssgram_parser::Parser::parse(&source, dialect))
}

/// `file:line:col: severity: message`
fn format_diagnostic(path: &str, result: &ParseResult, diagnostic: &Diagnostic) -> String {
    let (line, column) = result.line_column(diagnostic.from);
    format!(
        "{path}:{line}:{column}: {}: {}",
        diagnostic.severity, diagnostic.message
    )
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("serializing output: {e}"))
}

fn cmd_check(paths: &[String], dialect: Option<Dialect>, json: bool) -> Result<bool, String> {
    let mut clean = true;
    let mut reports = Vec::new();

    for path in paths {
        let result = parse_file(path, dialect)?;
        clean &= !result.has_errors();
        if json {
            reports.push(serde_json::json!({
                "path": path,
                "dialect": result.dialect(),
                "diagnostics": result.diagnostics(),
            }));
            continue;
        }
        for diagnostic in result.diagnostics() {
            eprintln!("{}", format_diagnostic(path, &result, diagnostic));
        }
        if !result.has_errors() {
            eprintln!("OK: {path}");
        }
    }

    if json {
        println!("{}", to_json(&reports)?);
    }
    Ok(clean)
}

fn cmd_tree(path: &str, dialect: Option<Dialect>, json: bool) -> Result<bool, String> {
    let result = parse_file(path, dialect)?;
    if json {
        println!("{}", to_json(&result.root())?);
    } else {
        print!("{}", result.root().dump());
    }
    for diagnostic in result.diagnostics() {
        eprintln!("{}", format_diagnostic(path, &result, diagnostic));
    }
    Ok(!result.has_errors())
}

fn cmd_tokens(path: &str, dialect: Option<Dialect>, json: bool) -> Result<bool, String> {
    let source = read_source(path)?;
    let tokens = Scanner::tokenize(&source, dialect_for(path, dialect));
    if json {
        println!("{}", to_json(&tokens)?);
        return Ok(true);
    }
    for token in &tokens {
        println!("{}", format_token(&source, token));
    }
    Ok(true)
}

/// `line:col Kind "text"`
fn format_token(source: &str, token: &cssgram_lexer::Token) -> String {
    format!(
        "{}:{} {:?} {:?}",
        token.span.line,
        token.span.column,
        token.kind,
        token.text(source)
    )
}

fn cmd_query(
    path: &str,
    query: &str,
    dialect: Option<Dialect>,
    json: bool,
) -> Result<bool, String> {
    let result = parse_file(path, dialect)?;
    let found = result.try_query(query).map_err(|e| e.to_string())?;
    let Some(node) = found else {
        eprintln!("No match for {query}");
        return Ok(false);
    };
    if json {
        println!("{}", to_json(&node)?);
    } else {
        let (line, column) = result.line_column(node.from());
        println!("{path}:{line}:{column}: {}", node.image());
    }
    Ok(true)
}
