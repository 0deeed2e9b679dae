//! Lessonmark CLI - render lesson markdown to HTML and inspect its structure
//!
//! Usage:
//!   lessonmark [OPTIONS] <COMMAND> [FILE]
//!
//! Commands:
//!   render  Render markdown to HTML
//!   blocks  Print the parsed document as JSON
//!   stats   Show document statistics
//!
//! `FILE` defaults to stdin; `-` also reads stdin.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser as ClapParser, Subcommand};
use lessonmark_core::options::DEFAULT_CONTAINER_CLASS;
use lessonmark_core::{Block, Document, ParseErrors, Parser, RenderOptions, Renderer};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, ClapParser)]
#[command(
    name = "lessonmark",
    version,
    about = "Render lesson markdown to HTML"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render markdown to HTML
    Render(RenderArgs),

    /// Print the parsed document and diagnostics as JSON
    Blocks(InputArgs),

    /// Show document statistics
    Stats(StatsArgs),
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Markdown file to read (stdin when omitted or `-`)
    file: Option<PathBuf>,

    /// Treat a leading `---` block as content instead of front matter
    #[arg(long)]
    no_front_matter: bool,
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Emit the bare fragment without the wrapper div
    #[arg(long)]
    fragment: bool,

    /// Class of the wrapper div
    #[arg(long, value_name = "NAME", default_value = DEFAULT_CONTAINER_CLASS)]
    class: String,

    /// JSON object of saved task state, e.g. {"0": true}
    #[arg(long, value_name = "FILE")]
    tasks: Option<PathBuf>,

    /// Write HTML to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct StatsArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output in JSON format
    #[arg(short, long)]
    json: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read '{path}': {source}")]
    Read { path: String, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: String, source: io::Error },

    #[error("invalid task state in '{path}': {source}")]
    TaskState {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Render(args) => cmd_render(args),
        Command::Blocks(args) => cmd_blocks(args),
        Command::Stats(args) => cmd_stats(args),
    }
}

fn read_input(file: Option<&Path>) -> Result<String, CliError> {
    match file {
        Some(path) if path != Path::new("-") => {
            log::info!("reading {}", path.display());
            fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.display().to_string(),
                source,
            })
        }
        _ => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|source| CliError::Read {
                    path: "<stdin>".to_string(),
                    source,
                })?;
            Ok(input)
        }
    }
}

fn parser_for(args: &InputArgs) -> Parser {
    Parser::new().with_front_matter(!args.no_front_matter)
}

fn report_diagnostics(errors: &ParseErrors) {
    for error in errors.iter() {
        log::warn!("{}", error);
    }
}

// =============================================================================
// Render Command
// =============================================================================

fn cmd_render(args: &RenderArgs) -> Result<(), CliError> {
    let input = read_input(args.input.file.as_deref())?;

    if log::log_enabled!(log::Level::Warn) {
        let result = parser_for(&args.input).parse_with_recovery(&input);
        report_diagnostics(&result.errors);
    }

    let html = Renderer::new(render_options(args)?).render(&input);
    log::info!("rendered {} bytes of HTML", html.len());

    match &args.output {
        Some(path) => fs::write(path, format!("{}\n", html)).map_err(|source| CliError::Write {
            path: path.display().to_string(),
            source,
        }),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", html).map_err(|source| CliError::Write {
                path: "<stdout>".to_string(),
                source,
            })
        }
    }
}

fn render_options(args: &RenderArgs) -> Result<RenderOptions, CliError> {
    let mut options = RenderOptions::default()
        .with_container_class(args.class.as_str())
        .with_wrap(!args.fragment)
        .with_front_matter(!args.input.no_front_matter);

    if let Some(path) = &args.tasks {
        let json = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        })?;
        options = options.with_task_state(parse_task_state(&json, path)?);
    }

    Ok(options)
}

fn parse_task_state(json: &str, path: &Path) -> Result<HashMap<String, bool>, CliError> {
    serde_json::from_str(json).map_err(|source| CliError::TaskState {
        path: path.display().to_string(),
        source,
    })
}

// =============================================================================
// Blocks Command
// =============================================================================

#[derive(Serialize)]
struct JsonReport<'a> {
    document: &'a Document<'a>,
    diagnostics: &'a ParseErrors,
}

fn cmd_blocks(args: &InputArgs) -> Result<(), CliError> {
    let input = read_input(args.file.as_deref())?;
    let result = parser_for(args).parse_with_recovery(&input);
    report_diagnostics(&result.errors);

    let report = JsonReport {
        document: &result.document,
        diagnostics: &result.errors,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// =============================================================================
// Stats Command
// =============================================================================

fn cmd_stats(args: &StatsArgs) -> Result<(), CliError> {
    let input = read_input(args.input.file.as_deref())?;
    let mut parser = parser_for(&args.input);
    let result = parser.parse_with_recovery(&input);
    let stats = DocumentStats::from_document(&result.document, &input, &result.errors, parser);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Document Statistics");
    println!("-------------------");
    println!("Front matter:   {}", stats.front_matter);
    println!("References:     {}", stats.references);
    println!();
    println!("Content:");
    println!("  Total blocks:   {}", stats.total_blocks);
    println!("  Headings:       {}", stats.headings);
    println!("  Paragraphs:     {}", stats.paragraphs);
    println!("  Code blocks:    {}", stats.code_blocks);
    println!("  Lists:          {}", stats.lists);
    println!("  List items:     {}", stats.list_items);
    println!("  Tasks done:     {}/{}", stats.tasks_done, stats.tasks);
    println!("  Quotes:         {}", stats.quotes);
    println!("  Rules:          {}", stats.rules);
    println!();
    println!("Size:");
    println!("  Characters:     {}", stats.chars);
    println!("  Words (est.):   {}", stats.words);
    println!("  Lines:          {}", stats.lines);
    println!();
    println!("Diagnostics:    {}", stats.diagnostics);

    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct DocumentStats {
    front_matter: bool,
    references: usize,
    total_blocks: usize,
    headings: usize,
    paragraphs: usize,
    code_blocks: usize,
    lists: usize,
    list_items: usize,
    tasks: usize,
    tasks_done: usize,
    quotes: usize,
    rules: usize,
    chars: usize,
    words: usize,
    lines: usize,
    diagnostics: usize,
}

impl DocumentStats {
    /// Gather statistics for a parsed document. Quote bodies are parsed
    /// again with `parser`, and their definitions and diagnostics are counted.
    fn from_document(
        doc: &Document<'_>,
        input: &str,
        errors: &ParseErrors,
        mut parser: Parser,
    ) -> Self {
        let mut stats = Self {
            front_matter: doc.front_matter.is_some(),
            references: doc.ref_defs.len(),
            chars: input.chars().count(),
            words: input.split_whitespace().count(),
            lines: input.lines().count(),
            diagnostics: errors.len(),
            ..Self::default()
        };

        // worklist instead of recursion: quotes nest arbitrarily deep
        let mut quotes = stats.count_blocks(&doc.blocks);
        while let Some(text) = quotes.pop() {
            let inner = parser.parse_with_recovery(&text);
            stats.references += inner.document.ref_defs.len();
            stats.diagnostics += inner.errors.len();
            quotes.extend(stats.count_blocks(&inner.document.blocks));
        }
        stats
    }

    /// Count `blocks` and return the bodies of the quotes among them.
    fn count_blocks(&mut self, blocks: &[Block<'_>]) -> Vec<String> {
        let mut quotes = Vec::new();
        for block in blocks {
            self.total_blocks += 1;
            match block {
                Block::Heading(_) => self.headings += 1,
                Block::Paragraph(_) => self.paragraphs += 1,
                Block::CodeBlock(_) => self.code_blocks += 1,
                Block::ThematicBreak(_) => self.rules += 1,
                Block::List(l) => {
                    self.lists += 1;
                    self.list_items += l.items.len();
                    for checked in l.items.iter().filter_map(|item| item.checked) {
                        self.tasks += 1;
                        self.tasks_done += usize::from(checked);
                    }
                }
                Block::Quote(q) => {
                    self.quotes += 1;
                    quotes.push(q.text.to_string());
                }
            }
        }
        quotes
    }
}
