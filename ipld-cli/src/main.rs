use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use ariadne::{Color, Label, Report, ReportKind, Source};
use ipld_data_model::{Format, Node, ParseError};
use ipld_format_json::{DagJson, DagJsonView};
use ipld_selector::{Budget, Selector, VisitReason, WalkConfig, WalkError, Walker};

mod dir_loader;

use dir_loader::DirLoader;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Already reported with source context.
    #[error("{0} could not be decoded")]
    Decode(String),
    #[error("failed to write output")]
    Write(#[source] std::io::Error),
    #[error(transparent)]
    Walk(#[from] WalkError),
}

fn report_errors(source: &str, errors: &[ParseError]) {
    for error in errors {
        let filename = &*error.span.filename;
        let span = error.span.start..error.span.end;
        let printed = Report::build(ReportKind::Error, (filename, span.clone()))
            .with_message(&error.message)
            .with_label(
                Label::new((filename, span))
                    .with_message("error occurred here")
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source)));
        if printed.is_err() {
            eprintln!("{filename}: {}", error.message);
        }
    }
}

fn report_selector_error(source: &str, filename: &str, error: &ipld_selector::ParseError) {
    let span = 0..source.len();
    let printed = Report::build(ReportKind::Error, (filename, span.clone()))
        .with_message(error.to_string())
        .with_label(Label::new((filename, span)).with_message("in this selector"))
        .finish()
        .eprint((filename, Source::from(source)));
    if printed.is_err() {
        eprintln!("{filename}: {error}");
    }
}

fn read(path: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_owned(),
        source,
    })
}

fn decode(path: &str) -> Result<Node, CliError> {
    let source = read(path)?;
    DagJson.decode(&source, path).map_err(|errors| {
        report_errors(&source, &errors);
        CliError::Decode(path.to_owned())
    })
}

/// `None` when the selector was rejected; the rejection has been reported.
fn compile(path: &str) -> Result<Option<Selector>, CliError> {
    let source = read(path)?;
    let node = DagJson.decode(&source, path).map_err(|errors| {
        report_errors(&source, &errors);
        CliError::Decode(path.to_owned())
    })?;
    match ipld_selector::parse(&node) {
        Ok(selector) => Ok(Some(selector)),
        Err(e) => {
            report_selector_error(&source, path, &e);
            Ok(None)
        }
    }
}

#[derive(serde::Serialize)]
struct Event<'a> {
    path: String,
    reason: String,
    node: DagJsonView<'a>,
}

#[derive(clap::Parser)]
#[command(name = "ipld", about = "Run IPLD selectors over DAG-JSON documents")]
enum Args {
    /// Walk a document with a selector, printing one JSON line per visited node.
    Select {
        #[arg(short, long)]
        selector: String,
        #[arg(short, long)]
        file: String,
        /// Directory holding linked blocks as `<cid>.json`.
        #[arg(long)]
        links: Option<PathBuf>,
        /// Also print nodes that were only explored.
        #[arg(long)]
        all: bool,
        #[arg(long)]
        max_nodes: Option<u64>,
        #[arg(long)]
        max_links: Option<u64>,
        /// Load each distinct link once.
        #[arg(long)]
        once: bool,
    },
    /// Compile a selector and print its canonical form.
    Check {
        #[arg(short, long)]
        selector: String,
    },
}

struct SelectOptions {
    links: Option<PathBuf>,
    all: bool,
    max_nodes: Option<u64>,
    max_links: Option<u64>,
    once: bool,
}

impl SelectOptions {
    fn config(&self) -> WalkConfig {
        let mut config = WalkConfig::new().link_visit_only_once(self.once);
        if let Some(dir) = &self.links {
            config = config.loader(DirLoader::new(dir));
        }
        if self.max_nodes.is_some() || self.max_links.is_some() {
            let mut budget = Budget::new();
            if let Some(nodes) = self.max_nodes {
                budget = budget.node_budget(nodes);
            }
            if let Some(links) = self.max_links {
                budget = budget.link_budget(links);
            }
            config = config.budget(budget);
        }
        config
    }
}

fn select(selector: &str, file: &str, options: SelectOptions, out: &mut impl Write) -> Result<bool, CliError> {
    let Some(selector) = compile(selector)? else {
        return Ok(false);
    };
    let data = decode(file)?;
    let config = options.config();

    Walker::new(&config).walk(&data, &selector, |progress, node, reason| {
        if reason == VisitReason::Explored && !options.all {
            return Ok(());
        }
        let event = Event {
            path: progress.path().to_string(),
            reason: reason.to_string(),
            node: DagJsonView(node),
        };
        serde_json::to_writer(&mut *out, &event).map_err(WalkError::visit)?;
        writeln!(out).map_err(WalkError::visit)
    })?;
    Ok(true)
}

fn check(selector: &str, out: &mut impl Write) -> Result<bool, CliError> {
    let Some(compiled) = compile(selector)? else {
        return Ok(false);
    };
    log::info!("{selector}: {} selector", compiled.kind());
    writeln!(out, "{}", DagJson.encode_pretty(&compiled.to_node())).map_err(CliError::Write)?;
    Ok(true)
}

fn main() -> ExitCode {
    use clap::Parser;
    env_logger::init();
    let args = Args::parse();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match args {
        Args::Select {
            selector,
            file,
            links,
            all,
            max_nodes,
            max_links,
            once,
        } => select(
            &selector,
            &file,
            SelectOptions {
                links,
                all,
                max_nodes,
                max_links,
                once,
            },
            &mut out,
        ),
        Args::Check { selector } => check(&selector, &mut out),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
