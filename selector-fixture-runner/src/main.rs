use clap::{Parser, Subcommand};
use ipld_data_model::{Format, Link, Node};
use ipld_format_json::DagJson;
use ipld_selector::{Budget, MemoryLoader, WalkConfig, Walker};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

#[derive(Debug, Parser)]
#[clap(name = "selector-fixtures", version = "0.1.0")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run selector fixture suites and report coverage
    Run {
        /// Fixture files to run
        #[clap(required = true)]
        files: Vec<String>,
        /// Show detailed output for each case
        #[clap(short, long)]
        verbose: bool,
    },
    /// Debug a single fixture case
    Debug {
        /// Fixture file
        #[clap(short, long)]
        file: String,
        /// Case index
        #[clap(short, long)]
        case: usize,
    },
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Mode {
    /// Only matched nodes are recorded.
    #[default]
    Matching,
    /// Every entered node is recorded.
    All,
}

#[derive(Debug, Deserialize)]
struct BudgetSpec {
    nodes: Option<u64>,
    links: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Case {
    description: String,
    selector: serde_json::Value,
    data: serde_json::Value,
    /// Linked blocks by CID. When present, links are loaded from here.
    blocks: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    mode: Mode,
    budget: Option<BudgetSpec>,
    #[serde(default)]
    once: bool,
    /// Substring of the expected compile or walk error.
    error: Option<String>,
    visits: Option<Vec<Visit>>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
struct Visit {
    path: String,
    #[serde(default = "matched")]
    reason: String,
}

fn matched() -> String {
    "matched".to_owned()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { files, verbose } => {
            let mut all_passed = true;
            for file in files {
                println!("\n=== Testing {} ===", file);
                all_passed &= test_file_coverage(&file, verbose)?;
            }
            if !all_passed {
                std::process::exit(1);
            }
        }
        Commands::Debug { file, case } => {
            run_debug(&file, case)?;
        }
    }

    Ok(())
}

fn load_cases(filepath: &str) -> Result<Vec<Case>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(filepath)?;
    let cases: Vec<Case> = serde_json::from_str(&content)?;
    log::info!("loaded {} cases from {}", cases.len(), filepath);
    Ok(cases)
}

fn test_file_coverage(filepath: &str, verbose: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let cases = load_cases(filepath)?;

    let mut passed = 0;
    for (i, case) in cases.iter().enumerate() {
        log::debug!("running case {}: {}", i, case.description);
        match run_case(case) {
            Ok(()) => {
                passed += 1;
                if verbose {
                    println!("  Case {}: PASS ({})", i, case.description);
                }
            }
            Err(reason) => {
                log::debug!("case {} failed: {}", i, reason);
                println!("  Case {}: FAIL ({})", i, case.description);
                if verbose {
                    println!("    {}", reason);
                    println!("    Selector: {}", serde_json::to_string(&case.selector)?);
                    println!("    Data: {}", serde_json::to_string(&case.data)?);
                }
            }
        }
    }

    let coverage = if cases.is_empty() {
        0.0
    } else {
        (passed as f64 / cases.len() as f64) * 100.0
    };
    println!("  Coverage: {:.2}% ({}/{})", coverage, passed, cases.len());

    Ok(passed == cases.len())
}

fn run_debug(filepath: &str, case_index: usize) -> Result<(), Box<dyn std::error::Error>> {
    let cases = load_cases(filepath)?;
    let Some(case) = cases.get(case_index) else {
        eprintln!(
            "Case index {} out of range (0-{})",
            case_index,
            cases.len().saturating_sub(1)
        );
        return Ok(());
    };

    println!("Case: {}", case.description);
    println!("Selector: {}", serde_json::to_string_pretty(&case.selector)?);
    println!("Data: {}", serde_json::to_string_pretty(&case.data)?);
    match execute(case) {
        Ok(visits) => {
            println!("Visits:");
            for visit in &visits {
                println!("  {} /{}", visit.reason, visit.path);
            }
        }
        Err(e) => println!("Error: {}", e),
    }
    match run_case(case) {
        Ok(()) => println!("Result: PASS"),
        Err(reason) => println!("Result: FAIL\n{}", reason),
    }
    Ok(())
}

/// Fixture values are plain JSON; re-reading them as DAG-JSON gives links and bytes.
fn to_node(value: &serde_json::Value, name: &str) -> Result<Node, String> {
    let text = serde_json::to_string(value).map_err(|e| e.to_string())?;
    DagJson.decode(&text, name).map_err(|errors| {
        errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ")
    })
}

fn config(case: &Case) -> Result<WalkConfig, String> {
    let mut config = WalkConfig::new().link_visit_only_once(case.once);
    if let Some(blocks) = &case.blocks {
        let loader = blocks
            .iter()
            .map(|(cid, value)| -> Result<(Link, Node), String> {
                Ok((Link::new(cid.as_str()), to_node(value, cid)?))
            })
            .collect::<Result<MemoryLoader, String>>()?;
        config = config.loader(loader);
    }
    if let Some(spec) = &case.budget {
        let mut budget = Budget::new();
        if let Some(nodes) = spec.nodes {
            budget = budget.node_budget(nodes);
        }
        if let Some(links) = spec.links {
            budget = budget.link_budget(links);
        }
        config = config.budget(budget);
    }
    Ok(config)
}

fn execute(case: &Case) -> Result<Vec<Visit>, String> {
    let selector = to_node(&case.selector, "selector")?;
    let selector = ipld_selector::parse(&selector).map_err(|e| e.to_string())?;
    log::trace!("compiled {} selector", selector.kind());
    let data = to_node(&case.data, "data")?;
    let config = config(case)?;

    let mut visits = Vec::new();
    Walker::new(&config)
        .walk(&data, &selector, |progress, _, reason| {
            if case.mode == Mode::All || reason == ipld_selector::VisitReason::Matched {
                visits.push(Visit {
                    path: progress.path().to_string(),
                    reason: reason.to_string(),
                });
            }
            Ok(())
        })
        .map_err(|e| e.to_string())?;
    Ok(visits)
}

fn run_case(case: &Case) -> Result<(), String> {
    match (&case.error, execute(case)) {
        (Some(expected), Err(actual)) if actual.contains(expected.as_str()) => Ok(()),
        (Some(expected), Err(actual)) => Err(format!(
            "expected an error containing {:?}, got {:?}",
            expected, actual
        )),
        (Some(expected), Ok(visits)) => Err(format!(
            "expected an error containing {:?}, walk made {} visits",
            expected,
            visits.len()
        )),
        (None, Err(actual)) => Err(format!("unexpected error: {}", actual)),
        (None, Ok(visits)) => match &case.visits {
            Some(expected) if *expected != visits => {
                Err(format!("expected visits {:?}\n    got {:?}", expected, visits))
            }
            _ => Ok(()),
        },
    }
}
