//! CLI: graph document -> (names | plan | convert)
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;

use crate::convert::build_with;
use crate::emit::render_outline;
use crate::graph_doc::load_graph_file;
use crate::ir::{TypeGraph, TypeId};
use crate::naming::resolve_names;
use crate::target::Target;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate hydrate/dehydrate converters and identifiers from a finished type graph
#[derive(Parser, Debug)]
#[command(name = "json-bridge", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve identifiers for every class, property and enum case
    Names(NamesOut),
    /// print the converter plan for the graph's entry classes
    Plan(PlanOut),
    /// dehydrate each input document into a class, then hydrate it back
    Convert(ConvertRun),
}

#[derive(Args, Debug, Clone)]
struct GraphSettings {
    /// graph document (.json)
    #[arg(long)]
    graph: PathBuf,

    /// backend whose naming rules and union handling apply
    #[arg(long, value_enum, default_value_t)]
    target: Target,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct NamesOut {
    #[command(flatten)]
    graph_settings: GraphSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct PlanOut {
    #[command(flatten)]
    graph_settings: GraphSettings,

    /// print the plan as JSON instead of the outline
    #[arg(long)]
    json: bool,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ConvertRun {
    #[command(flatten)]
    graph_settings: GraphSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// class to convert into: a top-level name or a class name
    #[arg(long)]
    class: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl GraphSettings {
    fn load(&self) -> Result<TypeGraph> {
        load_graph_file(&self.graph).with_context(|| format!("invalid graph document {}", self.graph.display()))
    }
}

impl InputSettings {
    /// Calls `apply` with a source label and each document, after the pointer and
    /// jq filter have been applied.
    fn load_process(&self, mut apply: impl FnMut(&str, Value)) -> Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        for source_path in source_paths {
            let source_label = source_path.to_string_lossy().to_string();
            let source = read_source(&source_path).with_context(|| format!("failed to read {source_label}"))?;

            let documents: Vec<(String, &str)> = if self.ndjson {
                source
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(i, line)| (format!("{source_label}:{}", i + 1), line))
                    .collect()
            } else {
                vec![(source_label.clone(), source.as_str())]
            };

            for (label, text) in documents {
                let json_value = serde_json::from_str::<Value>(text)
                    .with_context(|| format!("failed to parse JSON source ({label})"))?;
                let json_value = match self.json_pointer.as_deref() {
                    None => json_value,
                    Some(pointer) => json_value
                        .pointer(pointer)
                        .cloned()
                        .ok_or_else(|| anyhow!("JSON pointer {pointer} matched nothing in {label}"))?,
                };
                match self.jq_expr.as_ref() {
                    None => apply(&label, json_value),
                    Some(jq_expr) => {
                        let outputs = crate::jq_exec::run_jaq(jq_expr, &json_value)
                            .with_context(|| format!("failed to apply jq expression to {label}"))?;
                        for (i, output) in outputs.into_iter().enumerate() {
                            apply(&format!("{label}#{i}"), output);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Names(target) => {
                let graph = target.graph_settings.load()?;
                let names = resolve_names(&graph, &target.graph_settings.target.policy())?;
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&names)?)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Plan(target) => {
                let settings = &target.graph_settings;
                let graph = settings.load()?;
                let entries = entry_classes(&graph);
                let converters = build_with(&graph, &entries, settings.target.converter_options())?;
                if target.json {
                    write_output(target.out.as_deref(), &serde_json::to_string_pretty(&converters)?)?;
                    return Ok(ExitCode::SUCCESS);
                }
                let names = resolve_names(&graph, &settings.target.policy())?;
                let mut outline = render_outline(&names, &converters).map_err(|_| anyhow!("failed to render plan"))?;
                outline.set_header(format!(
                    "converter plan for {} (target: {})",
                    settings.graph.display(),
                    settings.target.name()
                ));
                match target.out.as_deref() {
                    Some(out) => {
                        outline.write_to_file(out).with_context(|| format!("failed to write {}", out.display()))?
                    }
                    None => print!("{}", outline.render()),
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::Convert(target) => {
                let settings = &target.graph_settings;
                let graph = settings.load()?;
                let class = find_class(&graph, &target.class)?;
                let converters = build_with(&graph, &[class], settings.target.converter_options())?;

                let mut failures = 0usize;
                let mut total = 0usize;
                target.input_settings.load_process(|label, document| {
                    total += 1;
                    let result = converters.dehydrate(class, &document).and_then(|object| converters.hydrate(&object));
                    match result {
                        Ok(value) => println!("{value}"),
                        Err(error) => {
                            failures += 1;
                            eprintln!("{} {label}: {error}", "invalid".yellow().bold());
                        }
                    }
                })?;
                tracing::debug!(total, failures, "converted documents");
                Ok(if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Classes named by top-level entries, or every class if no top-level is a class.
fn entry_classes(graph: &TypeGraph) -> Vec<TypeId> {
    let tops: Vec<TypeId> = graph.top_levels().values().copied().filter(|id| graph.class(*id).is_some()).collect();
    if tops.is_empty() { graph.classes().map(|(id, _)| id).collect() } else { tops }
}

fn find_class(graph: &TypeGraph, name: &str) -> Result<TypeId> {
    graph
        .top_level(name)
        .filter(|id| graph.class(*id).is_some())
        .or_else(|| graph.class_named(name))
        .ok_or_else(|| anyhow!("no class or top-level class named `{name}`"))
}

fn read_source(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            // literal path, or '-' for stdin
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_doc::load_graph_str;

    fn graph() -> TypeGraph {
        load_graph_str(
            r#"{
                "top_levels": {"Root": "Person"},
                "types": {
                    "Address": {"kind": "class", "fields": {"city": {"type": "string"}}},
                    "Person": {"kind": "class", "fields": {"home": {"type": "Address"}}}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn entries_prefer_top_level_classes() {
        let graph = graph();
        let person = graph.class_named("Person").unwrap();
        assert_eq!(entry_classes(&graph), vec![person]);
    }

    #[test]
    fn class_lookup_accepts_both_names() {
        let graph = graph();
        assert_eq!(find_class(&graph, "Root").unwrap(), find_class(&graph, "Person").unwrap());
        assert!(find_class(&graph, "Address").is_ok());
        assert!(find_class(&graph, "Nope").is_err());
    }

    #[test]
    fn cli_parses_convert_flags() {
        let cli = CommandLineInterface::try_parse_from([
            "json-bridge", "convert", "--graph", "g.json", "--class", "Root", "--target", "typescript", "-i", "a.json",
            "b.json", "--ndjson",
        ])
        .unwrap();
        let Command::Convert(run) = cli.cmd else {
            panic!("expected convert");
        };
        assert_eq!(run.graph_settings.target, Target::TypeScript);
        assert_eq!(run.input_settings.input, ["a.json", "b.json"]);
        assert!(run.input_settings.ndjson);
    }
}
