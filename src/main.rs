use std::io::{self, BufRead, Write};
use std::process;
use std::time::Instant;

use clap::Parser;
use tracing::warn;

use infer_playground::api::*;
use infer_playground::runtime::comparison::ComparisonGrid;
use infer_playground::runtime::render::render_badges_text;
use infer_playground::runtime::{
    EngineClient, ExpansionPolicy, Playground, PlaygroundConfig, PreferenceStore, ProcessLoader,
    ViewMode, logging, share,
};

mod cli;

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            print_diagnostics(&err);
            1
        }
    };
    process::exit(code);
}

struct Context {
    config: PlaygroundConfig,
    store: Option<PreferenceStore>,
}

impl Context {
    fn new(cli: &Cli) -> Result<Self, PlaygroundError> {
        let mut config = PlaygroundConfig::load(cli.config.as_deref())?;
        let mut store = PreferenceStore::default_path().map(PreferenceStore::open);
        match &cli.engine {
            Some(location) => {
                config.engine = WasmSource::from_location(location);
                if let Some(store) = store.as_mut() {
                    store.set_wasm_source(config.engine.clone());
                }
            }
            None => {
                if config.engine == WasmSource::default()
                    && let Some(stored) = store.as_ref().and_then(PreferenceStore::wasm_source)
                {
                    config.engine = stored.clone();
                }
            }
        }
        if let Some(runtime) = &cli.runtime {
            config.runtime = Some(runtime.clone());
        }
        Ok(Self { config, store })
    }

    fn playground(&self) -> Playground {
        let loader = ProcessLoader::new(self.config.runtime.clone(), self.config.timeout());
        let client = EngineClient::new(self.config.engine.clone(), Box::new(loader));
        let mut playground = Playground::new(Box::new(client), &self.config);
        if let Err(err) = playground.load_catalog() {
            warn!(error = %err, "algorithm catalog unavailable");
        }
        if let Some(store) = &self.store {
            playground.set_history(store.history().to_vec());
        }
        playground
    }

    /// Persist the chosen engine source and the session's history.
    fn save_preferences(&mut self, playground: &Playground) {
        if let Some(store) = self.store.as_mut() {
            store.set_history(playground.history().to_vec());
            if let Err(err) = store.save() {
                warn!(error = %err, "could not save preferences");
            }
        }
    }
}

fn run(cli: Cli) -> Result<i32, PlaygroundError> {
    let mut ctx = Context::new(&cli)?;
    match cli.command {
        Command::Meta { json } => {
            let loader = ProcessLoader::new(ctx.config.runtime.clone(), ctx.config.timeout());
            let client = EngineClient::new(ctx.config.engine.clone(), Box::new(loader));
            let algorithms = client.fetch_catalog()?;
            if json {
                print_json(&algorithms)?;
            } else {
                print_catalog(&RuleCatalog::new(algorithms));
            }
            Ok(0)
        }
        Command::Infer {
            algorithm,
            variant,
            view,
            collapsed,
            json,
            expression,
        } => {
            if collapsed {
                ctx.config.expansion = ExpansionPolicy::CollapseAll;
            }
            let mut playground = ctx.playground();
            let code = run_single(&mut playground, algorithm, variant, view.into(), json, &expression)?;
            ctx.save_preferences(&playground);
            Ok(code)
        }
        Command::Subtype {
            algorithm,
            variant,
            view,
            json,
            query,
        } => {
            SubtypingRequest::parse(algorithm.clone().unwrap_or_default(), None, &query)?;
            let mut playground = ctx.playground();
            let code = run_single(&mut playground, algorithm, variant, view.into(), json, &query)?;
            ctx.save_preferences(&playground);
            Ok(code)
        }
        Command::Compare {
            algorithms,
            expressions,
            json,
        } => {
            let mut playground = ctx.playground();
            playground.set_comparison_algorithms(algorithms);
            playground.set_comparison_expressions(expressions);
            let Some(grid) = playground.comparison() else {
                return Ok(1);
            };
            if json {
                print_json(&grid_json(grid))?;
            } else {
                print!("{}", render_grid(grid));
            }
            Ok(0)
        }
        Command::Share {
            algorithm,
            variant,
            expression,
            algorithms,
            expressions,
        } => {
            let view = if algorithms.is_empty() {
                SharedView::Single(ShareState {
                    algorithm: algorithm.unwrap_or_default(),
                    expression: expression.unwrap_or_default(),
                    variant,
                })
            } else {
                SharedView::Comparison(ComparisonShare {
                    algorithms,
                    expressions,
                })
            };
            println!("{}", share::encode(&ctx.config.share_base, &view));
            Ok(0)
        }
        Command::Open { url, view } => {
            let decoded = share::decode(&url)?;
            let Some(shared) = decoded.view else {
                return Err(PlaygroundError::parsing("link carries no playground state")
                    .with_suggestion("create one with the `share` command"));
            };
            eprintln!("opened {}", decoded.clean_url);
            let mut playground = ctx.playground();
            playground.apply_shared(shared)?;
            playground.set_view(view.into());
            playground.dispatch(Intent::RunInference);
            match playground.comparison() {
                Some(grid) => print!("{}", render_grid(grid)),
                None => print_playground(&playground),
            }
            Ok(0)
        }
        Command::Repl { algorithm } => {
            let mut playground = ctx.playground();
            if let Some(algorithm) = algorithm {
                playground.algorithm_changed(&algorithm)?;
            }
            run_repl(&mut playground);
            ctx.save_preferences(&playground);
            Ok(0)
        }
    }
}

fn run_single(
    playground: &mut Playground,
    algorithm: Option<String>,
    variant: Option<String>,
    view: ViewMode,
    json: bool,
    input: &str,
) -> Result<i32, PlaygroundError> {
    if let Some(algorithm) = algorithm {
        playground.algorithm_changed(&algorithm)?;
    }
    if variant.is_some() {
        playground.variant_changed(variant.as_deref())?;
    }
    playground.set_view(view);
    playground.expression_edited(input, Instant::now());
    let success = playground.run_current().is_some_and(|r| r.success);
    if json {
        if let Some(result) = playground.result() {
            print_json(result)?;
        }
    } else {
        print_playground(playground);
    }
    Ok(if success { 0 } else { 2 })
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), PlaygroundError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| PlaygroundError::runtime(format!("cannot encode output: {err}")))?;
    println!("{text}");
    Ok(())
}

fn print_catalog(catalog: &RuleCatalog) {
    for algorithm in catalog.algorithms() {
        let mode = match algorithm.mode {
            AlgorithmMode::Inference => "inference",
            AlgorithmMode::Subtyping => "subtyping",
        };
        println!("{}  {}  [{mode}]", algorithm.id, algorithm.name);
        if !algorithm.labels.is_empty() {
            println!("    labels: {}", algorithm.labels.join(", "));
        }
        let rules: Vec<&str> = algorithm.all_rules().iter().map(|r| r.id.as_str()).collect();
        if !rules.is_empty() {
            println!("    rules: {}", rules.join(" "));
        }
        for variant in &algorithm.variants {
            let marker = if algorithm.default_variant.as_deref() == Some(variant.id.as_str()) {
                " (default)"
            } else {
                ""
            };
            println!("    variant {}: {}{marker}", variant.id, variant.name);
        }
    }
}

fn print_playground(playground: &Playground) {
    let badges = playground.badges();
    if !badges.is_empty() {
        println!("rules: {}", render_badges_text(&badges));
    }
    print!("{}", playground.render_text());
    if let Some(err) = playground.last_error() {
        print_diagnostics(err);
    }
}

fn print_diagnostics(err: &PlaygroundError) {
    let location = err.location;
    for diag in err.clone().into_diagnostics().diagnostics {
        match location {
            Some(loc) => eprintln!(
                "[{}] {}:{}: {}",
                diag.category, loc.line, loc.column, diag.message
            ),
            None => eprintln!("[{}] {}", diag.category, diag.message),
        }
        for suggestion in &diag.suggestions {
            eprintln!("  hint: {suggestion}");
        }
    }
}

fn cell_summary(result: Option<&AlgorithmResult>, loading: bool) -> String {
    match result {
        _ if loading => "...".to_string(),
        None => "-".to_string(),
        Some(r) if r.success => format!("ok {}", r.final_type.as_deref().unwrap_or("")),
        Some(r) => format!("error {}", r.error.as_deref().unwrap_or("")),
    }
}

fn render_grid(grid: &ComparisonGrid) -> String {
    let mut out = String::new();
    for expression in grid.expressions() {
        out.push_str(expression);
        out.push('\n');
        for algorithm in grid.algorithms() {
            let summary = match grid.cell(algorithm, expression) {
                Some(cell) => cell_summary(cell.result.as_ref(), cell.loading),
                None => cell_summary(None, false),
            };
            out.push_str(&format!("  {algorithm}: {summary}\n"));
        }
    }
    out
}

fn grid_json(grid: &ComparisonGrid) -> serde_json::Value {
    let cells: Vec<serde_json::Value> = grid
        .pairs()
        .into_iter()
        .map(|(algorithm, expression)| {
            let result = grid
                .cell(&algorithm, &expression)
                .and_then(|c| c.result.as_ref());
            serde_json::json!({
                "algorithm": algorithm,
                "expression": expression,
                "result": result,
            })
        })
        .collect();
    serde_json::json!({
        "algorithms": grid.algorithms(),
        "expressions": grid.expressions(),
        "cells": cells,
    })
}

const REPL_HELP: &str = "\
  <expression>      run the expression with the current algorithm
  :rule <id>        toggle highlighting of a rule
  :step <path>      toggle selection of a step, e.g. :step 0.1.2
  :toggle <path>    expand or collapse a step in the tree view
  :view tree|linear switch the derivation view
  :algo <id>        switch algorithm
  :variant <id>     switch variant (:variant none to clear)
  :clear            clear the input and result
  :share            print a link to the current state
  :history          list recent expressions
  :help             show this help
  :quit             leave";

fn run_repl(playground: &mut Playground) {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let algorithm = playground.algorithm().unwrap_or("<none>").to_string();
    let _ = writeln!(
        out,
        "infer-playground {} (algorithm {algorithm}) - :help, :quit",
        env!("CARGO_PKG_VERSION")
    );
    let _ = write!(out, "> ");
    let _ = out.flush();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();
        if trimmed == ":quit" || trimmed == ":q" {
            break;
        }
        if !trimmed.is_empty() {
            repl_line(playground, trimmed, &mut out);
        }
        let _ = write!(out, "> ");
        let _ = out.flush();
    }
}

fn repl_line(playground: &mut Playground, line: &str, out: &mut impl Write) {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };
    let outcome: Result<bool, PlaygroundError> = match command {
        ":help" => {
            let _ = writeln!(out, "{REPL_HELP}");
            Ok(false)
        }
        ":rule" => {
            playground.click_rule(arg);
            Ok(true)
        }
        ":step" => arg.parse::<StepPath>().map(|path| {
            playground.click_step(&path);
            true
        }),
        ":toggle" => arg.parse::<StepPath>().map(|path| {
            playground.toggle_node(&path);
            true
        }),
        ":view" => match arg {
            "tree" => {
                playground.set_view(ViewMode::Tree);
                Ok(true)
            }
            "linear" => {
                playground.set_view(ViewMode::Linear);
                Ok(true)
            }
            other => Err(PlaygroundError::parsing(format!("unknown view '{other}'"))
                .with_suggestion("use :view tree or :view linear")),
        },
        ":algo" => playground.algorithm_changed(arg).map(|()| true),
        ":variant" => {
            let variant = (!arg.is_empty() && arg != "none").then_some(arg);
            playground.variant_changed(variant).map(|()| true)
        }
        ":clear" => {
            playground.dispatch(Intent::ClearInput);
            Ok(true)
        }
        ":share" => {
            if let Effect::ShareLink(link) = playground.dispatch(Intent::Share) {
                let _ = writeln!(out, "{link}");
            }
            Ok(false)
        }
        ":history" => {
            for (i, expression) in playground.history().iter().enumerate() {
                let _ = writeln!(out, "{:>3}  {expression}", i + 1);
            }
            Ok(false)
        }
        c if c.starts_with(':') => Err(PlaygroundError::parsing(format!("unknown command '{c}'"))
            .with_suggestion("type :help for the command list")),
        _ => {
            playground.expression_edited(line, Instant::now());
            playground.dispatch(Intent::RunInference);
            Ok(true)
        }
    };
    match outcome {
        Ok(true) => {
            let badges = playground.badges();
            if !badges.is_empty() {
                let _ = writeln!(out, "rules: {}", render_badges_text(&badges));
            }
            let _ = write!(out, "{}", playground.render_text());
            if let Some(err) = playground.last_error() {
                print_diagnostics(err);
            }
        }
        Ok(false) => {}
        Err(err) => print_diagnostics(&err),
    }
}
