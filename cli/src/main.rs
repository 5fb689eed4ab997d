use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

use blocks::Env;
use mintty::dom::{Element, Event};
use mintty::mount::prepare_document;
use mintty::{DataTree, FormatRegistry, ItemPath, SaveLog, Selection, Selector, render_document};

#[derive(Parser)]
#[command(name = "mintty", version, about = "Render, check and mount typed block data")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log selection and save events to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a data tree to static html
    Render(RenderArgs),

    /// Check a fixture against the schemas of the blocks it resolves to
    Check(CheckArgs),

    /// Print a data tree with the block picked for every node
    Tree(SourceArgs),

    /// Mount a data tree for editing, replay edits, and print the saves
    Mount(MountArgs),
}

#[derive(clap::Args)]
struct SourceArgs {
    /// TOML fixture file
    #[arg(required_unless_present = "demo", conflicts_with = "demo")]
    file: Option<PathBuf>,

    /// Use the built-in demo page instead of a file
    #[arg(long)]
    demo: bool,
}

#[derive(clap::Args)]
struct RenderArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Emit a complete html document
    #[arg(long)]
    page: bool,

    /// Prepend the root block's css in a <style> element
    #[arg(long)]
    css: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// TOML fixture file
    file: PathBuf,
}

#[derive(clap::Args)]
struct MountArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Simulate a user edit: ID=HTML, where ID is an item id or `/` for the root.
    /// Repeatable; applied in order.
    #[arg(short, long, value_parser = parse_edit)]
    edit: Vec<(String, String)>,
}

fn parse_edit(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(id, html)| (id.to_string(), html.to_string()))
        .ok_or_else(|| format!("expected ID=HTML, got `{}`", s))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    });

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let code = match cli.command {
        Command::Render(args) => do_render(args, color_choice),
        Command::Check(args) => do_check(args, color_choice),
        Command::Tree(args) => do_tree(args, color_choice),
        Command::Mount(args) => do_mount(args, color_choice),
    };
    process::exit(code);
}

fn init_tracing(default_level: LevelFilter) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(env_filter);
    // Only fails if a global subscriber is already set.
    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// A loaded tree, with its source registered for diagnostics.
struct Loaded {
    data: DataTree,
    files: SimpleFiles<String, String>,
    source: Option<(usize, String)>,
    env: Env,
}

fn load(args: &SourceArgs, color_choice: ColorChoice) -> Result<Loaded, i32> {
    let mut files = SimpleFiles::new();
    let env = Env::system();

    let Some(path) = args.file.as_ref().filter(|_| !args.demo) else {
        return Ok(Loaded {
            data: blocks::demo_page(env.now()),
            files,
            source: None,
            env,
        });
    };

    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            return Err(1);
        }
    };
    let file_id = files.add(path.display().to_string(), source.clone());

    match blocks::parse_fixture(&source, &FormatRegistry::standard()) {
        Ok(data) => Ok(Loaded {
            data,
            files,
            source: Some((file_id, source)),
            env,
        }),
        Err(error) => {
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            let diagnostic = error.to_diagnostic(file_id);
            let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            Err(1)
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn do_render(args: RenderArgs, color_choice: ColorChoice) -> i32 {
    let loaded = match load(&args.source, color_choice) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let selector = blocks::standard_selector(&loaded.env);
    let markup = render_document(&selector, &loaded.data);

    if args.page {
        println!(
            "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>",
            markup.css(),
            markup.html
        );
    } else if args.css {
        println!("<style>{}</style>\n{}", markup.css(), markup.html);
    } else {
        println!("{}", markup.html);
    }
    0
}

fn do_check(args: CheckArgs, color_choice: ColorChoice) -> i32 {
    let source_args = SourceArgs {
        file: Some(args.file.clone()),
        demo: false,
    };
    let loaded = match load(&source_args, color_choice) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let selector = blocks::standard_selector(&loaded.env);
    let report = selector.validate(&loaded.data);

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let label = |path: &ItemPath, message: String| -> Vec<Label<usize>> {
        loaded
            .source
            .as_ref()
            .and_then(|(file_id, source)| {
                blocks::locate(source, path).map(|span| Label::primary(*file_id, span))
            })
            .map(|l| vec![l.with_message(message)])
            .unwrap_or_default()
    };

    for error in &report.errors {
        let diagnostic = Diagnostic::error()
            .with_message(error.kind.to_string())
            .with_labels(label(&error.path, format!("checked as `{}`", error.schema)))
            .with_notes(vec![format!("at {}", error.path)]);
        let _ =
            term::emit_to_write_style(&mut writer.lock(), &config, &loaded.files, &diagnostic);
    }
    for (path, unclassified) in &report.unclassified {
        let diagnostic = Diagnostic::warning()
            .with_message(unclassified.to_string())
            .with_labels(label(path, "no block matches this data".to_string()))
            .with_notes(vec![
                format!("at {}", path),
                format!("would render with the fallback `{}`", selector.fallback().name()),
            ]);
        let _ =
            term::emit_to_write_style(&mut writer.lock(), &config, &loaded.files, &diagnostic);
    }

    if !report.errors.is_empty() {
        return 1;
    }
    eprintln!("ok: {} matches its block schemas", args.file.display());
    0
}

fn do_tree(args: SourceArgs, color_choice: ColorChoice) -> i32 {
    let loaded = match load(&args, color_choice) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let selector = blocks::standard_selector(&loaded.env);
    print_node(&selector, &loaded.data, "/", &ItemPath::root(), 0);
    0
}

fn print_node(selector: &Selector, data: &DataTree, label: &str, path: &ItemPath, depth: usize) {
    let pad = "  ".repeat(depth);
    let (ui, via) = match selector.classify(data) {
        Ok(picked) => (picked.ui.name(), picked.via),
        Err(_) => (selector.fallback().name(), Selection::Fallback),
    };
    let via = match via {
        Selection::Tagged => "tagged",
        Selection::Probed => "probed",
        Selection::Fallback => "fallback",
    };
    println!("{}{} {} ({})", pad, label, ui, via);
    for (field, formats) in &data.values {
        for (format, value) in formats {
            println!("{}  .{} [{}] = {}", pad, field, format, preview(&value.to_string()));
        }
    }
    for (slot, items) in &data.slots {
        for item in items {
            let standoff: Vec<String> = item
                .standoff
                .iter()
                .flat_map(|(field, formats)| {
                    formats
                        .values()
                        .map(move |value| format!("{}={}", field, preview(&value.to_string())))
                })
                .collect();
            let label = format!("{}/{} {{{}}}", slot, item.id, standoff.join(", "));
            print_node(selector, &item.item, &label, &path.child(slot, &item.id), depth + 1);
        }
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 60;
    if text.chars().count() <= MAX {
        return format!("{:?}", text);
    }
    let cut: String = text.chars().take(MAX).collect();
    format!("{:?}...", cut)
}

fn do_mount(args: MountArgs, color_choice: ColorChoice) -> i32 {
    let loaded = match load(&args.source, color_choice) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let selector = blocks::standard_selector(&loaded.env);
    let log = SaveLog::new();
    let editor = prepare_document(&selector, &loaded.data, log.saver());

    let root = Element::new("div");
    root.set_attr("id", "mintty-root");
    let mut handle = match editor.mount(&root) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("mount error: {}", e);
            return 1;
        }
    };

    let mut code = 0;
    for (id, html) in &args.edit {
        let target = if id == "/" {
            Some(root.clone())
        } else {
            root.find_by_attr("data-miid", id)
        };
        let Some(surface) =
            target.and_then(|t| t.find(&|e| e.attr("contenteditable").is_some()))
        else {
            eprintln!("error: no editable block with id `{}`", id);
            code = 1;
            continue;
        };
        tracing::debug!(%id, "simulating edit");
        surface.dispatch(&Event::input(html));
    }

    for event in log.events() {
        println!("{}", event);
    }
    println!("{}", root.outer_html());

    if let Err(e) = handle.destroy() {
        eprintln!("teardown error: {}", e);
        code = 1;
    }
    if root.has_children() {
        eprintln!("error: root still has content after destroy: {}", root.inner_html());
        code = 1;
    }
    code
}
