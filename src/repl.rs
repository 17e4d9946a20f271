use anyhow::Result;
use blueprint_common::{Component, ComponentRef};
use blueprint_pipeline::Studio;
use blueprint_services::ImagePayload;
use blueprint_view::{render_page, View, ViewMode};
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  pages                          list page slots
  upload <page> <image-path>     convert a sketch into the page's blueprint
  edit <page> <command...>       apply a natural-language edit
  generate <page>                generate code from the blueprint
  undo <page>                    restore the previous blueprint
  select <page> <path|none>      select a component, e.g. 0.1
  zoom <page> <factor|reset>     set the preview zoom, or reset zoom and pan
  show <page> [mode]             auto | preview | json | properties | code
  files <page> [name]            list generated files or print one
  help
  quit";

#[derive(Debug, PartialEq)]
enum ReplCommand {
    Pages,
    Upload { page: String, path: String },
    Edit { page: String, command: String },
    Generate { page: String },
    Undo { page: String },
    Select { page: String, target: Option<ComponentRef> },
    Zoom { page: String, factor: f64 },
    ResetView { page: String },
    Show { page: String, mode: ViewMode },
    Files { page: String, name: Option<String> },
    Help,
    Quit,
}

fn parse(line: &str) -> std::result::Result<ReplCommand, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or_else(|| "empty input".to_string())?;
    let mut page = || {
        words
            .next()
            .map(str::to_string)
            .ok_or_else(|| format!("usage: {} <page> ...", verb))
    };

    let command = match verb {
        "pages" => ReplCommand::Pages,
        "upload" => {
            let page = page()?;
            let path = words.next().ok_or("usage: upload <page> <image-path>")?.to_string();
            ReplCommand::Upload { page, path }
        }
        "edit" => {
            let page = page()?;
            // Blank commands are passed through; the pipeline reports them.
            let command = words.collect::<Vec<_>>().join(" ");
            ReplCommand::Edit { page, command }
        }
        "generate" => ReplCommand::Generate { page: page()? },
        "undo" => ReplCommand::Undo { page: page()? },
        "select" => {
            let page = page()?;
            let target = match words.next().ok_or("usage: select <page> <path|none>")? {
                "none" => None,
                path => Some(path.parse::<ComponentRef>().map_err(|e| e.to_string())?),
            };
            ReplCommand::Select { page, target }
        }
        "zoom" => {
            let page = page()?;
            match words.next() {
                Some("reset") => ReplCommand::ResetView { page },
                factor => {
                    let factor = factor
                        .and_then(|f| f.parse::<f64>().ok())
                        .ok_or("usage: zoom <page> <factor|reset>")?;
                    ReplCommand::Zoom { page, factor }
                }
            }
        }
        "show" => {
            let page = page()?;
            let mode = words
                .next()
                .unwrap_or("auto")
                .parse::<ViewMode>()
                .map_err(|e| e.to_string())?;
            ReplCommand::Show { page, mode }
        }
        "files" => {
            let page = page()?;
            ReplCommand::Files {
                page,
                name: words.next().map(str::to_string),
            }
        }
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(command)
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(studio: &Studio) -> Result<()> {
    println!("{}", "blueprint studio".bold().cyan());
    println!("{}", HELP.dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".cyan());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse(&line) {
            Ok(ReplCommand::Quit) => break,
            Ok(command) => {
                if let Err(e) = execute(studio, command).await {
                    println!("{} {}", "error:".red().bold(), e);
                    if e.is_retryable() {
                        println!("{}", "the service could not be reached; the same command can be retried".dimmed());
                    }
                }
            }
            Err(usage) => println!("{}", usage.yellow()),
        }
    }

    Ok(())
}

async fn execute(studio: &Studio, command: ReplCommand) -> blueprint_common::Result<()> {
    let store = studio.store();
    match command {
        ReplCommand::Pages => {
            for page in store.list_pages() {
                let name = page.name.unwrap_or_else(|| "(empty)".to_string());
                println!("  {}  {}", page.id.bold(), name.dimmed());
            }
        }
        ReplCommand::Upload { page, path } => {
            let image = ImagePayload::from_path(&path).await?;
            let blueprint = studio.upload(&page, &image).await?;
            println!(
                "{} '{}' with {} components",
                "loaded".green(),
                blueprint.name,
                blueprint.component_count()
            );
        }
        ReplCommand::Edit { page, command } => {
            let outcome = studio.edit(&page, &command).await?;
            println!(
                "{} {} {}",
                "edited".green(),
                outcome.summary,
                format!("(history {})", outcome.history_len).dimmed()
            );
        }
        ReplCommand::Generate { page } => {
            let files = studio.generate(&page).await?;
            println!("{} {}", "generated".green(), files.file_names().join(", "));
        }
        ReplCommand::Undo { page } => {
            let restored = studio.undo(&page)?;
            println!("{} '{}'", "restored".green(), restored.name);
        }
        ReplCommand::Select { page, target } => {
            store.select(&page, target)?;
            println!("{}", render_view(&render_page(store, &page, ViewMode::Properties)?));
        }
        ReplCommand::Zoom { page, factor } => {
            let ui = store.set_zoom(&page, factor)?;
            println!("zoom {:.2}", ui.zoom);
        }
        ReplCommand::ResetView { page } => {
            let ui = store.reset_viewport(&page)?;
            println!("zoom {:.2} pan {},{}", ui.zoom, ui.pan.x, ui.pan.y);
        }
        ReplCommand::Show { page, mode } => {
            println!("{}", render_view(&render_page(store, &page, mode)?));
        }
        ReplCommand::Files { page, name } => {
            let generated = store.get(&page)?.generated;
            match (generated, name) {
                (None, _) => println!("{}", "no generated files yet".dimmed()),
                (Some(files), None) => {
                    for (name, source) in files.iter() {
                        println!("  {}  {}", name.bold(), format!("{} bytes", source.len()).dimmed());
                    }
                }
                (Some(files), Some(name)) => match files.get(&name) {
                    Some(source) => println!("{}", source),
                    None => println!("{} no file named '{}'", "error:".red().bold(), name),
                },
            }
        }
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn render_view(view: &View) -> String {
    match view {
        View::EmptyState => "Upload a sketch to get started.".to_string(),
        View::BlueprintPreview {
            name,
            tokens,
            components,
        } => {
            let mut out = format!("{}\n", name.bold());
            if let Some(color) = &tokens.primary_color {
                out.push_str(&format!("  primary {}\n", color));
            }
            if let Some(color) = &tokens.accent_color {
                out.push_str(&format!("  accent  {}\n", color));
            }
            if let Some(spacing) = tokens.spacing {
                out.push_str(&format!("  spacing {}\n", spacing));
            }
            if let Some(radius) = tokens.radius {
                out.push_str(&format!("  radius  {}\n", radius));
            }
            render_tree(&mut out, components, &ComponentRef::default(), 1);
            out.trim_end().to_string()
        }
        View::RawJson { blueprint } => blueprint
            .to_pretty_json()
            .unwrap_or_else(|e| format!("<unprintable: {}>", e)),
        View::Properties { selection, component } => match (selection, component) {
            (Some(at), Some(component)) => {
                let mut out = format!("{} {}\n", at.to_string().bold(), component.kind);
                if let Some(text) = &component.text {
                    out.push_str(&format!("  text   {}\n", text));
                }
                match &component.bbox {
                    Some(b) => out.push_str(&format!(
                        "  bbox   x={} y={} w={} h={}\n",
                        b.x, b.y, b.width, b.height
                    )),
                    None => out.push_str("  bbox   (none)\n"),
                }
                for (key, value) in &component.extra {
                    out.push_str(&format!("  {}  {}\n", key, value));
                }
                out.trim_end().to_string()
            }
            _ => "Nothing selected.".to_string(),
        },
        View::GeneratedSummary { file_names } => {
            format!("{} file(s): {}", file_names.len(), file_names.join(", "))
        }
    }
}

fn render_tree(out: &mut String, nodes: &[Component], prefix: &ComponentRef, depth: usize) {
    for (index, node) in nodes.iter().enumerate() {
        let at = prefix.child(index);
        let label = node.text.as_deref().map(|t| format!(" \"{}\"", t)).unwrap_or_default();
        let geometry = node
            .bbox
            .map(|b| format!(" [{}x{} @ {},{}]", b.width, b.height, b.x, b.y))
            .unwrap_or_default();
        out.push_str(&format!("{}{} {}{}{}\n", "  ".repeat(depth), at, node.kind, label, geometry));
        render_tree(out, &node.children, &at, depth + 1);
    }
}
