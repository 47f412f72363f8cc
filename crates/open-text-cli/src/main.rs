use anyhow::{Context, Result, anyhow, bail};
use open_text_config::Config;
use open_text_engine::{
    Alignment, Boundary, EditableDocument, EditingHost, EditorSession, FormatCommand, GridLayout,
    NodeId, SessionOptions, TableAction, TextRange,
};
use std::collections::HashSet;
use std::str::FromStr;
use std::{env, fs, path::PathBuf, process};

/// Host for running the engine without a browser. Toggle commands flip a
/// flag so toolbar state can be inspected; nothing else touches the tree.
#[derive(Debug, Default)]
struct HeadlessHost {
    toggled: HashSet<FormatCommand>,
}

impl EditingHost for HeadlessHost {
    fn exec_command(
        &mut self,
        _doc: &mut EditableDocument,
        command: &FormatCommand,
        value: Option<&str>,
    ) -> bool {
        log::info!("exec {command} {value:?}");
        if value.is_none() && !self.toggled.remove(command) {
            self.toggled.insert(command.clone());
        }
        true
    }

    fn query_command_state(&self, command: &FormatCommand) -> bool {
        self.toggled.contains(command)
    }

    fn query_command_value(&self, _command: &FormatCommand) -> Option<String> {
        None
    }

    fn restore_selection(&mut self, range: &TextRange) {
        log::debug!("restore selection {range:?}");
    }

    fn focus(&mut self) {}
}

type Session = EditorSession<HeadlessHost, GridLayout>;

/// One scripted user interaction.
#[derive(Debug, Clone, PartialEq)]
enum Step {
    Click(Vec<usize>),
    ContextMenu(Vec<usize>),
    Caret(Vec<usize>, usize),
    Table(TableAction),
    Align(Alignment),
    ResizeNode(f64),
    ResizeColumn(usize, f64),
    InsertTable(usize, usize),
    InsertImage(String),
    Exec(FormatCommand, Option<String>),
    Delete,
    Tab,
    Escape,
}

fn parse_path(path: &str) -> Result<Vec<usize>> {
    if path.is_empty() {
        bail!("empty node path");
    }
    path.split('.')
        .map(|part| {
            part.parse::<usize>()
                .with_context(|| format!("bad path segment `{part}` in `{path}`"))
        })
        .collect()
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = s.split_once(':').unwrap_or((s, ""));
        let step = match name {
            "click" => Step::Click(parse_path(arg)?),
            "menu" => Step::ContextMenu(parse_path(arg)?),
            "caret" => {
                let (path, offset) = arg
                    .rsplit_once(':')
                    .ok_or_else(|| anyhow!("caret needs <path>:<offset>"))?;
                Step::Caret(parse_path(path)?, offset.parse()?)
            }
            "action" => Step::Table(arg.parse()?),
            "align" => Step::Align(arg.parse()?),
            "resize" => Step::ResizeNode(arg.parse().context("resize needs a pixel delta")?),
            "colresize" => {
                let (index, delta) = arg
                    .split_once(':')
                    .ok_or_else(|| anyhow!("colresize needs <index>:<delta>"))?;
                Step::ResizeColumn(index.parse()?, delta.parse()?)
            }
            "table" => {
                let (rows, cols) = arg
                    .split_once('x')
                    .ok_or_else(|| anyhow!("table needs <rows>x<cols>"))?;
                Step::InsertTable(rows.parse()?, cols.parse()?)
            }
            "image" if !arg.is_empty() => Step::InsertImage(arg.to_string()),
            "exec" => {
                let (command, value) = match arg.split_once('=') {
                    Some((command, value)) => (command, Some(value.to_string())),
                    None => (arg, None),
                };
                Step::Exec(command.parse()?, value)
            }
            "delete" => Step::Delete,
            "tab" => Step::Tab,
            "escape" => Step::Escape,
            _ => bail!("unknown step `{s}`"),
        };
        Ok(step)
    }
}

fn node(session: &Session, path: &[usize]) -> Result<NodeId> {
    session
        .document()
        .node_at_path(path)
        .ok_or_else(|| anyhow!("no node at {path:?}"))
}

fn run_step(session: &mut Session, step: &Step) -> Result<()> {
    match step {
        Step::Click(path) => session.handle_click(node(session, path)?),
        Step::ContextMenu(path) => {
            let disposition = session.handle_context_menu(node(session, path)?);
            log::info!("context menu: {disposition:?}");
            session.run_deferred();
        }
        Step::Caret(path, offset) => {
            let id = node(session, path)?;
            let boundary = Boundary {
                node: session
                    .document()
                    .node_ref(id)
                    .ok_or_else(|| anyhow!("no node at {path:?}"))?,
                offset: *offset,
            };
            session.handle_selection_change(TextRange::collapsed(boundary));
        }
        Step::Table(action) => {
            let outcome = session.table_action(*action);
            log::info!("{action}: {outcome:?}");
        }
        Step::Align(alignment) => {
            if !session.align_selected(*alignment) {
                log::warn!("nothing selected to align");
            }
            session.run_deferred();
        }
        Step::ResizeNode(delta) => {
            if !session.start_node_resize(0.0) {
                bail!("no image or table selected to resize");
            }
            session.handle_pointer_move(*delta);
            session.handle_pointer_up();
        }
        Step::ResizeColumn(index, delta) => {
            let handle = session
                .column_handles()
                .get(*index)
                .cloned()
                .ok_or_else(|| anyhow!("no column handle {index}"))?;
            if !session.start_column_resize(handle.cell, handle.left) {
                bail!("column {index} could not be resized");
            }
            session.handle_pointer_move(handle.left + delta);
            session.handle_pointer_up();
        }
        Step::InsertTable(rows, cols) => session.insert_table(*rows, *cols),
        Step::InsertImage(src) => session.insert_image(src),
        Step::Exec(command, value) => {
            session.exec_command(command.clone(), value.as_deref());
        }
        Step::Delete => {
            if !session.delete_selected() {
                log::warn!("nothing selected to delete");
            }
        }
        Step::Tab => session.handle_tab_key(),
        Step::Escape => {
            session.handle_escape();
        }
    }
    log::debug!("after {step:?}: {:?}", session.selection_state());
    Ok(())
}

fn session_options(config: &Config) -> SessionOptions {
    SessionOptions {
        node_min_width: config.resize.node_min_width,
        column_min_width: config.resize.column_min_width,
        default_table_rows: config.table.default_rows,
        default_table_cols: config.table.default_cols,
        cell_style: config.table.cell_style.clone(),
        placeholder: config.placeholder.clone(),
    }
}

fn print_summary(session: &Session) {
    match session.overlay() {
        Some(o) => println!(
            "overlay: top={} left={} width={} height={}",
            o.top, o.left, o.width, o.height
        ),
        None => println!("overlay: none"),
    }
    for (i, h) in session.column_handles().iter().enumerate() {
        println!("handle {i}: left={} top={} height={}", h.left, h.top, h.height);
    }
}

struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    steps: Vec<Step>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} <file.html> [--config <path>] [--output <path>] [step...]\n\
         Steps: click:<path> menu:<path> caret:<path>:<offset> action:<table-action>\n\
         \x20      align:<left|center|right|inline> resize:<dx> colresize:<index>:<dx>\n\
         \x20      table:<rows>x<cols> image:<src> exec:<command>[=<value>] delete tab escape\n\
         Paths are dot-separated child indexes from the editable root, e.g. 1.0.2.0"
    )
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut input = None;
    let mut config = None;
    let mut output = None;
    let mut steps = Vec::new();

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(
                    iter.next().ok_or_else(|| anyhow!("--config needs a path"))?,
                ));
            }
            "--output" => {
                output = Some(PathBuf::from(
                    iter.next().ok_or_else(|| anyhow!("--output needs a path"))?,
                ));
            }
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            _ => steps.push(arg.parse().with_context(|| format!("in step `{arg}`"))?),
        }
    }

    Ok(Args {
        input: input.ok_or_else(|| anyhow!("missing input file"))?,
        config,
        output,
        steps,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("open-text-cli", String::as_str);
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!("{}", usage(program));
            process::exit(1);
        }
    };

    let config_path = args.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load_from_path(&config_path) {
        Ok(Some(config)) => {
            log::info!("Loaded config from {}", config_path.display());
            config
        }
        Ok(None) => {
            log::info!("No config at {}, using defaults", config_path.display());
            Config::default()
        }
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let markup = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let mut session = EditorSession::new(
        HeadlessHost::default(),
        GridLayout::default(),
        session_options(&config),
    );
    session.set_markup(markup.trim());

    for step in &args.steps {
        run_step(&mut session, step).with_context(|| format!("running {step:?}"))?;
    }

    let result = session.markup();
    match &args.output {
        Some(path) => {
            fs::write(path, &result).with_context(|| format!("writing {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{result}"),
    }
    print_summary(&session);
    Ok(())
}
