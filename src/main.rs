use std::io;
use std::panic;
use std::path::PathBuf;
use std::process;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tablekit::column::{Column, ColumnType};
use tablekit::config::AppConfig;
use tablekit::fileio;
use tablekit::query::{self, SortDirection};
use tablekit::record::{IdGenerator, RecordId};
use tablekit::render;
use tablekit::state::TableState;

/// One table operation requested on the command line, applied in order
#[derive(Debug)]
enum Op {
    Search(String),
    /// No direction means a header click on the column
    Sort(String, Option<SortDirection>),
    Page(usize),
    Hide(String),
    Show(String),
    AddColumn(String, ColumnType),
    ToggleTheme,
    Delete(String),
}

#[derive(Debug, Default)]
struct Args {
    file: Option<PathBuf>,
    config: Option<PathBuf>,
    page_size: Option<usize>,
    no_persist: bool,
    export_dir: Option<PathBuf>,
    ops: Vec<Op>,
}

fn fail(msg: &str) -> ! {
    eprintln!("Error: {}", msg);
    process::exit(1);
}

/// Next argument value for `flag`, or exit
fn value_for(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(v) => v.clone(),
        None => fail(&format!("{} requires an argument", flag)),
    }
}

/// `COL` or `COL:asc|desc`
fn parse_sort(s: &str) -> (String, Option<SortDirection>) {
    match s.rsplit_once(':') {
        Some((col, dir)) => match dir.parse() {
            Ok(d) => (col.to_string(), Some(d)),
            Err(e) => fail(&e),
        },
        None => (s.to_string(), None),
    }
}

/// `LABEL` or `LABEL:type`
fn parse_new_column(s: &str) -> (String, ColumnType) {
    match s.rsplit_once(':') {
        Some((label, kind)) => match kind.parse() {
            Ok(k) => (label.to_string(), k),
            Err(e) => fail(&e),
        },
        None => (s.to_string(), ColumnType::Text),
    }
}

fn parse_count(s: &str, flag: &str) -> usize {
    s.parse()
        .unwrap_or_else(|_| fail(&format!("{} expects a non-negative number, got '{}'", flag, s)))
}

/// Parse command line arguments
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            "--no-persist" => {
                parsed.no_persist = true;
                i += 1;
            }
            "--toggle-theme" => {
                parsed.ops.push(Op::ToggleTheme);
                i += 1;
            }
            "--config" => {
                parsed.config = Some(PathBuf::from(value_for(&args, i, flag)));
                i += 2;
            }
            "--page-size" => {
                let n = parse_count(&value_for(&args, i, flag), flag);
                if n == 0 {
                    fail("--page-size must be at least 1");
                }
                parsed.page_size = Some(n);
                i += 2;
            }
            "--export" => {
                parsed.export_dir = Some(PathBuf::from(value_for(&args, i, flag)));
                i += 2;
            }
            "-s" | "--search" => {
                parsed.ops.push(Op::Search(value_for(&args, i, flag)));
                i += 2;
            }
            "--sort" => {
                let (col, dir) = parse_sort(&value_for(&args, i, flag));
                parsed.ops.push(Op::Sort(col, dir));
                i += 2;
            }
            "-p" | "--page" => {
                let n = parse_count(&value_for(&args, i, flag), flag);
                // pages are 1-based on the command line
                parsed.ops.push(Op::Page(n.saturating_sub(1)));
                i += 2;
            }
            "--hide" => {
                parsed.ops.push(Op::Hide(value_for(&args, i, flag)));
                i += 2;
            }
            "--show" => {
                parsed.ops.push(Op::Show(value_for(&args, i, flag)));
                i += 2;
            }
            "--add-column" => {
                let (label, kind) = parse_new_column(&value_for(&args, i, flag));
                parsed.ops.push(Op::AddColumn(label, kind));
                i += 2;
            }
            "--delete" => {
                parsed.ops.push(Op::Delete(value_for(&args, i, flag)));
                i += 2;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                process::exit(1);
            }
            _ => {
                parsed.file = Some(PathBuf::from(&args[i]));
                i += 1;
            }
        }
    }

    parsed
}

/// Log panics before the default hook prints them
fn install_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        if let Some(location) = info.location() {
            error!(
                file = location.file(),
                line = location.line(),
                "panic occurred"
            );
        } else {
            error!("panic occurred");
        }

        if let Some(s) = info.payload().downcast_ref::<&str>() {
            error!(message = %s);
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            error!(message = %s);
        }

        default_hook(info);
    }));
}

fn print_help() {
    eprintln!("tablekit - Search, sort, page and edit tabular records from the terminal");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    tablekit [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("FILE is a CSV with a header row (name, email, age, role, ...).");
    eprintln!("Without it the session starts from sample data.");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -s, --search <TERM>           Show only rows containing TERM");
    eprintln!("    --sort <COL[:asc|desc]>       Sort by a column; repeating COL without a");
    eprintln!("                                  direction flips it, like a header click");
    eprintln!("    -p, --page <N>                Show page N (1-based)");
    eprintln!("    --hide <COL>                  Hide a column");
    eprintln!("    --show <COL>                  Show a hidden column");
    eprintln!("    --add-column <LABEL[:type]>   Add a column (text, number, email)");
    eprintln!("    --toggle-theme                Switch between light and dark");
    eprintln!("    --delete <ID>                 Delete the row with ID");
    eprintln!("    --export <DIR>                Write visible columns of matching rows to DIR");
    eprintln!("    --page-size <N>               Rows per page");
    eprintln!("    --config <PATH>               Load settings from a TOML file");
    eprintln!("    --no-persist                  Do not load or save column/theme preferences");
    eprintln!("    -h, --help                    Print this help message");
    eprintln!();
    eprintln!("Log level is read from RUST_LOG (default: info).");
}

fn apply(state: &mut TableState, op: Op) {
    match op {
        Op::Search(term) => state.set_search_term(&term),
        Op::Sort(col, dir) => {
            let dir = dir.unwrap_or_else(|| state.sort_order().next_for(state.sort_by(), &col));
            state.set_sorting(&col, dir);
        }
        Op::Page(n) => state.set_current_page(n),
        Op::Hide(col) => state.update_column_visibility(&col, false),
        Op::Show(col) => state.update_column_visibility(&col, true),
        Op::AddColumn(label, kind) => {
            let id = state.unique_column_id(&label);
            state.add_column(Column::new(id, label, kind));
        }
        Op::ToggleTheme => state.toggle_theme(),
        Op::Delete(id) => state.delete_row(&RecordId::new(id)),
    }
}

/// Filtered, sorted rows (all pages) restricted to visible columns
fn export(state: &TableState, dir: &std::path::Path) -> io::Result<PathBuf> {
    let filtered = query::filter(state.data(), state.search_term());
    let rows = query::sort(filtered, state.sort_by(), state.sort_order());
    fileio::write_export_file(
        dir,
        rows,
        state.visible_columns(),
        fileio::export_date(),
    )
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!("tablekit started");

    install_panic_hook();

    let args = parse_args();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path).unwrap_or_else(|e| {
            error!(error = %e, "Failed to load config");
            fail(&e.to_string())
        }),
        None => AppConfig::new(),
    };
    if let Some(n) = args.page_size {
        config.page_size = n;
    }
    if args.no_persist {
        config.persist_preferences = false;
    }

    let mut state = TableState::from_config(&config);

    if let Some(path) = &args.file {
        let mut ids = IdGenerator::new("imported");
        let outcome = fileio::import_file(path, &mut ids).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to read file");
            e
        })?;

        for err in &outcome.errors {
            eprintln!("{}", err);
        }
        if !outcome.is_clean() {
            warn!(errors = outcome.errors.len(), "Import finished with errors");
        }
        eprintln!(
            "Imported {} rows ({} errors)",
            outcome.records.len(),
            outcome.errors.len()
        );
        state.replace_data(outcome.records);
    }

    for op in args.ops {
        apply(&mut state, op);
    }

    if let Some(dir) = &args.export_dir {
        let path = export(&state, dir).map_err(|e| {
            error!(dir = %dir.display(), error = %e, "Export failed");
            e
        })?;
        eprintln!("Exported to {}", path.display());
    }

    print!("{}", render::render_table(&state));
    println!("{}", render::render_status(&state));

    Ok(())
}
