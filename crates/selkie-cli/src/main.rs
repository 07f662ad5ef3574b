use chrono::NaiveDate;
use selkie_core::flowchart::{self, ArrowKind, NodeShape};
use selkie_core::{detect_dialect, gantt, Dialect};
use serde::Serialize;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Engine(selkie_core::Error),
    Json(serde_json::Error),
    BadDate(String),
    BadNumber(String),
    UnknownOp(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Engine(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::BadDate(s) => write!(f, "Invalid date (expected YYYY-MM-DD): {s}"),
            CliError::BadNumber(s) => write!(f, "Invalid number: {s}"),
            CliError::UnknownOp(s) => write!(f, "Unknown mutate op: {s}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<selkie_core::Error> for CliError {
    fn from(value: selkie_core::Error) -> Self {
        Self::Engine(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Default)]
enum Command {
    #[default]
    Parse,
    Detect,
    Schedule,
    Mutate {
        op: String,
        args: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
}

fn usage() -> &'static str {
    "selkie\n\
\n\
USAGE:\n\
  selkie [parse] [--pretty] [<path>|-]\n\
  selkie detect [<path>|-]\n\
  selkie schedule [--pretty] [<path>|-]\n\
  selkie mutate <op> <args...> [<path>|-]\n\
\n\
MUTATE OPS:\n\
  add-node <id> <label>          remove-node <id>\n\
  add-edge <source> <target>     remove-edge <source> <target>\n\
  rename-node <id> <label>       set-shape <id> <shape>\n\
  move-into <id> <subgraph>      move-out <id>\n\
  shift-task <key> <days>        set-start <key> <YYYY-MM-DD>\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - parse prints the dialect-neutral JSON model; schedule prints the Gantt\n\
    dependency/critical-path report.\n\
  - mutate writes the rewritten diagram text to stdout; unknown targets\n\
    leave the text unchanged.\n\
"
}

fn op_arity(op: &str) -> Option<usize> {
    match op {
        "remove-node" | "move-out" => Some(1),
        "add-node" | "add-edge" | "remove-edge" | "rename-node" | "set-shape" | "move-into"
        | "shift-task" | "set-start" => Some(2),
        _ => None,
    }
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1).peekable();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "parse" => args.command = Command::Parse,
            "detect" => args.command = Command::Detect,
            "schedule" => args.command = Command::Schedule,
            "mutate" => {
                let Some(op) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let Some(arity) = op_arity(op) else {
                    return Err(CliError::UnknownOp(op.clone()));
                };
                let mut op_args = Vec::with_capacity(arity);
                for _ in 0..arity {
                    let Some(value) = it.next() else {
                        return Err(CliError::Usage(usage()));
                    };
                    op_args.push(value.clone());
                }
                args.command = Command::Mutate {
                    op: op.clone(),
                    args: op_args,
                };
            }
            "--pretty" => args.pretty = true,
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()))
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn mutate(text: &str, op: &str, args: &[String]) -> Result<String, CliError> {
    let dialect = detect_dialect(text);
    Ok(match op {
        "add-node" => dialect.add_node(text, &args[0], &args[1]),
        "remove-node" => dialect.remove_node(text, &args[0]),
        "add-edge" => dialect.add_edge(text, &args[0], &args[1], None),
        "remove-edge" => dialect.remove_edge(text, &args[0], &args[1]),
        "rename-node" => match dialect {
            Dialect::Flowchart => flowchart::mutate::update_node_label(text, &args[0], &args[1]),
            _ => text.to_string(),
        },
        "set-shape" => match dialect {
            Dialect::Flowchart => {
                let shape = flowchart::lexical::shape_from_name(&args[1]);
                flowchart::mutate::update_node_shape(text, &args[0], &shape)
            }
            _ => text.to_string(),
        },
        "move-into" => match dialect {
            Dialect::Flowchart => {
                flowchart::mutate::move_node_to_subgraph(text, &args[0], &args[1])
            }
            _ => text.to_string(),
        },
        "move-out" => match dialect {
            Dialect::Flowchart => flowchart::mutate::move_node_out_of_subgraph(text, &args[0]),
            _ => text.to_string(),
        },
        "shift-task" => {
            let days: i64 = args[1]
                .parse()
                .map_err(|_| CliError::BadNumber(args[1].clone()))?;
            gantt::shift_task(text, &args[0], days)
        }
        "set-start" => gantt::set_task_start(text, &args[0], parse_date(&args[1])?),
        other => return Err(CliError::UnknownOp(other.to_string())),
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CliError::BadDate(s.to_string()))
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    match args.command {
        Command::Detect => {
            println!("{}", detect_dialect(&text).name());
        }
        Command::Parse => {
            let parsed = selkie_core::parse(&text);
            write_json(&parsed, args.pretty)?;
        }
        Command::Schedule => {
            let report = gantt::analyze(&text)?;
            write_json(&report, args.pretty)?;
        }
        Command::Mutate { op, args: op_args } => {
            let out = mutate(&text, &op, &op_args)?;
            print!("{out}");
        }
    }
    Ok(())
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
