#[cfg(feature = "sqlite")]
use plan_tool::{PersistenceError, PlanStore, SqlitePlanStore};
use plan_tool::{
    Date, DateTime, Day, Plan, Resource, Section, Task, TaskField, export_tasks_to_csv,
    load_plan_from_json, save_plan_to_json,
};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Splits off up to `words` leading words; the remainder keeps its inner
/// spacing so titles and comments survive.
fn split_words(input: &str, words: usize) -> (Vec<&str>, &str) {
    let mut rest = input.trim_start();
    let mut head = Vec::new();
    while head.len() < words && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        head.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (head, rest.trim_end())
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(ci) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let line = |cells: &mut dyn Iterator<Item = &str>| {
        let mut out = String::from("|");
        for (cell, width) in cells.zip(&widths) {
            out.push(' ');
            out.push_str(cell);
            out.push_str(&" ".repeat(width.saturating_sub(cell.chars().count())));
            out.push_str(" |");
        }
        out
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&line(&mut headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&line(&mut row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

const TASK_COLUMNS: [TaskField; 10] = [
    TaskField::Title,
    TaskField::Duration,
    TaskField::Start,
    TaskField::End,
    TaskField::Work,
    TaskField::Predecessors,
    TaskField::Resources,
    TaskField::Type,
    TaskField::Priority,
    TaskField::Deadline,
];

fn render_tasks(plan: &Plan) -> String {
    let mut headers = vec!["#"];
    headers.extend(TASK_COLUMNS.iter().map(|f| f.name()));
    let rows: Vec<Vec<String>> = plan
        .tasks()
        .iter()
        .map(|task| {
            let mut row = vec![task.index().to_string()];
            if task.is_null() {
                row.resize(TASK_COLUMNS.len() + 1, String::new());
                return row;
            }
            for field in TASK_COLUMNS {
                let text = task.text(field);
                row.push(match field {
                    TaskField::Title => format!("{}{}", "  ".repeat(task.indent as usize), text),
                    _ => text,
                });
            }
            row
        })
        .collect();
    render_table(&headers, &rows)
}

fn render_days(plan: &Plan) -> String {
    let rows: Vec<Vec<String>> = plan
        .days()
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let periods = day
                .periods()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            vec![i.to_string(), day.name().to_string(), format!("{:.2}", day.work()), periods]
        })
        .collect();
    render_table(&["#", "Name", "Work", "Periods"], &rows)
}

fn render_calendars(plan: &Plan) -> String {
    let rows: Vec<Vec<String>> = plan
        .calendars()
        .iter()
        .enumerate()
        .map(|(i, calendar)| {
            let cycle = calendar
                .cycle()
                .iter()
                .map(|d| plan.day(*d).map(Day::name).unwrap_or("?").to_string())
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                i.to_string(),
                calendar.name().to_string(),
                calendar.anchor().to_string(),
                calendar.exceptions().len().to_string(),
                cycle,
            ]
        })
        .collect();
    render_table(&["#", "Name", "Anchor", "Exceptions", "Cycle"], &rows)
}

fn render_resources(plan: &Plan) -> String {
    let rows: Vec<Vec<String>> = plan
        .resources()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            vec![
                i.to_string(),
                r.initials.clone(),
                r.name.clone(),
                r.group.clone(),
                r.role.clone(),
                r.available.to_string(),
            ]
        })
        .collect();
    render_table(&["#", "Initials", "Name", "Group", "Role", "Available"], &rows)
}

fn print_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "Commands:\n  help                                  Show this help\n  show                                  Show the task table\n  insert [index] [title...]             Insert a task (null row without a title)\n  remove <index>                        Remove a task\n  move <from> <to>                      Move a task to another row\n  task <index> <section> <text...>      Set a task cell (sections 0-11)\n  indent <index> | outdent <index>      Change a task's outline level\n  days                                  List day types\n  day add <name>                        Add a day type without work periods\n  day <index> <section> <text...>       Set a day cell\n  calendars                             List calendars\n  calendar <index> <section> <text...>  Set a calendar cell\n  exception <calendar> <date> <day|clear>\n                                        Override one date of a calendar\n  resources                             List resources\n  resource add <initials> [name...]     Add a resource\n  resource <index> <section> <text...>  Set a resource cell\n  title <text...>                       Set the plan title\n  start <YYYY-MM-DD [HH:MM]>            Set the default start\n  schedule                              Recompute every task\n  save <json|sqlite> <path>             Save the plan\n  load <json|sqlite> <path>             Load a plan\n  export <path>                         Write the task table as CSV\n  quit|exit                             Exit"
    )
}

fn parse_index(text: Option<&str>, what: &str) -> Result<usize, String> {
    text.ok_or_else(|| format!("missing {what}"))?
        .parse()
        .map_err(|_| format!("invalid {what}"))
}

fn save(plan: &Plan, format: &str, path: &str) -> Result<(), String> {
    let result = match format {
        "json" => save_plan_to_json(plan, path),
        #[cfg(feature = "sqlite")]
        "sqlite" => SqlitePlanStore::new(path).and_then(|store| store.save_plan(plan)),
        other => return Err(format!("unknown format '{other}' (expected json or sqlite)")),
    };
    result.map_err(|err| err.to_string())
}

fn load(format: &str, path: &str) -> Result<Plan, String> {
    let result = match format {
        "json" => load_plan_from_json(path),
        #[cfg(feature = "sqlite")]
        "sqlite" => SqlitePlanStore::new(path)
            .and_then(|store| store.load_plan())
            .and_then(|plan| plan.ok_or(PersistenceError::NotFound)),
        other => return Err(format!("unknown format '{other}' (expected json or sqlite)")),
    };
    result.map_err(|err| err.to_string())
}

/// Why a command line failed.
#[derive(Debug)]
enum CommandError {
    /// Bad input. Reported, and the session goes on.
    Rejected(String),
    /// The terminal can no longer be written to.
    Output(io::Error),
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        CommandError::Rejected(message)
    }
}

impl From<&str> for CommandError {
    fn from(message: &str) -> Self {
        CommandError::Rejected(message.to_string())
    }
}

impl From<io::Error> for CommandError {
    fn from(err: io::Error) -> Self {
        CommandError::Output(err)
    }
}

/// Runs one command line. Returns whether the task table changed.
fn execute(plan: &mut Plan, input: &str, out: &mut impl Write) -> Result<bool, CommandError> {
    let (head, _) = split_words(input, 1);
    let command = head.first().copied().unwrap_or("");
    match command {
        "help" => print_help(out)?,
        "show" => writeln!(out, "{}", render_tasks(plan))?,
        "days" => writeln!(out, "{}", render_days(plan))?,
        "calendars" => writeln!(out, "{}", render_calendars(plan))?,
        "resources" => writeln!(out, "{}", render_resources(plan))?,
        "insert" => {
            let (words, title) = split_words(input, 2);
            let (at, title) = match words.get(1).map(|w| w.parse::<usize>()) {
                Some(Ok(at)) => (at, title.to_string()),
                Some(Err(_)) => {
                    let (_, rest) = split_words(input, 1);
                    (plan.task_count(), rest.to_string())
                }
                None => (plan.task_count(), String::new()),
            };
            plan.insert_task(at, Task::new(title))
                .map_err(|err| err.to_string())?;
            return Ok(true);
        }
        "remove" => {
            let (words, _) = split_words(input, 2);
            let index = parse_index(words.get(1).copied(), "task index")?;
            let removed = plan.remove_task(index).map_err(|err| err.to_string())?;
            writeln!(out, "Removed task {index} ({}).", removed.title)?;
            return Ok(true);
        }
        "move" => {
            let (words, _) = split_words(input, 3);
            let from = parse_index(words.get(1).copied(), "source index")?;
            let to = parse_index(words.get(2).copied(), "target index")?;
            plan.move_task(from, to).map_err(|err| err.to_string())?;
            return Ok(true);
        }
        "indent" | "outdent" => {
            let (words, _) = split_words(input, 2);
            let index = parse_index(words.get(1).copied(), "task index")?;
            let result = if command == "indent" {
                plan.indent_task(index)
            } else {
                plan.outdent_task(index)
            };
            result.map_err(|err| err.to_string())?;
            return Ok(true);
        }
        "task" => {
            let (words, text) = split_words(input, 3);
            let index = parse_index(words.get(1).copied(), "task index")?;
            let section = parse_index(words.get(2).copied(), "section")?;
            plan.set_task_text(index, section, text)
                .map_err(|err| err.to_string())?;
            return Ok(true);
        }
        "day" => {
            let (words, text) = split_words(input, 3);
            if words.get(1) == Some(&"add") {
                let (_, name) = split_words(input, 2);
                let index = plan.add_day(Day::new(name));
                writeln!(out, "Added day {index}.")?;
            } else {
                let index = parse_index(words.get(1).copied(), "day index")?;
                let section = parse_index(words.get(2).copied(), "section")?;
                plan.set_day_text(index, section, text)
                    .map_err(|err| err.to_string())?;
            }
            writeln!(out, "{}", render_days(plan))?;
        }
        "calendar" => {
            let (words, text) = split_words(input, 3);
            let index = parse_index(words.get(1).copied(), "calendar index")?;
            let section = parse_index(words.get(2).copied(), "section")?;
            plan.set_calendar_text(index, section, text)
                .map_err(|err| err.to_string())?;
            writeln!(out, "{}", render_calendars(plan))?;
        }
        "exception" => {
            let (words, day) = split_words(input, 3);
            let index = parse_index(words.get(1).copied(), "calendar index")?;
            let date: Date = words
                .get(2)
                .ok_or("missing date")?
                .parse()
                .map_err(|err: plan_tool::FormatError| err.to_string())?;
            let day = if day.eq_ignore_ascii_case("clear") {
                None
            } else {
                let found = plan
                    .days()
                    .iter()
                    .position(|d| d.name().eq_ignore_ascii_case(day))
                    .or_else(|| day.parse().ok());
                Some(found.ok_or_else(|| format!("unknown day '{day}'"))?)
            };
            plan.set_calendar_exception(index, date, day)
                .map_err(|err| err.to_string())?;
            writeln!(out, "{}", render_calendars(plan))?;
        }
        "resource" => {
            let (words, text) = split_words(input, 3);
            if words.get(1) == Some(&"add") {
                let initials = words.get(2).ok_or("missing initials")?;
                let (_, name) = split_words(input, 3);
                let index = plan
                    .add_resource(Resource::new(*initials, name))
                    .map_err(|err| err.to_string())?;
                writeln!(out, "Added resource {index}.")?;
            } else {
                let index = parse_index(words.get(1).copied(), "resource index")?;
                let section = parse_index(words.get(2).copied(), "section")?;
                plan.set_resource_text(index, section, text)
                    .map_err(|err| err.to_string())?;
            }
            writeln!(out, "{}", render_resources(plan))?;
        }
        "title" => {
            let (_, title) = split_words(input, 1);
            plan.set_title(title);
            writeln!(out, "Plan title: {}", plan.metadata().title)?;
        }
        "start" => {
            let (_, text) = split_words(input, 1);
            let start: DateTime = text.parse().map_err(|err: plan_tool::FormatError| err.to_string())?;
            plan.set_default_start(start);
            writeln!(out, "Default start: {}", plan.default_start())?;
        }
        "schedule" => {
            let summary = plan.schedule().map_err(|err| err.to_string())?;
            writeln!(out, "Scheduled ({})", summary.to_cli_summary())?;
            return Ok(true);
        }
        "save" | "load" => {
            let (words, path) = split_words(input, 2);
            let format = words.get(1).copied().ok_or("missing format")?;
            if path.is_empty() {
                return Err(format!("Usage: {command} <json|sqlite> <path>").into());
            }
            if command == "save" {
                save(plan, format, path)?;
                writeln!(out, "Plan saved to {path}")?;
                return Ok(false);
            }
            *plan = load(format, path)?;
            writeln!(out, "Plan loaded from {path}")?;
            return Ok(true);
        }
        "export" => {
            let (_, path) = split_words(input, 1);
            if path.is_empty() {
                return Err("Usage: export <path>".into());
            }
            export_tasks_to_csv(plan, path).map_err(|err| err.to_string())?;
            writeln!(out, "Task table exported to {path}")?;
        }
        other => return Err(format!("Unknown command '{other}'. Type 'help'.").into()),
    }
    Ok(false)
}

/// Reads commands until `quit` or end of input. Fails only when the
/// terminal itself does.
fn run(plan: &mut Plan, commands: impl BufRead, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Plan Tool (CLI) - type 'help' for commands\n")?;
    writeln!(out, "{}", render_tasks(plan))?;

    let mut lines = commands.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "exit") {
            break;
        }
        match execute(plan, input, out) {
            Ok(true) => writeln!(out, "{}", render_tasks(plan))?,
            Ok(false) => {}
            Err(CommandError::Rejected(message)) => writeln!(out, "Error: {message}")?,
            Err(CommandError::Output(err)) => return Err(err),
        }
    }
    out.flush()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut plan = Plan::new();
    let stdout = io::stdout();
    match run(&mut plan, io::stdin().lock(), &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
