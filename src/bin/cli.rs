use chrono::NaiveDate;
use day_planner::task_validation::DATE_FORMAT;
use day_planner::{
    DailyTaskStore, PlannerConfig, ScheduleError, SchedulingEngine, Task, TaskDraft, TaskPatch,
    TaskPlacement, TaskService, TimeOfDay, export_day_to_csv, load_tasks_from_json,
    save_tasks_to_json,
};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |cells: &mut dyn Iterator<Item = &str>| {
        let mut line = String::from("|");
        for (ci, cell) in cells.enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.chars().count())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&mut headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(&mut row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_day(date: NaiveDate, placements: &[TaskPlacement]) -> String {
    let rows: Vec<Vec<String>> = placements
        .iter()
        .enumerate()
        .map(|(idx, placement)| {
            let task = &placement.task;
            vec![
                (idx + 1).to_string(),
                task.start_time.to_string(),
                task.end_time.to_string(),
                task.title.clone(),
                task.color.clone(),
                task.icon.clone().unwrap_or_default(),
                if placement.has_overlap { "!" } else { "" }.to_string(),
            ]
        })
        .collect();
    format!(
        "Tasks for {date}\n{}",
        render_text_table(
            &["#", "start", "end", "title", "color", "icon", "overlap"],
            &rows
        )
    )
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  day <YYYY-MM-DD>                   Switch the active day\n  show                               Show the active day's tasks\n  add <start> <end> <title...>       Create a task (times as HH:MM)\n  edit <#> <field> <value...>        Update title|start|end|desc|color|icon\n  move <#> <HH:MM>                   Move a task, keeping its duration\n  delete <#>                         Delete a task\n  now                                Show the task running now\n  save <path>                        Save all tasks as JSON\n  load <path>                        Replace all tasks from a JSON file (no database)\n  export <path>                      Export the active day as CSV\n  quit|exit                          Exit\n\nAppend '!' to add/edit/move (e.g. 'add! 09:00 10:00 Gym') to keep a change\nthat overlaps other tasks."
    );
}

fn print_conflict(overlaps: &[Task]) {
    println!("Conflicts with:");
    for task in overlaps {
        println!("  {}-{} {}", task.start_time, task.end_time, task.title);
    }
    println!("Repeat the command with '!' to proceed anyway.");
}

fn report_error(err: ScheduleError) {
    match err {
        ScheduleError::Conflict { overlaps } => print_conflict(&overlaps),
        ScheduleError::Validation(errors) => {
            println!("Invalid task:");
            for (field, message) in errors.fields() {
                println!("  {field}: {message}");
            }
        }
        other => println!("Error: {other}"),
    }
}

fn task_at(service: &TaskService, date: NaiveDate, position: Option<&str>) -> Option<Task> {
    let idx: usize = position?.parse().ok()?;
    let tasks = service.list(date).ok()?;
    idx.checked_sub(1).and_then(|i| tasks.get(i).cloned())
}

fn show(service: &TaskService, date: NaiveDate) {
    match service.layout(date) {
        Ok(placements) => println!("{}", render_day(date, &placements)),
        Err(err) => report_error(err),
    }
}

fn main() {
    let config = match PlannerConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    tracing::debug!(?config, "configuration loaded");

    let clock = match config.clock() {
        Ok(clock) => clock,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let mut service = match TaskService::open(clock, config.database_path.as_deref()) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("Error opening task storage: {err}");
            std::process::exit(1);
        }
    };
    let (mut date, _) = clock.now();

    println!("Day Planner (CLI) - type 'help' for commands\n");
    show(&service, date);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let raw_cmd = parts.next().unwrap_or("");
        let (cmd, force) = match raw_cmd.strip_suffix('!') {
            Some(cmd) => (cmd, true),
            None => (raw_cmd, false),
        };

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => show(&service, date),
            "day" => match parts.next().map(|s| NaiveDate::parse_from_str(s, DATE_FORMAT)) {
                Some(Ok(d)) => {
                    date = d;
                    show(&service, date);
                }
                Some(Err(_)) => println!("Invalid date (YYYY-MM-DD)"),
                None => println!("Active day is {date}"),
            },
            "add" => {
                let start = parts.next();
                let end = parts.next();
                let title = parts.collect::<Vec<_>>().join(" ");
                match (start, end) {
                    (Some(start), Some(end)) => {
                        let day = date.format(DATE_FORMAT).to_string();
                        let draft = TaskDraft::new(day, title, start, end);
                        match service.create(&draft, force) {
                            Ok(task) => {
                                println!(
                                    "Created task {}-{} {}.",
                                    task.start_time, task.end_time, task.title
                                );
                                show(&service, date);
                            }
                            Err(err) => report_error(err),
                        }
                    }
                    _ => println!("Usage: add <start> <end> <title...>"),
                }
            }
            "edit" => {
                let Some(task) = task_at(&service, date, parts.next()) else {
                    println!("Usage: edit <#> <field> <value...> (see 'show' for #)");
                    continue;
                };
                let field = parts.next().unwrap_or("");
                let value = parts.collect::<Vec<_>>().join(" ");
                let mut patch = TaskPatch::default();
                match field {
                    "title" => patch.title = Some(value),
                    "start" => patch.start_time = Some(value),
                    "end" => patch.end_time = Some(value),
                    "desc" => patch.description = Some(value),
                    "color" => patch.color = Some(value),
                    "icon" => patch.icon = Some(value),
                    _ => {
                        println!("Unknown field '{field}' (title|start|end|desc|color|icon)");
                        continue;
                    }
                }
                match service.update(task.id, &patch, force) {
                    Ok(updated) => {
                        println!("Updated task {}.", updated.title);
                        show(&service, date);
                    }
                    Err(err) => report_error(err),
                }
            }
            "move" => {
                let Some(task) = task_at(&service, date, parts.next()) else {
                    println!("Usage: move <#> <HH:MM> (see 'show' for #)");
                    continue;
                };
                let start = match parts.next().map(str::parse::<TimeOfDay>) {
                    Some(Ok(start)) => start,
                    Some(Err(err)) => {
                        println!("Error: {err}");
                        continue;
                    }
                    None => {
                        println!("Usage: move <#> <HH:MM>");
                        continue;
                    }
                };
                match service.relocate(task.id, start, force) {
                    Ok(moved) => {
                        println!(
                            "Moved {} to {}-{}.",
                            moved.title, moved.start_time, moved.end_time
                        );
                        show(&service, date);
                    }
                    Err(err) => report_error(err),
                }
            }
            "delete" => {
                let Some(task) = task_at(&service, date, parts.next()) else {
                    println!("Usage: delete <#> (see 'show' for #)");
                    continue;
                };
                match service.delete(task.id) {
                    Ok(removed) => {
                        println!("Deleted task {}.", removed.title);
                        show(&service, date);
                    }
                    Err(err) => report_error(err),
                }
            }
            "now" => match service.current_task() {
                Ok((today, at, Some(task))) => println!(
                    "{today} {at}: {} ({}-{})",
                    task.title, task.start_time, task.end_time
                ),
                Ok((today, at, None)) => println!("{today} {at}: no task scheduled right now"),
                Err(err) => report_error(err),
            },
            "save" => match parts.next() {
                Some(path) => {
                    let tasks = service.engine().store().snapshot();
                    match save_tasks_to_json(&tasks, path) {
                        Ok(()) => println!("Saved {} task(s) to {path}.", tasks.len()),
                        Err(err) => println!("Error saving tasks: {err}"),
                    }
                }
                None => println!("Usage: save <path>"),
            },
            "load" => match parts.next() {
                Some(_) if service.is_persistent() => {
                    println!("'load' is disabled while a database is configured.");
                }
                Some(path) => {
                    let loaded = load_tasks_from_json(path)
                        .map_err(ScheduleError::from)
                        .and_then(DailyTaskStore::from_tasks);
                    match loaded {
                        Ok(store) => {
                            let count = store.len();
                            service = TaskService::from_engine(
                                SchedulingEngine::with_store(store).with_clock(clock),
                            );
                            println!("Loaded {count} task(s) from {path}.");
                            show(&service, date);
                        }
                        Err(err) => println!("Error loading tasks: {err}"),
                    }
                }
                None => println!("Usage: load <path>"),
            },
            "export" => match parts.next() {
                Some(path) => match service.list(date) {
                    Ok(tasks) => match export_day_to_csv(&tasks, path) {
                        Ok(()) => println!("Exported {} task(s) to {path}.", tasks.len()),
                        Err(err) => println!("Error exporting tasks: {err}"),
                    },
                    Err(err) => report_error(err),
                },
                None => println!("Usage: export <path>"),
            },
            _ => println!("Unknown command '{raw_cmd}'. Type 'help'."),
        }
    }
}
