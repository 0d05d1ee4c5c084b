//! `taskdeck log list | add`: time spent on tasks.

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use taskdeck_core::{NewWorkLog, TaskId, WorkLog};

use super::{backend_error, home, signed_in};

#[derive(Subcommand, Debug)]
pub enum LogCommand {
    /// List work logged against a task.
    List {
        task: String,
    },

    /// Log time against a task.
    Add(AddArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub task: String,

    #[arg(long, short = 'm')]
    pub minutes: u32,

    #[arg(long, short = 'n')]
    pub note: Option<String>,

    /// Day the work happened, YYYY-MM-DD. Defaults to today.
    #[arg(long = "on", value_name = "DATE")]
    pub logged_on: Option<NaiveDate>,
}

#[derive(Tabled)]
struct WorkLogRow {
    #[tabled(rename = "date")]
    logged_on: String,
    #[tabled(rename = "time")]
    duration: String,
    #[tabled(rename = "note")]
    note: String,
}

impl From<WorkLog> for WorkLogRow {
    fn from(log: WorkLog) -> Self {
        Self {
            logged_on: log.logged_on.format("%Y-%m-%d").to_string(),
            duration: format_minutes(log.minutes),
            note: log.note.unwrap_or_default(),
        }
    }
}

pub fn run(cmd: LogCommand) -> Result<()> {
    match cmd {
        LogCommand::List { task } => list(task),
        LogCommand::Add(args) => add(args),
    }
}

fn list(task: String) -> Result<()> {
    let (client, identity) = signed_in(&home()?)?;
    let task = TaskId::from(task);
    let logs = client
        .list_work_logs(&identity, &task)
        .map_err(|e| backend_error(e, format!("failed to list work logs for task {task}")))?;

    if logs.is_empty() {
        println!("No time logged on task {task}.");
        return Ok(());
    }

    let total: u32 = logs.iter().map(|l| l.minutes).sum();
    let rows: Vec<WorkLogRow> = logs.into_iter().map(WorkLogRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("total: {}", format_minutes(total));
    Ok(())
}

fn add(args: AddArgs) -> Result<()> {
    if args.minutes == 0 {
        bail!("--minutes must be greater than zero");
    }
    let (client, identity) = signed_in(&home()?)?;
    let new = NewWorkLog {
        task_id: TaskId::from(args.task),
        user_id: identity.user_id.clone(),
        minutes: args.minutes,
        note: args.note,
        logged_on: args.logged_on.unwrap_or_else(|| Local::now().date_naive()),
    };
    let log = client
        .create_work_log(&identity, &new)
        .map_err(|e| backend_error(e, format!("failed to log time on task {}", new.task_id)))?;

    println!(
        "✓ Logged {} on {} for task {}",
        format_minutes(log.minutes),
        log.logged_on.format("%Y-%m-%d"),
        log.task_id
    );
    Ok(())
}

fn format_minutes(minutes: u32) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m:02}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_render_as_hours_and_minutes() {
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(120), "2h");
        assert_eq!(format_minutes(95), "1h 35m");
    }
}
