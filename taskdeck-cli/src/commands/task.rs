//! `taskdeck task list | add | status | rm`

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use taskdeck_core::{NewTask, ProjectId, Task, TaskId, TaskStatus};

use super::{backend_error, home, signed_in};
use crate::TaskStatusArg;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List the tasks of a project.
    List {
        project: String,
    },

    /// Create a task in a project.
    Add(AddArgs),

    /// Move a task to todo, in_progress or done.
    Status {
        task: String,
        status: TaskStatusArg,
    },

    /// Delete a task by id.
    Rm {
        task: String,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub project: String,

    pub title: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Due date, YYYY-MM-DD.
    #[arg(long, value_name = "DATE")]
    pub due: Option<NaiveDate>,

    /// Initial status. Defaults to todo.
    #[arg(long, value_name = "STATUS")]
    pub status: Option<TaskStatusArg>,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "due")]
    due: String,
}

impl From<Task> for TaskRow {
    fn from(task: Task) -> Self {
        Self {
            id: task.id.to_string(),
            status: task.status.to_string(),
            title: task.title,
            due: task
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

pub fn run(cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::List { project } => list(project),
        TaskCommand::Add(args) => add(args),
        TaskCommand::Status { task, status } => set_status(task, status.into()),
        TaskCommand::Rm { task } => remove(task),
    }
}

fn list(project: String) -> Result<()> {
    let (client, identity) = signed_in(&home()?)?;
    let project = ProjectId::from(project);
    let tasks = client
        .list_tasks(&identity, &project)
        .map_err(|e| backend_error(e, format!("failed to list tasks for project {project}")))?;

    if tasks.is_empty() {
        println!("No tasks in project {project}.");
        return Ok(());
    }

    let open = tasks
        .iter()
        .filter(|t| !matches!(t.status, TaskStatus::Done))
        .count();
    println!("{} tasks, {} open", tasks.len(), open);

    let rows: Vec<TaskRow> = tasks.into_iter().map(TaskRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn add(args: AddArgs) -> Result<()> {
    let (client, identity) = signed_in(&home()?)?;
    let new = NewTask {
        project_id: ProjectId::from(args.project),
        title: args.title.clone(),
        description: args.description,
        status: args.status.unwrap_or_default().into(),
        due_date: args.due,
    };
    let task = client
        .create_task(&identity, &new)
        .map_err(|e| backend_error(e, format!("failed to create task '{}'", args.title)))?;

    println!("✓ Created task '{}' ({})", task.title, task.id);
    Ok(())
}

fn set_status(task: String, status: TaskStatus) -> Result<()> {
    let (client, identity) = signed_in(&home()?)?;
    let id = TaskId::from(task);
    let task = client
        .update_task_status(&identity, &id, status)
        .map_err(|e| backend_error(e, format!("failed to update task {id}")))?;

    println!("✓ '{}' is now {}", task.title, status_label(task.status));
    Ok(())
}

fn remove(task: String) -> Result<()> {
    let (client, identity) = signed_in(&home()?)?;
    let id = TaskId::from(task);
    client
        .delete_task(&identity, &id)
        .map_err(|e| backend_error(e, format!("failed to delete task {id}")))?;
    println!("✓ Deleted task {id}");
    Ok(())
}

fn status_label(status: TaskStatus) -> String {
    match status {
        TaskStatus::Todo => "todo".normal().to_string(),
        TaskStatus::InProgress => "in progress".yellow().to_string(),
        TaskStatus::Done => "done".green().to_string(),
    }
}
