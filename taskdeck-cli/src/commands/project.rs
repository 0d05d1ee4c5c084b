//! `taskdeck project list | add | rm`

use anyhow::Result;
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use taskdeck_core::{timestamp, NewProject, Project, ProjectId};

use super::{backend_error, home, signed_in};

/// Manage the signed-in user's projects.
#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// List projects, oldest first.
    List,

    /// Create a project.
    Add(AddArgs),

    /// Delete a project by id.
    Rm {
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Project name (e.g. "Website relaunch").
    pub name: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "description")]
    description: String,
    #[tabled(rename = "created")]
    created_at: String,
}

impl From<Project> for ProjectRow {
    fn from(project: Project) -> Self {
        Self {
            id: project.id.to_string(),
            name: project.name,
            description: project.description.unwrap_or_default(),
            created_at: timestamp::format(&project.created_at),
        }
    }
}

pub fn run(cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::List => list(),
        ProjectCommand::Add(args) => add(args),
        ProjectCommand::Rm { id } => remove(id),
    }
}

fn list() -> Result<()> {
    let (client, identity) = signed_in(&home()?)?;
    let projects = client
        .list_projects(&identity)
        .map_err(|e| backend_error(e, "failed to list projects".to_string()))?;

    if projects.is_empty() {
        println!("No projects yet.");
        println!("Run: taskdeck project add <name>");
        return Ok(());
    }

    let rows: Vec<ProjectRow> = projects.into_iter().map(ProjectRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn add(args: AddArgs) -> Result<()> {
    let (client, identity) = signed_in(&home()?)?;
    let new = NewProject {
        owner_id: identity.user_id.clone(),
        name: args.name.clone(),
        description: args.description,
    };
    let project = client
        .create_project(&identity, &new)
        .map_err(|e| backend_error(e, format!("failed to create project '{}'", args.name)))?;

    println!("✓ Created project '{}' ({})", project.name, project.id);
    Ok(())
}

fn remove(id: String) -> Result<()> {
    let (client, identity) = signed_in(&home()?)?;
    let id = ProjectId::from(id);
    client
        .delete_project(&identity, &id)
        .map_err(|e| backend_error(e, format!("failed to delete project {id}")))?;
    println!("✓ Deleted project {id}");
    Ok(())
}
