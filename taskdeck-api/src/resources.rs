//! Table endpoints: profiles, projects, tasks, work logs.

use serde_json::json;

use taskdeck_core::{
    Identity, NewProject, NewTask, NewWorkLog, ProfileRecord, ProfileUpdate, Project, ProjectId,
    Task, TaskId, TaskStatus, WorkLog,
};

use crate::client::{decode, eq, first_row, BackendClient};
use crate::error::ApiError;

const RETURN_ROW: (&str, &str) = ("Prefer", "return=representation");

impl BackendClient {
    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    /// The signed-in user's profile row, or `None` if the backend has none.
    pub fn fetch_profile(&self, identity: &Identity) -> Result<Option<ProfileRecord>, ApiError> {
        let rows: Vec<ProfileRecord> = decode(
            self.request("GET", &self.table_url("profiles"), Some(identity))
                .query("id", &eq(identity.user_id.as_str()))
                .query("select", "*")
                .call()?,
            "profile",
        )?;
        Ok(rows.into_iter().next())
    }

    /// Overwrite the signed-in user's mutable profile fields and return the
    /// stored row.
    ///
    /// A PATCH that matches no row (deleted, or hidden by row-level security)
    /// still answers 2xx; it surfaces here as [`ApiError::EmptyResponse`].
    pub fn update_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> Result<ProfileRecord, ApiError> {
        first_row(
            self.request("PATCH", &self.table_url("profiles"), Some(identity))
                .query("id", &eq(identity.user_id.as_str()))
                .set(RETURN_ROW.0, RETURN_ROW.1)
                .send_json(update)?,
            "profile",
        )
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn list_projects(&self, identity: &Identity) -> Result<Vec<Project>, ApiError> {
        decode(
            self.request("GET", &self.table_url("projects"), Some(identity))
                .query("owner_id", &eq(identity.user_id.as_str()))
                .query("order", "created_at.asc")
                .call()?,
            "project",
        )
    }

    pub fn create_project(
        &self,
        identity: &Identity,
        project: &NewProject,
    ) -> Result<Project, ApiError> {
        first_row(
            self.request("POST", &self.table_url("projects"), Some(identity))
                .set(RETURN_ROW.0, RETURN_ROW.1)
                .send_json(project)?,
            "project",
        )
    }

    pub fn delete_project(&self, identity: &Identity, id: &ProjectId) -> Result<(), ApiError> {
        self.request("DELETE", &self.table_url("projects"), Some(identity))
            .query("id", &eq(id.as_str()))
            .call()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn list_tasks(
        &self,
        identity: &Identity,
        project: &ProjectId,
    ) -> Result<Vec<Task>, ApiError> {
        decode(
            self.request("GET", &self.table_url("tasks"), Some(identity))
                .query("project_id", &eq(project.as_str()))
                .query("order", "created_at.asc")
                .call()?,
            "task",
        )
    }

    pub fn create_task(&self, identity: &Identity, task: &NewTask) -> Result<Task, ApiError> {
        first_row(
            self.request("POST", &self.table_url("tasks"), Some(identity))
                .set(RETURN_ROW.0, RETURN_ROW.1)
                .send_json(task)?,
            "task",
        )
    }

    pub fn update_task_status(
        &self,
        identity: &Identity,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Task, ApiError> {
        first_row(
            self.request("PATCH", &self.table_url("tasks"), Some(identity))
                .query("id", &eq(id.as_str()))
                .set(RETURN_ROW.0, RETURN_ROW.1)
                .send_json(json!({ "status": status }))?,
            "task",
        )
    }

    pub fn delete_task(&self, identity: &Identity, id: &TaskId) -> Result<(), ApiError> {
        self.request("DELETE", &self.table_url("tasks"), Some(identity))
            .query("id", &eq(id.as_str()))
            .call()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Work logs
    // -----------------------------------------------------------------------

    pub fn list_work_logs(
        &self,
        identity: &Identity,
        task: &TaskId,
    ) -> Result<Vec<WorkLog>, ApiError> {
        decode(
            self.request("GET", &self.table_url("work_logs"), Some(identity))
                .query("task_id", &eq(task.as_str()))
                .query("order", "logged_on.asc")
                .call()?,
            "work log",
        )
    }

    pub fn create_work_log(
        &self,
        identity: &Identity,
        log: &NewWorkLog,
    ) -> Result<WorkLog, ApiError> {
        first_row(
            self.request("POST", &self.table_url("work_logs"), Some(identity))
                .set(RETURN_ROW.0, RETURN_ROW.1)
                .send_json(log)?,
            "work log",
        )
    }
}
