//! Project API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::tasks::{new_task_id, reindex};
use super::{check_weight, log_activity, now_rfc3339, require_text, respond, today, ApiResult};
use crate::access::{Permission, ViewScope, Viewer};
use crate::analytics::project_progress;
use crate::auth::Actor;
use crate::db::{check_version, DEFAULT_DEPARTMENT};
use crate::errors::AppError;
use crate::models::{
    CreateProjectRequest, Project, ProjectStatus, ProjectStep, ProjectView, SprintView, Task,
    TaskPriority, TaskStatus, UpdateProjectRequest,
};
use crate::AppState;

/// Estimated hours given to a new project step.
const STEP_ESTIMATED_HOURS: f64 = 8.0;

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListQuery {
    #[serde(default)]
    pub scope: ViewScope,
}

/// A project with its steps and sprints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: ProjectView,
    pub tasks: Vec<Task>,
    pub sprints: Vec<SprintView>,
}

/// Attach progress figures computed from `tasks` to `project`.
pub(crate) fn project_view(project: Project, tasks: &[Task]) -> ProjectView {
    let progress = project_progress(tasks.iter().filter(|t| t.belongs_to_project(&project.id)));
    ProjectView {
        project,
        progress: progress.progress,
        weight_total: progress.weight_total,
        weight_warning: progress.weight_warning,
        task_count: progress.task_count,
    }
}

/// GET /api/projects - Projects visible to the acting user, with progress.
pub async fn list_projects(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<Vec<ProjectView>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let projects = state.repo.list_projects().await?;
        let tasks = state.repo.list_tasks().await?;
        Ok::<_, AppError>(
            viewer
                .retain_visible(projects, query.scope)
                .into_iter()
                .map(|p| project_view(p, &tasks))
                .collect(),
        )
    }
    .await;
    respond(&state, revision_id, result).await
}

/// GET /api/projects/{id} - Project detail with steps and sprints.
pub async fn get_project(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
) -> ApiResult<ProjectDetail> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let project = load_project(&state, &viewer, &id).await?;
        let tasks: Vec<Task> = state
            .repo
            .list_tasks()
            .await?
            .into_iter()
            .filter(|t| t.belongs_to_project(&id))
            .collect();
        let today = today();
        let sprints = state
            .repo
            .list_sprints()
            .await?
            .into_iter()
            .filter(|s| s.project_id == id)
            .map(|s| SprintView::new(s, today))
            .collect();

        // Progress counts every step; the listing only what the viewer may see
        let project = project_view(project, &tasks);
        Ok::<_, AppError>(ProjectDetail {
            project,
            tasks: viewer.retain_visible(tasks, ViewScope::Department),
            sprints,
        })
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/projects - Launch a project with its initial steps.
pub async fn create_project(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<ProjectDetail> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = create_project_inner(&state, &viewer, request).await;
    respond(&state, revision_id, result).await
}

async fn create_project_inner(
    state: &AppState,
    viewer: &Viewer,
    request: CreateProjectRequest,
) -> Result<ProjectDetail, AppError> {
    viewer.require(Permission::ManageProjects)?;
    require_text(&request.name, "Project name")?;
    for step in &request.steps {
        require_text(&step.title, "Step title")?;
        check_weight(step.weight)?;
    }

    // The manager need not exist; the department then falls back to the default
    let manager = state.repo.get_employee(&request.manager_id).await?;
    let department_id = request
        .department_id
        .clone()
        .or_else(|| manager.map(|m| m.department_id))
        .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string());

    let now = now_rfc3339();
    let project = Project {
        id: format!("proj-{}", uuid::Uuid::new_v4().simple()),
        name: request.name.trim().to_string(),
        client: request.client.clone(),
        budget: request.budget,
        status: ProjectStatus::Active,
        deadline: request.deadline,
        manager_id: request.manager_id.clone(),
        department_id,
        created_at: now.clone(),
        updated_at: now.clone(),
        version: 1,
    };
    let steps: Vec<Task> = request
        .steps
        .iter()
        .map(|step| step_task(&project, step, project.deadline, &now))
        .collect();

    state.repo.insert_project(&project, &steps).await?;
    reindex(state, &steps).await;
    log_activity(state, viewer, "launched project", &project.name).await;

    Ok(ProjectDetail {
        project: project_view(project, &steps),
        tasks: steps,
        sprints: Vec::new(),
    })
}

/// PUT /api/projects/{id} - Edit project fields.
pub async fn update_project(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<ProjectView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        viewer.require(Permission::ManageProjects)?;
        let mut project = load_project(&state, &viewer, &id).await?;
        check_version(request.expected_version, project.version)?;
        if let Some(name) = &request.name {
            require_text(name, "Project name")?;
        }

        request.apply_to(&mut project);
        let project = state.repo.update_project(&project).await?;
        log_activity(&state, &viewer, "updated project", &project.name).await;

        let tasks = state.repo.list_tasks().await?;
        Ok::<_, AppError>(project_view(project, &tasks))
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/projects/{id}/steps - Add a step to a project.
pub async fn add_project_step(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(step): Json<ProjectStep>,
) -> ApiResult<Task> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        viewer.require(Permission::ManageProjects)?;
        require_text(&step.title, "Step title")?;
        check_weight(step.weight)?;
        let project = load_project(&state, &viewer, &id).await?;

        let task = step_task(&project, &step, today(), &now_rfc3339());
        state.repo.insert_task(&task).await?;
        reindex(&state, std::slice::from_ref(&task)).await;
        log_activity(&state, &viewer, "added step to", &project.name).await;
        Ok::<_, AppError>(task)
    }
    .await;
    respond(&state, revision_id, result).await
}

/// Fetch a project the viewer may see; hidden projects read as missing.
async fn load_project(state: &AppState, viewer: &Viewer, id: &str) -> Result<Project, AppError> {
    let project = state
        .repo
        .get_project(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;
    viewer.require_visible(&project, "Project", id)?;
    Ok(project)
}

/// A project step is a task owned by the project manager, worth twice its weight in KPI points.
fn step_task(project: &Project, step: &ProjectStep, due_date: NaiveDate, now: &str) -> Task {
    Task {
        id: new_task_id(),
        title: step.title.trim().to_string(),
        description: String::new(),
        status: TaskStatus::New,
        priority: TaskPriority::Medium,
        assigned_to: project.manager_id.clone(),
        department_id: project.department_id.clone(),
        project_id: Some(project.id.clone()),
        due_date,
        estimated_hours: STEP_ESTIMATED_HOURS,
        actual_hours: 0.0,
        comments: Vec::new(),
        attachments: Vec::new(),
        kpi_points: step.weight.saturating_mul(2),
        weight: step.weight,
        created_at: now.to_string(),
        updated_at: now.to_string(),
        version: 1,
    }
}
