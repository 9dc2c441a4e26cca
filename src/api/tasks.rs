//! Task API endpoints: CRUD, kanban moves, project-step toggles, comments
//! and attachments.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{check_weight, log_activity, now_rfc3339, require_text, respond, today, ApiResult};
use crate::access::{can_toggle_steps, Permission, ViewScope, Viewer};
use crate::auth::Actor;
use crate::db::check_version;
use crate::errors::AppError;
use crate::events::TaskStatusEvent;
use crate::models::{
    AddCommentRequest, Attachment, BulkCreateTasksRequest, Comment, CreateTaskRequest, Employee,
    MoveTaskRequest, NewAttachment, Task, TaskStatus, UpdateTaskRequest,
};
use crate::AppState;

/// Defaults for fields a new task leaves out.
const DEFAULT_ESTIMATED_HOURS: f64 = 8.0;
const DEFAULT_KPI_POINTS: i64 = 25;
const DEFAULT_WEIGHT: i64 = 10;

/// Query parameters for listing tasks.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    #[serde(default)]
    pub scope: ViewScope,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Query parameters for the kanban board.
#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    #[serde(default)]
    pub scope: ViewScope,
}

/// One kanban column.
#[derive(Debug, Serialize)]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

/// GET /api/tasks - List the tasks visible to the acting user.
pub async fn list_tasks(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Vec<Task>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.repo.list_tasks().await.map(|tasks| {
        viewer
            .retain_visible(tasks, query.scope)
            .into_iter()
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .filter(|t| {
                query
                    .project_id
                    .as_deref()
                    .map_or(true, |p| t.belongs_to_project(p))
            })
            .collect()
    });
    respond(&state, revision_id, result).await
}

/// GET /api/board - Visible tasks grouped into kanban columns.
pub async fn get_board(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Query(query): Query<BoardQuery>,
) -> ApiResult<Vec<BoardColumn>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.repo.list_tasks().await.map(|tasks| {
        let visible = viewer.retain_visible(tasks, query.scope);
        TaskStatus::ALL
            .iter()
            .map(|status| BoardColumn {
                status: *status,
                tasks: visible
                    .iter()
                    .filter(|t| t.status == *status)
                    .cloned()
                    .collect(),
            })
            .collect()
    });
    respond(&state, revision_id, result).await
}

/// GET /api/tasks/{id} - Get a single task.
pub async fn get_task(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
) -> ApiResult<Task> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = load_task(&state, &viewer, &id).await;
    respond(&state, revision_id, result).await
}

/// POST /api/tasks - Create a task.
pub async fn create_task(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<Task> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = create_task_inner(&state, &viewer, request).await;
    respond(&state, revision_id, result).await
}

async fn create_task_inner(
    state: &AppState,
    viewer: &Viewer,
    mut request: CreateTaskRequest,
) -> Result<Task, AppError> {
    viewer.require(Permission::EditTasks)?;

    // A KPI rule pre-fills whatever the request leaves out
    if let Some(rule_id) = &request.kpi_rule_id {
        let rule = state
            .repo
            .get_kpi_rule(rule_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown KPI rule {}", rule_id)))?;
        if request.title.trim().is_empty() {
            request.title = rule.title;
        }
        request.kpi_points.get_or_insert(rule.default_points);
        request.estimated_hours.get_or_insert(rule.default_hours);
    }

    require_text(&request.title, "Title")?;
    if let Some(weight) = request.weight {
        check_weight(weight)?;
    }
    let assignee = load_assignee(state, viewer, &request.assigned_to).await?;
    let department_id = request
        .department_id
        .clone()
        .unwrap_or_else(|| assignee.department_id.clone());
    if !viewer.sees_department(&department_id) {
        return Err(AppError::Forbidden(format!(
            "Cannot create tasks in department {}",
            department_id
        )));
    }
    check_project(state, request.project_id.as_deref()).await?;

    let now = now_rfc3339();
    let task = Task {
        id: new_task_id(),
        title: request.title.trim().to_string(),
        description: request.description.clone(),
        status: TaskStatus::New,
        priority: request.priority,
        assigned_to: assignee.id.clone(),
        department_id,
        project_id: request.project_id.clone(),
        due_date: request.due_date.unwrap_or_else(today),
        estimated_hours: request.estimated_hours.unwrap_or(DEFAULT_ESTIMATED_HOURS),
        actual_hours: 0.0,
        comments: Vec::new(),
        attachments: attachments_from(&request.attachments, &now),
        kpi_points: request.kpi_points.unwrap_or(DEFAULT_KPI_POINTS),
        weight: request.weight.unwrap_or(DEFAULT_WEIGHT),
        created_at: now.clone(),
        updated_at: now,
        version: 1,
    };

    state.repo.insert_task(&task).await?;
    reindex(state, std::slice::from_ref(&task)).await;
    log_activity(state, viewer, "created task", &task.title).await;

    Ok(task)
}

/// POST /api/tasks/bulk - Assign several tasks to one employee at once.
pub async fn bulk_create_tasks(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Json(request): Json<BulkCreateTasksRequest>,
) -> ApiResult<Vec<Task>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = bulk_create_inner(&state, &viewer, request).await;
    respond(&state, revision_id, result).await
}

async fn bulk_create_inner(
    state: &AppState,
    viewer: &Viewer,
    request: BulkCreateTasksRequest,
) -> Result<Vec<Task>, AppError> {
    viewer.require(Permission::EditTasks)?;

    if request.items.is_empty() {
        return Err(AppError::Validation("At least one task is required".to_string()));
    }
    for item in &request.items {
        require_text(&item.title, "Title")?;
    }
    let assignee = load_assignee(state, viewer, &request.assigned_to).await?;
    check_project(state, request.project_id.as_deref()).await?;

    let now = now_rfc3339();
    let due_date = request.due_date.unwrap_or_else(today);
    let tasks: Vec<Task> = request
        .items
        .iter()
        .map(|item| Task {
            id: new_task_id(),
            title: item.title.trim().to_string(),
            description: item.description.clone().unwrap_or_default(),
            status: TaskStatus::New,
            priority: item.priority,
            assigned_to: assignee.id.clone(),
            department_id: assignee.department_id.clone(),
            project_id: request.project_id.clone(),
            due_date,
            estimated_hours: request.estimated_hours.unwrap_or(DEFAULT_ESTIMATED_HOURS),
            actual_hours: 0.0,
            comments: Vec::new(),
            attachments: attachments_from(&request.attachments, &now),
            kpi_points: item.kpi_points.unwrap_or(DEFAULT_KPI_POINTS),
            weight: DEFAULT_WEIGHT,
            created_at: now.clone(),
            updated_at: now.clone(),
            version: 1,
        })
        .collect();

    state.repo.insert_tasks(&tasks).await?;
    reindex(state, &tasks).await;
    log_activity(
        state,
        viewer,
        &format!("assigned {} tasks to", tasks.len()),
        &assignee.name,
    )
    .await;

    Ok(tasks)
}

/// PUT /api/tasks/{id} - Edit task details.
pub async fn update_task(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Task> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = update_task_inner(&state, &viewer, &id, request).await;
    respond(&state, revision_id, result).await
}

async fn update_task_inner(
    state: &AppState,
    viewer: &Viewer,
    id: &str,
    request: UpdateTaskRequest,
) -> Result<Task, AppError> {
    viewer.require(Permission::EditTasks)?;
    let mut task = load_task(state, viewer, id).await?;
    check_version(request.expected_version, task.version)?;

    if let Some(title) = &request.title {
        require_text(title, "Title")?;
    }
    if let Some(weight) = request.weight {
        check_weight(weight)?;
    }
    let new_assignee = match &request.assigned_to {
        Some(assigned_to) => Some(load_assignee(state, viewer, assigned_to).await?),
        None => None,
    };
    if let Some(project_id) = request.project_id.as_deref().filter(|p| !p.is_empty()) {
        check_project(state, Some(project_id)).await?;
    }

    request.apply_to(&mut task);
    // A reassigned task moves to the new assignee's department
    if let Some(assignee) = new_assignee {
        task.department_id = assignee.department_id;
    }
    let task = state.repo.update_task(&task).await?;
    reindex(state, std::slice::from_ref(&task)).await;
    log_activity(state, viewer, "updated task", &task.title).await;

    Ok(task)
}

/// DELETE /api/tasks/{id} - Delete a task.
pub async fn delete_task(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        viewer.require(Permission::EditTasks)?;
        let task = load_task(&state, &viewer, &id).await?;
        state.repo.delete_task(&id).await?;

        if let Err(e) = state.search.remove_task(&id).await {
            tracing::warn!("Failed to remove task from index: {}", e);
        }
        log_activity(&state, &viewer, "deleted task", &task.title).await;
        Ok::<_, AppError>(())
    }
    .await;
    respond(&state, revision_id, result).await
}

/// PUT /api/tasks/{id}/status - Drop a task into a kanban column.
pub async fn move_task(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<MoveTaskRequest>,
) -> ApiResult<Task> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let mut task = load_task(&state, &viewer, &id).await?;
        task.move_to(request.status);
        let task = state.repo.update_task(&task).await?;

        state.hub.publish(TaskStatusEvent {
            task_id: task.id.clone(),
            title: task.title.clone(),
            status: task.status,
            actor_id: viewer.id.clone(),
            actor_name: viewer.name.clone(),
            at: task.updated_at.clone(),
        });
        log_activity(
            &state,
            &viewer,
            &format!("moved task to {}", task.status),
            &task.title,
        )
        .await;
        Ok::<_, AppError>(task)
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/tasks/{id}/toggle - Flip a project step between done and in progress.
pub async fn toggle_task(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
) -> ApiResult<Task> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let mut task = load_task(&state, &viewer, &id).await?;
        let project_id = task
            .project_id
            .clone()
            .ok_or_else(|| AppError::Validation(format!("Task {} is not a project step", id)))?;
        let project = state
            .repo
            .get_project(&project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))?;

        if !can_toggle_steps(&viewer, &project) {
            return Err(AppError::Forbidden(
                "Only an admin or the project manager can toggle steps".to_string(),
            ));
        }

        task.toggle_completion();
        let task = state.repo.update_task(&task).await?;
        log_activity(
            &state,
            &viewer,
            &format!("marked step {}", task.status),
            &task.title,
        )
        .await;
        Ok::<_, AppError>(task)
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/tasks/{id}/comments - Comment on a task.
pub async fn add_comment(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<AddCommentRequest>,
) -> ApiResult<Task> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        require_text(&request.text, "Comment text")?;
        let mut task = load_task(&state, &viewer, &id).await?;
        task.comments.push(Comment {
            id: uuid::Uuid::new_v4().to_string(),
            author_id: viewer.id.clone(),
            text: request.text.trim().to_string(),
            created_at: now_rfc3339(),
        });

        let task = state.repo.update_task(&task).await?;
        reindex(&state, std::slice::from_ref(&task)).await;
        log_activity(&state, &viewer, "commented on", &task.title).await;
        Ok::<_, AppError>(task)
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/tasks/{id}/attachments - Attach file metadata to a task.
pub async fn add_attachment(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<NewAttachment>,
) -> ApiResult<Task> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        require_text(&request.name, "Attachment name")?;
        require_text(&request.url, "Attachment url")?;
        let mut task = load_task(&state, &viewer, &id).await?;
        task.attachments
            .extend(attachments_from(std::slice::from_ref(&request), &now_rfc3339()));

        let task = state.repo.update_task(&task).await?;
        reindex(&state, std::slice::from_ref(&task)).await;
        log_activity(&state, &viewer, "attached a file to", &task.title).await;
        Ok::<_, AppError>(task)
    }
    .await;
    respond(&state, revision_id, result).await
}

/// Fetch a task the viewer may see; hidden tasks read as missing.
pub(crate) async fn load_task(state: &AppState, viewer: &Viewer, id: &str) -> Result<Task, AppError> {
    let task = state
        .repo
        .get_task(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;
    viewer.require_visible(&task, "Task", id)?;
    Ok(task)
}

async fn load_assignee(
    state: &AppState,
    viewer: &Viewer,
    employee_id: &str,
) -> Result<Employee, AppError> {
    let employee = state
        .repo
        .get_employee(employee_id)
        .await?
        .filter(|e| e.is_active() && viewer.can_see(e))
        .ok_or_else(|| AppError::Validation(format!("Unknown assignee {}", employee_id)))?;
    Ok(employee)
}

async fn check_project(state: &AppState, project_id: Option<&str>) -> Result<(), AppError> {
    if let Some(project_id) = project_id {
        if state.repo.get_project(project_id).await?.is_none() {
            return Err(AppError::Validation(format!(
                "Unknown project {}",
                project_id
            )));
        }
    }
    Ok(())
}

pub(crate) fn new_task_id() -> String {
    format!("task-{}", uuid::Uuid::new_v4().simple())
}

fn attachments_from(attachments: &[NewAttachment], uploaded_at: &str) -> Vec<Attachment> {
    attachments
        .iter()
        .map(|a| Attachment {
            id: uuid::Uuid::new_v4().to_string(),
            name: a.name.clone(),
            url: a.url.clone(),
            kind: a.kind.clone(),
            uploaded_at: uploaded_at.to_string(),
        })
        .collect()
}

/// Refresh the search index for `tasks`; indexing failures are logged only.
pub(crate) async fn reindex(state: &AppState, tasks: &[Task]) {
    if let Err(e) = state.search.index_tasks(tasks).await {
        tracing::warn!("Failed to index tasks: {}", e);
    }
}
