//! Sprint model with its lifecycle and extension ledger.
//!
//! Lifecycle: `PLANNED -> ACTIVE -> CLOSED`, with `CLOSED -> ACTIVE` reserved
//! for ADMIN. Every method leaves the sprint untouched when it returns an
//! error, so a refused action is a no-op.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Role;

/// Days before the end date at which an active sprint counts as expiring.
pub const EXPIRY_WARNING_DAYS: i64 = 3;

/// Default length of a new sprint when no end date is given.
pub const DEFAULT_SPRINT_DAYS: i64 = 14;

wire_enum! {
    pub enum SprintStatus {
        Planned => "PLANNED",
        Active => "ACTIVE",
        Closed => "CLOSED",
    }
}

/// Immutable record of one end-date change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SprintExtension {
    pub id: String,
    pub old_end_date: NaiveDate,
    pub new_end_date: NaiveDate,
    pub reason: String,
    pub extended_at: String,
    pub extended_by: String,
}

/// A time-boxed work cycle of one project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SprintStatus,
    pub project_id: String,
    /// Append-only, oldest first
    #[serde(default)]
    pub extensions: Vec<SprintExtension>,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Lifecycle actions a manager can take on a sprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprintAction {
    Activate,
    Close,
    Reopen,
    Extend,
}

impl SprintAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintAction::Activate => "activate",
            SprintAction::Close => "close",
            SprintAction::Reopen => "reopen",
            SprintAction::Extend => "extend",
        }
    }

    /// Whether `role` may perform this action at all.
    pub fn permitted_for(&self, role: Role) -> bool {
        match self {
            SprintAction::Activate | SprintAction::Close => role.is_manager(),
            SprintAction::Reopen | SprintAction::Extend => role.is_admin(),
        }
    }
}

/// Why a lifecycle action was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SprintLifecycleError {
    /// The acting role may not perform the action
    NotPermitted { action: SprintAction, role: Role },
    /// No action leads from the current status to the requested one
    NotApplicable {
        from: SprintStatus,
        to: SprintStatus,
    },
    /// Extensions are only recorded while the sprint is active
    NotActive(SprintStatus),
}

impl std::fmt::Display for SprintLifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SprintLifecycleError::NotPermitted { action, role } => {
                write!(f, "Role {} may not {} a sprint", role, action.as_str())
            }
            SprintLifecycleError::NotApplicable { from, to } => {
                write!(f, "Sprint cannot move from {} to {}", from, to)
            }
            SprintLifecycleError::NotActive(status) => {
                write!(f, "Only active sprints can be extended (sprint is {})", status)
            }
        }
    }
}

impl std::error::Error for SprintLifecycleError {}

impl Sprint {
    /// The action that moves this sprint to `target`, if any.
    pub fn action_towards(&self, target: SprintStatus) -> Option<SprintAction> {
        match (self.status, target) {
            (SprintStatus::Planned, SprintStatus::Active) => Some(SprintAction::Activate),
            (SprintStatus::Active, SprintStatus::Closed) => Some(SprintAction::Close),
            (SprintStatus::Closed, SprintStatus::Active) => Some(SprintAction::Reopen),
            _ => None,
        }
    }

    /// Move the sprint to `target` on behalf of `role`.
    ///
    /// Returns the action that was applied.
    pub fn transition_to(
        &mut self,
        target: SprintStatus,
        role: Role,
    ) -> Result<SprintAction, SprintLifecycleError> {
        let action = self
            .action_towards(target)
            .ok_or(SprintLifecycleError::NotApplicable {
                from: self.status,
                to: target,
            })?;

        if !action.permitted_for(role) {
            return Err(SprintLifecycleError::NotPermitted { action, role });
        }

        self.status = target;
        Ok(action)
    }

    /// Re-open a closed sprint. ADMIN only.
    pub fn reopen(&mut self, role: Role) -> Result<SprintAction, SprintLifecycleError> {
        self.transition_to(SprintStatus::Active, role)
    }

    /// Push the end date out and append the change to the ledger.
    ///
    /// The new date is not required to be later than the old one.
    pub fn extend(
        &mut self,
        role: Role,
        extended_by: &str,
        new_end_date: NaiveDate,
        reason: &str,
        extended_at: String,
    ) -> Result<&SprintExtension, SprintLifecycleError> {
        if !SprintAction::Extend.permitted_for(role) {
            return Err(SprintLifecycleError::NotPermitted {
                action: SprintAction::Extend,
                role,
            });
        }
        if self.status != SprintStatus::Active {
            return Err(SprintLifecycleError::NotActive(self.status));
        }

        self.extensions.push(SprintExtension {
            id: uuid::Uuid::new_v4().to_string(),
            old_end_date: self.end_date,
            new_end_date,
            reason: reason.to_string(),
            extended_at,
            extended_by: extended_by.to_string(),
        });
        self.end_date = new_end_date;

        Ok(&self.extensions[self.extensions.len() - 1])
    }

    /// Whole days from `today` until the end date; negative once overdue.
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days()
    }

    pub fn is_expiring_soon(&self, today: NaiveDate) -> bool {
        let days = self.days_remaining(today);
        self.status == SprintStatus::Active && (0..=EXPIRY_WARNING_DAYS).contains(&days)
    }
}

/// A sprint with its schedule indicators for the current day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintView {
    #[serde(flatten)]
    pub sprint: Sprint,
    pub days_remaining: i64,
    pub expiring_soon: bool,
}

impl SprintView {
    pub fn new(sprint: Sprint, today: NaiveDate) -> Self {
        Self {
            days_remaining: sprint.days_remaining(today),
            expiring_soon: sprint.is_expiring_soon(today),
            sprint,
        }
    }
}

/// Request body for planning a new sprint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSprintRequest {
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl CreateSprintRequest {
    /// Start and end dates, defaulting to a two-week sprint starting `today`.
    pub fn schedule(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = self.start_date.unwrap_or(today);
        let end = self
            .end_date
            .unwrap_or(start + Duration::days(DEFAULT_SPRINT_DAYS));
        (start, end)
    }
}

/// Request body for a lifecycle change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintStatusRequest {
    pub status: SprintStatus,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request body for rescheduling an active sprint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendSprintRequest {
    pub new_end_date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sprint(status: SprintStatus) -> Sprint {
        Sprint {
            id: "spr-1".to_string(),
            name: "Foundation design, phase 1".to_string(),
            start_date: date(2024, 5, 1),
            end_date: date(2024, 5, 30),
            status,
            project_id: "proj-1".to_string(),
            extensions: Vec::new(),
            created_at: "2024-05-01T00:00:00+00:00".to_string(),
            updated_at: "2024-05-01T00:00:00+00:00".to_string(),
            version: 1,
        }
    }

    const ALL_ROLES: [Role; 4] = [
        Role::Admin,
        Role::DeptManager,
        Role::TeamLeader,
        Role::Employee,
    ];

    #[test]
    fn test_managers_activate_and_close() {
        for role in [Role::Admin, Role::DeptManager] {
            let mut s = sprint(SprintStatus::Planned);
            assert_eq!(
                s.transition_to(SprintStatus::Active, role),
                Ok(SprintAction::Activate)
            );
            assert_eq!(
                s.transition_to(SprintStatus::Closed, role),
                Ok(SprintAction::Close)
            );
            assert_eq!(s.status, SprintStatus::Closed);
        }
    }

    #[test]
    fn test_staff_cannot_activate() {
        for role in [Role::TeamLeader, Role::Employee] {
            let mut s = sprint(SprintStatus::Planned);
            let before = s.clone();
            assert!(matches!(
                s.transition_to(SprintStatus::Active, role),
                Err(SprintLifecycleError::NotPermitted { .. })
            ));
            assert_eq!(s, before);
        }
    }

    #[test]
    fn test_reopen_is_admin_only() {
        for role in ALL_ROLES {
            let mut s = sprint(SprintStatus::Closed);
            let before = s.clone();
            let result = s.reopen(role);
            if role == Role::Admin {
                assert_eq!(result, Ok(SprintAction::Reopen));
                assert_eq!(s.status, SprintStatus::Active);
            } else {
                assert!(result.is_err());
                assert_eq!(s, before);
            }
        }
    }

    #[test]
    fn test_planned_cannot_close_directly() {
        let mut s = sprint(SprintStatus::Planned);
        assert_eq!(
            s.transition_to(SprintStatus::Closed, Role::Admin),
            Err(SprintLifecycleError::NotApplicable {
                from: SprintStatus::Planned,
                to: SprintStatus::Closed,
            })
        );
        assert_eq!(s.status, SprintStatus::Planned);
    }

    #[test]
    fn test_extend_appends_one_entry() {
        let mut s = sprint(SprintStatus::Active);
        let old_end = s.end_date;
        let new_end = date(2024, 6, 10);

        let entry = s
            .extend(
                Role::Admin,
                "emp-1",
                new_end,
                "Client changed the facade",
                "2024-05-28T10:00:00+00:00".to_string(),
            )
            .unwrap()
            .clone();

        assert_eq!(s.extensions.len(), 1);
        assert_eq!(s.end_date, new_end);
        assert_eq!(entry.old_end_date, old_end);
        assert_eq!(entry.new_end_date, new_end);
        assert_eq!(entry.extended_by, "emp-1");

        let second_end = date(2024, 6, 20);
        s.extend(
            Role::Admin,
            "emp-1",
            second_end,
            "Permit delay",
            "2024-06-09T10:00:00+00:00".to_string(),
        )
        .unwrap();
        assert_eq!(s.extensions.len(), 2);
        assert_eq!(s.extensions[1].old_end_date, new_end);
        assert_eq!(s.extensions[0], entry);
    }

    #[test]
    fn test_extend_allows_earlier_date() {
        let mut s = sprint(SprintStatus::Active);
        let earlier = date(2024, 5, 20);
        s.extend(Role::Admin, "emp-1", earlier, "Scope cut", String::new())
            .unwrap();
        assert_eq!(s.end_date, earlier);
    }

    #[test]
    fn test_extend_refusals_are_no_ops() {
        let mut s = sprint(SprintStatus::Active);
        let before = s.clone();
        assert!(s
            .extend(Role::DeptManager, "emp-2", date(2024, 6, 1), "late", String::new())
            .is_err());
        assert_eq!(s, before);

        let mut planned = sprint(SprintStatus::Planned);
        let before = planned.clone();
        assert_eq!(
            planned
                .extend(Role::Admin, "emp-1", date(2024, 6, 1), "late", String::new())
                .unwrap_err(),
            SprintLifecycleError::NotActive(SprintStatus::Planned)
        );
        assert_eq!(planned, before);
    }

    #[test]
    fn test_expiry_window() {
        let s = sprint(SprintStatus::Active);
        assert_eq!(s.days_remaining(date(2024, 5, 27)), 3);
        assert!(s.is_expiring_soon(date(2024, 5, 27)));
        assert!(s.is_expiring_soon(date(2024, 5, 30)));
        assert!(!s.is_expiring_soon(date(2024, 5, 26)));
        assert!(!s.is_expiring_soon(date(2024, 5, 31)));

        let planned = sprint(SprintStatus::Planned);
        assert!(!planned.is_expiring_soon(date(2024, 5, 29)));
    }

    #[test]
    fn test_default_schedule_is_two_weeks() {
        let request = CreateSprintRequest {
            name: "Interior".to_string(),
            project_id: "proj-2".to_string(),
            start_date: None,
            end_date: None,
        };
        let (start, end) = request.schedule(date(2024, 6, 1));
        assert_eq!(start, date(2024, 6, 1));
        assert_eq!(end, date(2024, 6, 15));
    }
}
