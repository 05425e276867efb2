//! Derived Views
//!
//! Pure read models computed from store snapshots: the kanban board, the
//! month calendar, dashboard figures and filters, and title search.

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{Category, Project, ProjectStatus, Task, TaskPatch, TaskStatus};
use crate::store::{SyncTicket, TaskStore};

/// Days shown by the calendar grid (six Sunday-first weeks)
pub const CALENDAR_CELLS: usize = 42;

#[derive(Debug, Clone, PartialEq)]
pub struct KanbanColumn {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

/// Tasks grouped by status, one column per status in board order
pub fn kanban(tasks: &[Task]) -> Vec<KanbanColumn> {
    TaskStatus::COLUMNS
        .into_iter()
        .map(|status| KanbanColumn {
            status,
            tasks: tasks.iter().filter(|t| t.status == status).cloned().collect(),
        })
        .collect()
}

/// Drop a card on a column. `None` if the task is unknown or already there.
pub fn move_to_column(store: &TaskStore, id: &str, status: TaskStatus) -> Option<SyncTicket> {
    let task = store.get(id)?;
    if task.status == status {
        return None;
    }
    Some(store.update(id, TaskPatch::new().status(status)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// False for the leading/trailing days from neighbouring months
    pub in_month: bool,
    pub tasks: Vec<Task>,
}

/// Month grid starting on the Sunday on or before the 1st.
///
/// Returns `None` for an invalid year/month.
pub fn month_grid(year: i32, month: u32, tasks: &[Task]) -> Option<Vec<CalendarDay>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let start = first - Duration::days(i64::from(first.weekday().num_days_from_sunday()));

    let grid = start
        .iter_days()
        .take(CALENDAR_CELLS)
        .map(|date| CalendarDay {
            date,
            in_month: date.month() == month && date.year() == year,
            tasks: tasks_on(tasks, date),
        })
        .collect();
    Some(grid)
}

/// Tasks scheduled on `date`, earliest time first (untimed tasks first)
pub fn tasks_on(tasks: &[Task], date: NaiveDate) -> Vec<Task> {
    let mut day: Vec<Task> = tasks
        .iter()
        .filter(|t| t.schedule.is_some_and(|s| s.date() == date))
        .cloned()
        .collect();
    day.sort_by_key(|t| t.schedule.and_then(|s| s.time()));
    day
}

/// Category/priority selection as offered by the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    /// `None` or "All" shows every category; matched case-insensitively
    pub category: Option<String>,
    /// Priority label ("High", "Low", ...); `None` shows every priority
    pub priority: Option<String>,
}

impl DashboardFilter {
    fn category_matches(&self, category: Category) -> bool {
        match self.category.as_deref().map(str::trim) {
            None => true,
            Some(label) if label.eq_ignore_ascii_case("all") => true,
            Some(label) => category.as_str().eq_ignore_ascii_case(label),
        }
    }

    fn priority_matches(&self, priority: &str) -> bool {
        self.priority.as_deref().map_or(true, |p| p == priority)
    }

    pub fn tasks(&self, tasks: &[Task]) -> Vec<Task> {
        tasks
            .iter()
            .filter(|t| self.category_matches(t.category) && self.priority_matches(t.priority.as_str()))
            .cloned()
            .collect()
    }

    pub fn projects(&self, projects: &[Project]) -> Vec<Project> {
        projects
            .iter()
            .filter(|p| self.category_matches(p.category) && self.priority_matches(p.priority.as_str()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    /// Rounded percentage of completed tasks; 0 for no tasks
    pub completion_percent: u32,
    pub open_tasks: usize,
    pub total_tasks: usize,
    pub active_projects: usize,
    pub completed_projects: usize,
}

impl DashboardStats {
    pub fn compute(tasks: &[Task], projects: &[Project]) -> Self {
        let done = tasks.iter().filter(|t| t.completed).count();
        let completion_percent = if tasks.is_empty() {
            0
        } else {
            ((done as f64 / tasks.len() as f64) * 100.0).round() as u32
        };
        let completed_projects = projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Completed)
            .count();
        Self {
            completion_percent,
            open_tasks: tasks.len() - done,
            total_tasks: tasks.len(),
            active_projects: projects.len() - completed_projects,
            completed_projects,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.projects.is_empty()
    }
}

/// Case-insensitive title match; a blank query matches nothing
pub fn search(query: &str, tasks: &[Task], projects: &[Project]) -> SearchResults {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return SearchResults::default();
    }
    SearchResults {
        tasks: tasks
            .iter()
            .filter(|t| t.title.to_lowercase().contains(&needle))
            .cloned()
            .collect(),
        projects: projects
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .cloned()
            .collect(),
    }
}
