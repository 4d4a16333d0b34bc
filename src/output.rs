use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Status, StatusCount, StatusRow, Task, User, UserTask, UserTaskCount};

#[derive(Serialize)]
pub struct TaskDetail<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub status: Option<Status>,
    pub owner: Option<&'a User>,
}

/// Status id -> name, for rendering `tasks.status_id`.
pub fn status_names(statuses: &[StatusRow]) -> HashMap<i64, Status> {
    statuses.iter().map(|s| (s.id, s.name)).collect()
}

fn status_icon(names: &HashMap<i64, Status>, status_id: i64) -> &'static str {
    names.get(&status_id).map_or("?", |s| s.icon())
}

fn description_suffix(task: &Task) -> String {
    match task.description.as_deref() {
        Some(d) if !d.is_empty() => format!("  {d}"),
        _ => String::new(),
    }
}

pub fn format_task_detail(task: &Task, status: Option<Status>, owner: Option<&User>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Id:          {}\n", task.id));
    out.push_str(&format!("Title:       {}\n", task.title));
    match status {
        Some(s) => out.push_str(&format!("Status:      {s}\n")),
        None => out.push_str(&format!("Status:      #{}\n", task.status_id)),
    }
    match owner {
        Some(u) => out.push_str(&format!("Owner:       {} <{}>\n", u.fullname, u.email)),
        None => out.push_str(&format!("Owner:       #{}\n", task.user_id)),
    }
    if task.has_description() {
        let desc = task.description.as_deref().unwrap_or_default();
        out.push_str(&format!("Description: {desc}\n"));
    }
    out
}

pub fn format_task_list(tasks: &[Task], names: &HashMap<i64, Status>) -> String {
    let mut out = String::new();
    for task in tasks {
        out.push_str(&format!(
            "{} #{} {} (user {}){}\n",
            status_icon(names, task.status_id),
            task.id,
            task.title,
            task.user_id,
            description_suffix(task)
        ));
    }
    out
}

pub fn format_user_list(users: &[User]) -> String {
    let mut out = String::new();
    for user in users {
        out.push_str(&format!("#{} {} <{}>\n", user.id, user.fullname, user.email));
    }
    out
}

pub fn format_user_tasks(rows: &[UserTask], names: &HashMap<i64, Status>) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!(
            "{} <{}>  {} #{} {}\n",
            row.user.fullname,
            row.user.email,
            status_icon(names, row.task.status_id),
            row.task.id,
            row.task.title
        ));
    }
    out
}

pub fn format_status_counts(counts: &[StatusCount]) -> String {
    let width = counts
        .iter()
        .map(|c| c.status.as_str().len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for c in counts {
        out.push_str(&format!("{:<width$}  {}\n", c.status.as_str(), c.count));
    }
    out
}

pub fn format_user_counts(counts: &[UserTaskCount]) -> String {
    let width = counts
        .iter()
        .map(|c| c.user.fullname.chars().count())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for c in counts {
        out.push_str(&format!(
            "#{} {:<width$}  {}\n",
            c.user.id, c.user.fullname, c.count
        ));
    }
    out
}

pub fn format_statuses(statuses: &[StatusRow]) -> String {
    let mut out = String::new();
    for s in statuses {
        out.push_str(&format!("{} {}\n", s.id, s.name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(id: i64, title: &str, desc: Option<&str>, status_id: i64) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: desc.map(|s| s.to_string()),
            status_id,
            user_id: 5,
        }
    }

    fn names() -> HashMap<i64, Status> {
        status_names(&[
            StatusRow { id: 1, name: Status::New },
            StatusRow { id: 2, name: Status::InProgress },
            StatusRow { id: 3, name: Status::Completed },
        ])
    }

    #[test]
    fn task_list_icons_and_descriptions() {
        let tasks = vec![
            make_task(1, "a", Some("desc A"), 2),
            make_task(2, "b", Some(""), 1),
            make_task(3, "c", None, 3),
        ];
        let out = format_task_list(&tasks, &names());
        assert_eq!(
            out,
            "* #1 a (user 5)  desc A\n. #2 b (user 5)\nx #3 c (user 5)\n"
        );
    }

    #[test]
    fn unknown_status_id_renders_placeholder() {
        let out = format_task_list(&[make_task(1, "a", None, 9)], &names());
        assert!(out.starts_with("? #1"));
    }

    #[test]
    fn detail_with_owner() {
        let task = make_task(4, "Write", Some("soon"), 1);
        let owner = User {
            id: 5,
            fullname: "Ann Lee".into(),
            email: "ann@example.com".into(),
        };
        let out = format_task_detail(&task, Some(Status::New), Some(&owner));
        assert!(out.contains("Status:      new\n"));
        assert!(out.contains("Owner:       Ann Lee <ann@example.com>\n"));
        assert!(out.contains("Description: soon\n"));
    }

    #[test]
    fn detail_omits_missing_description() {
        let task = make_task(4, "Write", Some(""), 1);
        let out = format_task_detail(&task, None, None);
        assert!(!out.contains("Description"));
        assert!(out.contains("Status:      #1\n"));
    }

    #[test]
    fn status_counts_aligned() {
        let out = format_status_counts(&[
            StatusCount { status: Status::New, count: 2 },
            StatusCount { status: Status::InProgress, count: 0 },
        ]);
        assert_eq!(out, "new          2\nin progress  0\n");
    }
}
