use plan_tool::{
    DateTime, Plan, PlanError, Resource, Task, TaskField, TaskType, TaskValue, TimeSpan,
};
use proptest::prelude::*;
use std::cmp::Ordering;

fn span(text: &str) -> TimeSpan {
    text.parse().expect("valid time span")
}

fn dt(text: &str) -> DateTime {
    text.parse().expect("valid date-time")
}

fn with_priority(title: &str, priority: u32, predecessors: &str) -> Task {
    let mut task = Task::new(title);
    task.priority = priority;
    task.predecessors = predecessors.parse().expect("valid predecessors");
    task
}

fn plan_of(tasks: Vec<Task>) -> Plan {
    let mut plan = Plan::new();
    for task in tasks {
        plan.push_task(task).expect("push");
    }
    plan
}

#[test]
fn predecessor_sorts_first_whatever_the_priority() {
    let plan = plan_of(vec![
        with_priority("Low", 1, ""),
        with_priority("High", 999, "0"),
    ]);
    assert_eq!(plan.compare_tasks(0, 1).expect("compare"), Ordering::Less);
    assert_eq!(plan.compare_tasks(1, 0).expect("compare"), Ordering::Greater);
    assert_eq!(plan.scheduling_order().expect("order"), vec![0, 1]);
}

#[test]
fn independent_tasks_sort_by_priority_then_index() {
    let plan = plan_of(vec![
        with_priority("A", 100, ""),
        with_priority("B", 500, ""),
        with_priority("C", 100, ""),
    ]);
    assert_eq!(plan.compare_tasks(1, 0).expect("compare"), Ordering::Less);
    assert_eq!(plan.compare_tasks(0, 2).expect("compare"), Ordering::Less);
    assert_eq!(plan.compare_tasks(2, 2).expect("compare"), Ordering::Equal);
    assert_eq!(plan.scheduling_order().expect("order"), vec![1, 0, 2]);
}

#[test]
fn summary_predecessors_order_the_children() {
    let mut child = with_priority("Child", 999, "");
    child.indent = 1;
    let plan = plan_of(vec![
        with_priority("Before", 1, ""),
        with_priority("Phase", 100, "0"),
        child,
    ]);
    assert!(plan.task(1).expect("task").is_summary());
    assert_eq!(plan.compare_tasks(0, 2).expect("compare"), Ordering::Less);
    // children are placed before the summary that wraps them
    assert_eq!(plan.compare_tasks(2, 1).expect("compare"), Ordering::Less);
}

#[test]
fn comparing_missing_tasks_is_an_error() {
    let plan = plan_of(vec![Task::new("Only")]);
    assert!(matches!(plan.compare_tasks(0, 3), Err(PlanError::InvalidArgument(_))));
}

proptest! {
    #[test]
    fn chains_ignore_priorities(priorities in prop::collection::vec(0u32..=999, 2..12)) {
        let tasks = priorities
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let predecessors = if i == 0 { String::new() } else { (i - 1).to_string() };
                with_priority(&format!("T{i}"), *p, &predecessors)
            })
            .collect();
        let plan = plan_of(tasks);
        for i in 1..priorities.len() {
            prop_assert_eq!(plan.compare_tasks(i - 1, i).expect("compare"), Ordering::Less);
        }
        let order = plan.scheduling_order().expect("order");
        prop_assert_eq!(order, (0..priorities.len()).collect::<Vec<_>>());
    }
}

#[test]
fn task_cells_read_and_write_through_text() {
    let mut plan = plan_of(vec![Task::new("Survey")]);
    plan.set_task_text(0, 1, "3d").expect("duration");
    assert_eq!(plan.task_text(0, 1).expect("text"), "3 d");
    plan.set_task_text(0, 0, "Site survey").expect("title");
    assert_eq!(plan.task(0).expect("task").title, "Site survey");
    plan.set_task_text(0, 8, "250").expect("priority");
    assert_eq!(plan.task_value(0, TaskField::Priority).expect("value"), TaskValue::Priority(250));
    plan.set_task_text(0, 9, "2024-02-01 17:00").expect("deadline");
    assert_eq!(plan.task(0).expect("task").deadline, Some(dt("2024-02-01 17:00")));
    plan.set_task_text(0, 11, "check access").expect("comment");
    assert_eq!(plan.task_text(0, 11).expect("text"), "check access");
}

#[test]
fn malformed_text_is_a_field_error_and_changes_nothing() {
    let mut plan = plan_of(vec![Task::new("Survey"), Task::new("Report")]);
    let before = plan.clone();

    match plan.set_task_text(0, 1, "soon") {
        Err(PlanError::Field { entity, index, field, .. }) => {
            assert_eq!((entity, index, field), ("task", 0, "Duration"));
        }
        other => panic!("expected a field error, got {other:?}"),
    }
    assert!(plan.set_task_text(1, 5, "1").is_err());
    assert!(plan.set_task_text(1, 5, "7").is_err());
    assert!(plan.set_task_text(0, 1, "-1d").is_err());
    assert!(plan.set_task_text(0, 8, "1000").is_err());
    assert_eq!(plan, before);
}

#[test]
fn unknown_sections_are_invalid_arguments() {
    let mut plan = plan_of(vec![Task::new("Survey")]);
    let err = plan.set_task_text(0, 12, "x").unwrap_err();
    assert!(matches!(err, PlanError::InvalidArgument(_)));
    assert!(!err.is_recoverable());
    assert!(plan.task_text(0, 99).is_err());
}

#[test]
fn editability_follows_the_task_type() {
    let mut plan = plan_of(vec![
        Task::new("Asap"),
        Task::new("Window").with_type(TaskType::FixedPeriod),
        Task::new("Effort").with_type(TaskType::AsapFixedWork),
        Task::new("Dated").with_type(TaskType::StartOnFixedDuration),
    ]);
    assert!(!plan.is_task_editable(0, TaskField::Start));
    assert!(!plan.is_task_editable(0, TaskField::End));
    assert!(plan.is_task_editable(0, TaskField::Duration));
    assert!(!plan.is_task_editable(0, TaskField::Work));

    assert!(plan.is_task_editable(1, TaskField::Start));
    assert!(plan.is_task_editable(1, TaskField::End));

    assert!(plan.is_task_editable(2, TaskField::Work));
    assert!(!plan.is_task_editable(2, TaskField::Duration));

    assert!(plan.is_task_editable(3, TaskField::Start));
    assert!(!plan.is_task_editable(3, TaskField::End));

    let err = plan.set_task_text(0, 2, "2024-01-01 08:00").unwrap_err();
    assert!(matches!(err, PlanError::InvalidArgument(_)));
}

#[test]
fn summaries_and_null_rows_lock_fields() {
    let mut child = Task::new("Child");
    child.indent = 1;
    let plan = plan_of(vec![Task::new("Phase"), child, Task::null()]);

    assert!(plan.task(0).expect("task").is_summary());
    for field in [
        TaskField::Duration,
        TaskField::Start,
        TaskField::End,
        TaskField::Work,
        TaskField::Type,
        TaskField::Priority,
    ] {
        assert!(!plan.is_task_editable(0, field), "{field:?}");
    }
    assert!(plan.is_task_editable(0, TaskField::Title));
    assert!(plan.is_task_editable(0, TaskField::Predecessors));

    assert!(plan.is_task_editable(2, TaskField::Title));
    assert!(!plan.is_task_editable(2, TaskField::Duration));
    assert_eq!(plan.task_text(2, 1).expect("text"), "");
}

#[test]
fn switching_to_start_on_keeps_the_current_start() {
    let mut plan = plan_of(vec![Task::new("Dated")]);
    plan.schedule().expect("schedule");
    let start = plan.task(0).expect("task").start;
    plan.set_task_text(0, 7, "SON_FDUR").expect("type");
    let task = plan.task(0).expect("task");
    assert_eq!(task.task_type, TaskType::StartOnFixedDuration);
    assert_eq!(task.start_on, Some(start));
}

#[test]
fn start_on_before_the_first_pass_uses_the_default_start() {
    let mut plan = plan_of(vec![Task::new("Fresh")]);
    plan.set_default_start(dt("2024-01-01 08:00"));
    plan.set_task_text(0, 7, "SON_FDUR").expect("type");
    assert_eq!(plan.task(0).expect("task").start_on, Some(dt("2024-01-01 08:00")));

    plan.schedule().expect("schedule");
    let task = plan.task(0).expect("task");
    assert_eq!(task.start, dt("2024-01-01 08:00"));
    assert_eq!(task.end, dt("2024-01-01 17:00"));
}

#[test]
fn inserting_shifts_predecessor_references() {
    let mut plan = plan_of(vec![
        Task::new("A"),
        with_priority("B", 100, "0"),
        with_priority("C", 100, "1"),
    ]);
    plan.insert_task(1, Task::new("New")).expect("insert");
    assert_eq!(plan.task_count(), 4);
    assert_eq!(plan.task_text(2, 5).expect("text"), "0");
    assert_eq!(plan.task_text(3, 5).expect("text"), "2");
    for (i, task) in plan.tasks().iter().enumerate() {
        assert_eq!(task.index(), i);
    }
}

#[test]
fn removing_drops_references_to_the_removed_task() {
    let mut plan = plan_of(vec![
        Task::new("A"),
        with_priority("B", 100, "0"),
        with_priority("C", 100, "0, 1"),
    ]);
    let removed = plan.remove_task(1).expect("remove");
    assert_eq!(removed.title, "B");
    assert_eq!(plan.task_text(1, 0).expect("text"), "C");
    assert_eq!(plan.task_text(1, 5).expect("text"), "0");
    assert!(plan.remove_task(5).is_err());
}

#[test]
fn moving_keeps_references_on_the_same_tasks() {
    let mut plan = plan_of(vec![
        Task::new("A"),
        Task::new("B"),
        with_priority("C", 100, "0"),
    ]);
    plan.move_task(0, 2).expect("move");
    let titles: Vec<&str> = plan.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["B", "C", "A"]);
    assert_eq!(plan.task_text(1, 5).expect("text"), "2");
}

#[test]
fn indent_and_outdent_rebuild_summaries() {
    let mut plan = plan_of(vec![Task::new("Phase"), Task::new("Step"), Task::new("Next")]);
    assert!(plan.indent_task(0).is_err());

    plan.indent_task(1).expect("indent");
    assert!(plan.task(0).expect("task").is_summary());
    assert_eq!(plan.task(0).expect("task").summary_range(), Some(1..2));
    assert_eq!(plan.task(1).expect("task").parent(), Some(0));
    assert!(plan.indent_task(1).is_err());

    plan.indent_task(2).expect("indent");
    assert_eq!(plan.task(0).expect("task").summary_range(), Some(1..3));

    plan.outdent_task(1).expect("outdent");
    assert!(!plan.task(0).expect("task").is_summary());
    assert!(plan.task(1).expect("task").is_summary());
    assert!(plan.outdent_task(0).is_err());
}

#[test]
fn loaded_indents_are_clamped_under_the_task_above() {
    let mut deep = Task::new("Deep");
    deep.indent = 4;
    let plan = plan_of(vec![Task::new("Top"), deep]);
    assert_eq!(plan.task(1).expect("task").indent, 1);
}

#[test]
fn day_cells() {
    let mut plan = Plan::new();
    assert_eq!(plan.day_text(0, 0).expect("name"), "Standard work day");
    assert_eq!(plan.day_text(0, 1).expect("work"), "1 d");
    assert_eq!(plan.day_text(0, 2).expect("periods"), "2");
    assert_eq!(plan.day_text(0, 3).expect("start"), "08:00");
    assert_eq!(plan.day_text(0, 6).expect("end"), "17:00");

    plan.set_day_text(0, 6, "18:00").expect("end");
    assert_eq!(plan.day_text(0, 1).expect("work"), "1.13 d");
    assert!(plan.set_day_text(0, 1, "2d").is_err());
    assert!(plan.set_day_text(0, 3, "13:30").is_err(), "start must stay before end");
    assert_eq!(plan.day_text(0, 3).expect("start"), "08:00");
}

#[test]
fn calendar_cells() {
    let mut plan = Plan::new();
    assert_eq!(plan.calendar_text(0, 0).expect("name"), "Standard");
    assert_eq!(plan.calendar_text(0, 1).expect("anchor"), "2000-01-03");
    assert_eq!(plan.calendar_text(0, 3).expect("cycle"), "7");
    assert_eq!(plan.calendar_text(0, 4).expect("monday"), "Standard work day");
    assert_eq!(plan.calendar_text(0, 9).expect("saturday"), "Non working");

    plan.set_calendar_text(0, 9, "Short day").expect("saturday");
    assert_eq!(plan.calendar_text(0, 9).expect("saturday"), "Short day");
    assert!(plan.set_calendar_text(0, 9, "No such day").is_err());
    assert!(plan.set_calendar_text(0, 2, "3").is_err());

    let holiday = "2024-12-25".parse().expect("date");
    plan.set_calendar_exception(0, holiday, Some(1)).expect("exception");
    assert_eq!(plan.calendar_text(0, 2).expect("exceptions"), "1");
    assert!(plan.set_calendar_exception(0, holiday, Some(42)).is_err());
}

#[test]
fn resource_cells() {
    let mut plan = Plan::new();
    let index = plan.add_resource(Resource::new("AB", "Ann Baker")).expect("add");
    plan.set_resource_text(index, 8, "0.5").expect("available");
    assert_eq!(plan.resource(index).expect("resource").available, 0.5);
    plan.set_resource_text(index, 10, "Part Time").expect("calendar");
    assert_eq!(plan.resource(index).expect("resource").calendar, Some(3));
    assert_eq!(plan.resource_text(index, 10).expect("calendar"), "Part Time");
    assert!(plan.set_resource_text(index, 10, "Nights").is_err());
    assert!(plan.set_resource_text(index, 8, "lots").is_err());
}

#[test]
fn fixed_work_units_come_from_matching_resources() {
    let mut plan = Plan::new();
    let mut half = Resource::new("AB", "Ann Baker");
    half.available = 0.5;
    half.group = "Crew".to_string();
    plan.add_resource(half).expect("add");
    plan.add_resource(Resource::new("CD", "Carl Dunn")).expect("add");

    let mut task = Task::new("Dig").with_type(TaskType::AsapFixedWork);
    task.work = span("3d");
    task.resources = "crew".parse().expect("assignment");
    plan.push_task(task).expect("push");
    assert_eq!(plan.assigned_units(0).expect("units"), 0.5);

    plan.set_task_text(0, 6, "AB, CD[0.5]").expect("resources");
    assert_eq!(plan.assigned_units(0).expect("units"), 1.0);

    plan.set_task_text(0, 6, "").expect("resources");
    assert_eq!(plan.assigned_units(0).expect("units"), 1.0);
}

#[test]
fn resource_window_and_calendar_leave_the_schedule_alone() {
    let mut plan = Plan::new();
    plan.set_default_start(dt("2024-01-01 08:00"));
    let mut nights = Resource::new("NW", "Nina White");
    nights.start = Some(dt("2025-06-01 00:00"));
    nights.end = Some(dt("2025-06-30 00:00"));
    nights.calendar = Some(2);
    plan.add_resource(nights).expect("add");

    let mut task = Task::new("Paint").with_type(TaskType::AsapFixedWork);
    task.work = span("2d");
    task.resources = "NW".parse().expect("assignment");
    plan.push_task(task).expect("push");
    assert_eq!(plan.assigned_units(0).expect("units"), 1.0);

    plan.schedule().expect("schedule");
    let task = plan.task(0).expect("task");
    assert_eq!(task.start, dt("2024-01-01 08:00"));
    assert_eq!(task.end, dt("2024-01-02 17:00"));
    assert_eq!(plan.resource_text(0, 10).expect("calendar"), "Evening");
}
