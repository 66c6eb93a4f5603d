use plan_tool::day::NON_WORKING_DAY;
use plan_tool::{
    Calendar, CalendarView, DateTime, Plan, PlanError, Resource, Task, TaskField, TaskType,
    TaskValue, TimeSpan,
};

fn dt(text: &str) -> DateTime {
    text.parse().expect("valid date-time")
}

fn span(text: &str) -> TimeSpan {
    text.parse().expect("valid time span")
}

fn plan_starting(start: &str) -> Plan {
    let mut plan = Plan::new();
    plan.set_default_start(dt(start));
    plan
}

fn task(title: &str, duration: &str) -> Task {
    Task::new(title).with_duration(span(duration))
}

fn after(title: &str, duration: &str, predecessors: &str) -> Task {
    let mut task = task(title, duration);
    task.predecessors = predecessors.parse().expect("valid predecessors");
    task
}

fn fixed_period(title: &str, start: &str, end: &str) -> Task {
    let mut task = Task::new(title).with_type(TaskType::FixedPeriod);
    task.start = dt(start);
    task.end = dt(end);
    task
}

fn timing(plan: &Plan, index: usize) -> (DateTime, DateTime) {
    let task = plan.task(index).expect("task exists");
    (task.start, task.end)
}

#[test]
fn two_day_task_fills_monday_and_tuesday() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "2d")).expect("push");
    let summary = plan.schedule().expect("schedule");

    let t1 = plan.task(0).expect("task");
    assert_eq!(t1.start, dt("2024-01-01 08:00"));
    assert_eq!(t1.end, dt("2024-01-02 17:00"));
    assert_eq!(t1.duration, span("2d"));
    assert_eq!(t1.work, span("2d"));
    assert_eq!(summary.task_count, 1);
    assert_eq!(summary.finish, Some(dt("2024-01-02 17:00")));
}

#[test]
fn finish_start_at_a_period_edge_is_not_rounded() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "2d")).expect("push");
    plan.push_task(after("T2", "1d", "0")).expect("push");
    plan.schedule().expect("schedule");

    assert_eq!(timing(&plan, 1), (dt("2024-01-02 17:00"), dt("2024-01-03 17:00")));
}

#[test]
fn finish_start_inside_a_gap_rounds_forward() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(fixed_period("T1", "2024-01-01 08:00", "2024-01-01 12:30"))
        .expect("push");
    plan.push_task(after("T2", "1d", "0")).expect("push");
    plan.schedule().expect("schedule");

    assert_eq!(timing(&plan, 1), (dt("2024-01-01 13:00"), dt("2024-01-02 12:00")));
}

#[test]
fn unconstrained_start_rounds_up_to_monday() {
    let mut plan = plan_starting("2024-01-06 10:00");
    plan.push_task(task("T1", "1d")).expect("push");
    plan.schedule().expect("schedule");

    assert_eq!(timing(&plan, 0), (dt("2024-01-08 08:00"), dt("2024-01-08 17:00")));
}

#[test]
fn work_spills_over_the_weekend() {
    let mut plan = plan_starting("2024-01-05 13:00");
    plan.push_task(task("T1", "1d")).expect("push");
    plan.schedule().expect("schedule");

    assert_eq!(timing(&plan, 0), (dt("2024-01-05 13:00"), dt("2024-01-08 12:00")));
}

#[test]
fn milestone_after_a_predecessor_sits_on_a_working_instant() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(fixed_period("T1", "2024-01-01 08:00", "2024-01-01 12:30"))
        .expect("push");
    plan.push_task(after("Review", "0d", "0")).expect("push");
    let summary = plan.schedule().expect("schedule");

    let milestone = plan.task(1).expect("task");
    assert!(milestone.is_milestone());
    assert_eq!(milestone.start, milestone.end);
    assert_eq!(milestone.start, dt("2024-01-01 12:00"));
    let view = plan.default_calendar_view().expect("view");
    assert!(view.is_working_instant(milestone.start));
    assert_eq!(summary.milestone_count, 1);
}

#[test]
fn unconstrained_milestone_uses_the_default_start() {
    let mut plan = plan_starting("2024-01-06 10:00");
    plan.push_task(task("Kick-off", "0d")).expect("push");
    plan.schedule().expect("schedule");

    assert_eq!(timing(&plan, 0), (dt("2024-01-08 08:00"), dt("2024-01-08 08:00")));
}

#[test]
fn start_start_and_lag() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "2d")).expect("push");
    plan.push_task(after("Together", "1d", "0SS")).expect("push");
    plan.push_task(after("Later", "1d", "0+1d")).expect("push");
    plan.push_task(after("Overlap", "1d", "0-0.5d")).expect("push");
    plan.schedule().expect("schedule");

    assert_eq!(timing(&plan, 1), (dt("2024-01-01 08:00"), dt("2024-01-01 17:00")));
    assert_eq!(timing(&plan, 2), (dt("2024-01-03 17:00"), dt("2024-01-04 17:00")));
    assert_eq!(timing(&plan, 3), (dt("2024-01-02 13:00"), dt("2024-01-03 12:00")));
}

#[test]
fn finish_finish_pins_the_end() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "2d")).expect("push");
    plan.push_task(after("Wrap-up", "1d", "0FF")).expect("push");
    plan.schedule().expect("schedule");

    assert_eq!(timing(&plan, 1), (dt("2024-01-02 08:00"), dt("2024-01-02 17:00")));
}

#[test]
fn finish_limit_pushes_a_start_constrained_task_later() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("Short", "1d")).expect("push");
    plan.push_task(task("Long", "3d")).expect("push");
    plan.push_task(after("Both", "1d", "0, 1FF")).expect("push");
    plan.schedule().expect("schedule");

    // starts after Short, but may not finish before Long does
    assert_eq!(timing(&plan, 2), (dt("2024-01-03 08:00"), dt("2024-01-03 17:00")));
}

#[test]
fn start_on_task_waits_for_its_requested_start() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "1d")).expect("push");
    plan.push_task(after("Fixed date", "1d", "0").with_type(TaskType::StartOnFixedDuration))
        .expect("push");
    plan.set_task_value(1, TaskValue::Start(dt("2024-01-03 10:00")))
        .expect("start is editable for start-on tasks");
    plan.schedule().expect("schedule");
    assert_eq!(timing(&plan, 1), (dt("2024-01-03 10:00"), dt("2024-01-04 10:00")));

    // a predecessor finishing later wins over the requested start
    plan.set_task_value(0, TaskValue::Duration(span("5d"))).expect("duration");
    plan.schedule().expect("schedule");
    assert_eq!(timing(&plan, 1).0, dt("2024-01-05 17:00"));
}

#[test]
fn fixed_work_is_spread_over_assigned_resources() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.add_resource(Resource::new("AB", "Ann Baker")).expect("resource");
    plan.add_resource(Resource::new("CD", "Carl Dunn")).expect("resource");
    let mut digging = Task::new("Dig").with_type(TaskType::AsapFixedWork);
    digging.work = span("4d");
    digging.resources = "AB, CD".parse().expect("assignment");
    plan.push_task(digging).expect("push");

    assert_eq!(plan.assigned_units(0).expect("units"), 2.0);
    plan.schedule().expect("schedule");

    let dig = plan.task(0).expect("task");
    assert_eq!((dig.start, dig.end), (dt("2024-01-01 08:00"), dt("2024-01-02 17:00")));
    assert_eq!(dig.work, span("4d"));
    assert_eq!(dig.duration, span("2d"));
}

#[test]
fn fixed_period_derives_duration_and_ignores_predecessors() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "3d")).expect("push");
    let mut window = fixed_period("Window", "2024-01-02 08:00", "2024-01-02 12:00");
    window.predecessors = "0".parse().expect("predecessors");
    plan.push_task(window).expect("push");
    plan.schedule().expect("schedule");

    let window = plan.task(1).expect("task");
    assert_eq!((window.start, window.end), (dt("2024-01-02 08:00"), dt("2024-01-02 12:00")));
    assert_eq!(window.duration, span("0.5d"));
}

#[test]
fn summary_spans_its_children_and_passes_on_its_predecessors() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("Design", "1d")).expect("push");
    plan.push_task(after("Build", "1d", "0")).expect("push");
    let mut first = task("Frame", "2d");
    first.indent = 1;
    plan.push_task(first).expect("push");
    let mut second = after("Roof", "1d", "2");
    second.indent = 1;
    plan.push_task(second).expect("push");
    plan.push_task(after("Handover", "0d", "1")).expect("push");
    let summary = plan.schedule().expect("schedule");

    let build = plan.task(1).expect("task");
    assert!(build.is_summary());
    assert_eq!(plan.task(2).expect("task").parent(), Some(1));
    // children inherit Build's dependency on Design
    assert_eq!(timing(&plan, 2), (dt("2024-01-01 17:00"), dt("2024-01-03 17:00")));
    assert_eq!(timing(&plan, 3), (dt("2024-01-03 17:00"), dt("2024-01-04 17:00")));
    assert_eq!((build.start, build.end), (dt("2024-01-01 17:00"), dt("2024-01-04 17:00")));
    assert_eq!(build.work, span("3d"));
    assert_eq!(timing(&plan, 4), (dt("2024-01-04 17:00"), dt("2024-01-04 17:00")));
    assert_eq!(summary.summary_count, 1);
}

#[test]
fn deadlines_flag_late_tasks() {
    let mut plan = plan_starting("2024-01-01 08:00");
    let mut late = task("Late", "2d");
    late.deadline = Some(dt("2024-01-01 17:00"));
    plan.push_task(late).expect("push");
    let mut on_time = task("On time", "1d");
    on_time.deadline = Some(dt("2024-01-05 17:00"));
    plan.push_task(on_time).expect("push");

    let summary = plan.schedule().expect("schedule");
    assert_eq!(summary.late_tasks, vec![0]);
    assert_eq!(plan.late_tasks(), vec![0]);
}

#[test]
fn null_rows_are_skipped() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "1d")).expect("push");
    plan.push_task(Task::null()).expect("push");
    plan.push_task(after("T2", "1d", "0")).expect("push");
    let summary = plan.schedule().expect("schedule");

    assert_eq!(summary.task_count, 2);
    assert_eq!(timing(&plan, 2), (dt("2024-01-01 17:00"), dt("2024-01-02 17:00")));
}

#[test]
fn cycles_are_reported_and_nothing_changes() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("A", "1d")).expect("push");
    plan.push_task(after("B", "1d", "0")).expect("push");
    plan.push_task(task("C", "1d")).expect("push");
    plan.schedule().expect("schedule");
    let before = plan.clone();

    plan.set_task_text(0, TaskField::Predecessors as usize, "1")
        .expect("a cycle is only found when scheduling");
    let edited = plan.clone();
    match plan.schedule() {
        Err(PlanError::CyclicPredecessors { tasks }) => assert_eq!(tasks, vec![0, 1]),
        other => panic!("expected a cycle, got {other:?}"),
    }
    assert_eq!(plan, edited);
    assert_ne!(plan, before);
}

#[test]
fn calendar_without_working_time_aborts_the_pass() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "1d")).expect("push");
    plan.schedule().expect("schedule");
    let scheduled = plan.tasks().to_vec();

    let idle = Calendar::new("Idle", Calendar::builtin_anchor(), vec![NON_WORKING_DAY]).expect("calendar");
    let index = plan.add_calendar(idle).expect("add");
    plan.set_default_calendar(index).expect("default");
    let err = plan.schedule().expect_err("no working time");
    assert!(matches!(err, PlanError::NoWorkingTime { .. }));
    assert!(err.is_recoverable());
    assert_eq!(plan.tasks(), scheduled.as_slice());
}

#[test]
fn span_beyond_the_date_range_aborts_the_pass() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "1d")).expect("push");
    plan.schedule().expect("schedule");
    let scheduled = plan.tasks().to_vec();

    plan.push_task(after("Forever", "10000000000d", "0")).expect("push");
    let err = plan.schedule().expect_err("out of range");
    assert!(matches!(err, PlanError::SpanOutOfRange { .. }));
    assert!(err.is_recoverable());
    assert_eq!(&plan.tasks()[..1], scheduled.as_slice());
}

#[test]
fn evening_shift_tasks_end_at_midnight() {
    let mut plan = plan_starting("2024-01-01 18:00");
    plan.set_default_calendar(2).expect("default");
    plan.push_task(task("Late", "1d")).expect("push");
    plan.push_task(after("Later", "0.25d", "0")).expect("push");
    plan.schedule().expect("schedule");

    // 18:00-22:00 then 23:00-24:00 is five hours, so a work day spills into Tuesday.
    assert_eq!(timing(&plan, 0), (dt("2024-01-01 18:00"), dt("2024-01-02 21:00")));
    assert_eq!(plan.task(0).expect("task").duration, span("1d"));
    assert_eq!(timing(&plan, 1), (dt("2024-01-02 21:00"), dt("2024-01-03 00:00")));
    let view = plan.default_calendar_view().expect("view");
    let (start, end) = timing(&plan, 1);
    assert_eq!(view.work_between(start, end), span("0.25d"));
}

#[test]
fn scheduling_is_repeatable() {
    let mut plan = plan_starting("2024-01-01 08:00");
    plan.push_task(task("T1", "1.5d")).expect("push");
    plan.push_task(after("T2", "2d", "0")).expect("push");
    plan.schedule().expect("schedule");
    let first = plan.clone();
    plan.schedule().expect("schedule");
    assert_eq!(plan, first);
}

#[test]
fn calendar_view_matches_the_plan_default() {
    let plan = Plan::new();
    let view: CalendarView<'_> = plan.default_calendar_view().expect("view");
    assert_eq!(view.calendar().name(), "Standard");
}
