use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use schedule_allocation::allocation::{
    AllocationId, Direction, EffortAllocator, ResourceAllocation, TaskWindow,
};
use schedule_allocation::config::EngineConfig;
use schedule_allocation::effort::{EffortDuration, ResourcesPerDay};
use schedule_allocation::load::LoadChart;
use schedule_allocation::persistence::{
    self, Scenario, save_assignments_to_csv, save_assignments_to_json, save_load_periods_to_csv,
};
use schedule_allocation::queue::{
    DateAndHour, DependencyKind, LimitingResourceQueue, LimitingResourceQueueElement,
    QueueDependency, QueueElementId, QueueId,
};
use schedule_allocation::resource::{Criterion, CriterionSatisfaction, Resource, ResourceId};
use tracing_subscriber::{EnvFilter, fmt::Subscriber};

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if cell.len() > widths[ci] {
                widths[ci] = cell.len();
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&widths, headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(&widths, row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn render_row<'c>(widths: &[usize], cells: impl Iterator<Item = &'c str>) -> String {
    let mut line = String::from("|");
    for (ci, cell) in cells.enumerate() {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
        line.push_str(" |");
    }
    line
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  load <scenario.json>               Load resources, calendars and settings\n  config <config.json>               Load engine settings\n  resource <id> <name> [limiting]    Add a resource on the default working week\n  satisfy <id> <kind:name> <YYYY-MM-DD> [YYYY-MM-DD]\n                                     Resource satisfies a criterion from a date\n  resources                          List resources\n  allocate <target> <rpd> <YYYY-MM-DD> <YYYY-MM-DD>\n                                     Allocate over a whole interval\n  until <target> <rpd> <YYYY-MM-DD> <effort>\n                                     Allocate forwards until effort is reached\n  back <target> <rpd> <YYYY-MM-DD> <effort>\n                                     Allocate backwards from an end date\n  show                               Show allocations\n  days <allocation>                  Show day assignments of an allocation\n  chart                              Show load periods per resource\n  export assignments <csv|json> <path>\n  export load <path>\n  queue add <allocation>             Queue an allocation of a limiting resource\n  queue place <element> <YYYY-MM-DD> <hour> <YYYY-MM-DD> <hour>\n  queue detach <element>\n  queue dep <origin> <destiny> [es|ss|ee|se]\n  queue show\n  quit|exit                          Exit\n\n  <target> is a resource id (specific) or kind:name[,kind:name] (generic)."
    );
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_criterion(s: &str) -> Option<Criterion> {
    let (kind, name) = s.split_once(':')?;
    if kind.is_empty() || name.is_empty() {
        return None;
    }
    Some(Criterion::new(kind, name))
}

fn parse_dependency_kind(s: Option<&str>) -> Option<DependencyKind> {
    match s.map(str::to_ascii_lowercase).as_deref() {
        None | Some("es") => Some(DependencyKind::EndStart),
        Some("ss") => Some(DependencyKind::StartStart),
        Some("ee") => Some(DependencyKind::EndEnd),
        Some("se") => Some(DependencyKind::StartEnd),
        _ => None,
    }
}

struct Session {
    scenario: Scenario,
    allocations: Vec<ResourceAllocation>,
    queues: BTreeMap<ResourceId, LimitingResourceQueue>,
    next_element: u32,
}

impl Session {
    fn new() -> Self {
        Self {
            scenario: Scenario::default(),
            allocations: Vec::new(),
            queues: BTreeMap::new(),
            next_element: 1,
        }
    }

    fn next_allocation_id(&self) -> AllocationId {
        AllocationId(self.allocations.iter().map(|a| a.id().0).max().unwrap_or(0) + 1)
    }

    fn new_allocation(&self, target: &str, task: TaskWindow) -> Result<ResourceAllocation, String> {
        let id = self.next_allocation_id();
        if let Ok(raw) = target.parse::<u32>() {
            let resource = self
                .scenario
                .resource(ResourceId(raw))
                .ok_or_else(|| format!("Unknown resource {raw}"))?;
            return Ok(ResourceAllocation::specific(id, Arc::clone(resource), task));
        }
        let criteria: Vec<Criterion> = target
            .split(',')
            .map(|c| parse_criterion(c.trim()))
            .collect::<Option<_>>()
            .ok_or_else(|| format!("Invalid target '{target}'"))?;
        let resources = self.scenario.resources_satisfying(&criteria);
        Ok(ResourceAllocation::generic(id, criteria, resources, task))
    }

    fn allocation_rows(&self) -> Vec<Vec<String>> {
        self.allocations
            .iter()
            .map(|a| {
                vec![
                    a.id().to_string(),
                    a.resources()
                        .iter()
                        .map(|r| r.id().to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                    a.start().to_string(),
                    a.end().to_string(),
                    a.resources_per_day()
                        .map(|r| r.to_string())
                        .unwrap_or_default(),
                    a.assigned_effort().to_string(),
                ]
            })
            .collect()
    }

    fn show_allocations(&self) {
        println!(
            "{}",
            render_table(
                &["id", "resources", "start", "end", "rpd", "assigned"],
                &self.allocation_rows()
            )
        );
    }

    fn show_resources(&self) {
        let rows: Vec<Vec<String>> = self
            .scenario
            .resources
            .iter()
            .map(|r| {
                vec![
                    r.id().to_string(),
                    r.name().to_string(),
                    r.calendar().name().to_string(),
                    r.satisfactions()
                        .iter()
                        .map(|s| s.criterion.to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                    r.is_limiting().to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            render_table(&["id", "name", "calendar", "criteria", "limiting"], &rows)
        );
    }

    fn show_queues(&self) {
        let mut rows = Vec::new();
        for queue in self.queues.values() {
            for element in queue.elements() {
                let position = |p: Option<DateAndHour>| p.map(|p| p.to_string()).unwrap_or_default();
                rows.push(vec![
                    queue.id().to_string(),
                    queue.resource().to_string(),
                    element.id().to_string(),
                    element.allocation().id().to_string(),
                    position(element.start_time()),
                    position(element.end_time()),
                ]);
            }
        }
        println!(
            "{}",
            render_table(&["queue", "resource", "element", "allocation", "start", "end"], &rows)
        );
    }

    fn queue_of(&mut self, element: QueueElementId) -> Option<&mut LimitingResourceQueue> {
        self.queues.values_mut().find(|q| q.get(element).is_some())
    }
}

fn main() {
    let _ = Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let mut session = Session::new();

    println!("Allocation Tool (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "load" => match parts.next() {
                Some(path) => match persistence::load_scenario_from_json(path) {
                    Ok(scenario) => {
                        println!(
                            "Scenario loaded from {path}: {} resources, {} calendars.",
                            scenario.resources.len(),
                            scenario.calendars.len()
                        );
                        session.scenario = scenario;
                        session.allocations.clear();
                        session.queues.clear();
                    }
                    Err(e) => println!("Error: {e}"),
                },
                None => println!("Usage: load <scenario.json>"),
            },
            "config" => match parts.next() {
                Some(path) => match EngineConfig::load_from_path(path) {
                    Ok(config) => {
                        println!(
                            "Config loaded: lookahead {} days, {}h default day.",
                            config.max_lookahead_days, config.default_daily_hours
                        );
                        session.scenario.config = config;
                    }
                    Err(e) => println!("Error: {e}"),
                },
                None => println!("Usage: config <config.json>"),
            },
            "resource" => {
                let id_s = parts.next();
                let name = parts.next();
                let limiting = parts.next() == Some("limiting");
                match (id_s, name) {
                    (Some(id_s), Some(name)) => {
                        let id: u32 = match id_s.parse() { Ok(v) => v, Err(_) => { println!("Invalid id"); continue; } };
                        if session.scenario.resource(ResourceId(id)).is_some() {
                            println!("Resource {} already exists.", ResourceId(id));
                            continue;
                        }
                        let resource = Resource::new(ResourceId(id), name).limiting(limiting);
                        session.scenario.resources.push(Arc::new(resource));
                        println!("Added resource {}.", ResourceId(id));
                    }
                    _ => println!("Usage: resource <id> <name> [limiting]"),
                }
            }
            "satisfy" => {
                let id_s = parts.next();
                let criterion_s = parts.next();
                let start_s = parts.next();
                let end_s = parts.next();
                match (id_s, criterion_s, start_s) {
                    (Some(id_s), Some(criterion_s), Some(start_s)) => {
                        let id: u32 = match id_s.parse() { Ok(v) => v, Err(_) => { println!("Invalid id"); continue; } };
                        let criterion = match parse_criterion(criterion_s) { Some(c) => c, None => { println!("Invalid criterion (kind:name)"); continue; } };
                        let start = match parse_date(start_s) { Some(d) => d, None => { println!("Invalid date (YYYY-MM-DD)"); continue; } };
                        let end = match end_s.map(parse_date) {
                            None => None,
                            Some(Some(d)) => Some(d),
                            Some(None) => { println!("Invalid date (YYYY-MM-DD)"); continue; }
                        };
                        let Some(position) = session.scenario.resources.iter().position(|r| r.id() == ResourceId(id)) else {
                            println!("Unknown resource {id}");
                            continue;
                        };
                        let updated = session.scenario.resources[position]
                            .as_ref()
                            .clone()
                            .with_satisfaction(CriterionSatisfaction::new(criterion.clone(), start, end));
                        session.scenario.resources[position] = Arc::new(updated);
                        println!("{} satisfies {criterion}.", ResourceId(id));
                    }
                    _ => println!("Usage: satisfy <id> <kind:name> <YYYY-MM-DD> [YYYY-MM-DD]"),
                }
            }
            "resources" => session.show_resources(),
            "allocate" | "until" | "back" => {
                let target = parts.next();
                let rpd_s = parts.next();
                let first_s = parts.next();
                let second_s = parts.next();
                let (Some(target), Some(rpd_s), Some(first_s), Some(second_s)) = (target, rpd_s, first_s, second_s) else {
                    match cmd {
                        "allocate" => println!("Usage: allocate <target> <rpd> <YYYY-MM-DD> <YYYY-MM-DD>"),
                        "until" => println!("Usage: until <target> <rpd> <YYYY-MM-DD> <effort>"),
                        _ => println!("Usage: back <target> <rpd> <YYYY-MM-DD> <effort>"),
                    }
                    continue;
                };
                let rpd: ResourcesPerDay = match rpd_s.parse() { Ok(v) => v, Err(e) => { println!("Invalid resources per day: {e}"); continue; } };
                let first = match parse_date(first_s) { Some(d) => d, None => { println!("Invalid date (YYYY-MM-DD)"); continue; } };
                let task = match cmd {
                    "allocate" => {
                        let Some(second) = parse_date(second_s) else { println!("Invalid date (YYYY-MM-DD)"); continue; };
                        TaskWindow::between_dates(first, second)
                    }
                    _ => TaskWindow::between_dates(first, first),
                };
                let task = match task { Ok(t) => t, Err(e) => { println!("Error: {e}"); continue; } };
                let effort = if cmd == "allocate" {
                    None
                } else {
                    match second_s.parse::<EffortDuration>() { Ok(v) => Some(v), Err(e) => { println!("Invalid effort: {e}"); continue; } }
                };
                let mut allocation = match session.new_allocation(target, task) { Ok(a) => a, Err(e) => { println!("{e}"); continue; } };
                let config = session.scenario.config.clone();
                let outcome = EffortAllocator::new(&mut allocation, rpd, &config).and_then(|mut allocator| {
                    match (cmd, effort) {
                        ("until", Some(effort)) => allocator.until_allocating(Direction::Forward, effort).map(Some),
                        ("back", Some(effort)) => allocator.until_allocating(Direction::Backward, effort).map(Some),
                        _ => allocator.apply_allocation_on_all_task_length().map(|_| None),
                    }
                });
                match outcome {
                    Ok(reached) => {
                        match reached {
                            Some(date) => println!("Allocation {} reaches {date}, {} assigned.", allocation.id(), allocation.assigned_effort()),
                            None => println!("Allocation {} assigned {}.", allocation.id(), allocation.assigned_effort()),
                        }
                        session.allocations.push(allocation);
                        session.show_allocations();
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }
            "show" => session.show_allocations(),
            "days" => {
                let Some(id) = parts.next().and_then(|s| s.parse::<u32>().ok()) else {
                    println!("Usage: days <allocation>");
                    continue;
                };
                match session.allocations.iter().find(|a| a.id() == AllocationId(id)) {
                    Some(allocation) => {
                        let rows: Vec<Vec<String>> = allocation
                            .assignments()
                            .iter()
                            .map(|d| vec![d.day.to_string(), d.resource.to_string(), d.duration.to_string()])
                            .collect();
                        println!("{}", render_table(&["day", "resource", "effort"], &rows));
                    }
                    None => println!("Unknown allocation {id}"),
                }
            }
            "chart" => {
                let chart = LoadChart::new(&session.scenario.resources, &session.allocations).build();
                let mut rows = Vec::new();
                for (resource, periods) in &chart {
                    for period in periods {
                        let level = period.level();
                        rows.push(vec![
                            resource.to_string(),
                            period.start().to_string(),
                            period.end().to_string(),
                            period.available_effort().to_string(),
                            period.assigned_effort().to_string(),
                            if level.is_infinite() { "inf".to_string() } else { format!("{}%", level.percentage()) },
                        ]);
                    }
                }
                println!(
                    "{}",
                    render_table(&["resource", "start", "end", "available", "assigned", "load"], &rows)
                );
            }
            "export" => {
                let what = parts.next();
                let arg1 = parts.next();
                let arg2 = parts.next();
                let result = match (what, arg1, arg2) {
                    (Some("assignments"), Some("csv"), Some(path)) => save_assignments_to_csv(&session.allocations, path).map(|_| path),
                    (Some("assignments"), Some("json"), Some(path)) => save_assignments_to_json(&session.allocations, path).map(|_| path),
                    (Some("load"), Some(path), None) => {
                        let chart = LoadChart::new(&session.scenario.resources, &session.allocations).build();
                        save_load_periods_to_csv(&chart, path).map(|_| path)
                    }
                    _ => {
                        println!("Usage: export assignments <csv|json> <path> | export load <path>");
                        continue;
                    }
                };
                match result {
                    Ok(path) => println!("Exported to {path}"),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "queue" => match parts.next() {
                Some("add") => {
                    let Some(id) = parts.next().and_then(|s| s.parse::<u32>().ok()) else {
                        println!("Usage: queue add <allocation>");
                        continue;
                    };
                    let Some(allocation) = session.allocations.iter().find(|a| a.id() == AllocationId(id)).cloned() else {
                        println!("Unknown allocation {id}");
                        continue;
                    };
                    let Some(resource) = allocation.resources().iter().find(|r| r.is_limiting()).map(|r| r.id()) else {
                        println!("Allocation {} has no limiting resource", allocation.id());
                        continue;
                    };
                    let element_id = QueueElementId(session.next_element);
                    session.next_element += 1;
                    let next_queue = QueueId(session.queues.len() as u32 + 1);
                    let queue = session
                        .queues
                        .entry(resource)
                        .or_insert_with(|| LimitingResourceQueue::new(next_queue, resource));
                    let element = LimitingResourceQueueElement::new(element_id, allocation, Utc::now().naive_utc());
                    match queue.add_element(element) {
                        Ok(()) => println!("Queued {element_id} on {}.", queue.id()),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                Some("place") => {
                    let args: Vec<&str> = parts.collect();
                    let [element_s, start_s, start_h, end_s, end_h] = args[..] else {
                        println!("Usage: queue place <element> <YYYY-MM-DD> <hour> <YYYY-MM-DD> <hour>");
                        continue;
                    };
                    let element: u32 = match element_s.parse() { Ok(v) => v, Err(_) => { println!("Invalid element"); continue; } };
                    let (Some(start), Some(end)) = (parse_date(start_s), parse_date(end_s)) else { println!("Invalid date (YYYY-MM-DD)"); continue; };
                    let (Ok(start_hour), Ok(end_hour)) = (start_h.parse::<u32>(), end_h.parse::<u32>()) else { println!("Invalid hour"); continue; };
                    let element = QueueElementId(element);
                    match session.queue_of(element) {
                        Some(queue) => match queue.move_element(element, DateAndHour::new(start, start_hour), DateAndHour::new(end, end_hour)) {
                            Ok(()) => {
                                queue.take_moved();
                                println!("Placed {element}.");
                            }
                            Err(e) => println!("Error: {e}"),
                        },
                        None => println!("Unknown element {element}"),
                    }
                }
                Some("detach") => {
                    let Some(element) = parts.next().and_then(|s| s.parse::<u32>().ok()).map(QueueElementId) else {
                        println!("Usage: queue detach <element>");
                        continue;
                    };
                    match session.queue_of(element) {
                        Some(queue) => match queue.detach(element) {
                            Ok(_) => println!("Detached {element}."),
                            Err(e) => println!("Error: {e}"),
                        },
                        None => println!("Unknown element {element}"),
                    }
                }
                Some("dep") => {
                    let origin = parts.next().and_then(|s| s.parse::<u32>().ok()).map(QueueElementId);
                    let destiny = parts.next().and_then(|s| s.parse::<u32>().ok()).map(QueueElementId);
                    let kind = parse_dependency_kind(parts.next());
                    let (Some(origin), Some(destiny), Some(kind)) = (origin, destiny, kind) else {
                        println!("Usage: queue dep <origin> <destiny> [es|ss|ee|se]");
                        continue;
                    };
                    let refs = |id: QueueElementId, session: &Session| {
                        session
                            .queues
                            .values()
                            .find_map(|q| q.get(id))
                            .map(|e| e.element_ref())
                    };
                    let (Some(origin_ref), Some(destiny_ref)) = (refs(origin, &session), refs(destiny, &session)) else {
                        println!("Unknown element");
                        continue;
                    };
                    let dependency = QueueDependency::new(origin_ref, destiny_ref, kind);
                    let mut outcome = Ok(());
                    for queue in session.queues.values_mut() {
                        if queue.get(origin).is_some() || queue.get(destiny).is_some() {
                            outcome = outcome.and_then(|_| queue.add_dependency(dependency));
                        }
                    }
                    match outcome {
                        Ok(()) => println!("Dependency {origin} -> {destiny} added."),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                Some("show") => session.show_queues(),
                _ => println!("Usage: queue <add|place|detach|dep|show> ..."),
            },
            _ => {
                println!("Unknown command. Type 'help'.");
            }
        }
    }
}
