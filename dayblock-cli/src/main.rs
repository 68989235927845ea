use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use dayblock_core::settings::{parse_timezone, parse_work_days};
use dayblock_core::time::{format_hhmm, parse_hhmm, parse_local_date, parse_local_to_utc, week_start};
use dayblock_core::{
    AutoScheduler, BlockType, Habit, HabitPatch, Placement, PreferredTime, Priority, Settings,
    Storage, Task, TaskPatch, TaskStatus, lifecycle, load_or_init_settings, plan_habit_week,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod calendar;
mod config;
mod state;
mod store;

use config::Config;
use store::JsonFileStore;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("DAYBLOCK_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(
    name = "dayblock",
    version,
    long_version = LONG_VERSION,
    about = "Auto-schedule tasks into free work time"
)]
struct Cli {
    /// Data file (overrides [storage] path in config.toml)
    #[arg(long, global = true, env = "DAYBLOCK_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default config to ~/.dayblock/config.toml
    Init,

    /// Place every open, unscheduled task into the next 14 days
    Schedule,

    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Manage recurring habits
    Habit {
        #[command(subcommand)]
        command: HabitCommand,
    },

    /// Calendar views and export
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },

    /// Work window and scheduling settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Create a task
    Add {
        title: String,

        /// critical | high | medium | low
        #[arg(long, default_value = "medium")]
        priority: Priority,

        /// Minutes (5..=480)
        #[arg(long, default_value_t = 30)]
        duration: u32,

        /// Local deadline: "YYYY-MM-DD" or "YYYY-MM-DD HH:MM"
        #[arg(long)]
        deadline: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },

    /// List tasks (done tasks are hidden unless --all)
    List {
        #[arg(long)]
        all: bool,
    },

    /// Change a task's fields; a new duration takes it off the calendar
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        priority: Option<Priority>,

        /// Minutes (5..=480)
        #[arg(long)]
        duration: Option<u32>,

        /// Local deadline: "YYYY-MM-DD" or "YYYY-MM-DD HH:MM"
        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<String>,

        #[arg(long)]
        clear_deadline: bool,

        #[arg(long)]
        description: Option<String>,

        /// #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },

    /// Mark a task in progress
    Start { id: String },

    /// Mark a task done and free its calendar time
    Done { id: String },

    /// Remove a task from the calendar so it can be rescheduled
    Unschedule { id: String },

    /// Delete a task and its blocks
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum HabitCommand {
    /// Create a habit
    Add {
        title: String,

        /// Minutes (5..=480)
        #[arg(long, default_value_t = 30)]
        duration: u32,

        /// Weekdays, 0 = Sunday: "1-5" or "1,3,5"
        #[arg(long, default_value = "1-5", value_parser = parse_work_days)]
        days: BTreeSet<u8>,

        /// morning | afternoon | evening
        #[arg(long, default_value = "morning")]
        preferred: PreferredTime,

        /// Fixed local start time (HH:MM); overrides --preferred
        #[arg(long, value_parser = parse_hhmm)]
        at: Option<NaiveTime>,

        /// #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },

    List,

    /// Change a habit; run plan-week afterwards to refresh its blocks
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        /// Minutes (5..=480)
        #[arg(long)]
        duration: Option<u32>,

        /// Weekdays, 0 = Sunday: "1-5" or "1,3,5"
        #[arg(long, value_parser = parse_work_days)]
        days: Option<BTreeSet<u8>>,

        /// morning | afternoon | evening
        #[arg(long)]
        preferred: Option<PreferredTime>,

        /// Fixed local start time (HH:MM)
        #[arg(long, value_parser = parse_hhmm, conflicts_with = "clear_at")]
        at: Option<NaiveTime>,

        /// Drop the fixed start time and use --preferred again
        #[arg(long)]
        clear_at: bool,

        /// #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },

    /// Stop planning a habit (its existing blocks stay until plan-week)
    Pause { id: String },

    /// Plan a paused habit again
    Resume { id: String },

    /// Delete a habit and its blocks
    Delete { id: String },

    /// Remove every habit block from the calendar
    ClearBlocks,

    /// Write this week's habit blocks (replaces existing ones)
    PlanWeek {
        /// Any date inside the target week (default: today)
        #[arg(long)]
        week: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum CalendarCommand {
    /// Show a Sunday-started week of blocks
    Week {
        /// Any date inside the target week (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Also export the week as an iCalendar file
        #[arg(long)]
        ics: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,

    /// Update one or more settings
    Set {
        /// HH:MM
        #[arg(long, value_parser = parse_hhmm)]
        work_start: Option<NaiveTime>,

        /// HH:MM
        #[arg(long, value_parser = parse_hhmm)]
        work_end: Option<NaiveTime>,

        /// Weekdays, 0 = Sunday: "1-5" or "1,3,5"
        #[arg(long, value_parser = parse_work_days)]
        work_days: Option<BTreeSet<u8>>,

        /// Shortest block a placement may occupy, in minutes
        #[arg(long)]
        min_block: Option<u32>,

        /// IANA name, e.g. America/Chicago
        #[arg(long, value_parser = parse_timezone)]
        timezone: Option<Tz>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    init_tracing(&cfg);

    if let Command::Init = cli.command {
        state::ensure_dayblock_home()?;
        return config::init_config();
    }

    let store_path = match cli.store {
        Some(p) => p,
        None => cfg.store_path()?,
    };
    let store = JsonFileStore::open(&store_path)?;

    match cli.command {
        Command::Init => {}
        Command::Schedule => schedule(&store).await?,
        Command::Task { command } => task_command(&store, command).await?,
        Command::Habit { command } => habit_command(&store, command).await?,
        Command::Calendar { command } => calendar_command(&store, &cfg, command).await?,
        Command::Settings { command } => settings_command(&store, command).await?,
    }

    Ok(())
}

fn init_tracing(cfg: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn schedule(store: &JsonFileStore) -> Result<()> {
    let storage = store.storage();
    let scheduler = AutoScheduler::new(storage.clone());

    let outcome = scheduler.auto_schedule().await;
    // Placements made before a failure are committed; keep them on disk.
    store.save().await?;
    let report = outcome.context("auto-schedule failed")?;

    let tz = load_or_init_settings(storage.as_ref()).await?.timezone;
    for o in &report.outcomes {
        match o.placement {
            Placement::Placed(slot) => {
                let start = slot.start.with_timezone(&tz);
                let end = slot.end.with_timezone(&tz);
                println!(
                    "  {} {}-{}  {}",
                    start.format("%a %m-%d"),
                    start.format("%H:%M"),
                    end.format("%H:%M"),
                    o.title
                );
            }
            Placement::Unplaced => println!("  (no free slot)  {}", o.title),
        }
    }
    println!("{}", report.summary());
    Ok(())
}

async fn task_command(store: &JsonFileStore, command: TaskCommand) -> Result<()> {
    let storage = store.storage();

    match command {
        TaskCommand::Add {
            title,
            priority,
            duration,
            deadline,
            description,
            color,
        } => {
            let tz = load_or_init_settings(storage.as_ref()).await?.timezone;
            let mut task = Task::new(String::new(), title)
                .with_priority(priority)
                .with_duration(duration);
            if let Some(raw) = deadline {
                task = task.with_deadline(parse_local_to_utc(&raw, tz)?);
            }
            if let Some(d) = description {
                task = task.with_description(d);
            }
            if let Some(c) = color {
                task = task.with_color(c);
            }
            let task = storage.create_task(task).await.context("create task")?;
            store.save().await?;
            println!("Created task {} ({})", short_id(&task.id), task.title);
        }

        TaskCommand::List { all } => {
            let tz = load_or_init_settings(storage.as_ref()).await?.timezone;
            let tasks = storage.list_tasks().await?;
            let mut shown = 0;
            for t in tasks.iter().filter(|t| all || t.status != TaskStatus::Done) {
                let when = match t.scheduled_slot() {
                    Some(slot) => {
                        let start = slot.start.with_timezone(&tz);
                        format!(
                            "{}-{}",
                            start.format("%a %m-%d %H:%M"),
                            slot.end.with_timezone(&tz).format("%H:%M")
                        )
                    }
                    None => "unscheduled".to_string(),
                };
                println!(
                    "{}  {:<11} {:<8} {:>3}m  {:<24} {}",
                    short_id(&t.id),
                    t.status.as_str(),
                    t.priority.as_str(),
                    t.duration,
                    when,
                    t.title
                );
                shown += 1;
            }
            if shown == 0 {
                println!("(no tasks)");
            }
        }

        TaskCommand::Edit {
            id,
            title,
            priority,
            duration,
            deadline,
            clear_deadline,
            description,
            color,
        } => {
            let id = resolve_task_id(storage.as_ref(), &id).await?;
            let deadline = match (deadline, clear_deadline) {
                (Some(raw), _) => {
                    let tz = load_or_init_settings(storage.as_ref()).await?.timezone;
                    Some(Some(parse_local_to_utc(&raw, tz)?))
                }
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = TaskPatch {
                title,
                description: description.map(Some),
                priority,
                duration,
                deadline,
                color,
                ..TaskPatch::default()
            };
            let task = lifecycle::edit_task(storage.as_ref(), &id, patch)
                .await
                .context("edit task")?;
            store.save().await?;
            let note = if task.is_scheduled() { "" } else { " (unscheduled)" };
            println!("Updated: {}{}", task.title, note);
        }

        TaskCommand::Start { id } => {
            let id = resolve_task_id(storage.as_ref(), &id).await?;
            let task = lifecycle::start_task(storage.as_ref(), &id).await?;
            store.save().await?;
            println!("Started: {}", task.title);
        }

        TaskCommand::Done { id } => {
            let id = resolve_task_id(storage.as_ref(), &id).await?;
            let task = lifecycle::complete_task(storage.as_ref(), &id).await?;
            store.save().await?;
            println!("Done: {}", task.title);
        }

        TaskCommand::Unschedule { id } => {
            let id = resolve_task_id(storage.as_ref(), &id).await?;
            let task = lifecycle::clear_schedule(storage.as_ref(), &id).await?;
            store.save().await?;
            println!("Unscheduled: {}", task.title);
        }

        TaskCommand::Delete { id } => {
            let id = resolve_task_id(storage.as_ref(), &id).await?;
            lifecycle::delete_task(storage.as_ref(), &id).await?;
            store.save().await?;
            println!("Deleted task {}", short_id(&id));
        }
    }

    Ok(())
}

async fn habit_command(store: &JsonFileStore, command: HabitCommand) -> Result<()> {
    let storage = store.storage();

    match command {
        HabitCommand::Add {
            title,
            duration,
            days,
            preferred,
            at,
            color,
        } => {
            let mut habit = Habit::new(String::new(), title)
                .with_duration(duration)
                .with_days(days)
                .with_preferred_time(preferred);
            if let Some(t) = at {
                habit = habit.with_start_time(t);
            }
            if let Some(c) = color {
                habit = habit.with_color(c);
            }
            let habit = storage.create_habit(habit).await.context("create habit")?;
            store.save().await?;
            println!("Created habit {} ({})", short_id(&habit.id), habit.title);
        }

        HabitCommand::List => {
            let habits = storage.list_habits().await?;
            if habits.is_empty() {
                println!("(no habits)");
            }
            for h in &habits {
                let days: Vec<String> = h.days_of_week.iter().map(u8::to_string).collect();
                println!(
                    "{}  {} {:>3}m  days={}  {}{}",
                    short_id(&h.id),
                    format_hhmm(h.start_of_day()),
                    h.duration,
                    days.join(","),
                    h.title,
                    if h.active { "" } else { " (paused)" }
                );
            }
        }

        HabitCommand::Edit {
            id,
            title,
            duration,
            days,
            preferred,
            at,
            clear_at,
            color,
        } => {
            let id = resolve_habit_id(storage.as_ref(), &id).await?;
            let start_time = match (at, clear_at) {
                (Some(t), _) => Some(Some(t)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = HabitPatch {
                title,
                duration,
                preferred_time: preferred,
                days_of_week: days,
                color,
                start_time,
                ..HabitPatch::default()
            };
            let habit = storage
                .update_habit(&id, patch)
                .await
                .context("edit habit")?;
            store.save().await?;
            println!("Updated habit: {}", habit.title);
        }

        HabitCommand::Pause { id } => {
            let id = resolve_habit_id(storage.as_ref(), &id).await?;
            let habit = storage.update_habit(&id, HabitPatch::active(false)).await?;
            store.save().await?;
            println!("Paused: {}", habit.title);
        }

        HabitCommand::Resume { id } => {
            let id = resolve_habit_id(storage.as_ref(), &id).await?;
            let habit = storage.update_habit(&id, HabitPatch::active(true)).await?;
            store.save().await?;
            println!("Resumed: {}", habit.title);
        }

        HabitCommand::Delete { id } => {
            let id = resolve_habit_id(storage.as_ref(), &id).await?;
            storage.delete_habit(&id).await?;
            store.save().await?;
            println!("Deleted habit {}", short_id(&id));
        }

        HabitCommand::ClearBlocks => {
            let removed = storage.delete_time_blocks_by_type(BlockType::Habit).await?;
            store.save().await?;
            println!("Removed {} habit blocks", removed);
        }

        HabitCommand::PlanWeek { week } => {
            let tz = load_or_init_settings(storage.as_ref()).await?.timezone;
            let start = week_start(target_date(week.as_deref(), tz)?);
            let created = plan_habit_week(storage.as_ref(), start, tz).await?;
            store.save().await?;
            info!(week = %start, created, "habit week planned");
            println!("Planned {} habit blocks for week of {}", created, start);
        }
    }

    Ok(())
}

async fn calendar_command(
    store: &JsonFileStore,
    cfg: &Config,
    command: CalendarCommand,
) -> Result<()> {
    let storage = store.storage();

    match command {
        CalendarCommand::Week { date, ics } => {
            let tz = load_or_init_settings(storage.as_ref()).await?.timezone;
            let start = week_start(target_date(date.as_deref(), tz)?);
            let (from, to) = calendar::week_range(start, tz);
            let blocks = storage.list_time_blocks(from, to).await?;

            println!("Week of {} ({})\n", start, tz);
            print!("{}", calendar::render_week(&blocks, tz));

            if let Some(path) = ics {
                let events = calendar::blocks_to_events(&blocks, &cfg.calendar.ics_prefix);
                fs::write(&path, calendar::events_to_ics(&events))
                    .with_context(|| format!("write {}", path.display()))?;
                println!("\nWrote {} events to {}", events.len(), path.display());
            }
        }
    }

    Ok(())
}

async fn settings_command(store: &JsonFileStore, command: SettingsCommand) -> Result<()> {
    let storage = store.storage();

    match command {
        SettingsCommand::Show => {
            let s = load_or_init_settings(storage.as_ref()).await?;
            store.save().await?;
            print_settings(&s);
        }

        SettingsCommand::Set {
            work_start,
            work_end,
            work_days,
            min_block,
            timezone,
        } => {
            let mut s = load_or_init_settings(storage.as_ref()).await?;
            if let Some(t) = work_start {
                s.work_start = t;
            }
            if let Some(t) = work_end {
                s.work_end = t;
            }
            if let Some(d) = work_days {
                s.work_days = d;
            }
            if let Some(m) = min_block {
                s.min_block_minutes = m;
            }
            if let Some(tz) = timezone {
                s.timezone = tz;
            }
            let s = storage
                .upsert_settings(s)
                .await
                .context("settings not saved")?;
            store.save().await?;
            print_settings(&s);
        }
    }

    Ok(())
}

fn print_settings(s: &Settings) {
    let days: Vec<String> = s.work_days.iter().map(u8::to_string).collect();
    println!("work_start        {}", format_hhmm(s.work_start));
    println!("work_end          {}", format_hhmm(s.work_end));
    println!("work_days         {}", days.join(","));
    println!("min_block_minutes {}", s.min_block_minutes);
    println!("timezone          {}", s.timezone);
}

fn target_date(raw: Option<&str>, tz: Tz) -> Result<NaiveDate> {
    match raw {
        Some(r) => parse_local_date(r),
        None => Ok(Utc::now().with_timezone(&tz).date_naive()),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

async fn resolve_task_id<S: Storage + ?Sized>(storage: &S, needle: &str) -> Result<String> {
    let tasks = storage.list_tasks().await?;
    resolve_id(tasks.iter().map(|t| t.id.as_str()), needle, "task")
}

async fn resolve_habit_id<S: Storage + ?Sized>(storage: &S, needle: &str) -> Result<String> {
    let habits = storage.list_habits().await?;
    resolve_id(habits.iter().map(|h| h.id.as_str()), needle, "habit")
}

/// Exact id, or a unique prefix of one.
fn resolve_id<'a>(ids: impl Iterator<Item = &'a str>, needle: &str, kind: &str) -> Result<String> {
    let needle = needle.trim();
    if needle.is_empty() {
        bail!("{kind} id must not be empty");
    }
    let mut matches = Vec::new();
    for id in ids {
        if id == needle {
            return Ok(id.to_string());
        }
        if id.starts_with(needle) {
            matches.push(id);
        }
    }
    match matches.as_slice() {
        [one] => Ok((*one).to_string()),
        [] => bail!("no {kind} matches '{needle}'"),
        many => bail!("'{needle}' matches {} {kind}s; use a longer prefix", many.len()),
    }
}
