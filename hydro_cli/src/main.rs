use clap::{Parser, Subcommand};
use hydro_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "hydro")]
#[command(about = "Personal hydration tracker with drink reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a drink
    Add {
        /// Amount in ml, 1-5000 (defaults to reminder.default_amount_ml)
        amount: Option<u32>,
    },

    /// Show today's progress (default)
    Status,

    /// Show the last seven days
    Week {
        /// Print as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Show or change the daily goal
    Goal {
        #[command(subcommand)]
        action: Option<GoalAction>,
    },

    /// Show or change the user profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },

    /// Clear today's records
    ResetToday {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Remove records older than the retention window
    Cleanup {
        /// Days to keep (defaults to retention.days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Export all records to CSV
    Export {
        #[arg(long)]
        out: PathBuf,
    },

    /// Check now whether a reminder would fire
    Remind,

    /// Run the reminder loop in the foreground
    Watch {
        /// Reminder interval in minutes (15-120)
        #[arg(long)]
        interval_minutes: Option<u32>,

        /// Seconds between scheduler ticks
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        tick_seconds: Option<u64>,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[derive(Subcommand)]
enum GoalAction {
    /// Show the current goal
    Show,

    /// Choose a goal mode and recompute the goal
    Set {
        /// standard, formula or custom
        #[arg(long)]
        mode: GoalMode,

        /// Goal in ml for custom mode (500-5000)
        #[arg(long)]
        custom: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the current profile
    Show,

    /// Update profile fields and recompute the goal
    Set {
        /// Weight in kg (30-200)
        #[arg(long)]
        weight: Option<u32>,

        /// male or female
        #[arg(long)]
        gender: Option<Gender>,

        /// 0-3 or sedentary, light, moderate, high
        #[arg(long)]
        activity: Option<ActivityLevel>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        hydro_core::logging::init_with_level("debug");
    } else {
        hydro_core::logging::init_with_level("warn");
    }

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_config_path);
    let mut config = if config_path.exists() {
        Config::load_from(&config_path)?
    } else {
        tracing::info!("No config file at {:?}, using defaults", config_path);
        Config::default()
    };

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let store = PersistentStore::new(data_dir).with_backup_threshold(config.backup.threshold);

    match cli.command {
        Some(Commands::Add { amount }) => cmd_add(&store, &config, amount),
        Some(Commands::Status) | None => cmd_status(&store, &config),
        Some(Commands::Week { csv }) => cmd_week(&store, &config, csv),
        Some(Commands::Goal { action }) => match action {
            Some(GoalAction::Set { mode, custom }) => {
                cmd_goal_set(&store, &mut config, &config_path, mode, custom)
            }
            Some(GoalAction::Show) | None => cmd_goal_show(&store, &config),
        },
        Some(Commands::Profile { action }) => match action {
            Some(ProfileAction::Set {
                weight,
                gender,
                activity,
            }) => cmd_profile_set(&store, &config, weight, gender, activity),
            Some(ProfileAction::Show) | None => cmd_profile_show(&store, &config),
        },
        Some(Commands::ResetToday { yes }) => cmd_reset_today(&store, &config, yes),
        Some(Commands::Cleanup { days }) => cmd_cleanup(&store, &config, days),
        Some(Commands::Export { out }) => cmd_export(&store, &config, &out),
        Some(Commands::Remind) => cmd_remind(&store, &config),
        Some(Commands::Watch {
            interval_minutes,
            tick_seconds,
            ticks,
        }) => cmd_watch(&store, &config, interval_minutes, tick_seconds, ticks),
    }
}

/// Open the ledger and prune records outside the retention window
fn open_ledger(store: &PersistentStore, config: &Config) -> RecordLedger {
    let mut ledger = RecordLedger::open(store.clone());
    if ledger.source() == StateSource::Backup {
        eprintln!("⚠ Data file was unreadable; restored from backup.");
    }
    ledger.cleanup_old_records(config.retention.days);
    ledger
}

fn cmd_add(store: &PersistentStore, config: &Config, amount: Option<u32>) -> Result<()> {
    let mut ledger = open_ledger(store, config);
    let amount = amount.unwrap_or(config.reminder.default_amount_ml);

    let record = ledger.add_water(amount)?;
    warn_if_unsaved(&ledger);

    println!(
        "✓ Logged {} ml at {}",
        record.amount,
        record.time.format("%H:%M")
    );
    print_progress(&ledger);
    if ledger.today_total() >= ledger.daily_goal()
        && ledger.today_total().saturating_sub(record.amount) < ledger.daily_goal()
    {
        println!("🎉 Daily goal reached!");
    }
    Ok(())
}

fn cmd_status(store: &PersistentStore, config: &Config) -> Result<()> {
    let ledger = open_ledger(store, config);

    print_progress(&ledger);
    let records = ledger.records_today();
    if records.is_empty() {
        println!("  No drinks logged today.");
    } else {
        for record in records {
            println!("  {}  {:>5} ml", record.time.format("%H:%M"), record.amount);
        }
    }
    Ok(())
}

fn cmd_week(store: &PersistentStore, config: &Config, csv: bool) -> Result<()> {
    let ledger = open_ledger(store, config);
    let stats = ledger.weekly_stats();

    if csv {
        hydro_core::export::write_summary(&stats, io::stdout().lock())?;
        return Ok(());
    }

    for stat in &stats {
        let fraction = progress_fraction(stat.total, stat.goal);
        let filled = (fraction * 20.0).round() as usize;
        println!(
            "{}  {:>5} / {} ml  {}{} {}",
            stat.date.format("%a %Y-%m-%d"),
            stat.total,
            stat.goal,
            "█".repeat(filled),
            "░".repeat(20 - filled),
            if stat.goal_met() { "✓" } else { "" }
        );
    }
    Ok(())
}

fn cmd_goal_show(store: &PersistentStore, config: &Config) -> Result<()> {
    let ledger = open_ledger(store, config);
    println!("Daily goal: {} ml", ledger.daily_goal());
    println!("Mode: {}", config.goal.mode);
    Ok(())
}

fn cmd_goal_set(
    store: &PersistentStore,
    config: &mut Config,
    config_path: &Path,
    mode: GoalMode,
    custom: Option<u32>,
) -> Result<()> {
    let mut ledger = open_ledger(store, config);

    config.goal.mode = mode;
    if let Some(custom) = custom {
        config.goal.custom_goal = custom;
    }
    let policy = config.goal.policy();

    let goal = ledger.apply_settings(ledger.user_profile().clone(), policy)?;
    warn_if_unsaved(&ledger);
    config.save_to(config_path)?;

    println!("✓ Daily goal set to {} ml ({} mode)", goal, mode);
    Ok(())
}

fn cmd_profile_show(store: &PersistentStore, config: &Config) -> Result<()> {
    let ledger = open_ledger(store, config);
    let profile = ledger.user_profile();
    println!("Weight: {} kg", profile.weight);
    println!("Gender: {}", profile.gender);
    println!(
        "Activity: {} ({})",
        profile.activity_level,
        u8::from(profile.activity_level)
    );
    Ok(())
}

fn cmd_profile_set(
    store: &PersistentStore,
    config: &Config,
    weight: Option<u32>,
    gender: Option<Gender>,
    activity: Option<ActivityLevel>,
) -> Result<()> {
    let mut ledger = open_ledger(store, config);

    let mut profile = ledger.user_profile().clone();
    if let Some(weight) = weight {
        profile.weight = weight;
    }
    if let Some(gender) = gender {
        profile.gender = gender;
    }
    if let Some(activity) = activity {
        profile.activity_level = activity;
    }

    let goal = ledger.apply_settings(profile, config.goal.policy())?;
    warn_if_unsaved(&ledger);

    println!("✓ Profile updated");
    println!("  Daily goal: {} ml ({} mode)", goal, config.goal.mode);
    Ok(())
}

fn cmd_reset_today(store: &PersistentStore, config: &Config, yes: bool) -> Result<()> {
    if !yes && !confirm("Reset today's records?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let mut ledger = open_ledger(store, config);
    let removed = ledger.reset_today();
    warn_if_unsaved(&ledger);

    println!("✓ Cleared {} records for today", removed);
    Ok(())
}

fn cmd_cleanup(store: &PersistentStore, config: &Config, days: Option<u32>) -> Result<()> {
    let mut ledger = RecordLedger::open(store.clone());
    let days = days.unwrap_or(config.retention.days);

    let removed = ledger.cleanup_old_records(days);
    warn_if_unsaved(&ledger);

    println!("✓ Removed {} days older than {} days", removed, days);
    Ok(())
}

fn cmd_export(store: &PersistentStore, config: &Config, out: &Path) -> Result<()> {
    let ledger = open_ledger(store, config);
    let count = hydro_core::export::export_records(ledger.records(), out)?;

    println!("✓ Exported {} records", count);
    println!("  CSV: {}", out.display());
    Ok(())
}

fn cmd_remind(store: &PersistentStore, config: &Config) -> Result<()> {
    let ledger = open_ledger(store, config);
    let mut scheduler = ReminderScheduler::new(config.reminder.interval_minutes)?;

    // A full interval forces the scheduler into its due state
    match scheduler.tick(scheduler.interval(), &ledger) {
        TickOutcome::Reminded(event) => print_reminder(&event),
        TickOutcome::Suppressed => println!("Goal met - reminder suppressed."),
        TickOutcome::Waiting => println!("No reminder due."),
    }
    Ok(())
}

fn cmd_watch(
    store: &PersistentStore,
    config: &Config,
    interval_minutes: Option<u32>,
    tick_seconds: Option<u64>,
    ticks: Option<u64>,
) -> Result<()> {
    let interval_minutes = interval_minutes.unwrap_or(config.reminder.interval_minutes);
    let tick = Duration::from_secs(tick_seconds.unwrap_or(config.reminder.tick_seconds));

    let mut scheduler = ReminderScheduler::new(interval_minutes)?;
    let (tx, rx) = channel();
    scheduler.subscribe(tx);

    println!(
        "Watching: reminder every {} minutes (Ctrl+C to stop)",
        interval_minutes
    );
    io::stdout().flush()?;

    let mut count = 0;
    let mut last = Instant::now();
    while ticks.map_or(true, |limit| count < limit) {
        std::thread::sleep(tick);
        let now = Instant::now();
        let elapsed = now.duration_since(last);
        last = now;
        count += 1;

        // Reload so drinks logged from another shell are seen
        let ledger = open_ledger(store, config);
        scheduler.tick(elapsed, &ledger);

        for event in rx.try_iter() {
            print_reminder(&event);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

fn print_progress(ledger: &RecordLedger) {
    let total = ledger.today_total();
    let goal = ledger.daily_goal();
    println!(
        "Today: {} / {} ml ({:.0}%)",
        total,
        goal,
        ledger.progress() * 100.0
    );
    if total < goal {
        println!("  Remaining: {} ml", goal - total);
    }
}

fn print_reminder(event: &ReminderEvent) {
    println!(
        "💧 Time to drink! {} minutes since the last reminder; {} ml to go ({} / {} ml).",
        event.interval_minutes,
        event.remaining_ml(),
        event.today_total,
        event.daily_goal
    );
}

fn warn_if_unsaved(ledger: &RecordLedger) {
    if !ledger.store_healthy() {
        eprintln!(
            "⚠ Could not write {}; changes are kept for this run only.",
            ledger.store().primary_path().display()
        );
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
