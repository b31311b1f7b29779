use crate::config::SimConfig;
use crate::ipc::Collaborators;
use crate::registry::PaymentOutcome;
use crate::runway::RunwayId;
use crate::schedule::scheduler::{Scheduler, TickReport};
use crate::violation::{Avn, AvnId, PaymentStatus, Rupees};
use clap::Parser;
use colored::Colorize;
use crossterm::event::{self, Event, KeyCode};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tabled::Tabled;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

mod aircraft;
mod airline;
mod config;
mod error;
mod generator;
mod ipc;
mod phase;
mod registry;
mod runway;
mod schedule;
mod time;
mod violation;

#[derive(Parser)]
struct Args {
    /// Path to the JSON scenario file
    #[arg(short, long, value_name = "FILE")]
    scenario: Option<PathBuf>,

    /// Seed for the simulation RNG
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks per simulation run
    #[arg(long, value_name = "TICKS")]
    duration: Option<u64>,

    /// Wall-clock milliseconds per tick
    #[arg(long, value_name = "MS")]
    tick_millis: Option<u64>,
}

impl Args {
    fn load_config(&self) -> Result<SimConfig, error::ConfigError> {
        let mut config = match &self.scenario {
            Some(path) => SimConfig::load_from_file(path)?,
            None => SimConfig::default(),
        };
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(tick_millis) = self.tick_millis {
            config.tick_millis = tick_millis;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let mut candidates = Vec::new();

        for cmd in &self.commands {
            if cmd.starts_with(line) {
                candidates.push(Pair {
                    display: cmd.clone(),
                    replacement: format!("{} ", cmd),
                });
            }
        }

        Ok((0, candidates))
    }
}

#[derive(Tabled)]
struct FlightRow {
    #[tabled(rename = "Flight")]
    flight: String,
    #[tabled(rename = "Airline")]
    airline: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Direction")]
    direction: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Speed")]
    speed: i32,
    #[tabled(rename = "Runway")]
    runway: String,
}

#[derive(Tabled)]
struct RunwayRow {
    #[tabled(rename = "Runway")]
    runway: RunwayId,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Occupant")]
    occupant: String,
    #[tabled(rename = "Waiting")]
    waiting: usize,
}

fn paginate(content: String) {
    let pager = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        // Fallback to 'more' if 'less' isn't available
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn());

    let mut pager = match pager {
        Ok(pager) => pager,
        Err(_) => {
            println!("{}", content);
            return;
        }
    };

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // Broken pipe is common if the user quits the pager early
            if e.kind() != io::ErrorKind::BrokenPipe {
                eprintln!("Error writing to pager: {}", e);
            }
        }
    }

    let _ = pager.wait();
}

fn print_table(mut table: tabled::Table, rows: usize) {
    table.with(Style::rounded());
    table.with(tabled::settings::Alignment::left());
    if rows > 20 {
        paginate(table.to_string());
    } else {
        println!("{}", table);
    }
}

fn print_avns(avns: Vec<&Avn>) {
    if avns.is_empty() {
        println!("No matching AVNs found.");
    } else {
        let rows = avns.len();
        print_table(tabled::Table::new(avns), rows);
    }
}

fn print_board(scheduler: &Scheduler, report: &TickReport) {
    let unpaid = scheduler.registry.unpaid().count();
    println!(
        "\n{} | {} active | {} completed | {} generated | {} unpaid AVNs",
        report.now.to_string().bold(),
        scheduler.active.len(),
        scheduler.completed.len(),
        scheduler.generated(),
        unpaid
    );

    let allocator = scheduler.allocator();
    let runways: Vec<RunwayRow> = allocator
        .runways()
        .iter()
        .map(|r| RunwayRow {
            runway: r.id,
            status: if r.available { "Free".green().to_string() } else { "Occupied".red().to_string() },
            occupant: r
                .occupant
                .and_then(|id| scheduler.active.get(&id))
                .map(|a| a.flight_number.to_string())
                .unwrap_or_else(|| "-".to_string()),
            waiting: allocator.queue_len(r.id),
        })
        .collect();
    let mut table = tabled::Table::new(runways);
    table.with(Style::rounded());
    println!("{}", table);

    let flights: Vec<FlightRow> = scheduler
        .active
        .values()
        .map(|a| FlightRow {
            flight: a.flight_number.to_string(),
            airline: a.airline.to_string(),
            kind: if a.flight_type == aircraft::FlightType::Emergency {
                a.flight_type.to_string().red().bold().to_string()
            } else {
                a.flight_type.to_string()
            },
            direction: a.direction.to_string(),
            phase: a.phase().to_string(),
            speed: a.speed,
            runway: a.runway.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    if !flights.is_empty() {
        let mut table = tabled::Table::new(flights);
        table.with(Style::rounded());
        println!("{}", table);
    }

    for id in &report.violations {
        if let Ok(avn) = scheduler.registry.get(*id) {
            println!(
                "{} AVN #{} {} {} at {} km/h (permitted {})",
                "VIOLATION".red().bold(),
                avn.id,
                avn.airline,
                avn.flight_number,
                avn.recorded_speed,
                avn.band
            );
        }
    }
    if report.overdue > 0 {
        println!("{} AVN(s) are now {}.", report.overdue, PaymentStatus::Overdue);
    }
}

fn print_flights(scheduler: &Scheduler) {
    if scheduler.active.is_empty() {
        println!("No active flights.");
    }
    for aircraft in scheduler.active.values() {
        println!("{}", aircraft.describe());
    }
    println!("{} flight(s) completed.", scheduler.completed.len());
}

fn print_notices(collaborators: &mut Collaborators) {
    let notices = collaborators.portal.take_notifications();
    if notices.is_empty() {
        println!("No billing notices.");
    }
    for notice in notices {
        println!(
            "{:?} | AVN #{} | {} {} | PKR {} | {}",
            notice.kind,
            notice.violation_id,
            notice.airline,
            notice.flight_number,
            notice.rupees(),
            notice.details.trim_end()
        );
    }
}

/// Polls the terminal until `deadline`. Without raw mode the key arrives
/// once the line is submitted, so `q` needs Enter.
fn quit_requested(deadline: Instant) -> io::Result<bool> {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !event::poll(remaining)? {
            return Ok(false);
        }
        if let Event::Key(key) = event::read()? {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
                return Ok(true);
            }
        }
    }
}

/// Runs up to `ticks` ticks, asking `stop` after each one whether to end
/// early. A terminal error ends the run but never the session.
fn run_simulation(
    scheduler: &mut Scheduler,
    collaborators: &mut Collaborators,
    ticks: u64,
    mut stop: impl FnMut(Instant) -> io::Result<bool>,
) {
    println!("Simulation running for {} ticks. Press q then Enter to stop.", ticks);
    for _ in 0..ticks {
        let started = Instant::now();
        let report = scheduler.tick(&mut collaborators.router);
        let settled = collaborators.router.poll_status(&mut scheduler.registry);
        if settled > 0 {
            println!("{} payment confirmation(s) applied.", settled);
        }
        print_board(scheduler, &report);

        match stop(started) {
            Ok(false) => {}
            Ok(true) => {
                println!("Simulation paused at {}.", scheduler.now());
                return;
            }
            Err(err) => {
                println!("Cannot read the terminal ({}), simulation stopped at {}.", err, scheduler.now());
                return;
            }
        }
    }
    println!("Simulation finished at {}.", scheduler.now());
}

fn show_avn(scheduler: &Scheduler, collaborators: &mut Collaborators, id: AvnId) {
    let avn = match scheduler.registry.get(id) {
        Ok(avn) => avn,
        Err(err) => {
            println!("{}", err);
            return;
        }
    };
    println!("AVN #{} | {} | {} ({})", avn.id, avn.airline, avn.flight_number, avn.flight_type);
    println!("  Recorded speed : {} km/h (permitted {})", avn.recorded_speed, avn.band);
    println!("  Issued         : {}", avn.issued_at);
    println!("  Due            : {}", avn.due_at);
    println!("  Fine           : PKR {}", avn.fine);
    println!("  Service fee    : PKR {}", avn.service_fee);
    println!("  Total          : PKR {}", avn.total);
    println!("  Status         : {}", avn.status);

    match collaborators.portal.query_violation(id) {
        Ok(Some(view)) => println!("  Billing service: PKR {} {}", view.rupees(), view.details),
        Ok(None) => println!("  Billing service: no record"),
        Err(err) => println!("  Billing service unavailable: {}", err),
    }
}

fn pay_avn(scheduler: &mut Scheduler, collaborators: &mut Collaborators, id: AvnId, amount: Option<Rupees>) {
    let (airline, total) = match scheduler.registry.get(id) {
        Ok(avn) => (avn.airline.clone(), avn.total),
        Err(err) => {
            println!("{}", err);
            return;
        }
    };
    let amount = amount.unwrap_or(total);

    match scheduler.registry.check_payment(id, amount) {
        Ok(PaymentOutcome::AlreadySettled) => {
            println!("AVN #{} is already {}.", id, PaymentStatus::Paid);
            return;
        }
        Ok(PaymentOutcome::Settled) => {}
        Err(err) => {
            println!("{}", err);
            return;
        }
    }

    println!("Processing payment of PKR {} for AVN #{}...", amount, id);
    if let Err(err) = collaborators.portal.request_payment(id, &airline, amount) {
        println!("Payment service unavailable: {}", err);
        return;
    }
    match collaborators.portal.await_confirmation(id) {
        Ok(Some(_)) => {
            collaborators.router.poll_status(&mut scheduler.registry);
            match scheduler.registry.get(id) {
                Ok(avn) => println!("AVN #{} is now {}.", id, avn.status),
                Err(err) => println!("{}", err),
            }
        }
        Ok(None) => println!("No confirmation yet; the status updates during the next run."),
        Err(err) => println!("Billing service unavailable: {}", err),
    }
}

fn show_airline(scheduler: &Scheduler, collaborators: &mut Collaborators, name: &str) {
    match scheduler.registry.violations_for(name) {
        Ok(avns) => print_avns(avns),
        Err(err) => {
            println!("{}", err);
            return;
        }
    }
    match collaborators.portal.query_airline(name) {
        Ok(Some(view)) => println!("Billing service holds {} record(s) for {}.", view.violation_id, name),
        Ok(None) => println!("Billing service did not answer."),
        Err(err) => println!("Billing service unavailable: {}", err),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,aircontrol=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = args.load_config()?;
    let mut scheduler = Scheduler::new(&config);

    let rl_config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: vec![
            "run".to_string(),
            "avns".to_string(),
            "show".to_string(),
            "pay".to_string(),
            "airlines".to_string(),
            "airline".to_string(),
            "flights".to_string(),
            "notices".to_string(),
            "help".to_string(),
            "exit".to_string(),
        ],
    };

    let mut rl = Editor::with_config(rl_config)?;
    rl.set_helper(Some(helper));

    let mut collaborators = ipc::spawn(&config.ipc)?;
    println!(
        "Tower online. {} airlines, seed {}.",
        scheduler.registry.airlines().count(),
        scheduler.seed()
    );

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() { continue; }

                if let Err(err) = rl.add_history_entry(trimmed) {
                    tracing::debug!(%err, "history entry not saved");
                }

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                match parts[0] {
                    "run" => {
                        let ticks = parts.get(1).and_then(|t| t.parse::<u64>().ok()).unwrap_or(config.duration);
                        let budget = Duration::from_millis(config.tick_millis);
                        run_simulation(&mut scheduler, &mut collaborators, ticks, |started| {
                            quit_requested(started + budget)
                        });
                    },
                    "avns" => {
                        let sub = parts.get(1).copied().unwrap_or("u");
                        let filtered: Vec<&Avn> = scheduler.registry.all()
                            .filter(|a| match sub {
                                "p" | "paid" => a.status == PaymentStatus::Paid,
                                "o" | "overdue" => a.status == PaymentStatus::Overdue,
                                "a" | "all" => true,
                                _ => !a.is_settled(), // 'avns' or 'avns u'
                            })
                            .collect();
                        print_avns(filtered);
                    },
                    "show" => {
                        match parts.get(1).and_then(|id| id.parse::<AvnId>().ok()) {
                            Some(id) => show_avn(&scheduler, &mut collaborators, id),
                            None => println!("Usage: show <avn_id>"),
                        }
                    },
                    "pay" => {
                        let id = parts.get(1).and_then(|id| id.parse::<AvnId>().ok());
                        let amount = parts.get(2).and_then(|a| a.parse::<Rupees>().ok());
                        match (id, parts.get(2), amount) {
                            (Some(id), None, _) | (Some(id), Some(_), Some(_)) => {
                                pay_avn(&mut scheduler, &mut collaborators, id, amount)
                            }
                            _ => println!("Usage: pay <avn_id> [amount]"),
                        }
                    },
                    "airlines" => {
                        let airlines: Vec<&airline::Airline> = scheduler.registry.airlines().collect();
                        let rows = airlines.len();
                        print_table(tabled::Table::new(airlines), rows);
                    },
                    "airline" => {
                        if parts.len() > 1 {
                            let name = parts[1..].join(" ");
                            show_airline(&scheduler, &mut collaborators, &name);
                        } else {
                            println!("Usage: airline <name>");
                        }
                    },
                    "flights" => print_flights(&scheduler),
                    "notices" => print_notices(&mut collaborators),
                    "help" | "?" => {
                        println!("\nAvailable Commands:");
                        println!("  run [ticks]          - Run the simulation, press q then Enter to stop early");
                        println!("  avns [status]        - List AVNs: u - unpaid (default), p - paid, o - overdue, a - all");
                        println!("  show <id>            - Show AVN <id> with the billing service's record");
                        println!("  pay <id> [amount]    - Pay AVN <id>, defaults to the full amount due");
                        println!("  airlines             - List the airline roster");
                        println!("  airline <name>       - List AVNs issued to airline <name>");
                        println!("  flights              - Describe every active flight");
                        println!("  notices              - Show notices the billing service sent to the portal");
                        println!("  help / ?             - Show this help menu");
                        println!("  exit / quit          - Exit the simulator\n");
                    },
                    "exit" | "quit" => break,
                    _ => println!("Unknown command: {}", parts[0]),
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            },
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            },
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    collaborators.shutdown();
    Ok(())
}
