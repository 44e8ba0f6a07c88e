pub mod admin;
mod config;
pub mod entities;
pub mod homes;
pub mod persistence;
pub mod telemetry;
pub mod world;

use crate::admin::console::{parse_console_line, ConsoleFlow, ConsoleHost};
use crate::homes::cooldown::CooldownBook;
use crate::homes::service::HomeService;
use crate::persistence::store::{MemoryHomeBackend, YamlHomeBackend};
use crate::persistence::worker::{HomeStorage, InlineStorage, ThreadedStorage};
use crate::world::time::GameClock;
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Instant;

pub use config::{AppConfig, HomesConfig, StorageKind};

pub fn run(args: &[String]) -> Result<(), String> {
    let config = config::AppConfig::from_args(args)?;
    telemetry::logging::init(&config.root)?;
    let homes_config = config::HomesConfig::load(&config.root)?;
    let ranks = homes_config.rank_table()?;
    let settings = homes_config.settings(config.countdown_override);

    let storage: Box<dyn HomeStorage> = match config.storage {
        StorageKind::Yaml => Box::new(ThreadedStorage::spawn(YamlHomeBackend::from_root(
            &config.root,
        ))?),
        StorageKind::Memory => Box::new(InlineStorage::new(MemoryHomeBackend::new())),
    };

    telemetry::logging::log_game(&format!(
        "homes starting: storage={:?}, tick={}ms, countdown={}s, page_size={}, tiers={}",
        config.storage,
        config.tick_length.as_millis(),
        settings.teleport_countdown_seconds,
        settings.page_size,
        ranks.tiers().len()
    ));
    println!("homes: started");
    println!("- root: {}", config.root.display());
    println!("- storage: {:?}", config.storage);
    println!("- tick: {}ms", config.tick_length.as_millis());
    println!("- countdown: {}s", settings.teleport_countdown_seconds);
    for tier in ranks.tiers() {
        println!(
            "- rank {} (level {}): {} home(s), cooldown {}s",
            tier.name, tier.level.0, tier.max_homes, tier.teleport_cooldown_seconds
        );
    }
    println!("type help for console commands");

    let clock = GameClock::new(config.tick_length);
    let ledger = CooldownBook::new(&clock);
    let mut service = HomeService::new(settings, ranks.clone(), storage, ledger, clock);
    let mut host = ConsoleHost::new();
    let online = host.online();
    service.init(&mut host, &online);

    let lines = spawn_console_reader()?;
    let tick_length = config.tick_length;
    let mut last_tick = Instant::now();
    loop {
        match lines.recv_timeout(tick_length) {
            Ok(line) => match parse_console_line(&line) {
                Ok(Some(command)) => match host.apply(&mut service, &ranks, command) {
                    Ok(ConsoleFlow::Continue) => {}
                    Ok(ConsoleFlow::Quit) => break,
                    Err(err) => host.print(format!("error: {}", err)),
                },
                Ok(None) => {}
                Err(err) => host.print(format!("error: {}", err)),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let elapsed = last_tick.elapsed().as_nanos() / tick_length.as_nanos().max(1);
        let ticks = elapsed.min(u64::MAX as u128) as u64;
        if ticks > 0 {
            last_tick += service.clock().duration_for_ticks(ticks);
            service.tick(&mut host, ticks);
        }
        for line in host.take_output() {
            println!("{}", line);
        }
    }

    for line in host.take_output() {
        println!("{}", line);
    }
    telemetry::logging::log_game("homes stopped");
    println!("homes: stopped");
    Ok(())
}

fn spawn_console_reader() -> Result<Receiver<String>, String> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(|err| format!("console reader spawn failed: {}", err))?;
    Ok(rx)
}
