use crate::admin::commands::{parse_chat_command, parse_ui_command, HomeCommand};
use crate::entities::player::PlayerId;
use crate::entities::rank::RankTable;
use crate::homes::cooldown::CooldownLedger;
use crate::homes::host::Host;
use crate::homes::presenter::{self, SYNTAX_HELP};
use crate::homes::store::{HomeStore, LoadError, LoadOutcome};
use crate::homes::teleport::{TeleportOutcome, TeleportSequencer};
use crate::persistence::worker::HomeStorage;
use crate::telemetry::logging;
use crate::world::cron::Cron;
use crate::world::time::GameClock;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeSettings {
    pub page_size: usize,
    pub teleport_countdown_seconds: u64,
    pub load_retry_seconds: u64,
}

impl Default for HomeSettings {
    fn default() -> Self {
        Self {
            page_size: presenter::PAGE_SIZE,
            teleport_countdown_seconds: crate::homes::teleport::DEFAULT_COUNTDOWN_SECONDS,
            load_retry_seconds: 1,
        }
    }
}

/// The homes feature as seen by the game loop: session hooks, commands and ticks.
pub struct HomeService<S, L> {
    settings: HomeSettings,
    clock: GameClock,
    homes: HomeStore<S>,
    teleports: TeleportSequencer,
    ledger: L,
    load_retries: Cron<PlayerId>,
    open_pages: HashMap<PlayerId, usize>,
}

impl<S: HomeStorage, L: CooldownLedger> HomeService<S, L> {
    pub fn new(
        settings: HomeSettings,
        ranks: RankTable,
        storage: S,
        ledger: L,
        clock: GameClock,
    ) -> Self {
        Self {
            settings,
            clock,
            homes: HomeStore::new(storage, ranks.clone()),
            teleports: TeleportSequencer::new(ranks),
            ledger,
            load_retries: Cron::new(),
            open_pages: HashMap::new(),
        }
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn homes(&self) -> &HomeStore<S> {
        &self.homes
    }

    pub fn homes_mut(&mut self) -> &mut HomeStore<S> {
        &mut self.homes
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn teleports(&self) -> &TeleportSequencer {
        &self.teleports
    }

    pub fn settings(&self) -> &HomeSettings {
        &self.settings
    }

    pub fn page_open(&self, player: PlayerId) -> Option<usize> {
        self.open_pages.get(&player).copied()
    }

    /// Server start: players already online get a clean UI and a fresh load.
    pub fn init<H: Host>(&mut self, host: &mut H, online: &[PlayerId]) {
        for &player in online {
            self.close_ui(host, player);
            self.player_connected(host, player);
        }
    }

    pub fn player_connected<H: Host>(&mut self, host: &mut H, player: PlayerId) {
        let profile = host.profile(player);
        match self.homes.load(player, profile.as_ref()) {
            Ok(()) => {}
            Err(LoadError::Deferred) => {
                logging::log_homes(&format!(
                    "Loading homes for [{}] has been delayed, waiting for the profile service",
                    player
                ));
                let delay = self
                    .clock
                    .ticks_from_secs(self.settings.load_retry_seconds)
                    .max(1);
                self.load_retries.schedule(self.clock.now(), delay, player);
            }
        }
    }

    pub fn player_disconnected(&mut self, player: PlayerId) {
        self.homes.unload(player);
        self.open_pages.remove(&player);
    }

    /// Handle a chat line; returns false when it was not a home command.
    pub fn handle_chat<H: Host>(&mut self, host: &mut H, player: PlayerId, message: &str) -> bool {
        match parse_chat_command(message) {
            Ok(Some(command)) => {
                self.execute(host, player, command, false);
                true
            }
            Ok(None) => false,
            Err(err) => {
                host.send_message(player, &format!("Error: {}", err));
                host.send_message(player, SYNTAX_HELP);
                true
            }
        }
    }

    /// Handle a UI console action; returns false when it was not a home action.
    pub fn handle_ui<H: Host>(&mut self, host: &mut H, player: PlayerId, line: &str) -> bool {
        match parse_ui_command(line) {
            Ok(Some(command)) => {
                self.execute(host, player, command, true);
                true
            }
            Ok(None) => false,
            Err(err) => {
                logging::log_error(&format!("bad home action from [{}]: {}", player, err));
                true
            }
        }
    }

    pub fn execute<H: Host>(
        &mut self,
        host: &mut H,
        player: PlayerId,
        command: HomeCommand,
        from_ui: bool,
    ) {
        match command {
            HomeCommand::OpenUi => {
                self.show_page(host, player, 0);
                host.send_message(player, SYNTAX_HELP);
            }
            HomeCommand::Usage => host.send_message(player, SYNTAX_HELP),
            HomeCommand::List => self.list(host, player),
            HomeCommand::Add(name) => {
                self.add(host, player, &name);
                if from_ui {
                    self.refresh_ui(host, player);
                }
            }
            HomeCommand::AddDefault => {
                let name = presenter::next_default_name(&self.homes.list(player));
                self.add(host, player, &name);
                self.refresh_ui(host, player);
            }
            HomeCommand::Remove(name) => {
                self.remove(host, player, &name);
                if from_ui {
                    self.refresh_ui(host, player);
                }
            }
            HomeCommand::Teleport(name) => {
                self.teleport_home(host, player, &name);
                if from_ui {
                    self.close_ui(host, player);
                }
            }
            HomeCommand::CloseUi => self.close_ui(host, player),
            HomeCommand::ShowPage(index) => self.show_page(host, player, index),
        }
    }

    fn list<H: Host>(&mut self, host: &mut H, player: PlayerId) {
        if !self.homes.is_loaded(player) {
            host.send_message(player, "Error: your homes are still loading, try again in a moment.");
            return;
        }
        let text = presenter::chat_listing(&self.homes.list(player));
        host.send_message(player, &text);
    }

    fn add<H: Host>(&mut self, host: &mut H, player: PlayerId, name: &str) {
        let (Some(profile), Some(actor)) = (host.profile(player), host.actor(player)) else {
            host.send_message(player, "Error: your profile is not available yet.");
            return;
        };
        match self
            .homes
            .add(player, name, actor.position, &actor, &profile)
        {
            Ok(()) => host.send_message(player, &format!("Your home \"{}\" has been added.", name)),
            Err(err) => host.send_message(player, &format!("Error: {}", err)),
        }
    }

    fn remove<H: Host>(&mut self, host: &mut H, player: PlayerId, name: &str) {
        match self.homes.remove(player, name) {
            Ok(_) => host.send_message(player, &format!("Your home \"{}\" has been removed.", name)),
            Err(err) => host.send_message(player, &format!("Error: {}", err)),
        }
    }

    fn teleport_home<H: Host>(&mut self, host: &mut H, player: PlayerId, name: &str) {
        let result = self.teleports.request_home(
            host,
            &self.homes,
            &mut self.ledger,
            &self.clock,
            player,
            name,
            self.settings.teleport_countdown_seconds,
        );
        match result {
            Ok(TeleportOutcome::Pending { .. }) | Ok(TeleportOutcome::Applied { .. }) => {}
            Err(err) => host.send_message(player, &format!("Error: {}", err)),
        }
    }

    fn show_page<H: Host>(&mut self, host: &mut H, player: PlayerId, index: usize) {
        let page = presenter::build_page(&self.homes.list(player), index, self.settings.page_size);
        self.open_pages.insert(player, page.index);
        host.show_home_page(player, &page);
    }

    fn refresh_ui<H: Host>(&mut self, host: &mut H, player: PlayerId) {
        if let Some(index) = self.open_pages.get(&player).copied() {
            self.show_page(host, player, index);
        }
    }

    fn close_ui<H: Host>(&mut self, host: &mut H, player: PlayerId) {
        self.open_pages.remove(&player);
        host.close_home_page(player);
    }

    /// Advance the clock and run everything that became due.
    pub fn tick<H: Host>(&mut self, host: &mut H, ticks: u64) {
        self.clock.advance(ticks);
        self.ledger.sync_clock(&self.clock);

        while let Some(player) = self.load_retries.pop_ready(self.clock.now()) {
            if host.actor(player).is_none() {
                continue;
            }
            self.player_connected(host, player);
        }

        for outcome in self.homes.pump() {
            match outcome {
                LoadOutcome::Loaded { player, .. } => self.refresh_ui(host, player),
                LoadOutcome::Failed { player, .. } => {
                    host.send_message(player, "Error: your homes could not be loaded.");
                }
                // write failures are already in error.log; memory stays authoritative
                LoadOutcome::Stale { .. } | LoadOutcome::WriteFailed { .. } => {}
            }
        }

        for resolution in self
            .teleports
            .run_due(host, &mut self.ledger, &self.clock)
        {
            if let Err(err) = resolution.result {
                host.send_message(resolution.player, &format!("Error: {}", err));
            }
        }
        self.teleports.forget_finished();
    }
}
