use crate::entities::player::{ActorState, PlayerId, Profile};
use crate::entities::rank::{RankLevel, RankTable};
use crate::homes::cooldown::CooldownLedger;
use crate::homes::host::{Host, Notifier, ProfileSource};
use crate::homes::presenter::HomePage;
use crate::homes::service::HomeService;
use crate::persistence::worker::HomeStorage;
use crate::world::position::Position;
use std::collections::BTreeMap;

pub const CONSOLE_HELP: &str = "commands:\n\
  join <player> <user_id> [rank|-]   connect a player (- = profile not ready)\n\
  leave <player>\n\
  move <player> <x> <y> <z>\n\
  state <player> <alive|wounded|build|swimming|crafting> <on|off|count>\n\
  rank <player> <rank>               set or create the profile\n\
  say <player> <chat line>\n\
  ui <player> <action>               e.g. ui 1 teleport home index 1\n\
  wait <seconds>                     fast-forward the clock\n\
  who\n\
  quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFlag {
    Alive(bool),
    Wounded(bool),
    CanBuild(bool),
    Swimming(bool),
    Crafting(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Join {
        player: PlayerId,
        user_id: u32,
        rank: Option<String>,
    },
    Leave(PlayerId),
    Move(PlayerId, Position),
    State(PlayerId, StateFlag),
    Rank(PlayerId, String),
    Say(PlayerId, String),
    Ui(PlayerId, String),
    Wait(u64),
    Who,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFlow {
    Continue,
    Quit,
}

pub fn parse_console_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = split_word(line);
    let command = match verb.to_ascii_lowercase().as_str() {
        "join" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            if parts.len() < 2 || parts.len() > 3 {
                return Err("usage: join <player> <user_id> [rank|-]".to_string());
            }
            let player = parse_player(parts[0])?;
            let user_id = parts[1]
                .parse::<u32>()
                .map_err(|_| format!("invalid user id '{}'", parts[1]))?;
            let rank = match parts.get(2) {
                Some(&"-") => None,
                Some(rank) => Some(rank.to_string()),
                None => Some("0".to_string()),
            };
            ConsoleCommand::Join {
                player,
                user_id,
                rank,
            }
        }
        "leave" => ConsoleCommand::Leave(parse_player(rest)?),
        "move" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [player, x, y, z] = parts.as_slice() else {
                return Err("usage: move <player> <x> <y> <z>".to_string());
            };
            let position = Position::new(parse_coord(x)?, parse_coord(y)?, parse_coord(z)?);
            if !position.is_finite() {
                return Err("coordinates must be finite".to_string());
            }
            ConsoleCommand::Move(parse_player(player)?, position)
        }
        "state" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [player, flag, value] = parts.as_slice() else {
                return Err("usage: state <player> <flag> <value>".to_string());
            };
            ConsoleCommand::State(parse_player(player)?, parse_flag(flag, value)?)
        }
        "rank" => {
            let (player, rank) = split_word(rest);
            if rank.is_empty() {
                return Err("usage: rank <player> <rank>".to_string());
            }
            ConsoleCommand::Rank(parse_player(player)?, rank.to_string())
        }
        "say" => {
            let (player, text) = split_word(rest);
            ConsoleCommand::Say(parse_player(player)?, text.to_string())
        }
        "ui" => {
            let (player, action) = split_word(rest);
            ConsoleCommand::Ui(parse_player(player)?, action.to_string())
        }
        "wait" => ConsoleCommand::Wait(
            rest.parse::<u64>()
                .map_err(|_| format!("invalid seconds '{}'", rest))?,
        ),
        "who" => ConsoleCommand::Who,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{}', try help", other)),
    };
    Ok(Some(command))
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn parse_player(value: &str) -> Result<PlayerId, String> {
    value
        .trim()
        .parse::<u64>()
        .map(PlayerId)
        .map_err(|_| format!("invalid player id '{}'", value.trim()))
}

fn parse_coord(value: &str) -> Result<f32, String> {
    value
        .parse::<f32>()
        .map_err(|_| format!("invalid coordinate '{}'", value))
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("expected on/off, got '{}'", value)),
    }
}

fn parse_flag(flag: &str, value: &str) -> Result<StateFlag, String> {
    let flag = match flag.to_ascii_lowercase().as_str() {
        "alive" => StateFlag::Alive(parse_switch(value)?),
        "wounded" => StateFlag::Wounded(parse_switch(value)?),
        "build" => StateFlag::CanBuild(parse_switch(value)?),
        "swimming" => StateFlag::Swimming(parse_switch(value)?),
        "crafting" => StateFlag::Crafting(
            value
                .parse::<usize>()
                .map_err(|_| format!("invalid crafting queue length '{}'", value))?,
        ),
        other => return Err(format!("unknown state flag '{}'", other)),
    };
    Ok(flag)
}

/// Rank by tier name or raw level number.
pub fn resolve_rank(ranks: &RankTable, value: &str) -> Result<RankLevel, String> {
    if let Some(level) = ranks.level_named(value) {
        return Ok(level);
    }
    value
        .trim()
        .parse::<u8>()
        .map(RankLevel)
        .map_err(|_| format!("unknown rank '{}'", value))
}

/// Simulated game server driven from stdin; everything it does is buffered as text.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    actors: BTreeMap<PlayerId, ActorState>,
    profiles: BTreeMap<PlayerId, Profile>,
    user_ids: BTreeMap<PlayerId, u32>,
    output: Vec<String>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn online(&self) -> Vec<PlayerId> {
        self.actors.keys().copied().collect()
    }

    pub fn print(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Apply one console command; player sessions are forwarded to the service.
    pub fn apply<S: HomeStorage, L: CooldownLedger>(
        &mut self,
        service: &mut HomeService<S, L>,
        ranks: &RankTable,
        command: ConsoleCommand,
    ) -> Result<ConsoleFlow, String> {
        match command {
            ConsoleCommand::Join {
                player,
                user_id,
                rank,
            } => {
                if self.actors.contains_key(&player) {
                    return Err(format!("player {} is already online", player));
                }
                self.actors
                    .insert(player, ActorState::new(player, Position::ORIGIN));
                self.user_ids.insert(player, user_id);
                if let Some(rank) = rank {
                    let level = resolve_rank(ranks, &rank)?;
                    self.profiles.insert(player, Profile::new(user_id, level));
                }
                self.print(format!("player {} joined as user {}", player, user_id));
                service.player_connected(self, player);
            }
            ConsoleCommand::Leave(player) => {
                self.require(player)?;
                self.actors.remove(&player);
                self.profiles.remove(&player);
                self.user_ids.remove(&player);
                service.player_disconnected(player);
                self.print(format!("player {} left", player));
            }
            ConsoleCommand::Move(player, position) => {
                self.require_mut(player)?.position = position;
            }
            ConsoleCommand::State(player, flag) => {
                let actor = self.require_mut(player)?;
                match flag {
                    StateFlag::Alive(value) => actor.alive = value,
                    StateFlag::Wounded(value) => actor.wounded = value,
                    StateFlag::CanBuild(value) => actor.can_build = value,
                    StateFlag::Swimming(value) => actor.swimming = value,
                    StateFlag::Crafting(count) => actor.crafting_queue = count,
                }
            }
            ConsoleCommand::Rank(player, rank) => {
                self.require(player)?;
                let level = resolve_rank(ranks, &rank)?;
                let user_id = self.user_ids.get(&player).copied().unwrap_or_default();
                self.profiles.insert(player, Profile::new(user_id, level));
            }
            ConsoleCommand::Say(player, text) => {
                self.require(player)?;
                if !service.handle_chat(self, player, &text) {
                    self.print(format!("[{}] says: {}", player, text));
                }
            }
            ConsoleCommand::Ui(player, action) => {
                self.require(player)?;
                if !service.handle_ui(self, player, &action) {
                    return Err(format!("unknown ui action '{}'", action));
                }
            }
            ConsoleCommand::Wait(seconds) => {
                let ticks = service.clock().ticks_from_secs(seconds);
                service.tick(self, ticks);
            }
            ConsoleCommand::Who => {
                let lines: Vec<String> = self
                    .actors
                    .values()
                    .map(|actor| {
                        let rank = self
                            .profiles
                            .get(&actor.id)
                            .map(|profile| profile.rank.0.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        format!(
                            "  {} at {} rank {} homes {}",
                            actor.id,
                            actor.position,
                            rank,
                            service.homes().list(actor.id).len()
                        )
                    })
                    .collect();
                self.print(format!("{} player(s) online", lines.len()));
                self.output.extend(lines);
            }
            ConsoleCommand::Help => self.print(CONSOLE_HELP),
            ConsoleCommand::Quit => return Ok(ConsoleFlow::Quit),
        }
        Ok(ConsoleFlow::Continue)
    }

    fn require(&self, player: PlayerId) -> Result<(), String> {
        if self.actors.contains_key(&player) {
            Ok(())
        } else {
            Err(format!("player {} is not online", player))
        }
    }

    fn require_mut(&mut self, player: PlayerId) -> Result<&mut ActorState, String> {
        self.actors
            .get_mut(&player)
            .ok_or_else(|| format!("player {} is not online", player))
    }
}

impl ProfileSource for ConsoleHost {
    fn profile(&self, player: PlayerId) -> Option<Profile> {
        self.profiles.get(&player).cloned()
    }
}

impl Notifier for ConsoleHost {
    fn add_timed_notification(
        &mut self,
        player: PlayerId,
        key: &str,
        label: &str,
        duration_seconds: u64,
        color: &str,
    ) {
        self.print(format!(
            "[{}] notify +{} \"{}\" {}s ({})",
            player, key, label, duration_seconds, color
        ));
    }

    fn remove_timed_notification(&mut self, player: PlayerId, key: &str) {
        self.print(format!("[{}] notify -{}", player, key));
    }
}

impl Host for ConsoleHost {
    fn actor(&self, player: PlayerId) -> Option<ActorState> {
        self.actors.get(&player).cloned()
    }

    fn apply_position(&mut self, player: PlayerId, position: Position) {
        if let Some(actor) = self.actors.get_mut(&player) {
            actor.position = position;
        }
        self.print(format!("[{}] moved to {}", player, position));
    }

    fn send_message(&mut self, player: PlayerId, text: &str) {
        for line in text.lines() {
            self.print(format!("[{}] << {}", player, line));
        }
    }

    fn show_home_page(&mut self, player: PlayerId, page: &HomePage) {
        let lines = render_page(page);
        for line in lines {
            self.print(format!("[{}] | {}", player, line));
        }
    }

    fn close_home_page(&mut self, player: PlayerId) {
        self.print(format!("[{}] | (homes closed)", player));
    }
}

fn render_page(page: &HomePage) -> Vec<String> {
    let mut lines = vec![format!(
        "Homes page {}/{} ({} total)",
        page.index + 1,
        page.page_count,
        page.total
    )];
    for entry in &page.entries {
        lines.push(format!(
            "  {}  [{}: {}] [{}: {}]",
            entry.label,
            entry.teleport.label,
            entry.teleport.action,
            entry.delete.label,
            entry.delete.action
        ));
    }
    let mut controls = Vec::new();
    for control in [page.previous.as_ref(), page.next.as_ref()]
        .into_iter()
        .flatten()
        .chain([&page.add, &page.close])
    {
        controls.push(format!("[{}: {}]", control.label, control.action));
    }
    lines.push(format!("  {}", controls.join(" ")));
    lines
}
