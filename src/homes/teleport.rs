use crate::entities::player::{PlayerId, Profile};
use crate::entities::rank::RankTable;
use crate::homes::cooldown::CooldownLedger;
use crate::homes::eligibility::{self, Reason};
use crate::homes::host::Host;
use crate::homes::store::HomeStore;
use crate::persistence::worker::HomeStorage;
use crate::telemetry::logging;
use crate::world::cron::{Cron, CronHandle};
use crate::world::position::Position;
use crate::world::time::{format_duration_long, GameClock};
use std::collections::HashMap;

pub const TELEPORT_HOME_KEY: &str = "teleport_home";
pub const TELEPORT_HOME_LABEL: &str = "Teleport Home";
pub const TELEPORT_HOME_COLOR: &str = "0.3 0.3 0.3 1";
pub const DEFAULT_COUNTDOWN_SECONDS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeleportId(pub u64);

/// Lifecycle of one teleport attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportPhase {
    Requested,
    OriginChecked,
    CountdownPending,
    Committing,
    Applied,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeleportError {
    OnCooldown(u64),
    UnknownHome(String),
    NotLoaded,
    ProfileUnavailable,
    IneligibleState(Reason),
    DestinationBlocked(Reason),
}

impl std::fmt::Display for TeleportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeleportError::OnCooldown(seconds) => {
                write!(f, "teleport cooldown {}.", format_duration_long(*seconds))
            }
            TeleportError::UnknownHome(name) => {
                write!(f, "the home with the name \"{}\" does not exist.", name)
            }
            TeleportError::NotLoaded => {
                write!(f, "your homes are still loading, try again in a moment.")
            }
            TeleportError::ProfileUnavailable => {
                write!(f, "your profile is not available yet.")
            }
            TeleportError::IneligibleState(reason) => write!(
                f,
                "you cannot teleport from your current location ({}).",
                reason
            ),
            TeleportError::DestinationBlocked(reason) => {
                write!(f, "you cannot teleport to your home ({}).", reason)
            }
        }
    }
}

impl std::error::Error for TeleportError {}

#[derive(Debug, Clone, PartialEq)]
pub enum TeleportOutcome {
    Pending {
        id: TeleportId,
        countdown_seconds: u64,
    },
    Applied {
        position: Position,
        cooldown_seconds: u64,
    },
}

/// Result of a countdown elapsing, reported back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub id: TeleportId,
    pub player: PlayerId,
    pub result: Result<TeleportOutcome, TeleportError>,
}

#[derive(Debug, Clone)]
struct Attempt {
    player: PlayerId,
    destination: Position,
    handle: CronHandle,
}

/// Drives teleports from request to applied position.
///
/// A countdown is a one-shot deferred re-check: when it elapses the origin
/// and destination are validated again from scratch, so anything that
/// changed in between (wounds, disconnect) rejects the attempt.
#[derive(Debug)]
pub struct TeleportSequencer {
    ranks: RankTable,
    cron: Cron<TeleportId>,
    pending: HashMap<TeleportId, Attempt>,
    by_player: HashMap<PlayerId, TeleportId>,
    next_id: u64,
    phases: HashMap<TeleportId, TeleportPhase>,
}

impl TeleportSequencer {
    pub fn new(ranks: RankTable) -> Self {
        Self {
            ranks,
            cron: Cron::new(),
            pending: HashMap::new(),
            by_player: HashMap::new(),
            next_id: 1,
            phases: HashMap::new(),
        }
    }

    /// Teleport to one of the player's saved homes.
    ///
    /// The cooldown is checked once here and not again when the countdown ends.
    #[allow(clippy::too_many_arguments)]
    pub fn request_home<H, S, L>(
        &mut self,
        host: &mut H,
        homes: &HomeStore<S>,
        ledger: &mut L,
        clock: &GameClock,
        player: PlayerId,
        name: &str,
        countdown_seconds: u64,
    ) -> Result<TeleportOutcome, TeleportError>
    where
        H: Host,
        S: HomeStorage,
        L: CooldownLedger,
    {
        let remaining = ledger.remaining_time(player, TELEPORT_HOME_KEY);
        if remaining > 0 {
            return Err(TeleportError::OnCooldown(remaining));
        }
        if !homes.is_loaded(player) {
            return Err(TeleportError::NotLoaded);
        }
        let home = homes
            .get(player, name)
            .ok_or_else(|| TeleportError::UnknownHome(name.to_string()))?;
        self.start(host, ledger, clock, player, home.position, countdown_seconds)
    }

    /// Teleport to a raw coordinate, skipping the cooldown gate.
    pub fn request_position<H, L>(
        &mut self,
        host: &mut H,
        ledger: &mut L,
        clock: &GameClock,
        player: PlayerId,
        destination: Position,
        countdown_seconds: u64,
    ) -> Result<TeleportOutcome, TeleportError>
    where
        H: Host,
        L: CooldownLedger,
    {
        self.start(host, ledger, clock, player, destination, countdown_seconds)
    }

    fn start<H: Host, L: CooldownLedger>(
        &mut self,
        host: &mut H,
        ledger: &mut L,
        clock: &GameClock,
        player: PlayerId,
        destination: Position,
        countdown_seconds: u64,
    ) -> Result<TeleportOutcome, TeleportError> {
        let id = self.allocate_id();
        self.phases.insert(id, TeleportPhase::Requested);
        if let Err(err) = check_route(host, player, destination) {
            self.phases.insert(id, TeleportPhase::Rejected);
            return Err(err);
        }
        self.phases.insert(id, TeleportPhase::OriginChecked);

        // a newer request replaces the one still counting down
        if let Some(previous) = self.by_player.remove(&player) {
            if let Some(attempt) = self.pending.remove(&previous) {
                self.cron.cancel(attempt.handle);
                host.remove_timed_notification(player, TELEPORT_HOME_KEY);
            }
            self.phases.remove(&previous);
        }

        if countdown_seconds == 0 {
            return self.commit(host, ledger, id, player, destination);
        }
        host.add_timed_notification(
            player,
            TELEPORT_HOME_KEY,
            TELEPORT_HOME_LABEL,
            countdown_seconds,
            TELEPORT_HOME_COLOR,
        );
        let delay = clock.ticks_from_secs(countdown_seconds);
        let handle = self.cron.schedule(clock.now(), delay, id);
        self.pending.insert(
            id,
            Attempt {
                player,
                destination,
                handle,
            },
        );
        self.by_player.insert(player, id);
        self.phases.insert(id, TeleportPhase::CountdownPending);
        Ok(TeleportOutcome::Pending {
            id,
            countdown_seconds,
        })
    }

    /// Re-check and commit every attempt whose countdown elapsed.
    pub fn run_due<H: Host, L: CooldownLedger>(
        &mut self,
        host: &mut H,
        ledger: &mut L,
        clock: &GameClock,
    ) -> Vec<Resolution> {
        let mut resolved = Vec::new();
        while let Some(id) = self.cron.pop_ready(clock.now()) {
            let Some(attempt) = self.pending.remove(&id) else {
                continue;
            };
            if self.by_player.get(&attempt.player) == Some(&id) {
                self.by_player.remove(&attempt.player);
            }
            let result = match check_route(host, attempt.player, attempt.destination) {
                Ok(()) => {
                    self.phases.insert(id, TeleportPhase::OriginChecked);
                    self.commit(host, ledger, id, attempt.player, attempt.destination)
                }
                Err(err) => {
                    host.remove_timed_notification(attempt.player, TELEPORT_HOME_KEY);
                    self.phases.insert(id, TeleportPhase::Rejected);
                    Err(err)
                }
            };
            resolved.push(Resolution {
                id,
                player: attempt.player,
                result,
            });
        }
        resolved
    }

    fn commit<H: Host, L: CooldownLedger>(
        &mut self,
        host: &mut H,
        ledger: &mut L,
        id: TeleportId,
        player: PlayerId,
        destination: Position,
    ) -> Result<TeleportOutcome, TeleportError> {
        let Some(profile) = host.profile(player) else {
            host.remove_timed_notification(player, TELEPORT_HOME_KEY);
            self.phases.insert(id, TeleportPhase::Rejected);
            return Err(TeleportError::ProfileUnavailable);
        };
        self.phases.insert(id, TeleportPhase::Committing);
        host.remove_timed_notification(player, TELEPORT_HOME_KEY);
        let cooldown_seconds = self.cooldown_for(&profile);
        ledger.commit(player, TELEPORT_HOME_KEY, cooldown_seconds);
        host.apply_position(player, destination);
        self.phases.insert(id, TeleportPhase::Applied);
        logging::log_player(profile.id, player, &format!("teleported to {}", destination));
        Ok(TeleportOutcome::Applied {
            position: destination,
            cooldown_seconds,
        })
    }

    pub fn cooldown_for(&self, profile: &Profile) -> u64 {
        self.ranks.teleport_cooldown_seconds(profile)
    }

    /// Last known phase; entries for finished attempts are kept until `forget_finished`.
    pub fn phase(&self, id: TeleportId) -> Option<TeleportPhase> {
        self.phases.get(&id).copied()
    }

    /// Drop bookkeeping for attempts that reached a terminal phase.
    pub fn forget_finished(&mut self) {
        self.phases.retain(|_, phase| {
            !matches!(phase, TeleportPhase::Applied | TeleportPhase::Rejected)
        });
    }

    pub fn pending_for(&self, player: PlayerId) -> Option<TeleportId> {
        self.by_player.get(&player).copied()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn allocate_id(&mut self) -> TeleportId {
        let id = TeleportId(self.next_id);
        self.next_id += 1;
        id
    }
}

fn check_route<H: Host>(
    host: &H,
    player: PlayerId,
    destination: Position,
) -> Result<(), TeleportError> {
    let actor = host
        .actor(player)
        .ok_or(TeleportError::IneligibleState(Reason::Disconnected))?;
    if let Some(reason) = eligibility::can_teleport_from(&actor) {
        return Err(TeleportError::IneligibleState(reason));
    }
    if let Some(reason) = eligibility::can_teleport_to_position(&actor, destination) {
        return Err(TeleportError::DestinationBlocked(reason));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::rank::RankLevel;
    use crate::homes::cooldown::CooldownBook;
    use crate::homes::host::ProfileSource;
    use crate::homes::testing::{FakeHost, HostCall};
    use crate::persistence::store::{HomeRecord, MemoryHomeBackend};
    use crate::persistence::worker::InlineStorage;
    use std::time::Duration;

    const PLAYER: PlayerId = PlayerId(5);
    const USER: u32 = 50;

    struct Fixture {
        host: FakeHost,
        homes: HomeStore<InlineStorage<MemoryHomeBackend>>,
        ledger: CooldownBook,
        clock: GameClock,
        sequencer: TeleportSequencer,
    }

    fn fixture(rank: RankLevel) -> Fixture {
        let clock = GameClock::new(Duration::from_millis(100));
        let mut host = FakeHost::new();
        host.join(PLAYER, USER, rank, Position::new(1.0, 1.0, 1.0));
        let storage = InlineStorage::new(MemoryHomeBackend::with_rows(
            USER,
            vec![HomeRecord::new("base", Position::new(500.0, 20.0, -300.0))],
        ));
        let mut homes = HomeStore::new(storage, RankTable::default());
        homes.load(PLAYER, host.profile(PLAYER).as_ref()).unwrap();
        homes.pump();
        Fixture {
            host,
            homes,
            ledger: CooldownBook::new(&clock),
            clock,
            sequencer: TeleportSequencer::new(RankTable::default()),
        }
    }

    impl Fixture {
        fn request(&mut self, name: &str, countdown: u64) -> Result<TeleportOutcome, TeleportError> {
            self.sequencer.request_home(
                &mut self.host,
                &self.homes,
                &mut self.ledger,
                &self.clock,
                PLAYER,
                name,
                countdown,
            )
        }

        fn advance_secs(&mut self, seconds: u64) -> Vec<Resolution> {
            self.clock.advance_duration(Duration::from_secs(seconds));
            self.ledger.sync_clock(&self.clock);
            self.sequencer
                .run_due(&mut self.host, &mut self.ledger, &self.clock)
        }
    }

    #[test]
    fn immediate_teleport_commits_base_cooldown() {
        let mut fx = fixture(RankLevel::BASE);
        let outcome = fx.request("base", 0).unwrap();
        assert_eq!(
            outcome,
            TeleportOutcome::Applied {
                position: Position::new(500.0, 20.0, -300.0),
                cooldown_seconds: 1200,
            }
        );
        assert_eq!(fx.host.applied(PLAYER), vec![Position::new(500.0, 20.0, -300.0)]);
        assert_eq!(fx.ledger.remaining_time(PLAYER, TELEPORT_HOME_KEY), 1200);
    }

    #[test]
    fn vip_cooldown_is_five_minutes() {
        let mut fx = fixture(RankLevel::VIP);
        fx.request("base", 0).unwrap();
        assert_eq!(fx.ledger.remaining_time(PLAYER, TELEPORT_HOME_KEY), 300);
    }

    #[test]
    fn countdown_defers_then_applies_once() {
        let mut fx = fixture(RankLevel::BASE);
        let outcome = fx.request("base", DEFAULT_COUNTDOWN_SECONDS).unwrap();
        let TeleportOutcome::Pending { id, countdown_seconds } = outcome else {
            panic!("expected pending");
        };
        assert_eq!(countdown_seconds, 10);
        assert_eq!(fx.sequencer.phase(id), Some(TeleportPhase::CountdownPending));
        assert_eq!(fx.sequencer.pending_for(PLAYER), Some(id));
        assert!(fx.host.calls.contains(&HostCall::AddNotification {
            player: PLAYER,
            key: TELEPORT_HOME_KEY.to_string(),
            label: TELEPORT_HOME_LABEL.to_string(),
            seconds: 10,
            color: TELEPORT_HOME_COLOR.to_string(),
        }));
        assert!(fx.host.applied(PLAYER).is_empty());
        assert_eq!(fx.ledger.remaining_time(PLAYER, TELEPORT_HOME_KEY), 0);

        assert!(fx.advance_secs(9).is_empty());
        assert!(fx.host.applied(PLAYER).is_empty());

        let resolved = fx.advance_secs(1);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, id);
        assert!(matches!(
            resolved[0].result,
            Ok(TeleportOutcome::Applied { cooldown_seconds: 1200, .. })
        ));
        assert_eq!(fx.sequencer.phase(id), Some(TeleportPhase::Applied));
        assert_eq!(fx.host.applied(PLAYER).len(), 1);
        assert!(fx.host.calls.contains(&HostCall::RemoveNotification {
            player: PLAYER,
            key: TELEPORT_HOME_KEY.to_string(),
        }));
        assert_eq!(fx.sequencer.pending_count(), 0);
        assert!(fx.advance_secs(30).is_empty());
        assert_eq!(fx.host.applied(PLAYER).len(), 1);
    }

    #[test]
    fn cooldown_rejects_without_commit() {
        let mut fx = fixture(RankLevel::BASE);
        fx.ledger.commit(PLAYER, TELEPORT_HOME_KEY, 90);
        assert_eq!(fx.request("base", 10), Err(TeleportError::OnCooldown(90)));
        assert_eq!(fx.ledger.remaining_time(PLAYER, TELEPORT_HOME_KEY), 90);
        assert!(fx.host.calls.is_empty());
        assert_eq!(fx.sequencer.pending_count(), 0);
    }

    #[test]
    fn cooldown_is_checked_before_home_lookup() {
        let mut fx = fixture(RankLevel::BASE);
        fx.ledger.commit(PLAYER, TELEPORT_HOME_KEY, 10);
        assert_eq!(fx.request("nowhere", 0), Err(TeleportError::OnCooldown(10)));
    }

    #[test]
    fn unknown_home_is_rejected() {
        let mut fx = fixture(RankLevel::BASE);
        assert_eq!(
            fx.request("nowhere", 10),
            Err(TeleportError::UnknownHome("nowhere".to_string()))
        );
        assert!(fx.host.calls.is_empty());
    }

    #[test]
    fn ineligible_origin_rejects_up_front() {
        let mut fx = fixture(RankLevel::BASE);
        fx.host.actor_mut(PLAYER).crafting_queue = 1;
        assert_eq!(
            fx.request("base", 10),
            Err(TeleportError::IneligibleState(Reason::Crafting))
        );
        assert!(fx.host.calls.is_empty());
        assert_eq!(fx.ledger.remaining_time(PLAYER, TELEPORT_HOME_KEY), 0);
    }

    #[test]
    fn wounded_during_countdown_rejects_at_recheck() {
        let mut fx = fixture(RankLevel::BASE);
        fx.request("base", 10).unwrap();
        fx.advance_secs(4);
        fx.host.actor_mut(PLAYER).wounded = true;

        let resolved = fx.advance_secs(6);
        assert_eq!(resolved.len(), 1);
        assert_eq!(
            resolved[0].result,
            Err(TeleportError::IneligibleState(Reason::Wounded))
        );
        assert_eq!(fx.sequencer.phase(resolved[0].id), Some(TeleportPhase::Rejected));
        assert!(fx.host.applied(PLAYER).is_empty());
        assert_eq!(fx.ledger.remaining_time(PLAYER, TELEPORT_HOME_KEY), 0);
    }

    #[test]
    fn disconnect_during_countdown_fails_cleanly() {
        let mut fx = fixture(RankLevel::BASE);
        fx.request("base", 10).unwrap();
        fx.host.leave(PLAYER);
        fx.homes.unload(PLAYER);

        let resolved = fx.advance_secs(10);
        assert_eq!(resolved.len(), 1);
        assert_eq!(
            resolved[0].result,
            Err(TeleportError::IneligibleState(Reason::Disconnected))
        );
        assert!(fx.host.applied(PLAYER).is_empty());
        assert_eq!(fx.ledger.remaining_time(PLAYER, TELEPORT_HOME_KEY), 0);
    }

    #[test]
    fn newer_request_replaces_pending_countdown() {
        let mut fx = fixture(RankLevel::BASE);
        let first = fx.request("base", 10).unwrap();
        fx.advance_secs(5);
        let second = fx.request("base", 10).unwrap();
        assert_ne!(first, second);
        assert_eq!(fx.sequencer.pending_count(), 1);

        assert!(fx.advance_secs(5).is_empty());
        let resolved = fx.advance_secs(5);
        assert_eq!(resolved.len(), 1);
        assert_eq!(fx.host.applied(PLAYER).len(), 1);
    }

    #[test]
    fn immediate_request_cancels_pending_countdown() {
        let mut fx = fixture(RankLevel::BASE);
        let TeleportOutcome::Pending { id, .. } = fx.request("base", 10).unwrap() else {
            panic!("expected pending");
        };
        let target = Position::new(5.0, 5.0, 5.0);
        fx.sequencer
            .request_position(&mut fx.host, &mut fx.ledger, &fx.clock, PLAYER, target, 0)
            .unwrap();
        assert_eq!(fx.sequencer.pending_count(), 0);
        assert_eq!(fx.sequencer.pending_for(PLAYER), None);
        assert_eq!(fx.sequencer.phase(id), None);

        assert!(fx.advance_secs(10).is_empty());
        assert_eq!(fx.host.applied(PLAYER), vec![target]);
    }

    #[test]
    fn replaced_countdown_clears_its_notification() {
        let mut fx = fixture(RankLevel::BASE);
        fx.request("base", 10).unwrap();
        fx.host.calls.clear();
        fx.request("base", 10).unwrap();
        assert_eq!(
            fx.host.calls.first(),
            Some(&HostCall::RemoveNotification {
                player: PLAYER,
                key: TELEPORT_HOME_KEY.to_string(),
            })
        );
    }

    #[test]
    fn missing_profile_at_commit_clears_notification() {
        let mut fx = fixture(RankLevel::BASE);
        fx.request("base", 10).unwrap();
        fx.host.profiles.remove(&PLAYER);
        fx.host.calls.clear();

        let resolved = fx.advance_secs(10);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].result, Err(TeleportError::ProfileUnavailable));
        assert_eq!(
            fx.host.calls,
            vec![HostCall::RemoveNotification {
                player: PLAYER,
                key: TELEPORT_HOME_KEY.to_string(),
            }]
        );
        assert!(fx.host.applied(PLAYER).is_empty());
        assert_eq!(fx.ledger.remaining_time(PLAYER, TELEPORT_HOME_KEY), 0);
    }

    #[test]
    fn direct_position_teleport_skips_cooldown_gate() {
        let mut fx = fixture(RankLevel::VIP);
        fx.ledger.commit(PLAYER, TELEPORT_HOME_KEY, 60);
        let target = Position::new(-1.0, 2.0, 3.5);
        let outcome = fx
            .sequencer
            .request_position(&mut fx.host, &mut fx.ledger, &fx.clock, PLAYER, target, 0)
            .unwrap();
        assert!(matches!(outcome, TeleportOutcome::Applied { cooldown_seconds: 300, .. }));
        assert_eq!(fx.host.applied(PLAYER), vec![target]);
    }

    #[test]
    fn forget_finished_keeps_pending() {
        let mut fx = fixture(RankLevel::BASE);
        let TeleportOutcome::Pending { id, .. } = fx.request("base", 10).unwrap() else {
            panic!("expected pending");
        };
        fx.sequencer.forget_finished();
        assert_eq!(fx.sequencer.phase(id), Some(TeleportPhase::CountdownPending));
        fx.advance_secs(10);
        fx.sequencer.forget_finished();
        assert_eq!(fx.sequencer.phase(id), None);
    }

    #[test]
    fn error_text_formats_cooldown() {
        assert_eq!(
            TeleportError::OnCooldown(1170).to_string(),
            "teleport cooldown 19 minutes 30 seconds."
        );
    }
}
