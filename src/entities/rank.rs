use serde::{Deserialize, Serialize};
use crate::entities::player::Profile;

/// Ordered privilege level; higher levels include every lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankLevel(pub u8);

impl RankLevel {
    pub const BASE: RankLevel = RankLevel(0);
    pub const VIP: RankLevel = RankLevel(1);
}

/// Limits granted from a given level upwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTier {
    pub name: String,
    pub level: RankLevel,
    pub max_homes: usize,
    pub teleport_cooldown_seconds: u64,
}

impl RankTier {
    pub fn new(
        name: impl Into<String>,
        level: RankLevel,
        max_homes: usize,
        teleport_cooldown_seconds: u64,
    ) -> Self {
        RankTier {
            name: name.into(),
            level,
            max_homes,
            teleport_cooldown_seconds,
        }
    }
}

/// Ordered tier table, lowest level first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankTable {
    tiers: Vec<RankTier>,
}

impl RankTable {
    /// Build a table; levels must be strictly increasing and names unique
    pub fn new(tiers: Vec<RankTier>) -> Result<Self, String> {
        if tiers.is_empty() {
            return Err("rank table needs at least one tier".to_string());
        }
        for (index, tier) in tiers.iter().enumerate() {
            if tier.name.trim().is_empty() {
                return Err(format!("rank tier {} has an empty name", index));
            }
            if index > 0 && tiers[index - 1].level >= tier.level {
                return Err(format!(
                    "rank tier '{}' level {} must be above '{}' level {}",
                    tier.name,
                    tier.level.0,
                    tiers[index - 1].name,
                    tiers[index - 1].level.0
                ));
            }
            if tiers[..index]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&tier.name))
            {
                return Err(format!("rank tier '{}' is defined twice", tier.name));
            }
        }
        Ok(RankTable { tiers })
    }

    pub fn tiers(&self) -> &[RankTier] {
        &self.tiers
    }

    /// Highest tier the profile qualifies for; the lowest tier otherwise
    pub fn tier_for(&self, profile: &Profile) -> &RankTier {
        self.tiers
            .iter()
            .rev()
            .find(|tier| profile.has_minimum_rank(tier.level))
            .unwrap_or(&self.tiers[0])
    }

    pub fn max_homes(&self, profile: &Profile) -> usize {
        self.tier_for(profile).max_homes
    }

    pub fn teleport_cooldown_seconds(&self, profile: &Profile) -> u64 {
        self.tier_for(profile).teleport_cooldown_seconds
    }

    pub fn level_named(&self, name: &str) -> Option<RankLevel> {
        self.tiers
            .iter()
            .find(|tier| tier.name.eq_ignore_ascii_case(name.trim()))
            .map(|tier| tier.level)
    }
}

/// Two-tier scheme: one home and 20 minutes for everyone, three homes and
/// 5 minutes from "vip" up.
impl Default for RankTable {
    fn default() -> Self {
        RankTable {
            tiers: vec![
                RankTier::new("default", RankLevel::BASE, 1, 20 * 60),
                RankTier::new("vip", RankLevel::VIP, 3, 5 * 60),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_two_tier_scheme() {
        let table = RankTable::default();
        let base = Profile::new(1, RankLevel::BASE);
        let vip = Profile::new(2, RankLevel::VIP);
        let above_vip = Profile::new(3, RankLevel(4));

        assert_eq!(table.max_homes(&base), 1);
        assert_eq!(table.teleport_cooldown_seconds(&base), 1200);
        assert_eq!(table.max_homes(&vip), 3);
        assert_eq!(table.teleport_cooldown_seconds(&vip), 300);
        assert_eq!(table.max_homes(&above_vip), 3);
        assert_eq!(table.teleport_cooldown_seconds(&above_vip), 300);
    }

    #[test]
    fn below_lowest_tier_falls_back_to_first() {
        let table = RankTable::new(vec![
            RankTier::new("member", RankLevel(2), 2, 600),
            RankTier::new("elite", RankLevel(5), 10, 60),
        ])
        .unwrap();
        let guest = Profile::new(1, RankLevel(0));
        assert_eq!(table.tier_for(&guest).name, "member");
    }

    #[test]
    fn rejects_unordered_levels() {
        let err = RankTable::new(vec![
            RankTier::new("vip", RankLevel(1), 3, 300),
            RankTier::new("default", RankLevel(0), 1, 1200),
        ])
        .unwrap_err();
        assert!(err.contains("must be above"));
    }

    #[test]
    fn rejects_empty_and_duplicate_names() {
        assert!(RankTable::new(Vec::new()).is_err());
        assert!(RankTable::new(vec![RankTier::new(" ", RankLevel(0), 1, 1)]).is_err());
        let err = RankTable::new(vec![
            RankTier::new("vip", RankLevel(0), 1, 1),
            RankTier::new("VIP", RankLevel(1), 1, 1),
        ])
        .unwrap_err();
        assert!(err.contains("defined twice"));
    }

    #[test]
    fn level_lookup_by_name() {
        let table = RankTable::default();
        assert_eq!(table.level_named("VIP"), Some(RankLevel::VIP));
        assert_eq!(table.level_named("default"), Some(RankLevel::BASE));
        assert_eq!(table.level_named("admin"), None);
    }
}
