use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Whether a user may place now, and how long they must wait otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownStatus {
    pub can_place: bool,
    pub remaining_seconds: u64,
    pub remaining_minutes: u64,
}

impl CooldownStatus {
    pub const READY: CooldownStatus = CooldownStatus {
        can_place: true,
        remaining_seconds: 0,
        remaining_minutes: 0,
    };

    fn waiting(remaining_seconds: u64) -> Self {
        CooldownStatus {
            can_place: false,
            remaining_seconds,
            remaining_minutes: remaining_seconds.div_ceil(60),
        }
    }

    /// Status of a user whose last placement was at `last`
    pub fn since(last: DateTime<Utc>, now: DateTime<Utc>, cooldown: Duration) -> Self {
        // A clock that stepped backwards counts as no time elapsed
        let elapsed = (now - last).max(Duration::zero());
        if elapsed >= cooldown {
            return CooldownStatus::READY;
        }

        let remaining = cooldown - elapsed;
        let mut seconds = remaining.num_seconds();
        if remaining > Duration::seconds(seconds) {
            seconds += 1;
        }
        CooldownStatus::waiting(seconds.max(1) as u64)
    }
}

/// One user's last accepted placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownEntry {
    pub user_id: String,
    pub last_placement_at: DateTime<Utc>,
}

/// Per-user record of the last accepted placement.
///
/// Entries are sharded by user, so lookups for different users rarely contend.
#[derive(Debug, Default)]
pub struct CooldownLedger {
    entries: DashMap<String, DateTime<Utc>>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Rebuild a ledger from checkpointed entries
    pub fn from_entries(entries: impl IntoIterator<Item = CooldownEntry>) -> Self {
        let ledger = Self::new();
        for entry in entries {
            ledger.record_placement(&entry.user_id, entry.last_placement_at);
        }
        ledger
    }

    /// Cooldown status of `user_id` at `now`
    pub fn status(&self, user_id: &str, now: DateTime<Utc>, cooldown: Duration) -> CooldownStatus {
        match self.entries.get(user_id) {
            Some(last) => CooldownStatus::since(*last, now, cooldown),
            None => CooldownStatus::READY,
        }
    }

    /// Set the user's last placement time, creating the entry if needed
    pub fn record_placement(&self, user_id: &str, now: DateTime<Utc>) {
        self.entries.insert(user_id.to_string(), now);
    }

    /// Check the cooldown and, if the user is eligible, hold their entry.
    ///
    /// While the returned reservation lives, no other caller can read or
    /// change this user's entry. Dropping it without
    /// [`CooldownReservation::commit`] leaves the ledger untouched.
    pub fn reserve(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<CooldownReservation<'_>, CooldownStatus> {
        let entry = self.entries.entry(user_id.to_string());
        if let Entry::Occupied(occupied) = &entry {
            let status = CooldownStatus::since(*occupied.get(), now, cooldown);
            if !status.can_place {
                return Err(status);
            }
        }
        Ok(CooldownReservation { entry })
    }

    /// Snapshot of all entries, ordered by user id
    pub fn entries(&self) -> Vec<CooldownEntry> {
        let mut entries: Vec<CooldownEntry> = self
            .entries
            .iter()
            .map(|item| CooldownEntry {
                user_id: item.key().clone(),
                last_placement_at: *item.value(),
            })
            .collect();
        entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exclusive hold on one user's ledger entry, obtained from
/// [`CooldownLedger::reserve`].
pub struct CooldownReservation<'a> {
    entry: Entry<'a, String, DateTime<Utc>>,
}

impl CooldownReservation<'_> {
    /// Record the accepted placement and release the entry
    pub fn commit(self, now: DateTime<Utc>) {
        match self.entry {
            Entry::Occupied(mut occupied) => {
                occupied.insert(now);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
            }
        }
    }
}
