//! Edit-state tracking for the active note.
//!
//! [`EditTracker`] is pure: every operation takes the current time, so the
//! debounce and backoff rules are tested without timers. The browser side
//! (interval, page lifecycle events, drafts) lives in [`controller`].

pub(crate) mod controller;

use crate::config::EnvConfig;

/// Which note the editor is bound to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum ActiveNote {
    #[default]
    None,
    /// The search results pseudo-note. Never saved.
    Search,
    Note(String),
}

impl ActiveNote {
    pub fn note_id(&self) -> Option<&str> {
        match self {
            Self::Note(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub max_attempts: u32,
    pub base_ms: u32,
    pub max_ms: u32,
}

impl RetryPolicy {
    pub fn from_config(cfg: &EnvConfig) -> Self {
        Self {
            max_attempts: cfg.save_max_attempts.max(1),
            base_ms: cfg.save_backoff_base_ms,
            max_ms: cfg.save_backoff_max_ms.max(cfg.save_backoff_base_ms),
        }
    }

    /// Wait before the next attempt after `failures` consecutive failures.
    pub fn delay_ms(&self, failures: u32) -> u32 {
        if failures == 0 {
            return 0;
        }
        let factor = 1u64 << (failures - 1).min(20);
        (self.base_ms as u64 * factor).min(self.max_ms as u64) as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SaveStatus {
    Saved,
    Unsaved,
    Saving,
    /// `attempt` is the number of the attempt that will run next.
    Retrying { attempt: u32 },
    Failed,
}

impl SaveStatus {
    pub fn label(&self) -> String {
        match self {
            Self::Saved => "Saved".to_string(),
            Self::Unsaved => "Unsaved changes".to_string(),
            Self::Saving => "Saving...".to_string(),
            Self::Retrying { attempt } => format!("Retrying (attempt {attempt})"),
            Self::Failed => "Save failed".to_string(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        !matches!(self, Self::Saved)
    }
}

/// Handle for one dispatched save. A ticket from before the last
/// [`EditTracker::activate`] no longer matches and is ignored on completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SaveTicket {
    pub note_id: String,
    generation: u64,
}

#[derive(Clone, Debug)]
pub(crate) struct EditTracker {
    active: ActiveNote,
    edited: bool,
    edited_during_save: bool,
    in_flight: Option<u64>,
    generation: u64,
    last_edit_ms: i64,
    failures: u32,
    next_attempt_ms: i64,
    failed: bool,
    idle_ms: i64,
    policy: RetryPolicy,
}

impl EditTracker {
    pub fn new(idle_ms: u32, policy: RetryPolicy) -> Self {
        Self {
            active: ActiveNote::None,
            edited: false,
            edited_during_save: false,
            in_flight: None,
            generation: 0,
            last_edit_ms: 0,
            failures: 0,
            next_attempt_ms: 0,
            failed: false,
            idle_ms: idle_ms as i64,
            policy,
        }
    }

    pub fn from_config(cfg: &EnvConfig) -> Self {
        Self::new(cfg.autosave_idle_ms, RetryPolicy::from_config(cfg))
    }

    pub fn active(&self) -> &ActiveNote {
        &self.active
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn last_edit_ms(&self) -> i64 {
        self.last_edit_ms
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Binds the tracker to a freshly loaded note and forgets all pending state.
    pub fn activate(&mut self, active: ActiveNote) {
        self.active = active;
        self.edited = false;
        self.edited_during_save = false;
        self.in_flight = None;
        self.generation += 1;
        self.failures = 0;
        self.next_attempt_ms = 0;
        self.failed = false;
    }

    /// Returns whether the edit counted.
    pub fn mark_edited(&mut self, now_ms: i64) -> bool {
        if self.active.note_id().is_none() {
            return false;
        }
        self.edited = true;
        self.last_edit_ms = now_ms;
        if self.in_flight.is_some() {
            self.edited_during_save = true;
        }
        if self.failed {
            self.failed = false;
            self.failures = 0;
            self.next_attempt_ms = 0;
        }
        true
    }

    fn dispatch(&mut self) -> Option<SaveTicket> {
        let note_id = self.active.note_id()?.to_string();
        self.in_flight = Some(self.generation);
        self.edited_during_save = false;
        Some(SaveTicket {
            note_id,
            generation: self.generation,
        })
    }

    /// Periodic check. Starts a save once the note has been idle long enough.
    pub fn tick(&mut self, now_ms: i64) -> Option<SaveTicket> {
        if !self.edited || self.failed || self.in_flight.is_some() {
            return None;
        }
        if now_ms - self.last_edit_ms < self.idle_ms || now_ms < self.next_attempt_ms {
            return None;
        }
        self.dispatch()
    }

    /// Manual save. Ignores the idle threshold and backoff, never overlaps a save.
    pub fn save_now(&mut self, _now_ms: i64) -> Option<SaveTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        self.failed = false;
        self.dispatch()
    }

    fn owns(&self, ticket: &SaveTicket) -> bool {
        self.in_flight == Some(ticket.generation) && ticket.generation == self.generation
    }

    /// Ends the save behind `ticket`. Returns false for a stale ticket.
    pub fn complete(&mut self, ticket: &SaveTicket, ok: bool, now_ms: i64) -> bool {
        if !self.owns(ticket) {
            return false;
        }
        self.in_flight = None;
        if ok {
            self.failures = 0;
            self.next_attempt_ms = 0;
            if !self.edited_during_save {
                self.edited = false;
            }
        } else {
            self.edited = true;
            self.failures += 1;
            if self.failures >= self.policy.max_attempts {
                self.failed = true;
            } else {
                self.next_attempt_ms = now_ms + self.policy.delay_ms(self.failures) as i64;
            }
        }
        self.edited_during_save = false;
        true
    }

    /// Ends the save behind `ticket` with an error that retrying will not fix,
    /// e.g. an expired session. The note goes straight to failed.
    pub fn reject(&mut self, ticket: &SaveTicket) -> bool {
        if !self.owns(ticket) {
            return false;
        }
        self.in_flight = None;
        self.edited = true;
        self.edited_during_save = false;
        self.failed = true;
        true
    }

    /// Takes the unsaved edits of the active note before the editor moves to
    /// another one. The caller sends the returned ticket's save itself; its
    /// completion is not tracked since the tracker is about to be re-bound.
    pub fn take_pending(&mut self) -> Option<SaveTicket> {
        let note_id = self.active.note_id()?.to_string();
        let covered_by_save = self.in_flight.is_some() && !self.edited_during_save;
        if !self.edited || covered_by_save {
            return None;
        }
        self.edited = false;
        self.edited_during_save = false;
        Some(SaveTicket {
            note_id,
            generation: self.generation,
        })
    }

    /// Releases a ticket whose request was never sent.
    pub fn abort(&mut self, ticket: &SaveTicket) -> bool {
        if !self.owns(ticket) {
            return false;
        }
        self.in_flight = None;
        true
    }

    pub fn status(&self) -> SaveStatus {
        if self.in_flight.is_some() {
            SaveStatus::Saving
        } else if self.failed {
            SaveStatus::Failed
        } else if self.edited && self.failures > 0 {
            SaveStatus::Retrying {
                attempt: self.failures + 1,
            }
        } else if self.edited {
            SaveStatus::Unsaved
        } else {
            SaveStatus::Saved
        }
    }
}

const UNSAVED_MARK: &str = "🔴 ";

/// Document title with the unsaved marker added or removed.
pub(crate) fn marked_title(title: &str, dirty: bool) -> String {
    let bare = title.strip_prefix(UNSAVED_MARK).unwrap_or(title);
    if dirty {
        format!("{UNSAVED_MARK}{bare}")
    } else {
        bare.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const IDLE: i64 = 15_000;

    fn tracker() -> EditTracker {
        EditTracker::new(
            IDLE as u32,
            RetryPolicy {
                max_attempts: 3,
                base_ms: 2_000,
                max_ms: 5_000,
            },
        )
    }

    fn active(id: &str) -> EditTracker {
        let mut t = tracker();
        t.activate(ActiveNote::Note(id.into()));
        t
    }

    #[test]
    fn manual_save_yields_one_ticket_for_active_note() {
        let mut t = active("7");
        t.mark_edited(0);
        let ticket = t.save_now(10).expect("ticket");
        assert_eq!(ticket.note_id, "7");
        assert!(t.is_saving());
        assert_eq!(t.save_now(11), None);
        assert_eq!(t.tick(IDLE * 10), None);
    }

    #[test]
    fn one_save_per_idle_period() {
        let mut t = active("1");
        for ms in [0, 500, 1_000, 1_500] {
            t.mark_edited(ms);
        }

        let mut tickets = vec![];
        let mut now = 1_500;
        while now <= 1_500 + IDLE * 3 {
            if let Some(ticket) = t.tick(now) {
                tickets.push(ticket.clone());
                assert!(t.complete(&ticket, true, now + 100));
            }
            now += 2_000;
        }
        assert_eq!(tickets.len(), 1);
        assert_eq!(t.status(), SaveStatus::Saved);
    }

    #[test]
    fn no_save_before_idle_threshold() {
        let mut t = active("1");
        t.mark_edited(1_000);
        assert_eq!(t.tick(1_000 + IDLE - 1), None);
        assert!(t.tick(1_000 + IDLE).is_some());
    }

    #[test]
    fn edits_during_save_keep_note_dirty() {
        let mut t = active("1");
        t.mark_edited(0);
        let ticket = t.tick(IDLE).expect("ticket");
        t.mark_edited(IDLE + 10);
        t.complete(&ticket, true, IDLE + 20);
        assert_eq!(t.status(), SaveStatus::Unsaved);

        assert_eq!(t.tick(IDLE + 20), None);
        assert!(t.tick(IDLE * 2 + 10).is_some());
    }

    #[test]
    fn search_pseudo_note_ignores_edits() {
        let mut t = tracker();
        t.activate(ActiveNote::Search);
        assert!(!t.mark_edited(0));
        assert_eq!(t.tick(IDLE * 2), None);
        assert_eq!(t.save_now(0), None);
    }

    #[test]
    fn failures_back_off_then_give_up() {
        let mut t = active("3");
        t.mark_edited(0);

        let first = t.tick(IDLE).expect("first attempt");
        t.complete(&first, false, IDLE);
        assert_eq!(t.status(), SaveStatus::Retrying { attempt: 2 });
        assert_eq!(t.tick(IDLE + 1_999), None);

        let second = t.tick(IDLE + 2_000).expect("second attempt");
        t.complete(&second, false, IDLE + 2_000);
        assert_eq!(t.tick(IDLE + 5_999), None);

        let third = t.tick(IDLE + 6_000).expect("third attempt");
        t.complete(&third, false, IDLE + 6_000);
        assert_eq!(t.status(), SaveStatus::Failed);
        assert_eq!(t.tick(IDLE * 100), None);

        // A new edit re-arms the tracker.
        t.mark_edited(IDLE * 100);
        assert_eq!(t.status(), SaveStatus::Unsaved);
        assert!(t.tick(IDLE * 101).is_some());
    }

    #[test]
    fn backoff_is_capped() {
        let p = RetryPolicy {
            max_attempts: 10,
            base_ms: 2_000,
            max_ms: 60_000,
        };
        assert_eq!(p.delay_ms(1), 2_000);
        assert_eq!(p.delay_ms(3), 8_000);
        assert_eq!(p.delay_ms(9), 60_000);
    }

    #[test]
    fn stale_ticket_after_switching_notes_is_ignored() {
        let mut t = active("1");
        t.mark_edited(0);
        let ticket = t.save_now(0).expect("ticket");
        t.activate(ActiveNote::Note("2".into()));
        assert!(!t.complete(&ticket, true, 10));
        assert!(!t.is_saving());
    }

    #[test]
    fn switching_notes_hands_off_pending_edits() {
        let mut t = active("1");
        t.mark_edited(0);
        let handoff = t.take_pending().expect("pending edits of note 1");
        assert_eq!(handoff.note_id, "1");
        assert_eq!(t.take_pending(), None);

        t.activate(ActiveNote::Note("2".into()));
        let mut now = 5_000;
        while now <= 200_000 {
            assert_eq!(t.tick(now), None);
            now += 5_000;
        }
    }

    #[test]
    fn handoff_skips_edits_already_in_flight() {
        let mut t = active("1");
        t.mark_edited(0);
        let _ticket = t.save_now(0).expect("ticket");
        assert_eq!(t.take_pending(), None);

        t.mark_edited(10);
        assert_eq!(t.take_pending().map(|h| h.note_id), Some("1".to_string()));
    }

    #[test]
    fn clean_or_search_view_has_nothing_to_hand_off() {
        assert_eq!(active("1").take_pending(), None);
        let mut t = tracker();
        t.activate(ActiveNote::Search);
        t.mark_edited(0);
        assert_eq!(t.take_pending(), None);
    }

    #[test]
    fn permanent_rejection_fails_without_retrying() {
        let mut t = active("5");
        t.mark_edited(0);
        let ticket = t.tick(IDLE).expect("ticket");
        assert!(t.reject(&ticket));
        assert_eq!(t.status(), SaveStatus::Failed);
        assert_eq!(t.tick(IDLE * 50), None);

        t.mark_edited(IDLE * 50);
        assert_eq!(t.status(), SaveStatus::Unsaved);
    }

    #[test]
    fn abort_releases_without_counting_a_failure() {
        let mut t = active("1");
        t.mark_edited(0);
        let ticket = t.save_now(0).expect("ticket");
        assert!(t.abort(&ticket));
        assert_eq!(t.status(), SaveStatus::Unsaved);
        assert!(t.save_now(1).is_some());
    }

    #[test]
    fn title_marker_is_idempotent() {
        assert_eq!(marked_title("Poznote", true), "🔴 Poznote");
        assert_eq!(marked_title("🔴 Poznote", true), "🔴 Poznote");
        assert_eq!(marked_title("🔴 Poznote", false), "Poznote");
    }
}
