//! UI-side data model: the session state machine and the events the download
//! worker publishes to it. Widget-free so the lifecycle is unit-testable.

use std::path::PathBuf;

/// Where the current (or last) operation stands.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Color class of the status line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StatusTone {
    Info,
    Busy,
    Good,
    Bad,
}

/// Messages sent from the worker task to the UI thread. The worker never
/// mutates widget state directly; everything goes through this channel.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum WorkerEvent {
    /// Metadata resolved a thumbnail; the UI decides whether to fetch it.
    ThumbnailUrl(String),
    /// Integer download percentage, 0..=100.
    Progress(u8),
    /// Raw retrieval done, post-processing (extraction/merge/convert) underway.
    PostProcessing,
    Completed { out_dir: PathBuf },
    Failed(String),
}

/// Per-session UI state. One instance lives on the application struct; the
/// update loop feeds it drained worker events.
pub struct SessionState {
    pub phase: Phase,
    /// Displayed percentage, 0..=100. Monotonic within a run.
    pub progress: u8,
    pub status_text: String,
    pub status_tone: StatusTone,
    /// Gate for the Show-in-Folder control. Only a completed download in this
    /// session opens it; starting a new run closes it again.
    pub reveal_enabled: bool,
    /// Folder of the most recent successful download. Overwritten on each
    /// success, never cleared.
    pub last_output_dir: Option<PathBuf>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            progress: 0,
            status_text: String::new(),
            status_tone: StatusTone::Info,
            reveal_enabled: false,
            last_output_dir: None,
        }
    }
}

impl SessionState {
    /// Idle/terminal → Running. Resets the indicator and disables the reveal
    /// control for the new run.
    pub fn begin(&mut self) {
        self.phase = Phase::Running;
        self.progress = 0;
        self.reveal_enabled = false;
        self.set_status("Starting download...", StatusTone::Info);
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Applies one worker event. Events arriving outside a run (stale sends
    /// from an earlier worker) are ignored.
    pub fn apply(&mut self, event: WorkerEvent) {
        if !self.is_running() {
            return;
        }
        match event {
            // The thumbnail is cosmetic; the app handles the fetch itself.
            WorkerEvent::ThumbnailUrl(_) => {}
            WorkerEvent::Progress(pct) => {
                if pct > self.progress {
                    self.progress = pct.min(100);
                }
            }
            WorkerEvent::PostProcessing => {
                self.set_status("Processing...", StatusTone::Busy);
            }
            WorkerEvent::Completed { out_dir } => {
                self.phase = Phase::Succeeded;
                self.progress = 100;
                self.reveal_enabled = true;
                self.last_output_dir = Some(out_dir);
                self.set_status("✅ Download Complete", StatusTone::Good);
            }
            WorkerEvent::Failed(_) => {
                self.phase = Phase::Failed;
                self.set_status("❌ Download Failed", StatusTone::Bad);
            }
        }
    }

    fn set_status(&mut self, text: &str, tone: StatusTone) {
        self.status_text = text.to_string();
        self.status_tone = tone;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> SessionState {
        let mut state = SessionState::default();
        state.begin();
        state
    }

    #[test]
    fn begin_resets_indicator_and_reveal() {
        let mut state = SessionState::default();
        state.progress = 73;
        state.reveal_enabled = true;
        state.begin();

        assert_eq!(state.phase, Phase::Running);
        assert_eq!(state.progress, 0);
        assert!(!state.reveal_enabled);
        assert!(state.is_running());
    }

    #[test]
    fn progress_is_monotonic_within_a_run() {
        let mut state = running();
        state.apply(WorkerEvent::Progress(40));
        state.apply(WorkerEvent::Progress(25));
        assert_eq!(state.progress, 40);
        state.apply(WorkerEvent::Progress(41));
        assert_eq!(state.progress, 41);
    }

    #[test]
    fn post_processing_is_a_transitional_status() {
        let mut state = running();
        state.apply(WorkerEvent::Progress(100));
        state.apply(WorkerEvent::PostProcessing);

        assert!(state.is_running());
        assert_eq!(state.status_tone, StatusTone::Busy);
        assert!(!state.reveal_enabled);
    }

    #[test]
    fn completion_records_folder_and_enables_reveal() {
        let mut state = running();
        state.apply(WorkerEvent::Progress(87));
        state.apply(WorkerEvent::Completed {
            out_dir: PathBuf::from("downloads/audio"),
        });

        assert_eq!(state.phase, Phase::Succeeded);
        assert_eq!(state.progress, 100);
        assert!(state.reveal_enabled);
        assert!(!state.is_running());
        assert_eq!(
            state.last_output_dir.as_deref(),
            Some(std::path::Path::new("downloads/audio"))
        );
    }

    #[test]
    fn failure_keeps_reveal_disabled_and_reenables_download() {
        let mut state = running();
        state.apply(WorkerEvent::Failed("engine exploded".into()));

        assert_eq!(state.phase, Phase::Failed);
        assert!(!state.reveal_enabled);
        // Not running anymore, so the download control comes back.
        assert!(!state.is_running());
        assert_eq!(state.status_tone, StatusTone::Bad);
    }

    #[test]
    fn failure_after_earlier_success_keeps_last_folder() {
        let mut state = running();
        state.apply(WorkerEvent::Completed {
            out_dir: PathBuf::from("downloads/video"),
        });

        state.begin();
        assert!(!state.reveal_enabled);
        state.apply(WorkerEvent::Failed("no formats".into()));

        assert!(!state.reveal_enabled);
        assert_eq!(
            state.last_output_dir.as_deref(),
            Some(std::path::Path::new("downloads/video"))
        );
    }

    #[test]
    fn stale_events_after_terminal_state_are_ignored() {
        let mut state = running();
        state.apply(WorkerEvent::Completed {
            out_dir: PathBuf::from("downloads/audio"),
        });
        state.apply(WorkerEvent::Progress(12));
        state.apply(WorkerEvent::Failed("late".into()));

        assert_eq!(state.phase, Phase::Succeeded);
        assert_eq!(state.progress, 100);
    }
}
