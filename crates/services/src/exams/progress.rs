use super::session::SessionStatus;

/// Snapshot of an exam session, for whatever renders the exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamProgress {
    pub total: usize,
    pub answered: usize,
    pub current: usize,
    pub remaining_secs: u64,
    pub status: SessionStatus,
}

impl ExamProgress {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    /// Remaining time as `m:ss`.
    #[must_use]
    pub fn remaining_label(&self) -> String {
        let minutes = self.remaining_secs / 60;
        let seconds = self.remaining_secs % 60;
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_label_pads_seconds() {
        let progress = ExamProgress {
            total: 3,
            answered: 3,
            current: 2,
            remaining_secs: 65,
            status: SessionStatus::InProgress,
        };
        assert_eq!(progress.remaining_label(), "1:05");
        assert_eq!(progress.unanswered(), 0);
    }
}
