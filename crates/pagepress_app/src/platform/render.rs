use pagepress_core::{AppViewModel, Phase};

/// Terminal rendering of the shell view. Remembers what it already printed
/// so that each call only yields new lines.
#[derive(Debug, Default)]
pub struct TerminalView {
    shown_progress: usize,
    shown_terminal: bool,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();
        if view.phase == Phase::Converting && self.shown_terminal {
            // A new attempt started.
            self.shown_progress = 0;
            self.shown_terminal = false;
        }
        if view.progress.len() < self.shown_progress {
            self.shown_progress = 0;
        }

        for message in &view.progress[self.shown_progress..] {
            lines.push(format!("  .. {message}"));
        }
        self.shown_progress = view.progress.len();

        if self.shown_terminal {
            return lines;
        }
        match view.phase {
            Phase::Succeeded => {
                if let Some(status) = &view.status {
                    lines.push(status.clone());
                }
                self.shown_terminal = true;
            }
            Phase::Failed => {
                let status = view.status.as_deref().unwrap_or("Conversion failed");
                lines.push(format!("Error: {status}"));
                self.shown_terminal = true;
            }
            Phase::Idle | Phase::Converting => {}
        }
        lines
    }
}
