use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

static PROGRESS_TEMPLATE: &str = "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} uploads settled";

/// Lines are printed through the progress bar so they never tear it.
#[derive(Clone)]
pub struct Console {
    bar: ProgressBar,
}

impl Console {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn start_progress(&self, len: u64) {
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        self.bar.set_style(style.progress_chars("=> "));
        self.bar.set_length(len);
        self.bar.set_position(0);
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
    }

    pub fn inc_progress(&self) {
        self.bar.inc(1);
    }

    pub fn finish_progress(&self) {
        self.bar.finish_and_clear();
        self.bar.set_draw_target(ProgressDrawTarget::hidden());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        let line = msg.as_ref().white();
        self.bar.suspend(|| println!("{}", line));
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        let line = format!("⚡ {}", msg.as_ref()).green();
        self.bar.suspend(|| println!("{}", line));
    }

    pub fn highlight(&self, msg: impl AsRef<str>) {
        let line = format!("✅ {}", msg.as_ref()).cyan();
        self.bar.suspend(|| println!("{}", line));
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        let line = format!("⚠️  {}", msg.as_ref()).yellow();
        self.bar.suspend(|| eprintln!("{}", line));
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        let line = format!("❌ {}", msg.as_ref()).red();
        self.bar.suspend(|| eprintln!("{}", line));
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
