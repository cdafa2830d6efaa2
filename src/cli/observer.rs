//! Console observer printing time-stamped task lines

use std::collections::HashMap;
use std::io::Write;

use chrono::Local;
use parking_lot::Mutex;

use crate::domain::model::{Outcome, TaskKind};
use crate::engine::{TaskId, TaskObserver};

/// Progress is printed in steps of this many percent
const PROGRESS_STEP: u8 = 10;

pub struct ConsoleObserver<W: Write + Send> {
    out: Mutex<W>,
    printed: Mutex<HashMap<TaskId, u8>>,
}

impl ConsoleObserver<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            printed: Mutex::new(HashMap::new()),
        }
    }

    fn line(&self, task_id: TaskId, text: &str) {
        let stamp = Local::now().format("%H:%M:%S");
        let mut out = self.out.lock();
        let _ = writeln!(out, "[{}] {} {}", stamp, task_id, text);
        let _ = out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> TaskObserver for ConsoleObserver<W> {
    fn on_status(&self, task_id: TaskId, kind: TaskKind, message: &str) {
        self.printed.lock().remove(&task_id);
        self.line(task_id, &format!("{}: {}", kind, message));
    }

    fn on_progress(&self, task_id: TaskId, kind: TaskKind, percent: u8) {
        let bucket = percent / PROGRESS_STEP * PROGRESS_STEP;
        {
            let mut printed = self.printed.lock();
            match printed.get(&task_id) {
                Some(last) if bucket <= *last && percent != 100 => return,
                _ => {}
            }
            printed.insert(task_id, bucket);
        }
        self.line(task_id, &format!("{}: {}%", kind, percent));
    }

    fn on_terminal(&self, task_id: TaskId, _kind: TaskKind, message: &str, _outcome: &Outcome) {
        self.printed.lock().remove(&task_id);
        self.line(task_id, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn progress_is_thinned_to_steps() {
        let observer = ConsoleObserver::new(Vec::new());
        let id = TaskId(3);
        for p in [1, 5, 9, 10, 15, 42, 43, 99, 100] {
            observer.on_progress(id, TaskKind::Fetch, p);
        }
        observer.on_terminal(
            id,
            TaskKind::Fetch,
            "Download complete: out.mp4",
            &Outcome::Completed(PathBuf::from("out.mp4")),
        );

        let text = String::from_utf8(observer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        let percents: Vec<&str> = lines
            .iter()
            .filter_map(|l| l.split("fetch: ").nth(1))
            .collect();
        assert_eq!(percents, vec!["1%", "10%", "42%", "99%", "100%"]);
        assert!(lines.last().unwrap().ends_with("#3 Download complete: out.mp4"));
        assert!(lines[0].starts_with('['));
    }
}
