//! Interactive prompts on the terminal

use std::io::{self, BufRead, Write};

use parking_lot::Mutex;
use tracing::debug;

use crate::domain::rules::{FormatAnswer, FormatQuestion};
use crate::engine::ShutdownChoice;
use crate::ports::PromptPort;

/// Asks on stdout and reads answers line by line from a reader.
///
/// End of input dismisses a format question and waits for tasks on
/// shutdown.
pub struct TerminalPrompt<R> {
    input: Mutex<R>,
}

impl TerminalPrompt<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(io::BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: Mutex::new(input),
        }
    }

    fn read_answer(&self) -> Option<String> {
        let _ = io::stdout().flush();
        let mut line = String::new();
        match self.input.lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_lowercase()),
        }
    }
}

/// Match a typed answer against the numbered options of a question
pub fn parse_format_answer(question: FormatQuestion, typed: &str) -> Option<FormatAnswer> {
    let options = question.options();
    match typed {
        "1" => Some(options[0]),
        "2" => Some(options[1]),
        _ => options
            .iter()
            .copied()
            .find(|o| o.label().eq_ignore_ascii_case(typed)),
    }
}

pub fn parse_shutdown_answer(typed: &str) -> Option<ShutdownChoice> {
    match typed {
        "t" | "terminate" => Some(ShutdownChoice::TerminateNow),
        "w" | "wait" => Some(ShutdownChoice::WaitForTasks),
        "k" | "keep" | "c" | "cancel" => Some(ShutdownChoice::KeepRunning),
        _ => None,
    }
}

impl<R: BufRead + Send> PromptPort for TerminalPrompt<R> {
    fn choose_format(&self, question: FormatQuestion) -> Option<FormatAnswer> {
        loop {
            let options = question.options();
            print!(
                "{}: [1] {}  [2] {}  (empty to cancel) > ",
                question.prompt(),
                options[0].label(),
                options[1].label()
            );
            let typed = self.read_answer()?;
            if typed.is_empty() {
                return None;
            }
            match parse_format_answer(question, &typed) {
                Some(answer) => return Some(answer),
                None => debug!(typed, "unrecognised format answer"),
            }
        }
    }

    fn choose_shutdown(&self, active: usize) -> ShutdownChoice {
        loop {
            println!();
            print!(
                "{} task(s) still running. [t]erminate now, [w]ait for them, [k]eep running > ",
                active
            );
            let Some(typed) = self.read_answer() else {
                return ShutdownChoice::WaitForTasks;
            };
            if let Some(choice) = parse_shutdown_answer(&typed) {
                return choice;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn numbered_and_named_format_answers() {
        assert_eq!(
            parse_format_answer(FormatQuestion::AudioContainer, "2"),
            Some(FormatAnswer::Mp4Audio)
        );
        assert_eq!(
            parse_format_answer(FormatQuestion::AudioContainer, "mp3"),
            Some(FormatAnswer::Mp3)
        );
        assert_eq!(parse_format_answer(FormatQuestion::KeepAudio, "mp3"), None);
    }

    #[test]
    fn retries_until_a_valid_answer() {
        let prompt = TerminalPrompt::new(Cursor::new("9\n1\n"));
        assert_eq!(
            prompt.choose_format(FormatQuestion::KeepAudio),
            Some(FormatAnswer::VideoOnly)
        );
    }

    #[test]
    fn end_of_input_dismisses_and_waits() {
        let prompt = TerminalPrompt::new(Cursor::new(""));
        assert_eq!(prompt.choose_format(FormatQuestion::AudioContainer), None);
        assert_eq!(prompt.choose_shutdown(2), ShutdownChoice::WaitForTasks);
    }

    #[test]
    fn shutdown_letters() {
        let prompt = TerminalPrompt::new(Cursor::new("x\nt\n"));
        assert_eq!(prompt.choose_shutdown(1), ShutdownChoice::TerminateNow);
        assert_eq!(parse_shutdown_answer("k"), Some(ShutdownChoice::KeepRunning));
    }
}
