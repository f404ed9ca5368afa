//! Operator controls for the interactive commands.
//!
//! Enter starts recording the next gesture and `q` followed by Enter asks
//! the running command to stop. The preview window feeds the same channel
//! from its key presses.

use std::{io::BufRead, thread};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Ready,
    Quit,
}

pub fn parse_line(line: &str) -> ConsoleCommand {
    match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" => ConsoleCommand::Quit,
        _ => ConsoleCommand::Ready,
    }
}

/// Command bound to a key pressed in the preview window.
pub fn key_command(key: &str) -> Option<ConsoleCommand> {
    match key {
        "q" | "escape" => Some(ConsoleCommand::Quit),
        "enter" => Some(ConsoleCommand::Ready),
        _ => None,
    }
}

/// Forwards stdin lines to `commands` from a background thread until
/// stdin closes or the receiver goes away.
pub fn spawn_stdin_reader(commands: Sender<ConsoleCommand>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if commands.send(parse_line(&line)).is_err() {
                break;
            }
        }
        log::debug!("console input closed");
    });
}

/// How capture and live learn what the operator wants.
pub trait OperatorControl {
    /// Blocks until the operator is ready to record `gesture`. Returns
    /// `false` if they asked to quit instead.
    fn wait_ready(&mut self, gesture: &str) -> bool;

    /// Non-blocking check for a pending quit request.
    fn quit_requested(&mut self) -> bool;
}

pub struct Console {
    commands: Receiver<ConsoleCommand>,
    quit: bool,
}

impl Console {
    /// Starts a background thread reading stdin lines.
    pub fn spawn() -> Self {
        let (tx, rx) = unbounded();
        spawn_stdin_reader(tx);
        Self::from_receiver(rx)
    }

    pub fn from_receiver(commands: Receiver<ConsoleCommand>) -> Self {
        Self {
            commands,
            quit: false,
        }
    }
}

impl OperatorControl for Console {
    fn wait_ready(&mut self, gesture: &str) -> bool {
        if self.quit {
            return false;
        }

        println!("Press Enter to start recording '{gesture}' (q + Enter to quit)");
        match self.commands.recv() {
            Ok(ConsoleCommand::Ready) => true,
            Ok(ConsoleCommand::Quit) | Err(_) => {
                self.quit = true;
                false
            }
        }
    }

    fn quit_requested(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(ConsoleCommand::Quit) => self.quit = true,
                Ok(ConsoleCommand::Ready) => {}
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        self.quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quit_and_enter() {
        assert_eq!(parse_line("q"), ConsoleCommand::Quit);
        assert_eq!(parse_line("  Q \r"), ConsoleCommand::Quit);
        assert_eq!(parse_line("quit"), ConsoleCommand::Quit);
        assert_eq!(parse_line(""), ConsoleCommand::Ready);
        assert_eq!(parse_line("go"), ConsoleCommand::Ready);
    }

    #[test]
    fn window_keys_map_to_commands() {
        assert_eq!(key_command("q"), Some(ConsoleCommand::Quit));
        assert_eq!(key_command("escape"), Some(ConsoleCommand::Quit));
        assert_eq!(key_command("enter"), Some(ConsoleCommand::Ready));
        assert_eq!(key_command("space"), None);
    }

    #[test]
    fn window_quit_interrupts_a_pending_wait() {
        let (tx, rx) = unbounded();
        let mut console = Console::from_receiver(rx);
        let window = thread::spawn(move || {
            tx.send(key_command("escape").unwrap()).unwrap();
        });
        assert!(!console.wait_ready("hello"));
        assert!(console.quit_requested());
        window.join().unwrap();
    }

    #[test]
    fn stale_enter_presses_are_ignored() {
        let (tx, rx) = unbounded();
        let mut console = Console::from_receiver(rx);
        tx.send(ConsoleCommand::Ready).unwrap();
        tx.send(ConsoleCommand::Ready).unwrap();
        assert!(!console.quit_requested());

        tx.send(ConsoleCommand::Ready).unwrap();
        assert!(console.wait_ready("hello"));
    }

    #[test]
    fn quit_is_sticky() {
        let (tx, rx) = unbounded();
        let mut console = Console::from_receiver(rx);
        tx.send(ConsoleCommand::Quit).unwrap();
        assert!(console.quit_requested());
        assert!(console.quit_requested());
        assert!(!console.wait_ready("bye"));
    }

    #[test]
    fn closed_input_means_quit_when_waiting() {
        let (tx, rx) = unbounded::<ConsoleCommand>();
        let mut console = Console::from_receiver(rx);
        drop(tx);
        assert!(!console.quit_requested());
        assert!(!console.wait_ready("peace"));
    }
}
