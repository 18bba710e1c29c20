use std::io::{self, BufRead, BufReader, Write};
use std::ops::ControlFlow;
use std::thread;

use log::{debug, warn};
use tokio::signal;
use tokio::sync::mpsc;

use crate::commands::{DbResult, parse_command};
use crate::config::PROMPT;
use crate::db::Database;
use crate::guard::{self, AssumeYes, Confirm, is_affirmative};
use crate::render::{HELP, render};
use crate::storage::BlobStore;

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Line source for both commands and confirmation answers.
///
/// Lines are read on a plain thread and handed over through a channel, so a
/// pending read never holds up shutdown after an interrupt.
pub struct Terminal {
    lines: mpsc::Receiver<io::Result<String>>,
    interrupts: mpsc::Receiver<()>,
    interrupted: bool,
}

fn spawn_reader<R: BufRead + Send + 'static>(reader: R) -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        for line in reader.lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

impl Terminal {
    /// Reads stdin and treats Ctrl-C as an interrupt.
    pub fn stdin() -> Self {
        let (tx, interrupts) = mpsc::channel(1);
        tokio::spawn(async move {
            while signal::ctrl_c().await.is_ok() {
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        Self::from_channels(spawn_reader(BufReader::new(io::stdin())), interrupts)
    }

    /// Reads from `reader` with no interrupt source.
    #[cfg(test)]
    pub fn new<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (_, interrupts) = mpsc::channel(1);
        Self::from_channels(spawn_reader(reader), interrupts)
    }

    pub fn from_channels(lines: mpsc::Receiver<io::Result<String>>, interrupts: mpsc::Receiver<()>) -> Self {
        Self {
            lines,
            interrupts,
            interrupted: false,
        }
    }

    /// True once an interrupt arrived while waiting for input.
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub async fn read_line(&mut self, prompt: &str) -> anyhow::Result<Input> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let input = tokio::select! {
            line = self.lines.recv() => match line {
                Some(line) => Input::Line(line?),
                None => Input::Eof,
            },
            Some(()) = self.interrupts.recv() => Input::Interrupted,
        };
        if input == Input::Interrupted {
            self.interrupted = true;
        }
        Ok(input)
    }
}

impl Confirm for Terminal {
    async fn ask(&mut self, question: &str) -> bool {
        match self.read_line(question).await {
            Ok(Input::Line(answer)) => is_affirmative(&answer),
            Ok(_) => false,
            Err(e) => {
                warn!("failed to read answer: {}", e);
                false
            }
        }
    }
}

/// Parses and executes one line. `Break` carries the farewell text, `Continue`
/// whatever should be shown for the command.
pub async fn handle_line<S, C>(db: &mut Database<S>, line: &str, confirm: &mut C) -> ControlFlow<String, String>
where
    S: BlobStore,
    C: Confirm,
{
    debug!("command: {}", line);
    let result = match parse_command(line) {
        Ok(cmd) => db.execute(cmd, confirm).await,
        Err(e) => Err(e),
    };

    match guard::translate(result) {
        Ok(DbResult::Exit) => ControlFlow::Break(render(&DbResult::Exit)),
        Ok(res) => ControlFlow::Continue(render(&res)),
        Err(message) => ControlFlow::Continue(message),
    }
}

async fn dispatch<S: BlobStore>(
    db: &mut Database<S>,
    terminal: &mut Terminal,
    line: &str,
    assume_yes: bool,
) -> ControlFlow<String, String> {
    if assume_yes {
        handle_line(db, line, &mut AssumeYes).await
    } else {
        handle_line(db, line, terminal).await
    }
}

/// Runs a single command, as for `--command`.
pub async fn run_once<S: BlobStore>(db: &mut Database<S>, terminal: &mut Terminal, line: &str, assume_yes: bool) {
    match dispatch(db, terminal, line, assume_yes).await {
        ControlFlow::Continue(out) | ControlFlow::Break(out) => println!("{}", out),
    }
}

/// Interactive loop. Ends on `exit`, end of input or an interrupt.
pub async fn run<S: BlobStore>(db: &mut Database<S>, terminal: &mut Terminal, assume_yes: bool) -> anyhow::Result<()> {
    println!("*** Database started ***\n");
    println!("{}\n", HELP);

    loop {
        let line = match terminal.read_line(PROMPT).await? {
            Input::Line(line) => line,
            Input::Eof | Input::Interrupted => {
                println!("\n{}", render(&DbResult::Exit));
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match dispatch(db, terminal, &line, assume_yes).await {
            ControlFlow::Continue(out) => println!("{}", out),
            ControlFlow::Break(out) => {
                println!("{}", out);
                break;
            }
        }
        if terminal.interrupted() {
            println!("\n{}", render(&DbResult::Exit));
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_types::Row;
    use crate::storage::MemoryStore;

    fn terminal(script: &'static str) -> Terminal {
        Terminal::new(script.as_bytes())
    }

    async fn rows(db: &Database<MemoryStore>, table: &str) -> Vec<Row> {
        db.store().load(table).await.unwrap()
    }

    #[tokio::test]
    async fn test_read_line_and_eof() {
        let mut t = terminal("first\n\nsecond");
        assert_eq!(t.read_line("").await.unwrap(), Input::Line("first".into()));
        assert_eq!(t.read_line("").await.unwrap(), Input::Line("".into()));
        assert_eq!(t.read_line("").await.unwrap(), Input::Line("second".into()));
        assert_eq!(t.read_line("").await.unwrap(), Input::Eof);
        assert!(!t.interrupted());
    }

    #[tokio::test]
    async fn test_terminal_confirm_reads_next_line() {
        let mut t = terminal("y\nn\n");
        assert!(t.ask("sure? ").await);
        assert!(!t.ask("sure? ").await);
        // end of input answers no
        assert!(!t.ask("sure? ").await);
    }

    #[tokio::test]
    async fn test_interrupt_while_waiting_ends_session() {
        // input stays open but never delivers a line
        let (_pending, lines) = mpsc::channel(1);
        let (interrupt, interrupts) = mpsc::channel(1);
        let mut t = Terminal::from_channels(lines, interrupts);
        let mut db = Database::new(MemoryStore::default());

        interrupt.send(()).await.unwrap();
        run(&mut db, &mut t, false).await.unwrap();

        assert!(t.interrupted());
    }

    #[tokio::test]
    async fn test_interrupt_during_confirmation_answers_no() {
        let (lines_tx, lines) = mpsc::channel(4);
        let (interrupt, interrupts) = mpsc::channel(1);
        let mut t = Terminal::from_channels(lines, interrupts);
        let mut db = Database::new(MemoryStore::default());
        for line in ["create_table users name:str", "insert into users values (a)", "delete from users"] {
            lines_tx.send(Ok(line.to_string())).await.unwrap();
        }

        let session = run(&mut db, &mut t, false);
        let fire = async {
            // wait until the three commands were taken off the channel
            while lines_tx.capacity() < 4 {
                tokio::task::yield_now().await;
            }
            interrupt.send(()).await.unwrap();
        };
        let (result, ()) = tokio::join!(session, fire);
        result.unwrap();

        assert!(t.interrupted());
        assert_eq!(rows(&db, "users").await.len(), 1);
    }

    #[tokio::test]
    async fn test_handle_line_outputs() {
        let mut db = Database::new(MemoryStore::default());

        let out = handle_line(&mut db, "create_table users name:str", &mut AssumeYes).await;
        assert_eq!(
            out,
            ControlFlow::Continue("Table \"users\" created with columns: ID:int, name:str".into())
        );

        let out = handle_line(&mut db, "frobnicate", &mut AssumeYes).await;
        let ControlFlow::Continue(message) = out else {
            panic!("unknown command must not end the shell");
        };
        assert!(message.starts_with("Error: Parse error"));

        let out = handle_line(&mut db, "exit", &mut AssumeYes).await;
        assert_eq!(out, ControlFlow::Break("Exiting...".into()));
    }

    #[tokio::test]
    async fn test_session_with_confirmed_delete() {
        let mut db = Database::new(MemoryStore::default());
        let mut t = terminal(
            "create_table users name:str\n\
             insert into users values (a)\n\
             insert into users values (b)\n\
             delete from users where name = a\n\
             y\n\
             exit\n\
             insert into users values (never)\n",
        );

        run(&mut db, &mut t, false).await.unwrap();

        let remaining = rows(&db, "users").await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), Some(2));
    }

    #[tokio::test]
    async fn test_session_declined_drop() {
        let mut db = Database::new(MemoryStore::default());
        let mut t = terminal(
            "create_table users name:str\n\
             insert into users values (a)\n\
             drop_table users\n\
             n\n",
        );

        run(&mut db, &mut t, false).await.unwrap();

        assert_eq!(rows(&db, "users").await.len(), 1);
        let out = handle_line(&mut db, "list_tables", &mut AssumeYes).await;
        assert_eq!(out, ControlFlow::Continue("- users".into()));
    }

    #[tokio::test]
    async fn test_session_assume_yes() {
        let mut db = Database::new(MemoryStore::default());
        let mut t = terminal(
            "create_table users name:str\n\
             insert into users values (a)\n\
             delete from users\n\
             select from users\n",
        );

        run(&mut db, &mut t, true).await.unwrap();

        assert!(rows(&db, "users").await.is_empty());
    }
}
