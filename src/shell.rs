//! Line-oriented command shell over a `FileStore`
//!
//! Commands, one per line:
//!
//! ```text
//! save <diskfile> <imffsfile>    copy a host file into the store
//! load <imffsfile> <diskfile>    copy a stored file out to the host
//! delete <imffsfile>
//! rename <old> <new>
//! dir                            names and sizes
//! fulldir                        names, sizes and every run
//! defrag
//! stats
//! help
//! quit
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. A failing command
//! prints its result code and message; the shell keeps reading.

use crate::core::error::{ImffsError, Result};
use crate::core::FileStore;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

const HELP: &str = "\
commands:
  save <diskfile> <imffsfile>
  load <imffsfile> <diskfile>
  delete <imffsfile>
  rename <old> <new>
  dir
  fulldir
  defrag
  stats
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Save { disk: PathBuf, name: String },
    Load { name: String, disk: PathBuf },
    Delete { name: String },
    Rename { old: String, new: String },
    Dir,
    FullDir,
    Defrag,
    Stats,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; `Ok(None)` for blank lines and comments
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = words.collect();

        let expect = |count: usize, usage: &str| -> Result<()> {
            if args.len() != count {
                return Err(ImffsError::InvalidCommand(format!("usage: {}", usage)));
            }
            Ok(())
        };

        let command = match verb.as_str() {
            "save" => {
                expect(2, "save <diskfile> <imffsfile>")?;
                Command::Save {
                    disk: PathBuf::from(args[0]),
                    name: args[1].to_string(),
                }
            }
            "load" => {
                expect(2, "load <imffsfile> <diskfile>")?;
                Command::Load {
                    name: args[0].to_string(),
                    disk: PathBuf::from(args[1]),
                }
            }
            "delete" => {
                expect(1, "delete <imffsfile>")?;
                Command::Delete {
                    name: args[0].to_string(),
                }
            }
            "rename" => {
                expect(2, "rename <old> <new>")?;
                Command::Rename {
                    old: args[0].to_string(),
                    new: args[1].to_string(),
                }
            }
            "dir" => {
                expect(0, "dir")?;
                Command::Dir
            }
            "fulldir" => {
                expect(0, "fulldir")?;
                Command::FullDir
            }
            "defrag" => {
                expect(0, "defrag")?;
                Command::Defrag
            }
            "stats" => {
                expect(0, "stats")?;
                Command::Stats
            }
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(ImffsError::InvalidCommand(format!(
                    "unknown command '{}' (try 'help')",
                    other
                )))
            }
        };

        Ok(Some(command))
    }
}

/// Whether the shell should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell<W: Write> {
    store: FileStore,
    out: W,
    json: bool,
    prompt: bool,
}

impl<W: Write> Shell<W> {
    pub fn new(store: FileStore, out: W) -> Self {
        Shell {
            store,
            out,
            json: false,
            prompt: false,
        }
    }

    /// Emit listings and reports as JSON instead of text
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Print a prompt before reading each line
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn into_parts(self) -> (FileStore, W) {
        (self.store, self.out)
    }

    fn emit_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, value).map_err(io::Error::from)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn emit_lines<T: std::fmt::Display + Serialize>(&mut self, items: &[T]) -> Result<()> {
        if self.json {
            return self.emit_json(&items);
        }
        for item in items {
            writeln!(self.out, "{}", item)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, command: Command) -> Result<Flow> {
        debug!("Executing {:?}", command);

        match command {
            Command::Save { disk, name } => {
                let size = self.store.save_file(&disk, &name)?;
                writeln!(self.out, "saved {} ({} bytes)", name, size)?;
            }
            Command::Load { name, disk } => {
                let size = self.store.load_file(&name, &disk)?;
                writeln!(self.out, "loaded {} ({} bytes) to {}", name, size, disk.display())?;
            }
            Command::Delete { name } => {
                self.store.delete(&name)?;
                writeln!(self.out, "deleted {}", name)?;
            }
            Command::Rename { old, new } => {
                self.store.rename(&old, &new)?;
                writeln!(self.out, "renamed {} to {}", old, new)?;
            }
            Command::Dir => {
                let entries = self.store.list();
                self.emit_lines(&entries)?;
            }
            Command::FullDir => {
                let entries = self.store.full_list();
                self.emit_lines(&entries)?;
            }
            Command::Defrag => {
                let report = self.store.defrag()?;
                if self.json {
                    self.emit_json(&report)?;
                } else {
                    writeln!(self.out, "{}", report)?;
                }
            }
            Command::Stats => {
                let stats = self.store.stats();
                if self.json {
                    self.emit_json(&stats)?;
                } else {
                    writeln!(self.out, "{}", stats)?;
                }
            }
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    /// Run commands from `input` until it ends or `quit` is read
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<()> {
        let mut lines = input.lines();

        loop {
            if self.prompt {
                write!(self.out, "imffs> ")?;
                self.out.flush()?;
            }

            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };

            let outcome = Command::parse(&line).and_then(|command| match command {
                Some(command) => self.execute(command),
                None => Ok(Flow::Continue),
            });

            match outcome {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(self.out, "{}: {}", e.code(), e)?,
            }
        }

        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run_script(store: FileStore, script: &str) -> (FileStore, String) {
        let mut shell = Shell::new(store, Vec::new());
        shell.run(script.as_bytes()).unwrap();
        let (store, out) = shell.into_parts();
        (store, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("save in.txt a").unwrap(),
            Some(Command::Save {
                disk: PathBuf::from("in.txt"),
                name: "a".to_string()
            })
        );
        assert_eq!(
            Command::parse("  RENAME a b ").unwrap(),
            Some(Command::Rename {
                old: "a".to_string(),
                new: "b".to_string()
            })
        );
        assert_eq!(Command::parse("fulldir").unwrap(), Some(Command::FullDir));
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(Command::parse("# comment").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Command::parse("save only-one"),
            Err(ImffsError::InvalidCommand(_))
        ));
        assert!(matches!(
            Command::parse("format c:"),
            Err(ImffsError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.bin");
        let dst = dir.path().join("out.bin");
        let content: Vec<u8> = (0..700u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&src, &content).unwrap();

        let script = format!(
            "save {} data\nload data {}\ndir\n",
            src.display(),
            dst.display()
        );
        let (store, out) = run_script(FileStore::new(8).unwrap(), &script);

        assert_eq!(std::fs::read(&dst).unwrap(), content);
        assert!(out.contains("saved data (700 bytes)"));
        assert!(out.contains("data"));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_errors_do_not_stop_the_shell() {
        let (_, out) = run_script(
            FileStore::new(4).unwrap(),
            "delete missing\nbogus\nstats\n",
        );

        let lines: Vec<_> = out.lines().collect();
        assert!(lines[0].starts_with("ERROR: File not found"));
        assert!(lines[1].starts_with("INVALID: Invalid command"));
        assert!(lines[2].contains("0 files"));
    }

    #[test]
    fn test_quit_stops_reading() {
        let (_, out) = run_script(FileStore::new(4).unwrap(), "quit\nhelp\n");
        assert!(out.is_empty());
    }

    #[test]
    fn test_json_dir() {
        let mut store = FileStore::new(4).unwrap();
        store.save_bytes("a", &[1u8; 100]).unwrap();

        let mut shell = Shell::new(store, Vec::new()).with_json(true);
        shell.execute(Command::Dir).unwrap();
        assert!(shell.store().exists("A"));
        let (_, out) = shell.into_parts();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["name"], "a");
        assert_eq!(parsed[0]["size"], 100);
    }

    #[test]
    fn test_defrag_command() {
        let mut store = FileStore::new(4).unwrap();
        store.save_bytes("a", b"a").unwrap();
        store.save_bytes("b", b"b").unwrap();
        store.delete("a").unwrap();

        let (store, out) = run_script(store, "defrag\n");
        assert!(out.contains("moved 1 file(s)"));
        assert_eq!(store.runs("b").unwrap()[0].start, 0);
    }
}
