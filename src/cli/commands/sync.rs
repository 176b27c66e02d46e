//! Sync command: copy a model's records between environments.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use super::{credentials, load_model, open_store, print_partial, print_summary, runtime};
use crate::cli::SyncArgs;
use crate::config::TableResolver;
use crate::error::{Error, Result};
use crate::sync::{AssumeYes, Confirmation, Engine, Interrupt, Summary, SyncOptions};

const ANSWER_POLL: Duration = Duration::from_millis(100);

/// Asks on stderr and reads the answer from stdin.
///
/// Anything but `y` / `yes` declines, including end of input and Ctrl-C.
struct TerminalPrompt {
    interrupt: Interrupt,
}

impl Confirmation for TerminalPrompt {
    fn confirm(&self, message: &str) -> Result<bool> {
        eprint!("{message} [y/N] ");
        io::stderr().flush()?;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut input = String::new();
            let read = io::stdin().lock().read_line(&mut input).map(|_| input);
            let _ = tx.send(read);
        });

        let answer = wait_for_answer(&rx, &self.interrupt)?;
        Ok(answer.is_some_and(|a| is_yes(&a)))
    }
}

/// The line read from `answers`, or `None` on Ctrl-C or a closed stdin.
fn wait_for_answer(
    answers: &Receiver<io::Result<String>>,
    interrupt: &Interrupt,
) -> Result<Option<String>> {
    loop {
        if interrupt.is_raised() {
            eprintln!();
            return Ok(None);
        }
        match answers.recv_timeout(ANSWER_POLL) {
            Ok(read) => return Ok(Some(read?)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(None),
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn options(args: &SyncArgs) -> SyncOptions {
    SyncOptions {
        write_missing: !args.skip_missing,
        write_differing: !args.skip_differing,
        scan_for_extra: !args.no_scan_extra,
        delete_extra: args.delete,
        dry_run: args.dryrun,
    }
}

/// Make `args.dest_env`'s table for `args.model` match `args.source_env`'s.
///
/// # Errors
///
/// Returns an error if either environment is unknown, both name the same
/// table, a read fails, or a write conflicts. Writes before the failure
/// stay applied and are reported.
pub fn execute(args: &SyncArgs, project: Option<&Path>, json: bool) -> Result<()> {
    let (project, schema) = load_model(project, &args.model)?;
    let source = project.resolve(&args.source_env, &schema.name)?;
    let target = project.resolve(&args.dest_env, &schema.name)?;
    if source.table_name == target.table_name && source.config.endpoint == target.config.endpoint {
        return Err(Error::InvalidArgument(format!(
            "Source and destination are the same table: {}",
            source.table_name
        )));
    }

    let rt = runtime()?;
    let session = rt.block_on(credentials(&project, &[&source, &target]))?;
    let source_store = open_store(&source, &session, &schema);
    let target_store = open_store(&target, &session, &schema);

    info!(from = %source.table_name, to = %target.table_name, "syncing");

    let mut summary = Summary::default();
    let result = rt.block_on(async {
        let interrupt = Interrupt::on_ctrl_c();
        let prompt = TerminalPrompt {
            interrupt: interrupt.clone(),
        };
        let confirm: &dyn Confirmation = if args.yes { &AssumeYes } else { &prompt };
        Engine::new()
            .with_interrupt(interrupt)
            .sync(&source_store, &target_store, &options(args), confirm, &mut summary)
            .await
    });

    match result {
        Ok(outcome) => print_summary(
            &format!("Sync {} → {}", source.table_name, target.table_name),
            outcome,
            &summary,
            json!({
                "model": schema.name,
                "source": source.table_name,
                "destination": target.table_name,
            }),
            json,
        ),
        Err(e) => {
            print_partial(&summary, json);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn args(extra: &[&str]) -> SyncArgs {
        let mut argv = vec!["recsync", "sync", "Todo", "dev", "prod"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Sync(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_default_options() {
        assert_eq!(options(&args(&[])), SyncOptions::default());
    }

    #[test]
    fn test_gates_are_independent() {
        let opts = options(&args(&["--delete", "--skip-missing"]));
        assert!(opts.delete_extra && opts.scan_for_extra);
        assert!(!opts.write_missing && opts.write_differing);
    }

    #[test]
    fn test_scan_extra_opt_out() {
        assert!(!options(&args(&["--no-scan-extra"])).scan_for_extra);
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no\n"));
    }

    #[test]
    fn test_answer_is_returned() {
        let (tx, rx) = mpsc::channel();
        tx.send(Ok("yes\n".to_string())).unwrap();
        let answer = wait_for_answer(&rx, &Interrupt::new()).unwrap();
        assert_eq!(answer.as_deref(), Some("yes\n"));
    }

    #[test]
    fn test_interrupt_declines_while_waiting() {
        let (_tx, rx) = mpsc::channel::<io::Result<String>>();
        let interrupt = Interrupt::new();
        let raiser = interrupt.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            raiser.raise();
        });

        assert_eq!(wait_for_answer(&rx, &interrupt).unwrap(), None);
        handle.join().unwrap();
    }

    #[test]
    fn test_closed_input_declines() {
        let (tx, rx) = mpsc::channel::<io::Result<String>>();
        drop(tx);
        assert_eq!(wait_for_answer(&rx, &Interrupt::new()).unwrap(), None);
    }
}
