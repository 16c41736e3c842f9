//! `skillforge watch`: runs the polling runtime and reads commands from stdin.
//!
//! ```text
//! open <path>     navigate (guarded)
//! click           follow the open notification
//! dismiss         close the open notification
//! login <token>   sign in with an issued token
//! logout          sign out and stop polling
//! status          print a status line
//! quit            stop (also on EOF)
//! ```

use std::io::BufRead;
use std::thread;

use skillforge_core::runtime::{self, RuntimeCommander};
use skillforge_core::{ClientUpdate, RuntimeCommand};
use tracing::{debug, warn};

use crate::context::ClientContext;
use crate::render::Renderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchInput {
    Command(RuntimeCommand),
    Quit,
}

/// Parses one stdin line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<WatchInput>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let argument = parts.next();
    if parts.next().is_some() {
        return Err(format!("Too many arguments for '{}'", verb));
    }

    let input = match (verb.to_ascii_lowercase().as_str(), argument) {
        ("open", Some(path)) => WatchInput::Command(RuntimeCommand::Open(path.to_string())),
        ("open", None) => return Err("Usage: open <path>".to_string()),
        ("login", Some(token)) => WatchInput::Command(RuntimeCommand::SignIn(token.to_string())),
        ("login", None) => return Err("Usage: login <token>".to_string()),
        ("click", None) => WatchInput::Command(RuntimeCommand::ClickNotification),
        ("dismiss", None) => WatchInput::Command(RuntimeCommand::DismissNotification),
        ("logout", None) => WatchInput::Command(RuntimeCommand::Logout),
        ("status", None) => WatchInput::Command(RuntimeCommand::Status),
        ("quit" | "exit", None) => WatchInput::Quit,
        ("click" | "dismiss" | "logout" | "status" | "quit" | "exit", Some(_)) => {
            return Err(format!("'{}' takes no arguments", verb))
        }
        (other, _) => return Err(format!("Unknown command '{}'", other)),
    };
    Ok(Some(input))
}

pub fn run(ctx: &ClientContext, renderer: Renderer) -> Result<(), String> {
    let (handle, updates) = runtime::spawn(ctx.controller(), ctx.services())
        .map_err(|err| format!("Failed to start runtime: {}", err))?;

    spawn_stdin_reader(handle.commander(), renderer)?;

    for update in updates.iter() {
        renderer.update(&update);
        if update == ClientUpdate::Stopped {
            break;
        }
    }

    handle.join();
    Ok(())
}

fn spawn_stdin_reader(commander: RuntimeCommander, renderer: Renderer) -> Result<(), String> {
    thread::Builder::new()
        .name("skillforge-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(error = %err, "Failed to read stdin");
                        break;
                    }
                };
                match parse_line(&line) {
                    Ok(Some(WatchInput::Command(command))) => {
                        if !commander.send(command) {
                            return;
                        }
                    }
                    Ok(Some(WatchInput::Quit)) => break,
                    Ok(None) => {}
                    Err(reason) => renderer.message(&reason),
                }
            }
            debug!("stdin closed; stopping runtime");
            commander.shutdown();
        })
        .map(|_| ())
        .map_err(|err| format!("Failed to start stdin reader: {}", err))
}
