//! Command tokenisation, the dispatch table, and arg-count checking (§6.1).
//! Thin pass-throughs into [`vfs_fs::Vfs`] — none of this module's logic is
//! part of the store's correctness.

use std::io;
use std::path::Path;

use vfs_fs::{EntryKind, Listing, Vfs};

/// Splits a line the way the original's `strtok(linha, " ")` does: on
/// whitespace, discarding empty tokens.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Outcome of dispatching one line: either the session continues, or the
/// user asked to `exit`.
pub enum Outcome {
    Continue,
    Exit,
}

/// Runs one already-tokenised command against `vfs`, printing `ERROR(op:
/// ...)` on any failure (§6.1, §7) and never returning an `Err` itself —
/// the shell loop keeps going regardless of what a command does.
pub fn dispatch(vfs: &mut dyn Vfs, tokens: &[&str], out: &mut dyn io::Write) -> Outcome {
    let Some(&cmd) = tokens.first() else {
        return Outcome::Continue;
    };
    let args = &tokens[1..];

    if let Some(expected) = expected_argc(cmd) {
        if args.len() != expected {
            let which = if args.len() < expected { "too few" } else { "too many" };
            let _ = writeln!(out, "ERROR(input: '{cmd}' - {which} arguments)");
            return Outcome::Continue;
        }
    }

    let result = match cmd {
        "ls" => match vfs.ls() {
            Ok(listing) => {
                print_ls(out, &listing);
                Ok(())
            }
            Err(err) => Err(err),
        },
        "mkdir" => vfs.mkdir(args[0]),
        "cd" => vfs.cd(args[0]),
        "pwd" => match vfs.pwd() {
            Ok(path) => {
                let _ = writeln!(out, "{path}");
                Ok(())
            }
            Err(err) => Err(err),
        },
        "rmdir" => vfs.rmdir(args[0]),
        "get" => vfs.get(Path::new(args[0]), args[1]),
        "put" => vfs.put(args[0], Path::new(args[1])),
        "cat" => vfs.cat(args[0], out),
        "cp" => vfs.cp(args[0], args[1]),
        "mv" => vfs.mv(args[0], args[1]),
        "rm" => vfs.rm(args[0]),
        "exit" => return Outcome::Exit,
        _ => {
            let _ = writeln!(out, "ERROR(input: command not found)");
            return Outcome::Continue;
        }
    };

    if let Err(err) = result {
        let _ = writeln!(out, "ERROR({cmd}: {err})");
    }
    Outcome::Continue
}

/// Expected argument count for each recognised command (§6.1's table), or
/// `None` for an unknown command — unknown commands are handled separately
/// in [`dispatch`], not as an argc mismatch.
fn expected_argc(cmd: &str) -> Option<usize> {
    match cmd {
        "ls" | "pwd" | "exit" => Some(0),
        "mkdir" | "cd" | "rmdir" | "cat" | "rm" => Some(1),
        "get" | "put" | "cp" | "mv" => Some(2),
        _ => None,
    }
}

/// Renders an `ls` listing (§4.5): name in a 25-column field, `DD-MM-YYYY`
/// date, then ` DIR` or the zero-padded byte size.
fn print_ls(out: &mut dyn io::Write, listing: &[Listing]) {
    for entry in listing {
        let suffix = match entry.kind {
            EntryKind::Directory => " DIR".to_string(),
            EntryKind::File(size) => format!(" {size:04}"),
        };
        let _ = writeln!(
            out,
            "{:<25} {:02}-{:02}-{:04}{suffix}",
            entry.name, entry.day, entry.month, entry.year
        );
    }
}
