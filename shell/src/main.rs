// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The `vfs` binary (§6.1): argument parsing, the `vfs$ ` prompt, and
//! command dispatch. This is the external collaborator §1 calls out as
//! outside the core's scope — everything it does is a thin front-end onto
//! `vfs_fs_fat::FatFileSystem`.

mod cli;
mod command;

use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use vfs_fs_fat::{FatFileSystem, Store};

use cli::Args;
use command::Outcome;

fn main() -> ExitCode {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("vfs: {err}");
            return ExitCode::FAILURE;
        }
    };

    let store = match Store::attach(&args.filesystem, args.block_size, args.fat_type) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("vfs: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut vfs = FatFileSystem::new(store);

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("vfs: {err}");
            return ExitCode::FAILURE;
        }
    };
    let stdout = std::io::stdout();

    loop {
        match editor.readline("vfs$ ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                let tokens = command::tokenize(&line);
                let mut handle = stdout.lock();
                match command::dispatch(&mut vfs, &tokens, &mut handle) {
                    Outcome::Continue => {}
                    Outcome::Exit => break,
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("vfs: {err}");
                break;
            }
        }
    }

    if let Err(err) = vfs.store_mut().flush() {
        eprintln!("vfs: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
