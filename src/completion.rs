//! # Shell Completion Module
//!
//! Static completion scripts come from clap. The enhanced bash script also
//! completes service names by asking the hidden `complete-services` command,
//! which reads them from the library database.
//!
//! ## Usage
//!
//! ```bash
//! gridfill completion bash > ~/.local/share/bash-completion/completions/gridfill
//! gridfill completion-enhanced > ~/.local/share/bash-completion/completions/gridfill
//! ```

use crate::config::RuntimeConfig;
use crate::db::LibraryDb;
use anyhow::Result;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use log::debug;
use std::io;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Bash completion script with service name completion
#[must_use]
pub fn enhanced_bash_completion() -> String {
    r#"#!/bin/bash
# Enhanced gridfill completion script with service name completion
# Install with: gridfill completion-enhanced > ~/.local/share/bash-completion/completions/gridfill

_gridfill_complete_services() {
    if command -v gridfill >/dev/null 2>&1; then
        gridfill complete-services 2>/dev/null
    fi
}

_gridfill() {
    local cur prev words cword
    _init_completion || return

    case "${prev}" in
        schedule|-r|--reference-service)
            mapfile -t COMPREPLY < <(_gridfill_complete_services | grep -i "^${cur}")
            return 0
            ;;
        completion)
            COMPREPLY=($(compgen -W "bash zsh fish power-shell elvish" -- "${cur}"))
            return 0
            ;;
        -o|--output-dir)
            _filedir -d
            return 0
            ;;
        --library-db|--artist-db)
            _filedir
            return 0
            ;;
        -d|--days)
            COMPREPLY=($(compgen -W "1 2 3 4 5 6 7" -- "${cur}"))
            return 0
            ;;
    esac

    local subcommands="schedule plan artists init-db completion completion-enhanced help"
    local window="--reference-service --groups --start-date --days"

    if [[ $cword -eq 1 ]]; then
        COMPREPLY=($(compgen -W "$subcommands --library-db --artist-db --verbose --help --version" -- "${cur}"))
    else
        case "${words[1]}" in
            schedule)
                COMPREPLY=($(compgen -W "$window --artist-separation --output-dir --stats --help" -- "${cur}"))
                ;;
            plan)
                COMPREPLY=($(compgen -W "$window --help" -- "${cur}"))
                ;;
            artists)
                COMPREPLY=($(compgen -W "--limit --help" -- "${cur}"))
                ;;
            *)
                COMPREPLY=($(compgen -W "$subcommands" -- "${cur}"))
                ;;
        esac
    fi
} &&
complete -F _gridfill gridfill

# ex: filetype=sh
"#
    .to_string()
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Service names from the library, or nothing if the library is missing or
/// unreadable. Completion must never fail loudly.
pub fn get_service_completions(runtime: &RuntimeConfig) -> Vec<String> {
    if !runtime.library_db.exists() {
        return Vec::new();
    }

    match LibraryDb::open(&runtime.library_db).and_then(|library| library.services()) {
        Ok(services) => services,
        Err(err) => {
            debug!("No service completions: {err:#}");
            Vec::new()
        }
    }
}

/// Print service names, one per line, quoting names with whitespace.
pub fn print_service_completions(runtime: &RuntimeConfig) -> Result<()> {
    for service in get_service_completions(runtime) {
        if service.contains(char::is_whitespace) {
            println!("\"{}\"", service.replace('"', "\\\""));
        } else {
            println!("{service}");
        }
    }
    Ok(())
}
