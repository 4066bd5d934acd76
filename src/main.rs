use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;
use pshvtools_shell::action::{ActionKind, Form};
use pshvtools_shell::command::SystemCommandRunner;
use pshvtools_shell::config::{self, Settings};
use pshvtools_shell::dispatch::{drain_until_finished, Dispatcher};
use pshvtools_shell::output::WriterSink;
use pshvtools_shell::repl::Repl;
use pshvtools_shell::runner::PowerShell;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Settings file with `key = value` lines.
    #[arg(long)]
    config: Option<PathBuf>,

    /// PowerShell executable to run.
    #[arg(long)]
    interpreter: Option<String>,

    /// Name of the module to import.
    #[arg(long)]
    module: Option<String>,

    /// Print the command line instead of running it. With `shell`, prints
    /// the command line of every action for the current form values.
    #[arg(long)]
    print_only: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Backs up virtual machines with hvbak.
    Backup {
        /// VM name pattern, e.g. "VM*".
        #[arg(long)]
        name_pattern: Option<String>,

        /// Directory receiving the backups.
        #[arg(long)]
        destination_path: Option<String>,

        /// Number of backups to keep.
        #[arg(long)]
        keep: Option<String>,

        /// Archive compression level.
        #[arg(long)]
        compression_level: Option<String>,

        /// Only report what would be done. `--what-if=false` turns off a configured dry-run.
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        what_if: Option<bool>,
    },
    /// Compacts the virtual disks of matching VMs.
    Compact {
        /// VM name pattern, e.g. "VM*".
        #[arg(long)]
        name_pattern: Option<String>,

        /// Only report what would be done. `--what-if=false` turns off a configured dry-run.
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        what_if: Option<bool>,
    },
    /// Checks the pshvtools environment.
    Health,
    /// Shows the pshvtools configuration.
    Config,
    /// Restores orphaned virtual machines.
    Restore,
    /// Opens an interactive shell with editable form fields.
    Shell,
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => config::read_settings(path)?,
        None => Settings::default(),
    };
    if let Some(interpreter) = &cli.interpreter {
        settings.interpreter = interpreter.clone();
    }
    if let Some(module) = &cli.module {
        settings.module = module.clone();
    }
    Ok(settings)
}

fn fill_form(form: &mut Form, command: &Commands) -> Option<ActionKind> {
    match command {
        Commands::Backup {
            name_pattern,
            destination_path,
            keep,
            compression_level,
            what_if,
        } => {
            let fields = [
                (&mut form.name_pattern, name_pattern),
                (&mut form.destination_path, destination_path),
                (&mut form.keep, keep),
                (&mut form.compression_level, compression_level),
            ];
            for (field, value) in fields {
                if let Some(v) = value {
                    *field = v.clone();
                }
            }
            if let Some(v) = what_if {
                form.what_if = *v;
            }
            Some(ActionKind::Backup)
        }
        Commands::Compact {
            name_pattern,
            what_if,
        } => {
            if let Some(v) = name_pattern {
                form.name_pattern = v.clone();
            }
            if let Some(v) = what_if {
                form.what_if = *v;
            }
            Some(ActionKind::Compact)
        }
        Commands::Health => Some(ActionKind::HealthCheck),
        Commands::Config => Some(ActionKind::ShowConfig),
        Commands::Restore => Some(ActionKind::RestoreOrphans),
        Commands::Shell => None,
    }
}

fn print_commands(form: &Form, kind: Option<ActionKind>, module: &str) -> Vec<String> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => ActionKind::ALL.to_vec(),
    };
    kinds
        .into_iter()
        .map(|k| form.action(k).command_line_for(module))
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let settings = load_settings(&cli)?;
    let mut form = settings.defaults.clone();
    let kind = fill_form(&mut form, &cli.command);

    if cli.print_only {
        for line in print_commands(&form, kind, &settings.module) {
            println!("{}", line);
        }
        return Ok(());
    }

    info!(
        "Using interpreter '{}' with module '{}'",
        settings.interpreter, settings.module
    );
    let powershell = PowerShell::new(settings.interpreter.clone(), Arc::new(SystemCommandRunner))
        .with_module(settings.module.clone());
    let (dispatcher, events) = Dispatcher::spawn(powershell);

    match kind {
        Some(kind) => {
            dispatcher.submit(form.action(kind))?;
            let sink = WriterSink::new(io::stdout());
            // A failed PowerShell command is reported in the output, not as our exit status.
            let exit_code = drain_until_finished(&events, &sink)?;
            info!("{} finished with exit code {:?}", kind, exit_code);
        }
        None => {
            let mut repl = Repl::new(form, dispatcher, events, io::stdout());
            repl.run(io::stdin().lock())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn form_for(args: &[&str], settings: &Settings) -> (Form, Option<ActionKind>) {
        let cli = Cli::parse_from(args);
        let mut form = settings.defaults.clone();
        let kind = fill_form(&mut form, &cli.command);
        (form, kind)
    }

    #[test]
    fn test_configured_what_if_stays_without_flag() {
        let settings = config::parse_settings("what_if = yes").unwrap();
        let (form, kind) = form_for(&["pshvtools-shell", "compact", "--name-pattern", "VM*"], &settings);
        assert_eq!(
            print_commands(&form, kind, &settings.module),
            vec![r#"Import-Module pshvtools; Invoke-VHDCompact -NamePattern "VM*" -WhatIf"#]
        );
    }

    #[test]
    fn test_what_if_flag_overrides_settings() {
        let settings = config::parse_settings("what_if = yes").unwrap();
        let (form, kind) = form_for(
            &["pshvtools-shell", "compact", "--name-pattern", "VM*", "--what-if=false"],
            &settings,
        );
        assert!(!form.what_if);
        assert_eq!(
            print_commands(&form, kind, &settings.module),
            vec![r#"Import-Module pshvtools; Invoke-VHDCompact -NamePattern "VM*""#]
        );

        let (form, _) = form_for(&["pshvtools-shell", "backup", "--what-if"], &Settings::default());
        assert!(form.what_if);
    }

    #[test]
    fn test_backup_flags_override_defaults() {
        let settings =
            config::parse_settings("name_pattern = web-*\nkeep = 9\ncompression_level = Fastest").unwrap();
        let (form, kind) = form_for(
            &[
                "pshvtools-shell",
                "backup",
                "--name-pattern",
                "VM*",
                "--destination-path",
                r"D:\Backups",
                "--keep",
                "5",
                "--compression-level",
                "Optimal",
                "--what-if",
            ],
            &settings,
        );
        assert_eq!(kind, Some(ActionKind::Backup));
        assert_eq!(
            print_commands(&form, kind, &settings.module),
            vec![r#"Import-Module pshvtools; hvbak -NamePattern "VM*" -DestinationPath "D:\Backups" -Keep 5 -CompressionLevel Optimal -WhatIf -Verbose"#]
        );
    }

    #[test]
    fn test_backup_falls_back_to_settings() {
        let settings = config::parse_settings("keep = 9\ncompression_level = Fastest").unwrap();
        let (form, _) = form_for(&["pshvtools-shell", "backup", "--keep", "3"], &settings);
        assert_eq!(form.keep, "3");
        assert_eq!(form.compression_level, "Fastest");
        assert_eq!(form.name_pattern, "*");
    }

    #[test]
    fn test_interpreter_and_module_flags_override_config_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("shell.conf");
        fs::write(&path, "interpreter = powershell.exe\nmodule = pshvtools-dev\n").unwrap();
        let config_arg = path.to_str().unwrap();

        let cli = Cli::parse_from(["pshvtools-shell", "--config", config_arg, "health"]);
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.interpreter, "powershell.exe");
        assert_eq!(settings.module, "pshvtools-dev");

        let cli = Cli::parse_from([
            "pshvtools-shell",
            "--config",
            config_arg,
            "--interpreter",
            "pwsh-preview",
            "--module",
            "pshvtools",
            "health",
        ]);
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.interpreter, "pwsh-preview");
        assert_eq!(settings.module, "pshvtools");
    }

    #[test]
    fn test_print_only_shell_lists_every_action() {
        let cli = Cli::parse_from(["pshvtools-shell", "--print-only", "--module", "hvdev", "shell"]);
        assert!(cli.print_only);
        let settings = load_settings(&cli).unwrap();
        let mut form = settings.defaults.clone();
        let kind = fill_form(&mut form, &cli.command);
        assert_eq!(kind, None);

        let lines = print_commands(&form, kind, &settings.module);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2], "Import-Module hvdev; Test-PSHVToolsEnvironment");
        assert!(lines.iter().all(|l| l.starts_with("Import-Module hvdev; ")));
    }
}
