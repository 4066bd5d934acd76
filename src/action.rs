use crate::error::ShellError;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MODULE: &str = "pshvtools";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Backup,
    Compact,
    HealthCheck,
    ShowConfig,
    RestoreOrphans,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Backup,
        ActionKind::Compact,
        ActionKind::HealthCheck,
        ActionKind::ShowConfig,
        ActionKind::RestoreOrphans,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Backup => "backup",
            ActionKind::Compact => "compact",
            ActionKind::HealthCheck => "health",
            ActionKind::ShowConfig => "config",
            ActionKind::RestoreOrphans => "restore",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActionKind {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|k| k.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ShellError::UnknownCommand(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackupParams {
    pub name_pattern: String,
    pub destination_path: String,
    pub keep: String,
    pub compression_level: String,
    pub what_if: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompactParams {
    pub name_pattern: String,
    pub what_if: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Backup(BackupParams),
    Compact(CompactParams),
    HealthCheck,
    ShowConfig,
    RestoreOrphans,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Backup(_) => ActionKind::Backup,
            Action::Compact(_) => ActionKind::Compact,
            Action::HealthCheck => ActionKind::HealthCheck,
            Action::ShowConfig => ActionKind::ShowConfig,
            Action::RestoreOrphans => ActionKind::RestoreOrphans,
        }
    }

    /// Builds the command string for the default `pshvtools` module.
    pub fn command_line(&self) -> String {
        self.command_line_for(DEFAULT_MODULE)
    }

    /// Builds the PowerShell command string passed to `-Command`.
    ///
    /// Parameter values are interpolated verbatim. Nothing is escaped, so a
    /// value containing `"` or `;` changes the meaning of the command. This is
    /// a known limitation: callers must only feed trusted input.
    pub fn command_line_for(&self, module: &str) -> String {
        let body = match self {
            Action::Backup(p) => {
                let mut parts = vec![
                    "hvbak".to_string(),
                    format!("-NamePattern \"{}\"", p.name_pattern),
                    format!("-DestinationPath \"{}\"", p.destination_path),
                    format!("-Keep {}", p.keep),
                    format!("-CompressionLevel {}", p.compression_level),
                ];
                if p.what_if {
                    parts.push("-WhatIf".to_string());
                }
                parts.push("-Verbose".to_string());
                parts.join(" ")
            }
            Action::Compact(p) => {
                let mut cmd = format!("Invoke-VHDCompact -NamePattern \"{}\"", p.name_pattern);
                if p.what_if {
                    cmd.push_str(" -WhatIf");
                }
                cmd
            }
            Action::HealthCheck => "Test-PSHVToolsEnvironment".to_string(),
            Action::ShowConfig => "Get-PSHVToolsConfig | Format-List * -Force".to_string(),
            Action::RestoreOrphans => "Restore-OrphanedVMs".to_string(),
        };
        format!("Import-Module {}; {}", module, body)
    }
}

/// Field state of the front end, mirroring the input boxes of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub name_pattern: String,
    pub destination_path: String,
    pub keep: String,
    pub compression_level: String,
    pub what_if: bool,
}

impl Default for Form {
    fn default() -> Self {
        Self {
            name_pattern: "*".to_string(),
            destination_path: String::new(),
            keep: "2".to_string(),
            compression_level: "Optimal".to_string(),
            what_if: false,
        }
    }
}

impl Form {
    /// Binds the current field values to an action. Text fields are trimmed
    /// but otherwise passed through unchecked.
    pub fn action(&self, kind: ActionKind) -> Action {
        match kind {
            ActionKind::Backup => Action::Backup(BackupParams {
                name_pattern: self.name_pattern.trim().to_string(),
                destination_path: self.destination_path.trim().to_string(),
                keep: self.keep.trim().to_string(),
                compression_level: self.compression_level.trim().to_string(),
                what_if: self.what_if,
            }),
            ActionKind::Compact => Action::Compact(CompactParams {
                name_pattern: self.name_pattern.trim().to_string(),
                what_if: self.what_if,
            }),
            ActionKind::HealthCheck => Action::HealthCheck,
            ActionKind::ShowConfig => Action::ShowConfig,
            ActionKind::RestoreOrphans => Action::RestoreOrphans,
        }
    }
}
