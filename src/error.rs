use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read config file '{0}': {1}")]
    ConfigRead(String, std::io::Error),

    #[error("Invalid config at line {line}: {reason}")]
    ConfigParse { line: usize, reason: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command worker is no longer running")]
    WorkerGone,
}
