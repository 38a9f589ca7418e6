//! Remote command line construction.

use secrecy::SecretString;

/// Executable run on the salt master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Program {
    /// `salt`
    #[default]
    Salt,

    /// `salt-run`
    SaltRun,

    /// `salt-key`
    SaltKey,

    /// No executable prefix; the arguments are the whole command.
    Bare,
}

impl Program {
    /// Pick the program from the selection flags.
    ///
    /// When several are set, `bare` wins over `key`, which wins over `runner`.
    pub fn select(runner: bool, key: bool, bare: bool) -> Self {
        if bare {
            Self::Bare
        } else if key {
            Self::SaltKey
        } else if runner {
            Self::SaltRun
        } else {
            Self::Salt
        }
    }

    /// Executable name, or `None` for [`Program::Bare`].
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Self::Salt => Some("salt"),
            Self::SaltRun => Some("salt-run"),
            Self::SaltKey => Some("salt-key"),
            Self::Bare => None,
        }
    }
}

/// Privilege escalation applied to the command.
#[derive(Debug, Default)]
pub enum Escalation {
    /// Run as the login user.
    #[default]
    None,

    /// `sudo` without a password prompt.
    Sudo,

    /// `sudo` answering its password prompt with this secret.
    SudoWithPassword(SecretString),
}

/// A command to run on the remote host.
#[derive(Debug)]
pub struct RemoteCommand {
    program: Program,
    args: Vec<String>,
    escalation: Escalation,
}

impl RemoteCommand {
    /// Create a command without escalation.
    pub fn new(program: Program, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            escalation: Escalation::None,
        }
    }

    /// Set the escalation mode.
    pub fn with_escalation(mut self, escalation: Escalation) -> Self {
        self.escalation = escalation;
        self
    }

    /// The selected program.
    pub fn program(&self) -> Program {
        self.program
    }

    /// The escalation mode.
    pub fn escalation(&self) -> &Escalation {
        &self.escalation
    }

    /// Whether the command needs a PTY and the prompt detector.
    pub fn is_interactive(&self) -> bool {
        matches!(self.escalation, Escalation::SudoWithPassword(_))
    }

    /// The line sent to the remote shell.
    ///
    /// Every argument, including the program name, is double-quoted and the
    /// results are joined with single spaces.
    pub fn line(&self) -> String {
        let program: Option<&str> = self.program.name();
        let words: Vec<String> = program
            .into_iter()
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect();

        let line = words.join(" ");
        match self.escalation {
            Escalation::None => line,
            Escalation::Sudo | Escalation::SudoWithPassword(_) => format!("sudo {}", line),
        }
    }
}

/// Wrap `arg` in double quotes, escaping `"` and `\`.
pub fn quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Selection flags found among the positional arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SelectionFlags {
    pub runner: bool,
    pub key: bool,
    pub bare: bool,
}

/// Pull `--tsr`, `--tsk` and `--tse` out of `args`, wherever they appear.
pub fn extract_selection_flags(args: Vec<String>) -> (SelectionFlags, Vec<String>) {
    let mut flags = SelectionFlags::default();
    let rest = args
        .into_iter()
        .filter(|arg| match arg.as_str() {
            "--tsr" => {
                flags.runner = true;
                false
            }
            "--tsk" => {
                flags.key = true;
                false
            }
            "--tse" => {
                flags.bare = true;
                false
            }
            _ => true,
        })
        .collect();
    (flags, rest)
}
