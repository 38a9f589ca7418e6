//! Cleanup of captured remote output.

use crate::channel::ESCALATION_PHRASE;

/// Printed by sudo after a rejected password, before asking again.
const RETRY_NOTICE: &str = "Sorry, try again.";

/// How the output was captured.
#[derive(Debug, Clone, Copy)]
pub enum OutputMode<'a> {
    /// Plain `exec` output.
    Batch,

    /// PTY transcript including the echoed command and shell prompts.
    Interactive {
        /// Remote username, used to recognise the trailing shell prompt.
        username: &'a str,

        /// The command line that was sent.
        command: &'a str,
    },
}

/// Strip echo, prompts and surrounding noise from captured output.
pub fn sanitize(raw: &str, mode: &OutputMode<'_>) -> String {
    match mode {
        OutputMode::Batch => sanitize_batch(raw),
        OutputMode::Interactive { username, command } => {
            sanitize_interactive(raw, username, command)
        }
    }
}

fn sanitize_batch(raw: &str) -> String {
    let trimmed = raw.trim();
    let (first, rest) = match trimmed.split_once('\n') {
        Some((first, rest)) => (first.trim_end(), Some(rest)),
        None => (trimmed, None),
    };

    // A label-only first line has nothing after its last ": " once trimmed,
    // so it is kept and the strip never reaches the next line
    let first = match first.rfind(": ") {
        Some(pos) => &first[pos + 2..],
        None => first,
    };

    match rest {
        Some(rest) => format!("{}\n{}", first, rest).trim().to_string(),
        None => first.trim().to_string(),
    }
}

fn sanitize_interactive(raw: &str, username: &str, command: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();

    let command = command.trim();
    let echo = if command.is_empty() {
        None
    } else {
        lines.iter().position(|line| line.contains(command))
    };
    let after_echo = echo.map_or(0, |idx| idx + 1);

    // Output starts after the password prompt that directly follows the
    // echo, skipping failed attempts, or right after the echo
    let start = match lines[after_echo..]
        .iter()
        .position(|line| !line.trim().is_empty())
        .map(|pos| after_echo + pos)
    {
        Some(idx) if lines[idx].contains(ESCALATION_PHRASE) => skip_retries(&lines, idx) + 1,
        _ => after_echo,
    };

    let body = &lines[start.min(lines.len())..];

    // Output ends before the last shell prompt
    let end = body
        .iter()
        .rposition(|line| is_shell_prompt(line, username))
        .unwrap_or(body.len());

    collapse_blank_lines(body[..end].join("\n").trim())
}

/// Index of the last password prompt in a run of `Sorry, try again.`
/// retries starting at `prompt`.
fn skip_retries(lines: &[&str], mut prompt: usize) -> usize {
    while let (Some(sorry), Some(next)) = (lines.get(prompt + 1), lines.get(prompt + 2)) {
        if sorry.trim() != RETRY_NOTICE || !next.contains(ESCALATION_PHRASE) {
            break;
        }
        prompt += 2;
    }
    prompt
}

/// The username followed, later on the line, by `$`, `#` or `>`.
fn is_shell_prompt(line: &str, username: &str) -> bool {
    if username.is_empty() {
        return false;
    }
    line.match_indices(username).any(|(pos, _)| {
        line[pos + username.len()..].contains(['$', '#', '>'])
    })
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = false;

    for line in text.split('\n') {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push(if blank { "" } else { line });
        previous_blank = blank;
    }

    out.join("\n")
}
