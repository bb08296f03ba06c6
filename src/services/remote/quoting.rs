//! Remote command-line construction.
//!
//! Every dynamic piece of a remote command (directory, command text, file
//! name, editor argument) goes through [`quote`] on its own. The directory
//! change and the payload are always joined with `&&`, so a failed `cd`
//! aborts the payload instead of running it in the wrong place.

use std::fmt;

use super::editor::EditorSpec;

/// A fully escaped command line, ready to hand to the remote shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(String);

impl CommandLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from building a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The directory to run in was empty
    EmptyDirectory,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyDirectory => write!(f, "cannot build command: empty remote directory"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Quote a string for a POSIX shell using single quotes.
///
/// Inside single quotes nothing is special except the quote itself, which is
/// written as `'\''` (close, escaped quote, reopen). The result is always
/// quoted, including for the empty string.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

fn cd_prefix(dir: &str) -> Result<String, BuildError> {
    if dir.is_empty() {
        return Err(BuildError::EmptyDirectory);
    }
    Ok(format!("cd -- {} && ", quote(dir)))
}

/// Build `cd -- '<dir>' && sh -c '<command>'`.
///
/// The command text is a single quoted word handed to an inner shell, so it
/// is interpreted once, exactly as the user typed it.
pub fn build_command(dir: &str, command: &str) -> Result<CommandLine, BuildError> {
    let mut line = cd_prefix(dir)?;
    line.push_str("sh -c ");
    line.push_str(&quote(command));
    tracing::debug!("Built remote command: {}", line);
    Ok(CommandLine(line))
}

/// Build the command that opens `file` in `editor` inside `dir`.
pub fn build_editor_command(
    dir: &str,
    editor: &EditorSpec,
    file: &str,
) -> Result<CommandLine, BuildError> {
    let mut line = cd_prefix(dir)?;
    line.push_str(&quote(&editor.program));
    for arg in &editor.args {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    line.push_str(" -- ");
    line.push_str(&quote(file));
    Ok(CommandLine(line))
}

/// Build the command that pages `file` with `less`, or `cat` when the remote
/// has no `less`.
pub fn build_pager_command(dir: &str, file: &str) -> Result<CommandLine, BuildError> {
    let file = quote(file);
    let mut line = cd_prefix(dir)?;
    line.push_str(&format!(
        "if command -v less >/dev/null 2>&1; then less -- {file}; else cat -- {file}; fi"
    ));
    Ok(CommandLine(line))
}

/// Build the listing command: resolved directory on the first line, then one
/// entry per line with directories marked by a trailing `/`.
pub fn build_listing_command(dir: &str) -> Result<CommandLine, BuildError> {
    let mut line = cd_prefix(dir)?;
    line.push_str("pwd -P && LC_ALL=C ls -1Ap");
    Ok(CommandLine(line))
}

/// Wrap a command line for the remote login shell.
///
/// ssh joins its arguments and hands them to the user's login shell, which
/// may not be POSIX. Wrapping in `sh -lc '<line>'` means that shell only ever
/// sees one quoted word.
pub fn wrap_for_remote(line: &CommandLine) -> String {
    format!("sh -lc {}", quote(line.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::process::Command;

    /// Run a built command line through a local POSIX shell.
    fn run_sh(line: &CommandLine) -> (i32, String, String) {
        let output = Command::new("sh")
            .arg("-c")
            .arg(line.as_str())
            .output()
            .unwrap();
        (
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        )
    }

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote("abc"), "'abc'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_quote_embedded_single_quote() {
        assert_eq!(quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_empty_directory_is_rejected() {
        assert_eq!(build_command("", "ls"), Err(BuildError::EmptyDirectory));
        assert_eq!(
            build_editor_command("", &EditorSpec::fallback(), "f"),
            Err(BuildError::EmptyDirectory)
        );
        assert_eq!(build_pager_command("", "f"), Err(BuildError::EmptyDirectory));
        assert_eq!(build_listing_command(""), Err(BuildError::EmptyDirectory));
    }

    #[test]
    fn test_command_content_never_fails() {
        for text in ["", "'", "\"", "$(rm -rf /)", "`x`", "a\nb", "\\"] {
            assert!(build_command("/", text).is_ok(), "failed for {text:?}");
        }
    }

    #[test]
    fn test_directory_change_uses_and_sequencing() {
        let line = build_command("/tmp", "echo hi").unwrap();
        assert_eq!(line.as_str(), "cd -- '/tmp' && sh -c 'echo hi'");
        assert!(!line.as_str().contains(';'));
    }

    #[test]
    fn test_wrap_for_remote_is_one_word() {
        let line = build_command("/it's", "echo 'x'").unwrap();
        let wrapped = wrap_for_remote(&line);
        let words = shlex::split(&wrapped).unwrap();
        assert_eq!(words, vec!["sh", "-lc", line.as_str()]);
    }

    #[test]
    #[cfg_attr(not(unix), ignore = "Requires a POSIX shell")]
    fn test_failed_cd_aborts_payload() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let command = format!("touch {}", quote(&marker.to_string_lossy()));
        let line = build_command("/nonexistent/rex-test-dir", &command).unwrap();

        let (code, _, _) = run_sh(&line);

        assert_ne!(code, 0);
        assert!(!marker.exists(), "payload ran despite failed cd");
    }

    #[test]
    #[cfg_attr(not(unix), ignore = "Requires a POSIX shell")]
    fn test_metacharacters_in_directory() {
        let base = tempfile::tempdir().unwrap();
        let weird = base.path().join("a b;c|d&e$f`g'h\"i(j)k");
        std::fs::create_dir(&weird).unwrap();
        let weird = weird.canonicalize().unwrap();

        let line = build_command(&weird.to_string_lossy(), "pwd -P").unwrap();
        let (code, stdout, _) = run_sh(&line);

        assert_eq!(code, 0);
        assert_eq!(stdout.trim_end_matches('\n'), weird.to_string_lossy());
    }

    #[test]
    #[cfg_attr(not(unix), ignore = "Requires a POSIX shell")]
    fn test_user_command_is_interpreted_as_typed() {
        let line = build_command("/", "printf '%s\\n' 'a b' | tr a-z A-Z").unwrap();
        let (code, stdout, _) = run_sh(&line);
        assert_eq!(code, 0);
        assert_eq!(stdout, "A B\n");
    }

    #[test]
    #[cfg_attr(not(unix), ignore = "Requires a POSIX shell")]
    fn test_editor_arguments_are_not_expanded() {
        let editor = EditorSpec {
            program: "printf".to_string(),
            args: vec!["%s|".to_string(), "$HOME".to_string(), "*".to_string()],
        };
        let line = build_editor_command("/", &editor, "x y").unwrap();
        let (code, stdout, _) = run_sh(&line);
        assert_eq!(code, 0);
        assert_eq!(stdout, "$HOME|*|--|x y|");
    }

    #[test]
    #[cfg_attr(not(unix), ignore = "Requires a POSIX shell")]
    fn test_pager_command_prints_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("it's here.txt"), "content\n").unwrap();
        let line = build_pager_command(&dir.path().to_string_lossy(), "it's here.txt").unwrap();

        // Not a tty, so less (if present) behaves like cat
        let (code, stdout, _) = run_sh(&line);

        assert_eq!(code, 0);
        assert_eq!(stdout, "content\n");
    }

    proptest! {
        #[test]
        fn prop_quoted_text_survives_the_shell(text in "[ -~\n]{0,40}") {
            let line = build_command("/", &format!("printf '%s' {}", quote(&text))).unwrap();
            let (code, stdout, _) = run_sh(&line);
            prop_assert_eq!(code, 0);
            prop_assert_eq!(stdout, text);
        }
    }
}
