//! Running external programs and capturing what they print.
//!
//! [`ProcessRunner`] resolves a program either directly or through the search path, starts
//! it without a shell and blocks until it exits. Both output streams are captured into the
//! returned [`Outcome`]'s diagnostics, stdout first, then stderr. A program that cannot be
//! found is never launched.
//!
//! # Examples
//!
//! ```rust,no_run
//! use publicizer::ProcessRunner;
//!
//! let runner = ProcessRunner::new().current_dir("tools");
//! let args = vec!["de4dot.exe".to_string(), "/out:de4dotp.exe".to_string()];
//! let outcome = runner.run("ILRepack.exe", &args);
//!
//! if outcome.exit_code() != 0 {
//!     print!("{}", outcome.diagnostics);
//! }
//! ```

use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{Diagnostics, Error, Outcome, FAILURE};

/// Resolves and runs external programs.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    current_dir: Option<PathBuf>,
    search_path: Option<OsString>,
}

impl ProcessRunner {
    /// A runner working in the current directory and searching `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run programs in `dir`; relative program paths are looked up there as well.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Search `paths` (joined like `PATH`) instead of the environment's `PATH`.
    #[must_use]
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Locate `program`: directly first, then in every directory of the search path.
    #[must_use]
    pub fn resolve(&self, program: &str) -> Option<PathBuf> {
        let direct = Path::new(program);
        let direct = match &self.current_dir {
            Some(dir) if direct.is_relative() => dir.join(direct),
            _ => direct.to_path_buf(),
        };
        if direct.is_file() {
            return Some(direct);
        }

        let file_name = Path::new(program).file_name()?;
        let search_path = match &self.search_path {
            Some(paths) => paths.clone(),
            None => env::var_os("PATH")?,
        };

        env::split_paths(&search_path)
            .map(|dir| dir.join(file_name))
            .find(|candidate| candidate.is_file())
    }

    /// Run `program` with `args` and wait for it to exit.
    ///
    /// The outcome's [`Outcome::exit_code`] is the child's exit code, or -1 if the program
    /// was not found, could not be started, or ended without an exit code.
    pub fn run(&self, program: &str, args: &[String]) -> Outcome<i32> {
        let mut diagnostics = Diagnostics::new();

        let Some(resolved) = self.resolve(program) else {
            log::debug!("{program} not found directly or on the search path");
            return Outcome::failure(Error::ProgramNotFound(program.to_string()), diagnostics);
        };

        let command_line = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        diagnostics.trace(format!("Running program '{command_line}'..."));
        log::debug!("Running {} with {} arguments", resolved.display(), args.len());

        let launch_error = |source| Error::Launch {
            program: program.to_string(),
            source,
        };

        let resolved = match fs::canonicalize(&resolved) {
            Ok(path) => path,
            Err(source) => return Outcome::failure(launch_error(source), diagnostics),
        };

        let mut command = Command::new(&resolved);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let output = match command.output() {
            Ok(output) => output,
            Err(source) => return Outcome::failure(launch_error(source), diagnostics),
        };

        diagnostics.output(String::from_utf8_lossy(&output.stdout));
        diagnostics.output(String::from_utf8_lossy(&output.stderr));

        match output.status.code() {
            Some(code) => {
                log::debug!("{program} exited with code {code}");
                Outcome::success(code, diagnostics)
            }
            None => Outcome::failure(
                Error::ToolFailed {
                    program: program.to_string(),
                    code: FAILURE,
                },
                diagnostics,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_not_launched() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new()
            .current_dir(dir.path())
            .with_search_path(dir.path());

        let outcome = runner.run("definitely-not-here.exe", &[]);

        assert!(matches!(outcome.result, Err(Error::ProgramNotFound(_))));
        assert_eq!(outcome.exit_code(), FAILURE);
        assert_eq!(
            outcome.diagnostics.to_string(),
            "Program 'definitely-not-here.exe' does not exist.\n"
        );
    }

    #[test]
    fn resolve_direct_and_search_path() {
        let work = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        fs::write(work.path().join("local.exe"), b"").unwrap();
        fs::write(bin.path().join("global.exe"), b"").unwrap();

        let runner = ProcessRunner::new()
            .current_dir(work.path())
            .with_search_path(bin.path());

        assert_eq!(
            runner.resolve("local.exe"),
            Some(work.path().join("local.exe"))
        );
        assert_eq!(
            runner.resolve("global.exe"),
            Some(bin.path().join("global.exe"))
        );
        assert_eq!(runner.resolve("nowhere.exe"), None);
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "tool.sh", "echo \"out $1\"\necho \"err $2\" >&2\nexit 3");

        let runner = ProcessRunner::new().current_dir(dir.path());
        let outcome = runner.run("tool.sh", &["a b".to_string(), "c".to_string()]);

        assert!(outcome.is_success());
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(
            outcome.diagnostics.to_string(),
            "Running program 'tool.sh a b c'...\nout a b\nerr c\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn arguments_are_not_shell_expanded() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "echo.sh", "printf '%s|' \"$@\"");

        let runner = ProcessRunner::new().current_dir(dir.path());
        let outcome = runner.run("echo.sh", &["$HOME".to_string(), "*".to_string()]);

        assert_eq!(outcome.exit_code(), 0);
        assert!(outcome.diagnostics.to_string().contains("$HOME|*|"));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_program_fails_to_launch() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noexec.exe");
        fs::write(&path, b"MZ\0\0\0\0\0").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let runner = ProcessRunner::new().current_dir(dir.path());
        let outcome = runner.run("noexec.exe", &["x".to_string()]);

        assert!(matches!(outcome.result, Err(Error::Launch { .. })));
        assert!(!outcome.is_success());
        assert_eq!(outcome.exit_code(), FAILURE);

        let text = outcome.diagnostics.to_string();
        assert!(text.starts_with("Running program 'noexec.exe x'...\nFailed to run 'noexec.exe'\n"));
        assert!(text.contains("caused by:"));
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "touch.sh", "echo hi > created.txt");

        let runner = ProcessRunner::new().current_dir(dir.path());
        assert_eq!(runner.run("touch.sh", &[]).exit_code(), 0);
        assert!(dir.path().join("created.txt").exists());
    }
}
