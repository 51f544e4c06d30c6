//! Child process plumbing: executable lookup, shell command composition,
//! spawning with piped stdio and draining both output streams.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, warn};

use crate::constants::SHELL;

/// Everything a finished child left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Resolve a program name to the executable that will be run.
///
/// Names containing a path separator are used verbatim. Otherwise `cwd` is
/// searched first, then every directory of `search_path`. An unresolved name
/// is returned unchanged so the shell reports it.
pub fn resolve_executable(program: &str, cwd: &Path, search_path: Option<&OsStr>) -> String {
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        return program.to_string();
    }

    let local = cwd.join(program);
    if is_executable(&local) {
        return local.to_string_lossy().into_owned();
    }

    search_path
        .map(std::env::split_paths)
        .into_iter()
        .flatten()
        .map(|dir: PathBuf| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .map(|found| found.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string())
}

/// Build the text handed to `sh -c`
pub fn compose_command_line(executable: &str, args: &str, nice: i32) -> String {
    let mut command_line = String::new();
    if nice != 0 {
        command_line.push_str(&format!("nice -n {nice} "));
    }

    if executable.contains(char::is_whitespace) {
        command_line.push('\'');
        command_line.push_str(&executable.replace('\'', r"'\''"));
        command_line.push('\'');
    } else {
        command_line.push_str(executable);
    }

    if !args.is_empty() {
        command_line.push(' ');
        command_line.push_str(args);
    }
    command_line
}

/// Spawn `/bin/sh -c <command_line>` with all three standard streams piped
pub fn spawn_shell(command_line: &str) -> io::Result<Child> {
    Command::new(SHELL)
        .arg("-c")
        .arg(command_line)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}

/// Write the payload and a newline to the child's stdin, then close it so the
/// child sees EOF. An empty payload only closes the stream. A child that exits
/// or closes stdin before reading everything is not an error.
async fn feed_stdin(stdin: Option<ChildStdin>, payload: &str) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    match write_payload(&mut stdin, payload).await {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("Child closed stdin before reading all of it");
        }
        Err(e) => warn!(error = %e, "Could not write child stdin"),
        Ok(()) => {}
    }
    Ok(())
}

async fn write_payload(stdin: &mut ChildStdin, payload: &str) -> io::Result<()> {
    if !payload.is_empty() {
        stdin.write_all(payload.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
    }
    stdin.shutdown().await
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>) -> io::Result<String> {
    let mut buffer = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buffer).await?;
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Exit code as a shell reports it: `128 + n` for a child killed by signal `n`
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Feed stdin while draining stdout and stderr independently, then wait for
/// the child to exit
pub async fn collect_output(mut child: Child, payload: &str) -> io::Result<CapturedOutput> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let ((), stdout, stderr, status) = tokio::try_join!(
        feed_stdin(stdin, payload),
        drain(stdout),
        drain(stderr),
        child.wait()
    )?;

    Ok(CapturedOutput {
        exit_code: exit_code(&status),
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_with_separator_are_verbatim() {
        assert_eq!(
            resolve_executable("./bin/unload", Path::new("/"), None),
            "./bin/unload"
        );
        assert_eq!(
            resolve_executable("/usr/bin/env", Path::new("/tmp"), None),
            "/usr/bin/env"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_current_directory_has_priority() {
        use std::os::unix::fs::PermissionsExt;

        let cwd = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        for dir in [cwd.path(), bin.path()] {
            let tool = dir.join("exptool");
            std::fs::write(&tool, "#!/bin/sh\n").unwrap();
            std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let path = std::env::join_paths([bin.path()]).unwrap();
        assert_eq!(
            resolve_executable("exptool", cwd.path(), Some(&path)),
            cwd.path().join("exptool").to_string_lossy()
        );

        let empty = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_executable("exptool", empty.path(), Some(&path)),
            bin.path().join("exptool").to_string_lossy()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_files_are_skipped() {
        let cwd = tempfile::tempdir().unwrap();
        std::fs::write(cwd.path().join("notes"), "plain text").unwrap();
        assert_eq!(resolve_executable("notes", cwd.path(), None), "notes");
    }

    #[test]
    fn test_unresolved_name_is_returned_unchanged() {
        let cwd = tempfile::tempdir().unwrap();
        let path = std::env::join_paths([cwd.path()]).unwrap();
        assert_eq!(
            resolve_executable("no-such-program", cwd.path(), Some(&path)),
            "no-such-program"
        );
    }

    #[test]
    fn test_compose_command_line() {
        assert_eq!(compose_command_line("/bin/echo", "a b", 0), "/bin/echo a b");
        assert_eq!(compose_command_line("true", "", 0), "true");
        assert_eq!(
            compose_command_line("/usr/bin/sqlldr", "control=x.ctl", 10),
            "nice -n 10 /usr/bin/sqlldr control=x.ctl"
        );
        assert_eq!(
            compose_command_line("/opt/my tools/run", "-x", 0),
            "'/opt/my tools/run' -x"
        );
    }

    #[tokio::test]
    async fn test_collect_output_separates_streams() {
        let child = spawn_shell("printf out; printf err >&2; exit 3").unwrap();
        let captured = collect_output(child, "").await.unwrap();
        assert_eq!(
            captured,
            CapturedOutput {
                exit_code: 3,
                stdout: "out".to_string(),
                stderr: "err".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_stdin_payload_then_eof() {
        let child = spawn_shell("cat").unwrap();
        let captured = collect_output(child, "scott/tiger@orcl").await.unwrap();
        assert_eq!(captured.exit_code, 0);
        assert_eq!(captured.stdout, "scott/tiger@orcl\n");
    }

    #[tokio::test]
    async fn test_large_output_on_both_streams_does_not_deadlock() {
        let child = spawn_shell(
            "i=0; while [ $i -lt 2000 ]; do echo 'stdout line stdout line stdout line'; \
             echo 'stderr line stderr line stderr line' >&2; i=$((i+1)); done",
        )
        .unwrap();
        let captured = collect_output(child, "").await.unwrap();
        assert_eq!(captured.exit_code, 0);
        assert_eq!(captured.stdout.lines().count(), 2000);
        assert_eq!(captured.stderr.lines().count(), 2000);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_exit_code() {
        let child = spawn_shell("kill -9 $$").unwrap();
        let captured = collect_output(child, "").await.unwrap();
        assert_eq!(captured.exit_code, 128 + 9);
    }

    #[tokio::test]
    async fn test_large_stdin_while_child_floods_stdout() {
        // the child fills the stdout pipe before it starts reading stdin
        let child = spawn_shell("head -c 200000 /dev/zero; wc -c").unwrap();
        let payload = "x".repeat(200_000);

        let captured = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            collect_output(child, &payload),
        )
        .await
        .expect("child should not deadlock on its pipes")
        .unwrap();

        assert_eq!(captured.exit_code, 0);
        assert_eq!(captured.stdout.matches('\0').count(), 200_000);
        assert!(captured.stdout.trim_end().ends_with("200001"));
    }

    #[tokio::test]
    async fn test_child_ignoring_stdin_is_not_an_error() {
        let child = spawn_shell("exit 0").unwrap();
        let payload = "x".repeat(200_000);
        let captured = collect_output(child, &payload).await.unwrap();
        assert_eq!(captured.exit_code, 0);
    }
}
