//! Obtaining the source reference from the command line or the terminal.

use imgup_core::{Error, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Prompt shown when no input was given on the command line.
pub const PROMPT: &str = "Enter image path or URL: ";

/// Returns the command-line input, or prompts for one on stdin.
///
/// # Errors
///
/// Returns an [`InvalidInput`] error if the answer is blank.
///
/// [`InvalidInput`]: imgup_core::ErrorKind::InvalidInput
pub async fn resolve_input(arg: Option<&str>) -> Result<String> {
    if let Some(arg) = arg.filter(|arg| !arg.trim().is_empty()) {
        return Ok(arg.to_owned());
    }

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    prompt_line(&mut stdin, &mut stdout).await
}

/// Writes [`PROMPT`] to `writer` and reads one line from `reader`.
pub async fn prompt_line<R, W>(reader: &mut R, writer: &mut W) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(PROMPT.as_bytes()).await?;
    writer.flush().await?;

    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let line = line.trim();
    if line.is_empty() {
        return Err(Error::invalid_input().with_message("no image path or URL given"));
    }
    Ok(line.to_owned())
}
