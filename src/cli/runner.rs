use log::{ info, warn };
use std::error::Error;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt };

use crate::error::SubmitError;
use crate::session::{ ConversationSession, Reply };
use crate::speech::SpeechRecorder;

fn render(outcome: &Result<Reply, SubmitError>) -> String {
    match outcome {
        Ok(Reply::Generated(text)) => text.clone(),
        Ok(Reply::Skipped) => "(no input, continuing)".to_string(),
        Err(e) => e.display_message(),
    }
}

/// Submits each line read from `input` and writes the reply, or the inline
/// error, to `output`. Returns the number of lines sent to the backend;
/// blank lines are settled by the empty-input policy and not counted.
pub async fn run_typed<R, W>(
    session: &ConversationSession,
    input: R,
    mut output: W
) -> Result<usize, Box<dyn Error + Send + Sync>>
    where R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin
{
    let mut lines = input.lines();
    let mut submitted = 0;
    while let Some(line) = lines.next_line().await? {
        let blank = line.trim().is_empty();
        if !blank {
            output.write_all(b"Generating response...\n").await?;
        }
        let outcome = session.submit(&line).await;
        if !blank {
            submitted += 1;
        }
        output.write_all(render(&outcome).as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    info!("Input closed after {} submissions", submitted);
    Ok(submitted)
}

/// Records one take from the speech capability and submits the finalized
/// transcript.
pub async fn run_speech<W>(
    session: &ConversationSession,
    recorder: &mut SpeechRecorder,
    mut output: W
) -> Result<Option<Reply>, Box<dyn Error + Send + Sync>>
    where W: AsyncWrite + Unpin
{
    if let Err(e) = recorder.start().await {
        warn!("Speech capture unavailable: {}", e);
        output.write_all(format!("{}\n", e.display_message()).as_bytes()).await?;
        return Ok(None);
    }
    recorder.record_until_end().await;
    output.write_all(format!("{}\n", recorder.status()).as_bytes()).await?;

    let transcript = match recorder.take_transcript() {
        Ok(text) => text,
        Err(e) => {
            output.write_all(format!("{}\n", recorder.status()).as_bytes()).await?;
            info!("Nothing submitted from speech: {}", e);
            return Ok(None);
        }
    };

    output.write_all(format!("You said: {}\n", transcript).as_bytes()).await?;
    let outcome = session.submit(&transcript).await;
    output.write_all(format!("{}\n", render(&outcome)).as_bytes()).await?;
    output.flush().await?;
    Ok(outcome.ok())
}
