use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::debug;

use crate::error::TurnError;
use crate::inference::InferenceClient;
use crate::model::Message;
use crate::session::{Session, TurnReply};

const EXIT_COMMAND: &str = "exit";
const HISTORY_COMMAND: &str = "/history";
const SEPARATOR_WIDTH: usize = 50;

pub fn write_banner<W>(out: &mut W, model: &str) -> Result<()>
where
    W: Write + ?Sized,
{
    writeln!(out, "Hugging Face Chat Bot Initialized! Type 'exit' to quit.")?;
    writeln!(out, "model: {model}")?;
    writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
    out.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Reads questions from `input` until `exit` or end of input.
///
/// Model failures are reported and the loop continues; failing to write
/// output or read input ends it with an error.
pub async fn run_repl<C, R, W>(session: &mut Session<C>, mut input: R, out: &mut W) -> Result<()>
where
    C: InferenceClient,
    R: BufRead,
    W: Write + ?Sized,
{
    loop {
        write!(out, "You: ")?;
        out.flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read stdin")?;
        if read == 0 {
            debug!("input closed, leaving chat loop");
            break;
        }

        let prompt = line.trim_end_matches(['\r', '\n']);
        if prompt.eq_ignore_ascii_case(EXIT_COMMAND) {
            break;
        }
        if prompt.eq_ignore_ascii_case(HISTORY_COMMAND) {
            print_history(out, session.history().messages())?;
            continue;
        }

        match session.run_turn(prompt, out).await {
            Ok(reply) => print_reply(out, &reply, session.template().final_answer_key())?,
            Err(TurnError::Invocation(err)) => {
                writeln!(out, "\nAn error occurred during the API call: {err}")?;
            }
            Err(err @ TurnError::Output(_)) => return Err(err.into()),
        }
    }

    Ok(())
}

/// Prints the reasoning and final-answer sections after the streamed text.
pub fn print_reply<W>(out: &mut W, reply: &TurnReply, final_answer_key: &str) -> Result<()>
where
    W: Write + ?Sized,
{
    writeln!(out, "\n")?;
    writeln!(out, "\n--- Reasoning ---")?;
    writeln!(out, "{}", reply.split.reasoning)?;
    writeln!(out, "\n--- {final_answer_key} ---")?;
    writeln!(out, "{}", reply.split.final_answer)?;
    writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
    out.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn print_history<W>(out: &mut W, history: &[Message]) -> Result<()>
where
    W: Write + ?Sized,
{
    if history.is_empty() {
        writeln!(out, "(history is empty)\n")?;
        return Ok(());
    }

    for (idx, msg) in history.iter().enumerate() {
        writeln!(out, "[{}] {}: {}", idx, msg.role.as_str(), msg.content)?;
    }
    writeln!(out)?;
    Ok(())
}
