pub mod config;
pub mod error;
pub mod inference;
pub mod logging;
pub mod model;
pub mod prompt;
pub mod providers;
pub mod repl;
pub mod session;
pub mod splitter;

use anyhow::{Context, Result};
use std::env;
use std::io::{self, Write};
use tracing::info;

use config::Config;
use providers::huggingface::HfInferenceClient;
use repl::{print_reply, run_repl, write_banner};
use session::Session;

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cfg = Config::from_env()?;
    let client = HfInferenceClient::new(&cfg).context("Error initializing inference client")?;
    info!(
        model = %cfg.model,
        api_url = %client.api_url(),
        max_tokens = cfg.max_tokens,
        temperature = cfg.temperature,
        timeout_secs = ?cfg.model_timeout_secs,
        failed_turn_policy = cfg.failed_turn_policy.as_str(),
        "loaded runtime configuration"
    );

    let mut session = Session::from_config(client, &cfg);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        write_banner(&mut out, session.model())?;
        run_repl(&mut session, io::stdin().lock(), &mut out).await
    } else {
        let prompt = args.join(" ");
        let reply = session.run_turn(&prompt, &mut out).await?;
        print_reply(&mut out, &reply, session.template().final_answer_key())?;
        out.flush().context("Failed to flush stdout")?;
        Ok(())
    }
}
