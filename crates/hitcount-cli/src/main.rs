#![forbid(unsafe_code)]

//! # Hitcount
//!
//! ## Usage
//!
//! ```bash
//! hitcount --work-item bug.json --field Custom.HitCount        # edit the count
//! hitcount --work-item bug.json --field Custom.HitCount show   # print it
//! ```

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Context;
use hitcount::host::{FormHost, coerce_field_value};
use hitcount::runtime::{Message, Model, Program};
use hitcount::{FormControl, LoadedMsg, UnloadedMsg, WidgetOptions};
use hitcount_cli::workitem::{self, FileHost};
use hitcount_cli::{App, Cli, Command, logging, options};
use tracing::info;

const WATCH_INTERVAL: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    logging::init(cli.log_file.as_deref(), cli.log_filter())?;

    let options = options::load(cli.options.as_deref())?;
    let host = FileHost::open(&cli.work_item, &cli.field)
        .with_context(|| format!("cannot open work item {}", cli.work_item.display()))?
        .offline(cli.offline)
        .unavailable_for(cli.unavailable_for);

    match cli.command() {
        Command::Show => {
            let binding = host.configuration().binding()?;
            let value = host.work_item().value(binding.as_str());
            println!("{}", coerce_field_value(&value));
            Ok(())
        }
        Command::Run => run(Arc::new(host), options),
    }
}

fn run(host: Arc<FileHost>, options: WidgetOptions) -> anyhow::Result<()> {
    let title = format!("Work item {}", host.work_item().id);
    let (tx, rx) = mpsc::channel();
    tx.send(Message::new(LoadedMsg))
        .map_err(|err| anyhow::anyhow!("{err}"))
        .context("cannot queue load notification")?;
    let watcher = workitem::watch(Arc::clone(&host), WATCH_INTERVAL, tx);

    let form = FormControl::new(host, options);
    let result = Program::new(App::new(form, title))
        .with_input_receiver(rx)
        .run();
    watcher.stop();

    let mut app = result?;
    let _ = app.update(Message::new(UnloadedMsg));
    info!("hitcount exited");
    Ok(())
}
