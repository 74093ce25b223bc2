#![forbid(unsafe_code)]

//! fglk-harness binary entry point.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use fglk_harness::cli::Opts;
use fglk_harness::{DemoVm, Host};
use fglk_runtime::Session;
use fglk_web::transcript::{StanzaReader, TranscriptRecorder, render_text};
use fglk_web::{WebError, WebSession};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("Invalid --log filter {filter:?}: {err}; using 'warn'");
        EnvFilter::new("warn")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn render(path: &std::path::Path) -> Result<(), WebError> {
    let reader = BufReader::new(File::open(path)?);
    let stanzas = StanzaReader::new(reader).collect::<Result<Vec<_>, _>>()?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(render_text(&stanzas).as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn recorder(opts: &Opts) -> Result<Option<TranscriptRecorder<Box<dyn Write>>>, WebError> {
    let Some(path) = &opts.transcript else {
        return Ok(None);
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let session_id = opts.session_id.clone().unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().to_string())
            .unwrap_or_default()
    });
    let out: Box<dyn Write> = Box::new(BufWriter::new(file));
    let mut recorder = TranscriptRecorder::new(out, session_id);
    if let Some(label) = &opts.label {
        recorder = recorder.with_label(label.clone());
    }
    let metadata = BTreeMap::from([("title".to_owned(), "Glk Harness".to_owned())]);
    recorder.record_metadata(0, metadata)?;
    Ok(Some(recorder))
}

fn run(opts: &Opts) -> Result<(), WebError> {
    let mut web = WebSession::new(Session::new(DemoVm::new()));
    if let Some(recorder) = recorder(opts)? {
        web = web.with_recorder(recorder);
    }

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "stdin read failed");
                    break;
                }
            }
        }
    });

    let mut host = Host::new(web, io::stdout());
    host.run(&rx)
}

fn main() {
    let opts = Opts::parse();
    init_logging(&opts.log);

    let result = match &opts.render_transcript {
        Some(path) => render(path),
        None => run(&opts),
    };
    if let Err(err) = result {
        error!(error = %err, "harness failed");
        eprintln!("fglk-harness: {err}");
        std::process::exit(1);
    }
}
