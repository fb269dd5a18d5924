// hl7-send: send the messages in a file to an MLLP endpoint
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hl7_client::MllpSender;
use hl7_core::batch;

#[derive(Parser)]
#[command(name = "hl7-send", about = "Send HL7 messages over MLLP")]
struct Args {
    /// Remote host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Remote port
    #[arg(long)]
    port: u16,

    /// File holding one or more HL7 messages
    #[arg(long)]
    file: PathBuf,

    /// Do not wait for acknowledgments
    #[arg(long)]
    no_ack: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let text = match fs::read_to_string(&args.file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("cannot read {}: {}", args.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let messages = batch::split_default(&text);
    if messages.is_empty() {
        eprintln!("no messages found in {}", args.file.display());
        return ExitCode::FAILURE;
    }

    let mut sender = MllpSender::new(&args.host, args.port);
    sender.expect_ack(!args.no_ack);
    if let Err(e) = sender.start() {
        eprintln!("cannot connect to {}:{}: {}", args.host, args.port, e);
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for (i, message) in messages.iter().enumerate() {
        match sender.send(message) {
            Ok(Some(ack)) => println!("message {}: {}", i + 1, ack.trim_end()),
            Ok(None) => println!("message {}: sent", i + 1),
            Err(e) => {
                eprintln!("message {}: send failed: {}", i + 1, e);
                failed = true;
                break;
            }
        }
    }

    let _ = sender.stop();
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
