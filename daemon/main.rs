// hl7-daemon: receive, acknowledge and print HL7 messages
use std::process::ExitCode;

use clap::Parser;
use tracing::warn;

use hl7_core::Message;
use hl7_listener::MllpListener;

#[derive(Parser)]
#[command(name = "hl7-daemon", about = "MLLP listener daemon")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 2575)]
    port: u16,

    /// Receive without sending acknowledgments
    #[arg(long)]
    no_ack: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut listener = MllpListener::new(args.port);
    listener.set_ack(!args.no_ack);
    if let Err(e) = listener.start() {
        eprintln!("cannot listen on port {}: {}", args.port, e);
        return ExitCode::FAILURE;
    }

    println!(
        "hl7-daemon listening on port {}",
        listener.local_port().unwrap_or(args.port)
    );

    // Lazy, unbounded sequence; ends only when the listener stops.
    while let Some(raw) = listener.recv() {
        let received = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");
        match Message::parse(&raw) {
            Ok(msg) => {
                println!(
                    "{} {:>10} {}^{} ts={} segments=[{}]",
                    received,
                    msg.control_id(),
                    msg.message_type(),
                    msg.trigger_event(),
                    msg.timestamp(),
                    msg.segment_types().join(","),
                );
            }
            Err(e) => {
                // Bad message: log and keep serving.
                warn!("unparseable message ({} bytes): {}", raw.len(), e);
            }
        }
    }

    ExitCode::SUCCESS
}
