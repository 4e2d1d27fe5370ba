use std::io::{self, IsTerminal, Read};

use rc_backend::UpstreamClient;
use rc_core::batch::{run_ask, AskOutput};
use rc_core::config::Config;
use rc_core::http::serve;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("relaychat: streaming chat relay");
    println!();
    println!("Usage:");
    println!("  relaychat                     Serve the chat API (POST /api/chat)");
    println!("  relaychat ask \"message\"       Ask once and print the answer");
    println!("  echo \"message\" | relaychat ask  Ask once, message from stdin");
    println!();
    println!("Options:");
    println!("  --version         Print version");
    println!("  --help            Print this help");
    println!();
    println!("Environment:");
    println!("  RELAYCHAT_UPSTREAM_URL, RELAYCHAT_HOST, RELAYCHAT_PORT, RUST_LOG");
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_message(args: &[String]) -> String {
    if !args.is_empty() {
        return args.join(" ");
    }
    let mut buf = String::new();
    if !io::stdin().is_terminal() {
        let _ = io::stdin().read_to_string(&mut buf);
    }
    buf
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("relaychat {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let ask_mode = args.first().is_some_and(|a| a == "ask");
    init_tracing(if ask_mode { "warn" } else { "info" });

    let config = Config::load_or_default();

    let client = match UpstreamClient::new(&config.upstream.url, config.upstream.timeout()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    if ask_mode {
        let message = read_message(&args[1..]);
        let mut output = AskOutput::new(io::stdout(), io::stderr());
        let code = runtime.block_on(run_ask(client, &message, &mut output));
        std::process::exit(code);
    }

    if let Some(unknown) = args.first() {
        eprintln!("error: unknown argument '{unknown}'");
        eprintln!("hint: relaychat --help");
        std::process::exit(2);
    }

    tracing::info!(upstream = %client.url(), "starting relay server");
    if let Err(e) = runtime.block_on(serve(&config.server.bind_addr(), client)) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
