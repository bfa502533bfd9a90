//! Hosts one poker table.
//!
//! Accepts TCP clients, hands them to the felt server, and reads host
//! commands from stdin:
//!
//! ```text
//! start          deal the first hand with everyone seated
//! kick <name>    remove a player
//! players        list who is seated
//! quit           stop the server
//! ```

use std::time::Duration;

use clap::Parser;
use felt::prelude::*;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Relays game payloads between players without interpreting them.
///
/// Stands in for the poker engine so clients can be tested end to end.
struct RelayTable;

impl GameLogic for RelayTable {
    type State = u64;
    type ClientMessage = Value;
    type ServerMessage = Value;

    fn init(config: &GameData, seats: &[Seat], start: &StartData) -> u64 {
        tracing::info!(
            players = seats.len(),
            dealer = %start.dealer,
            small_blind = config.small_blind,
            big_blind = config.big_blind(),
            "dealing first hand"
        );
        0
    }

    fn handle_message(
        relayed: &mut u64,
        _seats: &mut [Seat],
        sender: PlayerId,
        msg: Value,
    ) -> Vec<(Recipient, Value)> {
        *relayed += 1;
        vec![(
            Recipient::AllExcept(sender),
            serde_json::json!({ "from": sender.0, "msg": msg }),
        )]
    }

    fn on_player_left(
        _relayed: &mut u64,
        seats: &mut [Seat],
        player: PlayerId,
    ) -> Vec<(Recipient, Value)> {
        let remaining = seats.iter().filter(|s| s.active).count();
        vec![(
            Recipient::All,
            serde_json::json!({ "folded": player.0, "remaining": remaining }),
        )]
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to listen on
    #[clap(short, long, default_value = "127.0.0.1:4711")]
    bind: String,
    /// Table password; empty means open table
    #[clap(short, long, default_value = "")]
    password: String,
    /// Seats at the table
    #[clap(long, default_value = "10")]
    max_players: usize,
    /// Chips each player starts with
    #[clap(long, default_value = "3000")]
    start_money: u32,
    /// Seconds a removed client stays connected so its last packets flush
    #[clap(long, default_value = "10")]
    close_grace: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = ServerConfig {
        close_grace: Duration::from_secs(args.close_grace),
        ..ServerConfig::default()
    };
    config.game.max_players = args.max_players;
    config.game.start_money = args.start_money;

    let (server, handle) = FeltServer::<TcpConnection, RelayTable, PasswordAuthenticator>::builder()
        .config(config)
        .build::<TcpConnection, RelayTable, _>(PasswordAuthenticator::new(args.password));

    let transport = TcpTransport::bind(&args.bind).await?;
    tracing::info!(addr = %transport.local_addr()?, "table open");

    let acceptor = handle.clone();
    tokio::spawn(async move {
        loop {
            match transport.accept().await {
                Ok(conn) => {
                    if acceptor.add_connection(conn).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, os_code = ?e.raw_os_error(), "accept failed"),
            }
        }
    });

    let commands = handle.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !run_command(&commands, line.trim()) {
                break;
            }
        }
        commands.stop();
    });

    server.run().await?;
    Ok(())
}

/// Executes one host command. Returns `false` when the host quits.
fn run_command(handle: &ServerHandle<TcpConnection>, line: &str) -> bool {
    let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
    let queued = match command {
        "start" => handle.start_game(),
        "kick" if !arg.trim().is_empty() => handle.kick_player(arg.trim()),
        "players" => {
            for player in handle.players() {
                println!("seat {:>2}  {}  {}", player.seat, player.id, player.name);
            }
            println!("{} seated", handle.player_count());
            Ok(())
        }
        "quit" | "exit" => return false,
        "" => Ok(()),
        other => {
            println!("unknown command: {other} (start, kick <name>, players, quit)");
            Ok(())
        }
    };
    if let Err(e) = queued {
        tracing::warn!(error = %e, "command not delivered");
        return false;
    }
    true
}
