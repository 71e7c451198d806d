use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use shared::{ClientPacket, ServerPacket};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::{interval, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Headless bot that joins a server, walks back and forth and edits one block
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short, long, default_value = "ws://127.0.0.1:3000")]
    server: String,
    /// Display name to join with
    #[arg(short, long, default_value = "bot")]
    name: String,
    /// How long to stay connected
    #[arg(long, default_value = "10")]
    seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let (ws_stream, _) = connect_async(args.server.as_str()).await?;
    info!("Connected to {}", args.server);
    let (mut write, mut read) = ws_stream.split();

    let join = ClientPacket::Join {
        name: args.name.clone(),
    };
    write.send(Message::Text(join.to_json()?)).await?;

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let mut move_timer = interval(Duration::from_millis(50));
    let mut my_id = None;
    let mut position = (300.0, 50.0);
    let mut step = 5.0;
    let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("Connection error: {}", e);
                        break;
                    }
                    None => break,
                };

                let packet = match ServerPacket::from_json(&text) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Unparseable server message: {}", e);
                        continue;
                    }
                };
                *counts.entry(packet.kind()).or_insert(0) += 1;

                if let ServerPacket::YourId { id } = packet {
                    info!("Joined as player {}", id);
                    my_id = Some(id);

                    let block = (id as i64 % 30, 19);
                    let place = ClientPacket::PlaceBlock {
                        x: block.0,
                        y: block.1,
                        color: shared::player_color(id).to_string(),
                    };
                    write.send(Message::Text(place.to_json()?)).await?;
                }
            }
            _ = move_timer.tick(), if my_id.is_some() => {
                position.0 += step;
                if !(150.0..450.0).contains(&position.0) {
                    step = -step;
                }
                let movement = ClientPacket::MovePlayer { x: position.0, y: position.1 };
                write.send(Message::Text(movement.to_json()?)).await?;
            }
        }
    }

    if let Some(id) = my_id {
        let delete = ClientPacket::DeleteBlock {
            x: id as i64 % 30,
            y: 19,
        };
        write.send(Message::Text(delete.to_json()?)).await?;
    }
    let _ = write.close().await;

    for (kind, count) in &counts {
        info!("Received {} {}", count, kind);
    }

    Ok(())
}
