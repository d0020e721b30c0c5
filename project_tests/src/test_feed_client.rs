use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Prints every data_update pushed by a PollCast server", long_about = None)]
struct Args {
    /// WebSocket endpoint of the server
    #[clap(short, long, default_value = "ws://127.0.0.1:5001/ws")]
    url: String,

    /// Stop after this many frames (0 = run until the server closes)
    #[clap(short, long, default_value_t = 0)]
    max_frames: usize,
}

fn describe(frame: &Value) -> String {
    let Some(data) = frame.get("data").and_then(Value::as_object) else {
        return "frame without data".to_string();
    };
    let marker = data.get("last_updated").and_then(Value::as_str).unwrap_or("?");
    let groups: Vec<String> = data
        .iter()
        .filter_map(|(name, rows)| rows.as_array().map(|rows| format!("{}={}", name, rows.len())))
        .collect();
    format!("last_updated={} [{}]", marker, groups.join(", "))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (ws_stream, _) = connect_async(args.url.as_str()).await?;
    println!("Connected to {}", args.url);
    let (mut write, mut read) = ws_stream.split();

    let mut frames = 0usize;
    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => {
                let frame: Value = serde_json::from_str(text.as_str())?;
                let event = frame.get("event").and_then(Value::as_str).unwrap_or("?");
                frames += 1;
                println!("[{}] {} {}", frames, event, describe(&frame));
                if args.max_frames > 0 && frames >= args.max_frames {
                    write.send(Message::Close(None)).await?;
                    break;
                }
            }
            Message::Close(_) => {
                println!("Server closed the connection");
                break;
            }
            _ => {}
        }
    }

    println!("Received {} frame(s)", frames);
    Ok(())
}
