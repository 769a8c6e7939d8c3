use std::{future::Future, path::PathBuf, time::Duration};

use anyhow::Result;
use futures::{stream::SplitSink, SinkExt, StreamExt};
use re4ap_lib::{
    bridge::{Bridge, ClientStatus},
    locations::to_local_id,
};
use tokio::{net::TcpStream, time::sleep};
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{protocol::WebSocketConfig, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::{
    protocol::{encode_frame, parse_frame, ClientMessage},
    session::{Action, Session},
};

const MONITOR_INTERVAL: Duration = Duration::from_millis(250);
const ITEM_BATCH_INTERVAL: Duration = Duration::from_millis(150);
const ITEM_BATCHES_PER_TICK: usize = 5;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub server: String,
    pub slot: String,
    pub password: String,
    pub save_path: PathBuf,
}

pub fn server_url(server: &str) -> String {
    let server = server.trim();
    if server.starts_with("ws") {
        server.to_owned()
    } else {
        format!("wss://{}", server)
    }
}

fn write_status(bridge: &Bridge, status: ClientStatus) {
    if let Err(err) = bridge.write_status(status) {
        warn!("failed to write status: {}", err);
    }
}

async fn send(sink: &mut WsSink, message: &ClientMessage) -> Result<()> {
    let frame = encode_frame(message)?;
    debug!("send: {}", frame);
    sink.send(Message::Text(frame)).await?;
    Ok(())
}

async fn apply(actions: Vec<Action>, sink: &mut WsSink, bridge: &Bridge) -> Result<()> {
    for action in actions {
        match action {
            Action::Send(message) => send(sink, &message).await?,
            Action::Status(status) => write_status(bridge, status),
        }
    }
    Ok(())
}

/// Writes queued items to the game inbox. Items stay queued when the write fails.
fn deliver_items(session: &mut Session, bridge: &Bridge) -> bool {
    let items = session.take_pending_items();
    if items.is_empty() {
        return true;
    }
    let ids: Vec<i64> = items
        .iter()
        .map(|pending| to_local_id(pending.item))
        .collect();
    match bridge.append_items(&ids) {
        Ok(()) => {
            for pending in &items {
                info!("Sent to game: {}", session.item_name(pending.item));
            }
            session.mark_delivered(&items);
            true
        }
        Err(err) => {
            warn!("failed to write items: {}", err);
            session.requeue_items(items);
            false
        }
    }
}

async fn monitor_files(session: &mut Session, bridge: &Bridge, sink: &mut WsSink) -> Result<()> {
    match bridge.take_locations() {
        Ok(locations) if !locations.is_empty() => {
            let actions = session.check_locations(&locations);
            apply(actions, sink, bridge).await?;
        }
        Ok(_) => {}
        Err(err) => warn!("failed to read locations: {}", err),
    }

    for batch in 0..ITEM_BATCHES_PER_TICK {
        if !session.has_pending_items() {
            break;
        }
        if batch > 0 {
            sleep(ITEM_BATCH_INTERVAL).await;
        }
        if !deliver_items(session, bridge) {
            break;
        }
    }
    Ok(())
}

async fn pump(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    session: &mut Session,
    bridge: &Bridge,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let (mut sink, mut stream) = ws.split();
    let mut ticker = tokio::time::interval(MONITOR_INTERVAL);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                let _ = sink.close().await;
                return Ok(());
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                    Ok(messages) => {
                        for message in messages {
                            let actions = session.handle(message);
                            apply(actions, &mut sink, bridge).await?;
                        }
                    }
                    Err(err) => warn!("{}", err),
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("Server closed the connection: {:?}", frame);
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(()),
            },
            _ = ticker.tick() => {
                if session.is_connected() {
                    monitor_files(session, bridge, &mut sink).await?;
                }
            }
        }
    }
}

/// Runs one websocket session until the server closes it or `shutdown` resolves.
pub async fn run(options: ClientOptions, shutdown: impl Future<Output = ()>) -> Result<()> {
    let bridge = Bridge::new(options.save_path.clone());
    write_status(&bridge, ClientStatus::Connecting);

    let url = server_url(&options.server);
    info!("Connecting to {}", url);
    let mut config = WebSocketConfig::default();
    config.max_message_size = None;
    config.max_frame_size = None;
    let ws = match connect_async_with_config(url.as_str(), Some(config), false).await {
        Ok((ws, _)) => ws,
        Err(err) => {
            write_status(&bridge, ClientStatus::Disconnected);
            return Err(err.into());
        }
    };
    let mut session = Session::new(options.slot, options.password);
    let result = pump(ws, &mut session, &bridge, shutdown).await;
    if let Err(err) = &result {
        error!("Connection error: {}", err);
    }
    info!(
        "Disconnected, goal modes completed: {}/{}",
        session.completed_goal_modes().len(),
        session.goal_modes().len()
    );
    write_status(&bridge, ClientStatus::Disconnected);
    result
}
