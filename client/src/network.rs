use crate::game::{ConnectionStatus, GameSession};
use crate::identity::IdentityStore;
use crate::input::{Command, HELP};
use crate::rendering::TextRenderer;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::ClientMessage;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How hard to try getting a lost connection back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts before giving up.
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub reconnect: ReconnectPolicy,
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionEnd {
    Quit,
    /// Server closed with code 1000; no reconnect.
    CleanClose,
    Lost(String),
}

enum Flow {
    Continue,
    Send(ClientMessage),
    Quit,
}

pub struct Client {
    config: ClientConfig,
    session: GameSession,
    identity_store: Option<IdentityStore>,
    renderer: TextRenderer,
}

impl Client {
    pub fn new(
        config: ClientConfig,
        session: GameSession,
        identity_store: Option<IdentityStore>,
    ) -> Self {
        Self {
            config,
            session,
            identity_store,
            renderer: TextRenderer::new(),
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn into_session(self) -> GameSession {
        self.session
    }

    /// Connects and keeps the session going until the operator quits, the
    /// server closes cleanly, or the reconnect budget is spent.
    pub async fn run(
        &mut self,
        commands: &mut mpsc::Receiver<Command>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut failures = 0u32;

        loop {
            self.session.set_status(ConnectionStatus::Connecting);
            info!("Connecting to {}", self.config.server_url);

            match connect_async(self.config.server_url.as_str()).await {
                Ok((ws, _response)) => {
                    failures = 0;
                    self.session.set_status(ConnectionStatus::Connected);

                    match self.run_connection(ws, commands).await {
                        ConnectionEnd::Quit => {
                            self.session.set_status(ConnectionStatus::Disconnected);
                            return Ok(());
                        }
                        ConnectionEnd::CleanClose => {
                            info!("Server closed the connection");
                            self.session.set_status(ConnectionStatus::Disconnected);
                            return Ok(());
                        }
                        ConnectionEnd::Lost(reason) => warn!("Connection lost: {}", reason),
                    }
                }
                Err(e) => error!("Failed to connect to {}: {}", self.config.server_url, e),
            }

            self.session.set_status(ConnectionStatus::Disconnected);
            failures += 1;
            if failures > self.config.reconnect.attempts {
                return Err(format!(
                    "giving up on {} after {} reconnect attempts",
                    self.config.server_url, self.config.reconnect.attempts
                )
                .into());
            }

            info!(
                "Reconnecting in {:?} (attempt {}/{})",
                self.config.reconnect.interval, failures, self.config.reconnect.attempts
            );
            if !self.wait_for_retry(commands).await {
                return Ok(());
            }
        }
    }

    /// Sleeps out the reconnect interval while still serving local commands.
    /// Returns false if the operator quit meanwhile.
    async fn wait_for_retry(&mut self, commands: &mut mpsc::Receiver<Command>) -> bool {
        let deadline = sleep(self.config.reconnect.interval);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => return true,
                command = commands.recv() => {
                    match self.handle_command(command.unwrap_or(Command::Quit)) {
                        Flow::Quit => return false,
                        Flow::Send(_) => debug!("Dropping outbound message while offline"),
                        Flow::Continue => {}
                    }
                }
            }
        }
    }

    async fn run_connection(
        &mut self,
        ws: WsStream,
        commands: &mut mpsc::Receiver<Command>,
    ) -> ConnectionEnd {
        let (mut write, mut read) = ws.split();

        if let Some(join) = self.session.join_message() {
            if let Err(e) = send(&mut write, &join).await {
                return ConnectionEnd::Lost(e);
            }
            self.save_identity();
        }

        let mut close_code: Option<CloseCode> = None;

        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let routed = self.session.handle_text_frame(&text);
                        debug!("Frame handled: {:?}", routed);
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        debug!("Dropping binary frame of {} bytes", bytes.len());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        self.session.set_status(ConnectionStatus::Closing);
                        close_code = Some(frame.map(|f| f.code).unwrap_or(CloseCode::Status));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) if close_code.is_none() => {
                        return ConnectionEnd::Lost(e.to_string());
                    }
                    Some(Err(_)) | None => {
                        return match close_code {
                            Some(CloseCode::Normal) => ConnectionEnd::CleanClose,
                            Some(code) => {
                                ConnectionEnd::Lost(format!("closed with code {}", u16::from(code)))
                            }
                            None => ConnectionEnd::Lost("stream ended".to_string()),
                        };
                    }
                },

                command = commands.recv() => {
                    match self.handle_command(command.unwrap_or(Command::Quit)) {
                        Flow::Continue => {}
                        Flow::Send(message) => {
                            if let Err(e) = send(&mut write, &message).await {
                                return ConnectionEnd::Lost(e);
                            }
                        }
                        Flow::Quit => {
                            self.session.set_status(ConnectionStatus::Closing);
                            let frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: "".into(),
                            };
                            if let Err(e) = write.send(Message::Close(Some(frame))).await {
                                debug!("Close frame not delivered: {}", e);
                            }
                            return ConnectionEnd::Quit;
                        }
                    }
                },
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Move { x, y } => match self.session.request_move(x, y) {
                Ok(message) => return Flow::Send(message),
                Err(reason) => println!("cannot move: {}", reason),
            },
            Command::At { x, y } => {
                let here = self.session.roster().players_at(x, y);
                if here.is_empty() {
                    println!("nobody at ({}, {})", x, y);
                }
                for player in here {
                    println!(
                        "{} ({}){}",
                        player.display_name(),
                        player.id,
                        if player.online { "" } else { " [offline]" }
                    );
                }
            }
            Command::List => {
                for line in self.renderer.render_players(self.session.roster()) {
                    println!("{}", line);
                }
                self.print_status();
            }
            Command::Map => {
                for line in self.renderer.render_grid(self.session.roster()) {
                    println!("{}", line);
                }
                self.print_status();
            }
            Command::Highlight(None) => self.session.roster_mut().set_highlighted(None),
            Command::Highlight(Some(name)) => {
                let id = self
                    .session
                    .roster()
                    .find_by_name(&name)
                    .map(|p| p.id.clone());
                match id {
                    Some(id) => self.session.roster_mut().set_highlighted(Some(id)),
                    None => println!("no player named {}", name),
                }
            }
            Command::Dedup => {
                let removed = self.session.roster_mut().deduplicate();
                println!("removed {} duplicate players", removed);
            }
            Command::Sync => {
                self.session.roster_mut().sync_current_player();
                self.print_status();
            }
            Command::Purge => {
                self.session.roster_mut().purge();
                if let Some(store) = &self.identity_store {
                    if let Err(e) = store.erase() {
                        error!("{}", e);
                    }
                }
                println!("identity and players cleared; restart to join again");
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn print_status(&self) {
        println!(
            "{}",
            self.renderer
                .render_status(self.session.roster(), self.session.status())
        );
    }

    fn save_identity(&self) {
        if let (Some(store), Some(operator)) = (&self.identity_store, self.session.roster().operator())
        {
            if let Err(e) = store.save(operator) {
                error!("{}", e);
            }
        }
    }
}

async fn send<S>(write: &mut S, message: &ClientMessage) -> Result<(), String>
where
    S: futures_util::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = message.to_json().map_err(|e| e.to_string())?;
    debug!("Sending {}", json);
    write.send(Message::Text(json)).await.map_err(|e| e.to_string())
}
