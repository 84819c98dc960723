//! # Grid Map Client Library
//!
//! Client side of a small multiplayer grid map. Each connected player owns
//! one avatar on a 40×25 grid; the server relays every join, move,
//! reconnect and departure to all clients, and this library keeps a local
//! view of who is where.
//!
//! ## Architecture Overview
//!
//! Inbound text frames flow through one pipeline:
//!
//! ```text
//! WebSocket ──> FrameDecoder ──> MessageRouter ──> Roster ──> TextRenderer
//!               (dialect)        (dispatch)        (reconcile)
//! ```
//!
//! ### Roster Reconciliation
//! The server's stream is noisy: the same person can appear under several ids
//! after reconnecting and snapshots can carry stale entries. The
//! [`roster::Roster`] collapses records sharing a display name after every
//! snapshot and reconnect, keeps every position inside the grid, and never
//! deletes a player who leaves. Records are not unique by id: `add` appends
//! even when the id is already known. A move for an id nobody has announced
//! is a no-op.
//!
//! ### Message Routing
//! [`router::MessageRouter`] classifies each frame by its `type` field and
//! invokes the matching roster operation for it; snapshots and reconnects are
//! followed by a deduplication pass. Undecodable frames are logged and
//! dropped; nothing a server sends can end the session.
//!
//! ## Module Organization
//!
//! ### Roster Module (`roster`)
//! - The [`roster::Reconciler`] operations and the `Roster` that implements them
//! - Name-based deduplication and reconnect rebinding
//! - The operator's own avatar and the highlighted player
//!
//! ### Router Module (`router`)
//! - Frame classification and dispatch to a `Reconciler`
//!
//! ### Game Module (`game`)
//! - [`game::GameSession`]: roster, router and connection status for one run
//! - Validation of the operator's own moves
//!
//! ### Identity Module (`identity`)
//! - Operator id generation and the JSON identity file
//!
//! ### Input Module (`input`)
//! - Terminal command parsing and the stdin reader task
//!
//! ### Network Module (`network`)
//! - WebSocket connection, reconnect policy and the command loop
//!
//! ### Rendering Module (`rendering`)
//! - Text rendition of the grid, the player list and the status line
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::game::GameSession;
//! use client::identity::Operator;
//! use client::network::{Client, ClientConfig, ReconnectPolicy};
//! use client::router::MessageRouter;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let session = GameSession::new(Operator::generate(), MessageRouter::default());
//! let config = ClientConfig {
//!     server_url: "ws://127.0.0.1:8000/ws".to_string(),
//!     reconnect: ReconnectPolicy::default(),
//! };
//!
//! let (commands, mut rx) = tokio::sync::mpsc::channel(32);
//! client::input::spawn_stdin_reader(commands);
//!
//! let mut client = Client::new(config, session, None);
//! client.run(&mut rx).await?;
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod identity;
pub mod input;
pub mod network;
pub mod rendering;
pub mod roster;
pub mod router;
