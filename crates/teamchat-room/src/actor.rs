//! Service actor: the single task that owns the [`ChatService`].
//!
//! Every chat event from every connection goes through one mpsc channel
//! and is applied to completion before the next one starts. That is the
//! whole concurrency story: no locks, no interleaving mid-mutation, and
//! broadcasts reflect the order the actor processed events in.

use std::panic::{catch_unwind, AssertUnwindSafe};

use teamchat_protocol::{Ack, ConnectionId, Request, TeamCode, TeamMap};
use tokio::sync::{mpsc, oneshot};

use crate::{ChatService, Outbox, RoomError, RoomInfo};

/// Commands sent to the service actor.
///
/// Variants carrying a `oneshot::Sender` expect exactly one reply.
enum ServiceCommand {
    /// Register a connection and its outbox.
    Connect { conn: ConnectionId, outbox: Outbox },

    /// Apply one client request and reply with its ack.
    Request {
        conn: ConnectionId,
        request: Request,
        reply: oneshot::Sender<Ack>,
    },

    /// Close a connection's session.
    Disconnect { conn: ConnectionId },

    /// Register a team outside of any connection.
    CreateTeam {
        custom_code: Option<String>,
        reply: oneshot::Sender<Result<TeamCode, RoomError>>,
    },

    /// Snapshot of the registry.
    ListTeams { reply: oneshot::Sender<TeamMap> },

    /// Snapshot of one room.
    RoomInfo {
        code: TeamCode,
        reply: oneshot::Sender<Option<RoomInfo>>,
    },

    /// Stop the actor.
    Shutdown,
}

/// Handle to the running service actor.
///
/// Cheap to clone; every connection handler holds one.
#[derive(Clone)]
pub struct ServiceHandle {
    sender: mpsc::Sender<ServiceCommand>,
}

impl ServiceHandle {
    /// Registers a connection. Its outbox starts receiving events once
    /// the connection joins a room.
    pub async fn connect(
        &self,
        conn: ConnectionId,
        outbox: Outbox,
    ) -> Result<(), RoomError> {
        self.send(ServiceCommand::Connect { conn, outbox }).await
    }

    /// Submits a request and waits for its ack.
    pub async fn request(
        &self,
        conn: ConnectionId,
        request: Request,
    ) -> Result<Ack, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::Request { conn, request, reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Closes a connection's session (fire-and-forget).
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.send(ServiceCommand::Disconnect { conn }).await
    }

    /// Registers a team and waits for the write-through to finish.
    pub async fn create_team(
        &self,
        custom_code: Option<String>,
    ) -> Result<TeamCode, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::CreateTeam { custom_code, reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Returns every registered team.
    pub async fn list_teams(&self) -> Result<TeamMap, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::ListTeams { reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Returns a snapshot of the room for `code`.
    pub async fn room_info(
        &self,
        code: TeamCode,
    ) -> Result<Option<RoomInfo>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::RoomInfo { code, reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Tells the actor to stop after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(ServiceCommand::Shutdown).await
    }

    async fn send(&self, cmd: ServiceCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| RoomError::Unavailable)
    }
}

struct ServiceActor {
    service: ChatService,
    receiver: mpsc::Receiver<ServiceCommand>,
}

impl ServiceActor {
    async fn run(mut self) {
        tracing::info!(
            teams = self.service.registry().len(),
            "chat service started"
        );

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                ServiceCommand::Connect { conn, outbox } => {
                    self.service.connect(conn, outbox);
                }
                ServiceCommand::Request { conn, request, reply } => {
                    let ack = self.apply(conn, request);
                    let _ = reply.send(ack);
                }
                ServiceCommand::Disconnect { conn } => {
                    let service = &mut self.service;
                    if catch_unwind(AssertUnwindSafe(|| service.disconnect(conn))).is_err() {
                        tracing::error!(%conn, "disconnect panicked");
                    }
                }
                ServiceCommand::CreateTeam { custom_code, reply } => {
                    let _ = reply.send(self.service.create_team(custom_code.as_deref()));
                }
                ServiceCommand::ListTeams { reply } => {
                    let _ = reply.send(self.service.list_teams());
                }
                ServiceCommand::RoomInfo { code, reply } => {
                    let _ = reply.send(self.service.room_info(&code));
                }
                ServiceCommand::Shutdown => {
                    tracing::info!("chat service shutting down");
                    break;
                }
            }
        }

        tracing::info!("chat service stopped");
    }

    /// Runs one request behind a panic boundary so a bug triggered by one
    /// client becomes a failed ack instead of killing every room.
    fn apply(&mut self, conn: ConnectionId, request: Request) -> Ack {
        let Request { seq, event } = request;
        let service = &mut self.service;
        catch_unwind(AssertUnwindSafe(|| service.handle(conn, seq, event)))
            .unwrap_or_else(|_| {
                tracing::error!(%conn, seq, "request handler panicked");
                Ack::failure(seq, RoomError::Internal)
            })
    }
}

/// Spawns the service actor and returns a handle to it.
///
/// The command channel holds `config().command_buffer` commands;
/// senders wait when it is full.
pub fn spawn_service(service: ChatService) -> ServiceHandle {
    let (tx, rx) = mpsc::channel(service.config().command_buffer.max(1));
    let actor = ServiceActor {
        service,
        receiver: rx,
    };
    tokio::spawn(actor.run());
    ServiceHandle { sender: tx }
}
