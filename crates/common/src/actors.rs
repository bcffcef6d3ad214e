use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorType {
    ExecutionActor,
}

/// Messages sent from Actors to the Supervisor
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    Started(Uuid),
    Shutdown(Uuid),
    Error(Uuid, String),
}

/// The trait that all supervised services must implement
#[async_trait]
pub trait Actor: Send + Sync {
    /// The unique name of the actor (e.g., "ExecutionActor")
    fn name(&self) -> ActorType;

    fn id(&self) -> Uuid;

    /// The main loop of the actor.
    /// It reports non-fatal errors through `supervisor_tx` and returns once asked to stop.
    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()>;
}
