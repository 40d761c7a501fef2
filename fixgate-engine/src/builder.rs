/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Engine builder for fluent configuration.
//!
//! The builder collects the application, the store factory and the session
//! configurations; [`Engine::start_session`] turns one of them into a
//! running [`SessionRunner`] attached to a transport.

use crate::error::EngineError;
use crate::handle::SessionHandle;
use crate::runner::SessionRunner;
use fixgate_core::SessionId;
use fixgate_core::error::SessionError;
use fixgate_session::{
    Application, MessageSender, NoOpApplication, Session, SessionConfig, SessionLog,
    StateMachine, TracingLog,
};
use fixgate_store::{MemoryStoreFactory, MessageStoreFactory};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Builder for configuring a FIX engine.
pub struct EngineBuilder<A: Application = NoOpApplication> {
    /// Application callback handler.
    application: Arc<A>,
    /// Creates one store per session.
    store_factory: Arc<dyn MessageStoreFactory>,
    /// Session log shared by all sessions.
    log: Arc<dyn SessionLog>,
    /// Session configurations.
    sessions: Vec<SessionConfig>,
    /// Bound of each session's event channel.
    event_capacity: usize,
}

impl<A: Application> fmt::Debug for EngineBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("sessions", &self.sessions)
            .field("event_capacity", &self.event_capacity)
            .finish_non_exhaustive()
    }
}

impl Default for EngineBuilder<NoOpApplication> {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder<NoOpApplication> {
    /// Creates a builder with in-memory stores and tracing output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            application: Arc::new(NoOpApplication),
            store_factory: Arc::new(MemoryStoreFactory::new()),
            log: Arc::new(TracingLog),
            sessions: Vec::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl<A: Application + 'static> EngineBuilder<A> {
    /// Sets the application callback handler.
    #[must_use]
    pub fn with_application<B: Application>(self, application: B) -> EngineBuilder<B> {
        EngineBuilder {
            application: Arc::new(application),
            store_factory: self.store_factory,
            log: self.log,
            sessions: self.sessions,
            event_capacity: self.event_capacity,
        }
    }

    /// Sets the store factory.
    #[must_use]
    pub fn with_store_factory(mut self, factory: impl MessageStoreFactory + 'static) -> Self {
        self.store_factory = Arc::new(factory);
        self
    }

    /// Sets the session log.
    #[must_use]
    pub fn with_log(mut self, log: Arc<dyn SessionLog>) -> Self {
        self.log = log;
        self
    }

    /// Adds a session configuration.
    #[must_use]
    pub fn add_session(mut self, config: SessionConfig) -> Self {
        self.sessions.push(config);
        self
    }

    /// Sets the bound of each session's event channel.
    #[must_use]
    pub const fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Returns the configured sessions.
    #[must_use]
    pub fn sessions(&self) -> &[SessionConfig] {
        &self.sessions
    }

    /// Returns the application handler.
    #[must_use]
    pub fn application(&self) -> Arc<A> {
        Arc::clone(&self.application)
    }

    /// Validates the configuration and builds the engine.
    ///
    /// # Errors
    /// Returns the configuration error of the first invalid session, or
    /// `SessionError::Configuration` if a session id is registered twice.
    pub fn build(self) -> Result<Engine<A>, EngineError> {
        let mut sessions = HashMap::with_capacity(self.sessions.len());
        for config in self.sessions {
            config.validate()?;
            let id = config.session_id.clone();
            if sessions.insert(id.clone(), config).is_some() {
                return Err(SessionError::Configuration(format!("duplicate session {id}")).into());
            }
        }
        Ok(Engine {
            application: self.application,
            store_factory: self.store_factory,
            log: self.log,
            sessions,
            running: Mutex::new(HashMap::new()),
            event_capacity: self.event_capacity,
        })
    }
}

/// A set of configured sessions sharing one application and store factory.
pub struct Engine<A: Application = NoOpApplication> {
    application: Arc<A>,
    store_factory: Arc<dyn MessageStoreFactory>,
    log: Arc<dyn SessionLog>,
    sessions: HashMap<SessionId, SessionConfig>,
    running: Mutex<HashMap<SessionId, SessionHandle>>,
    event_capacity: usize,
}

impl<A: Application> fmt::Debug for Engine<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("sessions", &self.sessions.keys().collect::<Vec<_>>())
            .field("running", &self.running.lock().len())
            .finish_non_exhaustive()
    }
}

impl<A: Application + 'static> Engine<A> {
    /// Returns the application handler.
    #[must_use]
    pub fn application(&self) -> Arc<A> {
        Arc::clone(&self.application)
    }

    /// Returns the configuration of `session_id`.
    #[must_use]
    pub fn session_config(&self, session_id: &SessionId) -> Option<&SessionConfig> {
        self.sessions.get(session_id)
    }

    /// Iterates over the configured session ids.
    pub fn session_ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }

    /// Returns the handle of a running session.
    #[must_use]
    pub fn handle(&self, session_id: &SessionId) -> Option<SessionHandle> {
        self.running
            .lock()
            .get(session_id)
            .filter(|handle| !handle.is_stopped())
            .cloned()
    }

    /// Creates the session's store, notifies the application and spawns its
    /// runner with `sender` as the transport.
    ///
    /// # Errors
    /// Returns `EngineError::UnknownSession` if the session is not configured,
    /// `EngineError::AlreadyRunning` if its runner is still alive, or the
    /// store error if the store cannot be created.
    pub async fn start_session(
        &self,
        session_id: &SessionId,
        sender: Arc<dyn MessageSender>,
    ) -> Result<SessionHandle, EngineError> {
        let config = self
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownSession(session_id.to_string()))?;
        if self.handle(session_id).is_some() {
            return Err(EngineError::AlreadyRunning(session_id.to_string()));
        }

        let store = self.store_factory.create(session_id).await?;
        self.application.on_create(session_id).await;

        let application: Arc<dyn Application> = self.application.clone();
        let session = Session::new(config, store, application, sender, Arc::clone(&self.log));
        let (runner, handle) = SessionRunner::new(StateMachine::new(session), self.event_capacity);

        {
            let mut running = self.running.lock();
            if running
                .get(session_id)
                .is_some_and(|existing| !existing.is_stopped())
            {
                return Err(EngineError::AlreadyRunning(session_id.to_string()));
            }
            running.insert(session_id.clone(), handle.clone());
        }

        tokio::spawn(runner.run());
        info!(session = %session_id, "session started");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixgate_session::ChannelSender;

    fn id() -> SessionId {
        SessionId::new("FIX.4.4", "SENDER", "TARGET")
    }

    #[test]
    fn test_engine_builder_default() {
        let builder = EngineBuilder::new();
        assert!(builder.sessions().is_empty());
        assert_eq!(builder.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn test_engine_builder_add_session() {
        let builder = EngineBuilder::new().add_session(SessionConfig::new(id()));
        assert_eq!(builder.sessions().len(), 1);
        let engine = builder.build().unwrap();
        assert!(engine.session_config(&id()).is_some());
    }

    #[test]
    fn test_engine_builder_rejects_duplicates() {
        let result = EngineBuilder::new()
            .add_session(SessionConfig::new(id()))
            .add_session(SessionConfig::new(id()))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_start_unknown_session() {
        let engine = EngineBuilder::new().build().unwrap();
        let (sender, _wire) = ChannelSender::channel();
        let result = engine.start_session(&id(), Arc::new(sender)).await;
        assert!(matches!(result, Err(EngineError::UnknownSession(_))));
    }

    #[tokio::test]
    async fn test_start_session_once() {
        let engine = EngineBuilder::new()
            .add_session(SessionConfig::new(id()))
            .build()
            .unwrap();
        let (sender, _wire) = ChannelSender::channel();
        let sender: Arc<dyn MessageSender> = Arc::new(sender);

        let handle = engine.start_session(&id(), sender.clone()).await.unwrap();
        assert!(engine.handle(&id()).is_some());
        assert!(matches!(
            engine.start_session(&id(), sender.clone()).await,
            Err(EngineError::AlreadyRunning(_))
        ));

        handle.shutdown().await.unwrap();
        while !handle.is_stopped() {
            tokio::task::yield_now().await;
        }
        assert!(engine.handle(&id()).is_none());
        assert!(engine.start_session(&id(), sender).await.is_ok());
    }
}
