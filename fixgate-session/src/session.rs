/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-session context shared by every state handler.
//!
//! A [`Session`] owns the store for its identity and the collaborators the
//! state machine talks to. It holds no sequence counters of its own: every
//! read and write of `NextSenderSeqNum`/`NextTargetSeqNum` goes through the
//! store.

use crate::application::{Application, RejectReason};
use crate::builders;
use crate::config::SessionConfig;
use crate::heartbeat::HeartbeatManager;
use crate::log::SessionLog;
use crate::sender::MessageSender;
use crate::state::SessionState;
use crate::timer::{Timeout, TimerCommand};
use fixgate_core::error::{FixError, SessionError, StoreError};
use fixgate_core::tags;
use fixgate_core::{Message, SessionId, Timestamp};
use fixgate_store::MessageStore;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Outstanding ResendRequest issued by this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendRange {
    /// First missing sequence number.
    pub begin: u64,
    /// Last missing sequence number.
    pub end: u64,
    /// End of the chunk currently requested, when requests are chunked.
    pub chunk_end: Option<u64>,
}

/// Inbound message parked until the gap before it is filled.
#[derive(Debug, Clone)]
pub(crate) enum Stashed {
    /// Not yet processed.
    Pending(Message),
    /// Already processed out of order; only the sequence slot remains.
    Consumed,
}

/// Runtime context of one FIX session.
pub struct Session {
    config: SessionConfig,
    store: Box<dyn MessageStore>,
    application: Arc<dyn Application>,
    sender: Arc<dyn MessageSender>,
    log: Arc<dyn SessionLog>,
    heartbeat: HeartbeatManager,
    timer_commands: Vec<TimerCommand>,
    stash: BTreeMap<u64, Stashed>,
    resend_range: Option<ResendRange>,
    disconnect_requested: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.config.session_id)
            .field("next_sender_seq", &self.store.next_sender_seq())
            .field("next_target_seq", &self.store.next_target_seq())
            .field("stashed", &self.stash.len())
            .field("resend_range", &self.resend_range)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session context.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        store: Box<dyn MessageStore>,
        application: Arc<dyn Application>,
        sender: Arc<dyn MessageSender>,
        log: Arc<dyn SessionLog>,
    ) -> Self {
        let heartbeat = HeartbeatManager::new(config.heartbeat_interval);
        Self {
            config,
            store,
            application,
            sender,
            log,
            heartbeat,
            timer_commands: Vec::new(),
            stash: BTreeMap::new(),
            resend_range: None,
            disconnect_requested: false,
        }
    }

    /// Returns the session identity.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.config.session_id
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the session's message store.
    #[must_use]
    pub fn store(&self) -> &dyn MessageStore {
        self.store.as_ref()
    }

    /// Returns the heartbeat bookkeeping.
    #[must_use]
    pub fn heartbeat(&self) -> &HeartbeatManager {
        &self.heartbeat
    }

    pub(crate) fn heartbeat_mut(&mut self) -> &mut HeartbeatManager {
        &mut self.heartbeat
    }

    /// Returns the application callbacks.
    #[must_use]
    pub fn application(&self) -> Arc<dyn Application> {
        Arc::clone(&self.application)
    }

    /// Returns the outstanding ResendRequest, if any.
    #[must_use]
    pub const fn resend_range(&self) -> Option<ResendRange> {
        self.resend_range
    }

    /// Returns how many inbound messages wait for a gap to fill.
    #[must_use]
    pub fn stashed_count(&self) -> usize {
        self.stash.len()
    }

    /// Drains the timer commands queued by the last transitions.
    pub fn take_timer_commands(&mut self) -> Vec<TimerCommand> {
        std::mem::take(&mut self.timer_commands)
    }

    /// Returns true once, after a transition asked for the transport to close.
    pub fn take_disconnect_request(&mut self) -> bool {
        std::mem::take(&mut self.disconnect_requested)
    }

    /// Records a session event.
    pub fn log_event(&self, text: &str) {
        self.log.on_event(&self.config.session_id, text);
    }

    /// Records a raw inbound message.
    pub fn log_incoming(&self, raw: &[u8]) {
        self.log.on_incoming(&self.config.session_id, raw);
    }

    pub(crate) fn arm_timer(&mut self, timeout: Timeout, after: Duration) {
        self.timer_commands.push(TimerCommand::Arm(timeout, after));
    }

    pub(crate) fn cancel_timer(&mut self, timeout: Timeout) {
        self.timer_commands.push(TimerCommand::Cancel(timeout));
    }

    /// Arms the heartbeat pair once the session is established.
    pub(crate) fn arm_heartbeat_timers(&mut self) {
        let interval = self.heartbeat.interval();
        let idle = self.heartbeat.peer_idle_after();
        self.arm_timer(Timeout::HeartbeatDue, interval);
        self.arm_timer(Timeout::PeerIdle, idle);
    }

    /// Notes inbound traffic and pushes the peer-idle deadline out.
    pub(crate) fn on_traffic(&mut self, heartbeat_test_req_id: Option<Option<&str>>) {
        let is_heartbeat = heartbeat_test_req_id.is_some();
        let answered = self
            .heartbeat
            .on_message_received(is_heartbeat, heartbeat_test_req_id.flatten());
        if answered {
            self.cancel_timer(Timeout::TestRequestTimeout);
        }
        let idle = self.heartbeat.peer_idle_after();
        self.arm_timer(Timeout::PeerIdle, idle);
    }

    /// Sends a message with the next outbound sequence number.
    ///
    /// The standard header is filled in, the application sees the message
    /// through `to_admin`/`to_app`, and the encoded bytes are committed to the
    /// store together with the counter advance before being handed to the
    /// transport. A transport failure is logged; the sequence number stays
    /// consumed.
    ///
    /// # Errors
    /// Returns `FixError::Store` if the commit fails, in which case nothing was
    /// sent and the counter did not move.
    pub async fn send(&mut self, mut message: Message) -> Result<u64, FixError> {
        let msg_type = message.msg_type()?;
        let seq = self.store.next_sender_seq();
        self.stamp_header(&mut message, seq);

        if msg_type.is_admin() {
            self.application
                .to_admin(&mut message, &self.config.session_id)
                .await;
        } else {
            self.application
                .to_app(&mut message, &self.config.session_id)
                .await;
        }

        let bytes = fixgate_tagvalue::encode(&message)?.freeze();
        self.store
            .save_message_and_incr_next_sender_seq(seq, &bytes)
            .await?;
        self.transmit(bytes);
        Ok(seq)
    }

    fn stamp_header(&self, message: &mut Message, seq: u64) {
        builders::stamp_identity(&mut message.header, &self.config.session_id);
        message.header.set_uint(tags::MSG_SEQ_NUM, seq);
        message
            .header
            .set_str(tags::SENDING_TIME, &Timestamp::now().format_millis());
    }

    fn transmit(&mut self, bytes: bytes::Bytes) {
        self.log.on_outgoing(&self.config.session_id, &bytes);
        if let Err(err) = self.sender.send(&self.config.session_id, bytes) {
            warn!(session = %self.config.session_id, error = %err, "send failed");
            self.log_event(&format!("send failed: {err}"));
        }
        self.heartbeat.on_message_sent();
        let interval = self.heartbeat.interval();
        self.arm_timer(Timeout::HeartbeatDue, interval);
    }

    /// Retransmits a message at its original sequence number without storing it.
    async fn retransmit(&mut self, mut message: Message, seq: u64) -> Result<(), FixError> {
        let now = Timestamp::now().format_millis();
        let original = message.header.get_bytes(tags::SENDING_TIME).cloned();
        builders::stamp_identity(&mut message.header, &self.config.session_id);
        message.header.set_uint(tags::MSG_SEQ_NUM, seq);
        message.header.set_bool(tags::POSS_DUP_FLAG, true);
        message.header.set_str(tags::SENDING_TIME, &now);
        match original {
            Some(sent_at) => message.header.set_bytes(tags::ORIG_SENDING_TIME, sent_at),
            None => message.header.set_str(tags::ORIG_SENDING_TIME, &now),
        }
        let bytes = fixgate_tagvalue::encode(&message)?.freeze();
        self.transmit(bytes);
        Ok(())
    }

    /// Sends a SequenceReset-GapFill at `begin` that skips to `new_seq_no`.
    async fn send_gap_fill(&mut self, begin: u64, new_seq_no: u64) -> Result<(), FixError> {
        let mut gap_fill = builders::sequence_reset(&self.config.session_id, new_seq_no, true);
        self.application
            .to_admin(&mut gap_fill, &self.config.session_id)
            .await;
        self.retransmit(gap_fill, begin).await
    }

    /// Serves a ResendRequest for `begin..=end` out of the message log.
    ///
    /// Application messages are resent with PossDupFlag; runs of admin
    /// messages, and ranges the log cannot produce, become gap fills.
    ///
    /// # Errors
    /// Returns store persistence errors and encoding errors.
    pub(crate) async fn serve_resend(&mut self, begin: u64, end: u64) -> Result<(), FixError> {
        let last_sent = self.store.next_sender_seq().saturating_sub(1);
        let end = if end == 0 || end >= 999_999 || end > last_sent {
            last_sent
        } else {
            end
        };
        if begin == 0 || begin > end {
            return Ok(());
        }

        let stored = match self.store.get_messages(begin, end).await {
            Ok(stored) => stored,
            Err(err @ StoreError::RangeNotAvailable { .. }) => {
                warn!(session = %self.config.session_id, error = %err, "gap filling unavailable range");
                self.log_event(&err.to_string());
                return self.send_gap_fill(begin, end + 1).await;
            }
            Err(err) => return Err(err.into()),
        };

        let mut gap_start = None;
        for (seq, raw) in (begin..=end).zip(stored) {
            let resendable = fixgate_tagvalue::decode(&raw)
                .ok()
                .filter(|message| message.msg_type().is_ok_and(|t| !t.is_admin()));
            match resendable {
                Some(message) => {
                    if let Some(start) = gap_start.take() {
                        self.send_gap_fill(start, seq).await?;
                    }
                    self.log_event(&format!("Resending message: {seq}"));
                    self.retransmit(message, seq).await?;
                }
                None => {
                    gap_start.get_or_insert(seq);
                }
            }
        }
        if let Some(start) = gap_start {
            self.send_gap_fill(start, end + 1).await?;
        }
        Ok(())
    }

    /// EndSeqNo meaning "everything from BeginSeqNo on" for this version.
    fn open_end(&self) -> u64 {
        if builders::at_least_fix42(&self.config.session_id.begin_string) {
            0
        } else {
            999_999
        }
    }

    /// Sends a ResendRequest for the gap `begin..received` and records it.
    ///
    /// # Errors
    /// Returns store errors from sending the request.
    pub(crate) async fn request_resend(&mut self, begin: u64, received: u64) -> Result<(), FixError> {
        let end = received.saturating_sub(1);
        let chunk = self.config.resend_request_chunk_size;
        let chunk_end = (chunk > 0 && end - begin + 1 > chunk).then(|| begin + chunk - 1);
        let request_end = chunk_end.unwrap_or_else(|| self.open_end());

        self.log_event(&format!(
            "Sent ResendRequest FROM: {begin} TO: {request_end}"
        ));
        let request = builders::resend_request(&self.config.session_id, begin, request_end);
        self.send(request).await?;
        self.resend_range = Some(ResendRange {
            begin,
            end,
            chunk_end,
        });
        Ok(())
    }

    /// Clears or advances the outstanding ResendRequest after the target
    /// sequence number moved.
    ///
    /// # Errors
    /// Returns store errors from sending the next chunk.
    pub(crate) async fn continue_resend(&mut self) -> Result<(), FixError> {
        let Some(range) = self.resend_range else {
            return Ok(());
        };
        let next = self.store.next_target_seq();
        if next > range.end {
            self.log_event(&format!(
                "ResendRequest for messages FROM: {} TO: {} has been satisfied.",
                range.begin, range.end
            ));
            self.resend_range = None;
            return Ok(());
        }
        if let Some(chunk_end) = range.chunk_end
            && next > chunk_end
        {
            self.request_resend(next, range.end + 1).await?;
            if let Some(current) = self.resend_range.as_mut() {
                current.begin = range.begin;
            }
        }
        Ok(())
    }

    /// Widens the outstanding resend range to cover `end`.
    pub(crate) fn extend_resend(&mut self, end: u64) {
        if let Some(range) = self.resend_range.as_mut()
            && end > range.end
        {
            range.end = end;
        }
    }

    pub(crate) fn stash(&mut self, seq: u64, entry: Stashed) {
        self.stash.insert(seq, entry);
    }

    /// Removes the stashed entry for the next expected sequence number,
    /// discarding entries a sequence reset has overtaken.
    pub(crate) fn take_stashed(&mut self) -> Option<Stashed> {
        let next = self.store.next_target_seq();
        self.stash = self.stash.split_off(&next);
        self.stash.remove(&next)
    }

    /// Validates BeginString, CompIDs and MsgSeqNum presence, returning MsgSeqNum.
    ///
    /// # Errors
    /// Returns the first header problem found.
    pub(crate) fn check_header(&self, message: &Message) -> Result<u64, SessionError> {
        let id = &self.config.session_id;
        let begin_string = message.begin_string().unwrap_or_default();
        if begin_string != id.begin_string {
            return Err(SessionError::IncorrectBeginString {
                expected: id.begin_string.clone(),
                received: begin_string.to_string(),
            });
        }
        if self.config.validate_comp_ids {
            let sender = message.sender_comp_id().unwrap_or_default();
            let target = message.target_comp_id().unwrap_or_default();
            if sender != id.target_comp_id || target != id.sender_comp_id {
                return Err(SessionError::IncorrectCompId {
                    expected: format!("{}->{}", id.target_comp_id, id.sender_comp_id),
                    received: format!("{sender}->{target}"),
                });
            }
        }
        message.seq_num().map_err(|_| SessionError::MissingField {
            tag: tags::MSG_SEQ_NUM,
        })
    }

    /// Sends a session-level Reject, logging rather than returning failures.
    pub(crate) async fn send_reject(
        &mut self,
        ref_seq_num: u64,
        reason: &RejectReason,
        ref_msg_type: Option<&str>,
    ) {
        self.log_event(&format!(
            "Message {ref_seq_num} Rejected: {} (code {})",
            reason.text, reason.code
        ));
        let reject = builders::reject(&self.config.session_id, ref_seq_num, reason, ref_msg_type);
        if let Err(err) = self.send(reject).await {
            warn!(session = %self.config.session_id, error = %err, "failed to send reject");
        }
    }

    /// Sends a Logout, logging rather than returning failures.
    pub(crate) async fn send_logout(&mut self, text: Option<&str>) {
        let logout = builders::logout(&self.config.session_id, text);
        if let Err(err) = self.send(logout).await {
            warn!(session = %self.config.session_id, error = %err, "failed to send logout");
            self.log_event(&format!("failed to send logout: {err}"));
        }
    }

    /// Resets the store and the in-flight recovery bookkeeping.
    ///
    /// # Errors
    /// Returns `StoreError` if the store reset fails.
    pub(crate) async fn reset_store(&mut self) -> Result<(), StoreError> {
        self.store.reset().await?;
        self.stash.clear();
        self.resend_range = None;
        Ok(())
    }

    /// Tears down in-session bookkeeping and asks for the transport to close.
    pub(crate) fn end_session(&mut self) -> SessionState {
        self.timer_commands.push(TimerCommand::CancelAll);
        self.stash.clear();
        self.resend_range = None;
        self.heartbeat.reset();
        self.disconnect_requested = true;
        SessionState::Latent
    }

    /// Logs a failure that ends the session and returns `Latent`.
    pub(crate) fn abort(&mut self, reason: &dyn fmt::Display) -> SessionState {
        warn!(session = %self.config.session_id, reason = %reason, "session aborted");
        self.log_event(&reason.to_string());
        self.end_session()
    }

    /// Sends Logout with `reason`, then ends the session.
    pub(crate) async fn logout_and_end(
        &mut self,
        reason: &(dyn fmt::Display + Sync),
    ) -> SessionState {
        let text = reason.to_string();
        self.log_event(&text);
        self.send_logout(Some(&text)).await;
        self.end_session()
    }

    pub(crate) fn set_heartbeat_interval(&mut self, interval: Duration) {
        self.heartbeat.set_interval(interval);
    }

    /// Sequence number expected next from the counterparty.
    #[must_use]
    pub fn next_target_seq(&self) -> u64 {
        self.store.next_target_seq()
    }

    /// Sequence number of the next outbound message.
    #[must_use]
    pub fn next_sender_seq(&self) -> u64 {
        self.store.next_sender_seq()
    }

    pub(crate) async fn incr_target(&mut self) -> Result<(), StoreError> {
        self.store.incr_next_target_seq().await
    }

    pub(crate) async fn set_target(&mut self, seq: u64) -> Result<(), StoreError> {
        self.store.set_next_target_seq(seq).await
    }
}
