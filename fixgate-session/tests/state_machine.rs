/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! End-to-end scenarios for the session state machine.

use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::{FixError, SessionError, StoreError};
use fixgate_core::tags;
use fixgate_core::{Message, MsgType, SessionId, Timestamp};
use fixgate_session::builders;
use fixgate_session::{
    Application, ChannelSender, MemoryLog, RejectReason, Session, SessionConfig, SessionState,
    StateMachine, Timeout, TimerCommand,
};
use fixgate_store::{MemoryStore, MessageStore, SequenceState, SqlStore, SqlStoreConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Default)]
struct Recorder {
    logons: AtomicUsize,
    logouts: AtomicUsize,
    received: Mutex<Vec<Message>>,
    reject_app: bool,
}

#[async_trait]
impl Application for Recorder {
    async fn on_create(&self, _session_id: &SessionId) {}

    async fn on_logon(&self, _session_id: &SessionId) {
        self.logons.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_logout(&self, _session_id: &SessionId) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
    }

    async fn to_admin(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_admin(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), RejectReason> {
        Ok(())
    }

    async fn to_app(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_app(&self, message: &Message, _session_id: &SessionId) -> Result<(), RejectReason> {
        if self.reject_app {
            return Err(RejectReason::new(RejectReason::OTHER, "unsupported"));
        }
        self.received.lock().push(message.clone());
        Ok(())
    }
}

struct Harness {
    machine: StateMachine,
    wire: UnboundedReceiver<Bytes>,
    log: Arc<MemoryLog>,
    app: Arc<Recorder>,
}

impl Harness {
    fn new(config: SessionConfig, store: Box<dyn MessageStore>, app: Recorder) -> Self {
        let (sender, wire) = ChannelSender::channel();
        let log = Arc::new(MemoryLog::new());
        let app = Arc::new(app);
        let session = Session::new(config, store, app.clone(), Arc::new(sender), log.clone());
        Self {
            machine: StateMachine::new(session),
            wire,
            log,
            app,
        }
    }

    fn sent(&mut self) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(bytes) = self.wire.try_recv() {
            out.push(fixgate_tagvalue::decode(&bytes).unwrap());
        }
        out
    }

    fn store(&self) -> &dyn MessageStore {
        self.machine.session().store()
    }

    fn timers(&mut self) -> Vec<TimerCommand> {
        self.machine.session_mut().take_timer_commands()
    }

    async fn receive(&mut self, message: Message) -> SessionState {
        self.machine.handle_message(&message).await
    }

    fn logons(&self) -> usize {
        self.app.logons.load(Ordering::SeqCst)
    }

    fn logouts(&self) -> usize {
        self.app.logouts.load(Ordering::SeqCst)
    }
}

fn ours() -> SessionId {
    SessionId::new("FIX.4.4", "SENDER", "TARGET")
}

fn theirs() -> SessionId {
    SessionId::new("FIX.4.4", "TARGET", "SENDER")
}

fn config() -> SessionConfig {
    SessionConfig::new(ours())
}

fn inbound(mut message: Message, seq: u64) -> Message {
    builders::stamp_identity(&mut message.header, &theirs());
    message.header.set_uint(tags::MSG_SEQ_NUM, seq);
    message
        .header
        .set_str(tags::SENDING_TIME, &Timestamp::now().format_millis());
    message
}

fn logon(seq: u64) -> Message {
    inbound(builders::logon(&theirs(), 30, false, None), seq)
}

fn order(seq: u64, cl_ord_id: &str) -> Message {
    let mut message = Message::new(MsgType::App("D".to_string()));
    message.body.set_str(11, cl_ord_id);
    inbound(message, seq)
}

fn outbound_order(cl_ord_id: &str) -> Message {
    let mut message = Message::new(MsgType::App("D".to_string()));
    message.body.set_str(11, cl_ord_id);
    message
}

fn store_at(next_sender_seq: u64, next_target_seq: u64) -> Box<dyn MessageStore> {
    Box::new(MemoryStore::from_state(SequenceState {
        creation_time: Timestamp::now(),
        next_sender_seq,
        next_target_seq,
    }))
}

/// Returns a harness that has completed an acceptor logon at target seq 1.
async fn logged_on(config: SessionConfig, app: Recorder) -> Harness {
    let mut h = Harness::new(config, Box::new(MemoryStore::new()), app);
    h.machine.accept().unwrap();
    assert_eq!(h.receive(logon(1)).await, SessionState::InSession);
    h.sent();
    h.timers();
    h.log.clear();
    h
}

#[tokio::test]
async fn test_acceptor_logon_with_heartbeat_interval() {
    let mut h = Harness::new(
        config().with_reset_on_logon(true),
        Box::new(MemoryStore::new()),
        Recorder::default(),
    );
    h.machine.accept().unwrap();
    assert_eq!(
        h.machine.state(),
        SessionState::LogonPending { initiator: false }
    );

    let state = h.receive(logon(1)).await;

    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.logons(), 1);
    assert_eq!(h.store().next_target_seq(), 2);
    assert_eq!(h.store().next_sender_seq(), 2);

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    let ack = &sent[0];
    assert!(ack.is(&MsgType::Logon));
    assert_eq!(ack.body.get_uint(tags::HEART_BT_INT).unwrap(), 30);
    assert_eq!(ack.seq_num().unwrap(), 1);
    assert_eq!(ack.sender_comp_id(), Some("SENDER"));
    assert_eq!(ack.target_comp_id(), Some("TARGET"));

    let timers = h.timers();
    assert!(timers.contains(&TimerCommand::Cancel(Timeout::LogonTimeout)));
    assert!(timers.contains(&TimerCommand::Arm(
        Timeout::HeartbeatDue,
        Duration::from_secs(30)
    )));
    assert!(h.log.has_event("Received logon request"));
    assert!(h.log.has_event("Responding to logon request"));
}

#[tokio::test]
async fn test_heartbeat_timer_before_logon_keeps_state() {
    let mut h = Harness::new(config(), Box::new(MemoryStore::new()), Recorder::default());
    h.machine.accept().unwrap();

    let state = h.machine.handle_timeout(Timeout::HeartbeatDue).await;
    assert_eq!(state, SessionState::LogonPending { initiator: false });
    let state = h.machine.handle_timeout(Timeout::PeerIdle).await;
    assert_eq!(state, SessionState::LogonPending { initiator: false });
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_logon_timeout_returns_to_latent() {
    let mut h = Harness::new(config(), store_at(4, 7), Recorder::default());
    h.machine.accept().unwrap();
    assert!(h.timers().contains(&TimerCommand::Arm(
        Timeout::LogonTimeout,
        Duration::from_secs(10)
    )));
    h.log.clear();

    let state = h.machine.handle_timeout(Timeout::LogonTimeout).await;

    assert_eq!(state, SessionState::Latent);
    assert_eq!(h.log.events().len(), 1);
    assert_eq!(h.store().next_sender_seq(), 4);
    assert_eq!(h.store().next_target_seq(), 7);
    assert!(h.sent().is_empty());
    assert!(h.timers().contains(&TimerCommand::CancelAll));
}

#[tokio::test]
async fn test_non_logon_while_awaiting_logon_is_violation() {
    let mut h = Harness::new(config(), Box::new(MemoryStore::new()), Recorder::default());
    h.machine.accept().unwrap();

    let heartbeat = inbound(builders::heartbeat(&theirs(), None), 1);
    let state = h.receive(heartbeat).await;

    assert_eq!(state, SessionState::Latent);
    assert!(h.log.has_event("protocol violation"));
    assert!(h.log.has_event("waiting for Logon"));
    assert_eq!(h.store().next_target_seq(), 1);
    assert!(h.machine.session_mut().take_disconnect_request());
}

#[tokio::test]
async fn test_logon_too_low_is_refused() {
    let mut h = Harness::new(config(), store_at(1, 5), Recorder::default());
    h.machine.accept().unwrap();

    let state = h.receive(logon(3)).await;

    assert_eq!(state, SessionState::Latent);
    assert_eq!(h.logons(), 0);
    assert_eq!(h.store().next_target_seq(), 5);
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is(&MsgType::Logout));
    assert_eq!(
        sent[0].body.get_str(tags::TEXT).unwrap(),
        "MsgSeqNum too low, expecting 5 but received 3"
    );
}

#[tokio::test]
async fn test_logon_too_high_enters_session_and_requests_resend() {
    let mut h = Harness::new(config(), Box::new(MemoryStore::new()), Recorder::default());
    h.machine.accept().unwrap();

    let state = h.receive(logon(5)).await;

    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.logons(), 1);
    assert!(h.log.has_event("MsgSeqNum too high, expecting 1 but received 5"));
    assert_eq!(h.store().next_target_seq(), 1);

    let sent = h.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].is(&MsgType::Logon));
    assert!(sent[1].is(&MsgType::ResendRequest));
    assert_eq!(sent[1].body.get_uint(tags::BEGIN_SEQ_NO).unwrap(), 1);
    assert_eq!(sent[1].body.get_uint(tags::END_SEQ_NO).unwrap(), 0);

    let range = h.machine.session().resend_range().unwrap();
    assert_eq!((range.begin, range.end), (1, 4));

    // Counterparty fills the gap up to the Logon it already sent.
    let mut gap_fill = inbound(builders::sequence_reset(&theirs(), 5, true), 1);
    gap_fill.header.set_bool(tags::POSS_DUP_FLAG, true);
    let state = h.receive(gap_fill).await;

    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 6);
    assert!(h.machine.session().resend_range().is_none());
    assert_eq!(h.machine.session().stashed_count(), 0);
}

#[tokio::test]
async fn test_logon_from_latent_is_accepted() {
    let mut h = Harness::new(config(), Box::new(MemoryStore::new()), Recorder::default());
    let state = h.receive(logon(1)).await;
    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.sent().len(), 1);
}

#[tokio::test]
async fn test_latent_ignores_other_messages() {
    let mut h = Harness::new(config(), Box::new(MemoryStore::new()), Recorder::default());
    let state = h.receive(order(1, "A")).await;
    assert_eq!(state, SessionState::Latent);
    assert!(h.log.has_event("in Latent state"));
    assert_eq!(h.store().next_target_seq(), 1);

    assert_eq!(
        h.machine.handle_timeout(Timeout::LogonTimeout).await,
        SessionState::Latent
    );
}

#[tokio::test]
async fn test_initiator_logon_round_trip() {
    let mut h = Harness::new(
        config().with_reset_on_logon(true),
        store_at(9, 9),
        Recorder::default(),
    );
    h.machine.initiate_logon().await.unwrap();
    assert_eq!(
        h.machine.state(),
        SessionState::LogonPending { initiator: true }
    );

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is(&MsgType::Logon));
    assert_eq!(sent[0].seq_num().unwrap(), 1);
    assert!(sent[0].body.flag(tags::RESET_SEQ_NUM_FLAG));
    assert_eq!(sent[0].body.get_uint(tags::HEART_BT_INT).unwrap(), 30);

    let mut response = logon(1);
    response.body.set_bool(tags::RESET_SEQ_NUM_FLAG, true);
    let state = h.receive(response).await;

    assert_eq!(state, SessionState::InSession);
    assert!(h.sent().is_empty());
    assert_eq!(h.store().next_sender_seq(), 2);
    assert_eq!(h.store().next_target_seq(), 2);
    assert_eq!(h.logons(), 1);
}

#[tokio::test]
async fn test_logon_requires_latent() {
    let mut h = logged_on(config(), Recorder::default()).await;
    let err = h.machine.initiate_logon().await.unwrap_err();
    assert!(matches!(
        err,
        FixError::Session(SessionError::InvalidState { .. })
    ));
    assert!(h.machine.accept().is_err());
}

#[tokio::test]
async fn test_in_order_application_message_is_delivered() {
    let mut h = logged_on(config(), Recorder::default()).await;

    let state = h.receive(order(2, "ORD1")).await;

    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 3);
    let received = h.app.received.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].body.get_str(11).unwrap(), "ORD1");
}

#[tokio::test]
async fn test_gap_is_recovered_in_order() {
    let mut h = logged_on(config(), Recorder::default()).await;

    let state = h.receive(order(4, "C")).await;
    assert_eq!(state, SessionState::ResendPending { begin: 2, end: 3 });
    assert!(h.log.has_event("MsgSeqNum too high, expecting 2 but received 4"));

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is(&MsgType::ResendRequest));
    assert_eq!(sent[0].body.get_uint(tags::BEGIN_SEQ_NO).unwrap(), 2);
    assert_eq!(sent[0].body.get_uint(tags::END_SEQ_NO).unwrap(), 0);

    // A further gap message is stashed without a second request.
    let state = h.receive(order(5, "D")).await;
    assert_eq!(state, SessionState::ResendPending { begin: 2, end: 4 });
    assert!(h.sent().is_empty());

    let state = h.receive(order(2, "A")).await;
    assert_eq!(state, SessionState::ResendPending { begin: 2, end: 4 });

    let state = h.receive(order(3, "B")).await;
    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 6);

    let ids: Vec<String> = h
        .app
        .received
        .lock()
        .iter()
        .map(|m| m.body.get_str(11).unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["A", "B", "C", "D"]);
    assert!(h.log.has_event("has been satisfied"));
}

#[tokio::test]
async fn test_chunked_resend_requests() {
    let mut h = logged_on(
        config().with_resend_request_chunk_size(2),
        Recorder::default(),
    )
    .await;

    let state = h.receive(order(7, "G")).await;
    assert_eq!(state, SessionState::ResendPending { begin: 2, end: 6 });
    let sent = h.sent();
    assert_eq!(sent[0].body.get_uint(tags::BEGIN_SEQ_NO).unwrap(), 2);
    assert_eq!(sent[0].body.get_uint(tags::END_SEQ_NO).unwrap(), 3);

    h.receive(order(2, "B")).await;
    assert!(h.sent().is_empty());

    let state = h.receive(order(3, "C")).await;
    assert_eq!(state, SessionState::ResendPending { begin: 2, end: 6 });
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body.get_uint(tags::BEGIN_SEQ_NO).unwrap(), 4);
    assert_eq!(sent[0].body.get_uint(tags::END_SEQ_NO).unwrap(), 5);
}

#[tokio::test]
async fn test_possible_duplicate_is_ignored() {
    let mut h = logged_on(config(), Recorder::default()).await;

    let mut duplicate = order(1, "OLD");
    duplicate.header.set_bool(tags::POSS_DUP_FLAG, true);
    let state = h.receive(duplicate).await;

    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 2);
    assert!(h.app.received.lock().is_empty());
    assert!(h.log.has_event("PossDupFlag set"));
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_too_low_without_poss_dup_logs_out() {
    let mut h = logged_on(config(), Recorder::default()).await;

    let state = h.receive(order(1, "OLD")).await;

    assert_eq!(state, SessionState::Latent);
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is(&MsgType::Logout));
    assert_eq!(
        sent[0].body.get_str(tags::TEXT).unwrap(),
        "MsgSeqNum too low, expecting 2 but received 1"
    );
    assert!(h.machine.session_mut().take_disconnect_request());
}

#[tokio::test]
async fn test_comp_id_mismatch_logs_out() {
    let mut h = logged_on(config(), Recorder::default()).await;

    let mut message = order(2, "X");
    message.header.set_str(tags::SENDER_COMP_ID, "INTRUDER");
    let state = h.receive(message).await;

    assert_eq!(state, SessionState::Latent);
    assert!(h.log.has_event("CompID problem"));
    assert!(h.sent()[0].is(&MsgType::Logout));
}

#[tokio::test]
async fn test_missing_seq_num_is_rejected() {
    let mut h = logged_on(config(), Recorder::default()).await;

    let mut message = order(2, "X");
    message.header.remove(tags::MSG_SEQ_NUM);
    let state = h.receive(message).await;

    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 2);
    let sent = h.sent();
    assert!(sent[0].is(&MsgType::Reject));
    assert_eq!(sent[0].body.get_uint(tags::REF_TAG_ID).unwrap(), 34);
}

#[tokio::test]
async fn test_test_request_is_answered() {
    let mut h = logged_on(config(), Recorder::default()).await;

    let request = inbound(builders::test_request(&theirs(), "PING"), 2);
    let state = h.receive(request).await;

    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 3);
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is(&MsgType::Heartbeat));
    assert_eq!(sent[0].body.get_str(tags::TEST_REQ_ID).unwrap(), "PING");
}

#[tokio::test]
async fn test_application_reject_produces_session_reject() {
    let app = Recorder {
        reject_app: true,
        ..Recorder::default()
    };
    let mut h = logged_on(config(), app).await;

    let state = h.receive(order(2, "X")).await;

    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 3);
    let sent = h.sent();
    assert!(sent[0].is(&MsgType::Reject));
    assert_eq!(sent[0].body.get_uint(tags::REF_SEQ_NUM).unwrap(), 2);
    assert_eq!(sent[0].body.get_str(tags::REF_MSG_TYPE).unwrap(), "D");
    assert_eq!(sent[0].body.get_uint(tags::SESSION_REJECT_REASON).unwrap(), 99);
}

#[tokio::test]
async fn test_resend_request_is_served_from_log() {
    let mut h = logged_on(config(), Recorder::default()).await;

    h.machine.send(outbound_order("A")).await.unwrap();
    h.machine.send(outbound_order("B")).await.unwrap();
    h.machine.handle_timeout(Timeout::HeartbeatDue).await;
    h.machine.send(outbound_order("C")).await.unwrap();
    assert_eq!(h.sent().len(), 4);
    assert_eq!(h.store().next_sender_seq(), 6);

    let request = inbound(builders::resend_request(&theirs(), 1, 0), 2);
    let state = h.receive(request).await;
    assert_eq!(state, SessionState::InSession);

    let sent = h.sent();
    let summary: Vec<(String, u64)> = sent
        .iter()
        .map(|m| {
            (
                m.msg_type().unwrap().to_string(),
                m.seq_num().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("4".to_string(), 1),
            ("D".to_string(), 2),
            ("D".to_string(), 3),
            ("4".to_string(), 4),
            ("D".to_string(), 5),
        ]
    );
    assert_eq!(sent[0].body.get_uint(tags::NEW_SEQ_NO).unwrap(), 2);
    assert!(sent[0].body.flag(tags::GAP_FILL_FLAG));
    assert_eq!(sent[3].body.get_uint(tags::NEW_SEQ_NO).unwrap(), 5);
    assert!(sent.iter().all(Message::poss_dup));
    assert!(sent[1].header.has(tags::ORIG_SENDING_TIME));
    assert_eq!(sent[1].body.get_str(11).unwrap(), "A");

    assert_eq!(h.store().next_sender_seq(), 6);
    assert_eq!(h.store().next_target_seq(), 3);
}

#[tokio::test]
async fn test_resend_of_unavailable_range_is_gap_filled() {
    let mut h = Harness::new(config(), store_at(10, 1), Recorder::default());
    h.machine.accept().unwrap();
    h.receive(logon(1)).await;
    h.sent();

    let request = inbound(builders::resend_request(&theirs(), 1, 0), 2);
    h.receive(request).await;

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is(&MsgType::SequenceReset));
    assert_eq!(sent[0].seq_num().unwrap(), 1);
    assert_eq!(sent[0].body.get_uint(tags::NEW_SEQ_NO).unwrap(), 11);
    assert!(h.log.has_event("messages not available"));
}

#[tokio::test]
async fn test_sequence_reset_modes() {
    let mut h = logged_on(config(), Recorder::default()).await;

    let reset = inbound(builders::sequence_reset(&theirs(), 20, false), 7);
    assert_eq!(h.receive(reset).await, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 20);

    let lower = inbound(builders::sequence_reset(&theirs(), 3, false), 99);
    assert_eq!(h.receive(lower).await, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 20);
    let sent = h.sent();
    assert!(sent[0].is(&MsgType::Reject));
    assert_eq!(sent[0].body.get_uint(tags::SESSION_REJECT_REASON).unwrap(), 5);
    assert_eq!(sent[0].body.get_uint(tags::REF_TAG_ID).unwrap(), 36);

    let gap_fill = inbound(builders::sequence_reset(&theirs(), 25, true), 20);
    assert_eq!(h.receive(gap_fill).await, SessionState::InSession);
    assert_eq!(h.store().next_target_seq(), 25);
}

#[tokio::test]
async fn test_counterparty_logout() {
    let mut h = logged_on(config().with_reset_on_logout(true), Recorder::default()).await;

    let logout = inbound(builders::logout(&theirs(), None), 2);
    let state = h.receive(logout).await;

    assert_eq!(state, SessionState::Latent);
    assert_eq!(h.logouts(), 1);
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is(&MsgType::Logout));
    assert_eq!(h.store().next_sender_seq(), 1);
    assert_eq!(h.store().next_target_seq(), 1);
}

#[tokio::test]
async fn test_initiated_logout() {
    let mut h = logged_on(config(), Recorder::default()).await;

    h.machine.initiate_logout(Some("end of day")).await.unwrap();
    assert_eq!(h.machine.state(), SessionState::LogoutPending);
    let sent = h.sent();
    assert_eq!(sent[0].body.get_str(tags::TEXT).unwrap(), "end of day");
    assert!(h.timers().contains(&TimerCommand::Arm(
        Timeout::LogoutTimeout,
        Duration::from_secs(10)
    )));

    // Traffic before the response is still processed.
    assert_eq!(
        h.receive(order(2, "LATE")).await,
        SessionState::LogoutPending
    );

    let response = inbound(builders::logout(&theirs(), None), 3);
    assert_eq!(h.receive(response).await, SessionState::Latent);
    assert!(h.sent().is_empty());
    assert_eq!(h.logouts(), 1);
}

#[tokio::test]
async fn test_logout_timeout() {
    let mut h = logged_on(config(), Recorder::default()).await;
    h.machine.initiate_logout(None).await.unwrap();

    let state = h.machine.handle_timeout(Timeout::LogoutTimeout).await;

    assert_eq!(state, SessionState::Latent);
    assert!(h.log.has_event("Timed out waiting for logout response"));
    assert_eq!(h.logouts(), 1);
}

#[tokio::test]
async fn test_idle_peer_is_probed_then_dropped() {
    let mut h = logged_on(config(), Recorder::default()).await;

    let state = h.machine.handle_timeout(Timeout::PeerIdle).await;
    assert_eq!(state, SessionState::InSession);
    let sent = h.sent();
    assert!(sent[0].is(&MsgType::TestRequest));
    assert_eq!(sent[0].body.get_str(tags::TEST_REQ_ID).unwrap(), "TEST1");
    assert!(h.timers().contains(&TimerCommand::Arm(
        Timeout::TestRequestTimeout,
        Duration::from_secs(30)
    )));

    let state = h.machine.handle_timeout(Timeout::TestRequestTimeout).await;
    assert_eq!(state, SessionState::Latent);
    assert_eq!(h.logouts(), 1);
    assert!(h.log.has_event("heartbeat timeout"));
}

#[tokio::test]
async fn test_heartbeat_answers_test_request() {
    let mut h = logged_on(config(), Recorder::default()).await;
    h.machine.handle_timeout(Timeout::PeerIdle).await;
    h.timers();

    let heartbeat = inbound(builders::heartbeat(&theirs(), Some("TEST1")), 2);
    assert_eq!(h.receive(heartbeat).await, SessionState::InSession);
    assert!(h.timers().contains(&TimerCommand::Cancel(Timeout::TestRequestTimeout)));
    assert!(h.machine.session().heartbeat().pending_test_request().is_none());

    let state = h.machine.handle_timeout(Timeout::TestRequestTimeout).await;
    assert_eq!(state, SessionState::InSession);
}

#[tokio::test]
async fn test_application_send_requires_logon() {
    let mut h = Harness::new(config(), Box::new(MemoryStore::new()), Recorder::default());

    let err = h.machine.send(outbound_order("A")).await.unwrap_err();

    assert!(matches!(
        err,
        FixError::Session(SessionError::InvalidState { .. })
    ));
    assert_eq!(h.store().next_sender_seq(), 1);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_transport_failure_keeps_sequence_consumed() {
    let mut h = logged_on(config(), Recorder::default()).await;
    let next = h.store().next_sender_seq();
    h.wire.close();

    let seq = h.machine.send(outbound_order("A")).await.unwrap();

    assert_eq!(seq, next);
    assert_eq!(h.store().next_sender_seq(), next + 1);
    assert_eq!(h.store().get_messages(seq, seq).await.unwrap().len(), 1);
    assert!(h.log.has_event("send failed"));
}

#[tokio::test]
async fn test_disconnect_resets_when_configured() {
    let mut h = logged_on(config().with_reset_on_disconnect(true), Recorder::default()).await;

    h.machine.disconnect().await.unwrap();

    assert_eq!(h.machine.state(), SessionState::Latent);
    assert_eq!(h.logouts(), 1);
    assert_eq!(h.store().next_sender_seq(), 1);
    assert_eq!(h.store().next_target_seq(), 1);
}

#[tokio::test]
async fn test_handle_bytes() {
    let mut h = Harness::new(config(), Box::new(MemoryStore::new()), Recorder::default());
    h.machine.accept().unwrap();

    let state = h.machine.handle_bytes(b"not a fix message").await;
    assert_eq!(state, SessionState::LogonPending { initiator: false });
    assert!(h.log.has_event("undecodable"));

    let raw = fixgate_tagvalue::encode(&logon(1)).unwrap();
    let state = h.machine.handle_bytes(&raw).await;
    assert_eq!(state, SessionState::InSession);
    assert_eq!(h.log.incoming().len(), 2);
}

/// Store whose writes always fail.
struct BrokenStore(MemoryStore);

#[async_trait]
impl MessageStore for BrokenStore {
    fn next_sender_seq(&self) -> u64 {
        self.0.next_sender_seq()
    }

    fn next_target_seq(&self) -> u64 {
        self.0.next_target_seq()
    }

    fn creation_time(&self) -> Timestamp {
        self.0.creation_time()
    }

    async fn set_next_sender_seq(&self, _seq: u64) -> Result<(), StoreError> {
        Err(StoreError::persistence("set_next_sender_seq", "disk full"))
    }

    async fn set_next_target_seq(&self, _seq: u64) -> Result<(), StoreError> {
        Err(StoreError::persistence("set_next_target_seq", "disk full"))
    }

    async fn save_message(&self, _seq: u64, _message: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::persistence("save_message", "disk full"))
    }

    async fn save_message_and_incr_next_sender_seq(
        &self,
        _seq: u64,
        _message: &[u8],
    ) -> Result<(), StoreError> {
        Err(StoreError::persistence(
            "save_message_and_incr_next_sender_seq",
            "disk full",
        ))
    }

    async fn get_messages(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError> {
        self.0.get_messages(begin, end).await
    }

    async fn reset(&self) -> Result<(), StoreError> {
        Err(StoreError::persistence("reset", "disk full"))
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_persistence_failure_on_send_is_returned() {
    let mut h = Harness::new(
        config(),
        Box::new(BrokenStore(MemoryStore::new())),
        Recorder::default(),
    );

    let err = h
        .machine
        .send(builders::heartbeat(&ours(), None))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FixError::Store(StoreError::Persistence { .. })
    ));
    assert_eq!(h.store().next_sender_seq(), 1);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_during_logon_goes_latent() {
    let mut h = Harness::new(
        config(),
        Box::new(BrokenStore(MemoryStore::new())),
        Recorder::default(),
    );
    h.machine.accept().unwrap();

    let state = h.receive(logon(1)).await;

    assert_eq!(state, SessionState::Latent);
    assert_eq!(h.logons(), 0);
    assert!(h.log.has_event("persistence error"));
}

#[tokio::test]
async fn test_sql_backed_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store_config = SqlStoreConfig::sqlite(dir.path().join("session.db").to_string_lossy());

    {
        let store = SqlStore::connect(ours(), &store_config).await.unwrap();
        let mut h = Harness::new(config(), Box::new(store), Recorder::default());
        h.machine.accept().unwrap();
        h.receive(logon(1)).await;
        h.machine.send(outbound_order("A")).await.unwrap();
        h.receive(order(2, "B")).await;
        assert_eq!(h.store().next_sender_seq(), 3);
        assert_eq!(h.store().next_target_seq(), 3);
    }

    let store = SqlStore::connect(ours(), &store_config).await.unwrap();
    assert_eq!(store.next_sender_seq(), 3);
    assert_eq!(store.next_target_seq(), 3);
    let stored = store.get_messages(2, 2).await.unwrap();
    let resent = fixgate_tagvalue::decode(&stored[0]).unwrap();
    assert_eq!(resent.body.get_str(11).unwrap(), "A");
}
