//! Watch-loop behavior tests using scripted in-memory sessions.
//!
//! These tests drive [`MailboxWatcher`] through the public [`MailSession`]
//! trait with a scripted session, under a paused tokio clock so backoff
//! delays are observed deterministically instead of slept through.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use mail_watch::{
    Error, MailSession, MailboxRole, MailboxWatcher, NewMessage, Result, RetryPolicy, SessionEvent,
};

// ─────────────────────────────────────────────────────────────────────────────
// Scripted session
// ─────────────────────────────────────────────────────────────────────────────

/// Shared view of everything a scripted session was asked to do.
#[derive(Debug, Default)]
struct CallLog {
    /// Call names ("connect", "open", "fetch 3", "close") in order.
    calls: Vec<String>,
    /// Timestamp (paused tokio clock) of every connect attempt.
    connect_times: Vec<Instant>,
}

impl CallLog {
    fn connects(&self) -> usize {
        self.connect_times.len()
    }
}

/// An in-memory [`MailSession`] driven by a prepared script of events.
struct ScriptedSession {
    log: Arc<Mutex<CallLog>>,
    /// Events delivered by `next_event` in order; an empty script pends forever.
    events: VecDeque<SessionEvent>,
    /// How many connect attempts fail before one succeeds.
    connect_failures: u32,
    /// Message count reported when the mailbox is opened.
    initial_count: u32,
    /// Whether the transport still claims to be alive after an `Error` event.
    usable_after_error: bool,
    /// Extra latency per fetched identifier.
    fetch_delays: HashMap<u32, Duration>,
    usable: bool,
}

impl ScriptedSession {
    fn new(log: Arc<Mutex<CallLog>>) -> Self {
        Self {
            log,
            events: VecDeque::new(),
            connect_failures: 0,
            initial_count: 0,
            usable_after_error: false,
            fetch_delays: HashMap::new(),
            usable: false,
        }
    }

    fn with_events(mut self, events: impl IntoIterator<Item = SessionEvent>) -> Self {
        self.events = events.into_iter().collect();
        self
    }

    fn record(&self, call: impl Into<String>) {
        self.log.lock().unwrap().calls.push(call.into());
    }
}

impl MailSession for ScriptedSession {
    async fn connect(&mut self) -> Result<()> {
        {
            let mut log = self.log.lock().unwrap();
            log.calls.push("connect".into());
            log.connect_times.push(Instant::now());
        }

        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            self.usable = false;
            return Err(Error::TcpConnect {
                target: "imap.test:993".into(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            });
        }

        self.usable = true;
        Ok(())
    }

    async fn open_mailbox(&mut self, _mailbox: &str, _read_only: bool) -> Result<u32> {
        self.record("open");
        Ok(self.initial_count)
    }

    async fn fetch(&mut self, identifier: u32) -> Result<Vec<u8>> {
        self.record(format!("fetch {identifier}"));

        let delay = self.fetch_delays.get(&identifier).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(format!("Subject: message {identifier}\r\n\r\nbody {identifier}").into_bytes())
    }

    fn is_usable(&self) -> bool {
        self.usable
    }

    async fn close(&mut self) {
        self.record("close");
        self.usable = false;
        self.events.push_front(SessionEvent::Closed);
    }

    async fn next_event(&mut self) -> SessionEvent {
        match self.events.pop_front() {
            Some(event) => {
                match &event {
                    SessionEvent::Closed => self.usable = false,
                    SessionEvent::Error { .. } => self.usable = self.usable_after_error,
                    SessionEvent::CountChanged { .. } => {}
                }
                event
            }
            // Script exhausted: a healthy session on a quiet mailbox
            None => std::future::pending().await,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn spawn_watcher(
    role: MailboxRole,
    session: ScriptedSession,
) -> mpsc::Receiver<NewMessage> {
    let (tx, rx) = mpsc::channel(16);
    let watcher = MailboxWatcher::new(
        role,
        role.default_mailbox(),
        session,
        RetryPolicy::default(),
        tx,
    );
    tokio::spawn(watcher.run());
    rx
}

async fn recv_or_panic(rx: &mut mpsc::Receiver<NewMessage>) -> NewMessage {
    tokio::time::timeout(Duration::from_secs(3600), rx.recv())
        .await
        .expect("timed out waiting for a new message")
        .expect("event channel closed")
}

async fn wait_for_connects(log: &Arc<Mutex<CallLog>>, wanted: usize) {
    tokio::time::timeout(Duration::from_secs(3600), async {
        loop {
            if log.lock().unwrap().connects() >= wanted {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for connect attempts");
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_initial_batch_emitted_in_order() {
    let log = Arc::new(Mutex::new(CallLog::default()));
    let session = ScriptedSession::new(Arc::clone(&log))
        .with_events([SessionEvent::CountChanged { count: 2 }]);

    let mut rx = spawn_watcher(MailboxRole::Inbox, session);

    let first = recv_or_panic(&mut rx).await;
    assert_eq!(first.identifier, 1);
    assert_eq!(first.role, MailboxRole::Inbox);
    assert_eq!(first.message.subject, "message 1");

    let second = recv_or_panic(&mut rx).await;
    assert_eq!(second.identifier, 2);
    assert_eq!(second.message.subject, "message 2");

    // Idle and connected afterwards: nothing further arrives
    let nothing = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
    assert!(nothing.is_err());

    let calls = log.lock().unwrap().calls.clone();
    assert_eq!(calls, ["connect", "open", "fetch 1", "fetch 2"]);
}

#[tokio::test(start_paused = true)]
async fn test_order_survives_slow_middle_fetch() {
    let log = Arc::new(Mutex::new(CallLog::default()));
    let mut session = ScriptedSession::new(Arc::clone(&log))
        .with_events([SessionEvent::CountChanged { count: 13 }]);
    session.initial_count = 10;
    // 12 is dramatically slower than its neighbours combined
    session.fetch_delays =
        HashMap::from([(11, Duration::from_millis(10)), (12, Duration::from_secs(5))]);

    let mut rx = spawn_watcher(MailboxRole::Inbox, session);

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(recv_or_panic(&mut rx).await.identifier);
    }

    // Sequential fetching preserves ascending order regardless of latency
    assert_eq!(received, vec![11, 12, 13]);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_delays_escalate_linearly() {
    let log = Arc::new(Mutex::new(CallLog::default()));
    let mut session = ScriptedSession::new(Arc::clone(&log));
    session.connect_failures = 3;

    let _rx = spawn_watcher(MailboxRole::Inbox, session);

    // Initial attempt + three retries (the last one succeeds)
    wait_for_connects(&log, 4).await;

    let times = log.lock().unwrap().connect_times.clone();
    let deltas: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();

    // Observed delays: immediate, then +10s per failed attempt
    assert_eq!(deltas[0], Duration::ZERO);
    assert_eq!(deltas[1], Duration::from_secs(10));
    assert_eq!(deltas[2], Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_successful_reconnect_resets_backoff() {
    let log = Arc::new(Mutex::new(CallLog::default()));
    let session = ScriptedSession::new(Arc::clone(&log))
        .with_events([SessionEvent::Closed, SessionEvent::Closed]);

    let _rx = spawn_watcher(MailboxRole::Inbox, session);

    wait_for_connects(&log, 3).await;

    let times = log.lock().unwrap().connect_times.clone();
    // Both reconnects happen immediately: the delay reset to zero after each
    // fully successful reconnect
    assert_eq!(times[1] - times[0], Duration::ZERO);
    assert_eq!(times[2] - times[1], Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_disconnect_notifications_yield_one_reconnect() {
    let log = Arc::new(Mutex::new(CallLog::default()));
    let mut session = ScriptedSession::new(Arc::clone(&log)).with_events([SessionEvent::Error {
        detail: "went sideways".into(),
    }]);
    // The transport still claims to be alive when the error arrives
    session.usable_after_error = true;

    let _rx = spawn_watcher(MailboxRole::Inbox, session);

    wait_for_connects(&log, 2).await;

    // The error on a usable session is answered with a single close; the
    // close's own Closed notification drives exactly one real reconnect.
    let calls = log.lock().unwrap().calls.clone();
    assert_eq!(calls, ["connect", "open", "close", "connect", "open"]);
}

#[tokio::test(start_paused = true)]
async fn test_failing_watcher_does_not_disturb_healthy_one() {
    let broken_log = Arc::new(Mutex::new(CallLog::default()));
    let mut broken = ScriptedSession::new(Arc::clone(&broken_log));
    broken.connect_failures = u32::MAX; // never comes up

    let healthy_log = Arc::new(Mutex::new(CallLog::default()));
    let healthy = ScriptedSession::new(Arc::clone(&healthy_log))
        .with_events([SessionEvent::CountChanged { count: 1 }]);

    let mut broken_rx = spawn_watcher(MailboxRole::Inbox, broken);
    let mut healthy_rx = spawn_watcher(MailboxRole::Sent, healthy);

    // The healthy watcher delivers normally
    let event = recv_or_panic(&mut healthy_rx).await;
    assert_eq!(event.role, MailboxRole::Sent);
    assert_eq!(event.identifier, 1);

    // The broken one keeps retrying on its own, emitting nothing
    wait_for_connects(&broken_log, 3).await;
    assert!(broken_rx.try_recv().is_err());
}
