//! Failure pipeline integration tests
//!
//! End-to-end tests from the interceptor through the alert queue to the
//! notification channels and the event log. Covers generic failure
//! responses, severity routing, channel isolation, response latency,
//! cancellation of the originating request, real HTTP channels against a
//! local capture server, and SQLite persistence.

use axum::http::{StatusCode, Uri};
use axum::Router;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use txguard::channel::{CallLog, MemoryChannel};
use txguard::{
    Alert, AlertDispatcher, AlertQueue, ChannelKind, EventLog, EventStore, GuardConfig,
    HandlerError, RequestInfo, Response, Severity, SqliteEventStore, TransactionInterceptor,
    TRANSACTION_FAILURE_BODY,
};

struct Pipeline {
    interceptor: TransactionInterceptor,
    channels: HashMap<ChannelKind, Arc<MemoryChannel>>,
}

fn pipeline(build: impl Fn(ChannelKind) -> MemoryChannel, event_log: EventLog) -> Pipeline {
    let mut dispatcher = AlertDispatcher::new(Duration::from_secs(10));
    let mut channels = HashMap::new();
    for kind in ChannelKind::ALL {
        let channel = Arc::new(build(kind));
        dispatcher = dispatcher.with_channel(channel.clone());
        channels.insert(kind, channel);
    }

    let (queue, _worker) = AlertQueue::start(Arc::new(dispatcher), 64);
    Pipeline {
        interceptor: TransactionInterceptor::new(Arc::new(queue), Arc::new(event_log)),
        channels,
    }
}

async fn failing_request(interceptor: &TransactionInterceptor, method: &str, path: &str) -> Response {
    interceptor
        .handle(&RequestInfo::new(method, path), async {
            Err::<Response, _>(HandlerError::database("connection lost"))
        })
        .await
        .unwrap()
}

async fn eventually<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

// ─── Interception ────────────────────────────────────────────────

#[tokio::test]
async fn test_success_logs_single_complete_entry() {
    let p = pipeline(MemoryChannel::new, EventLog::new(100));

    let response = p
        .interceptor
        .handle(&RequestInfo::new("GET", "/health"), async {
            Ok::<_, HandlerError>(Response::json(200, r#"{"status":"ok"}"#))
        })
        .await
        .unwrap();
    assert_eq!(response.status, 200);

    let entries = p.interceptor.event_log().recent(10);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event, "db_transaction_complete");
    assert_eq!(entries[0].method, "GET");
    assert_eq!(entries[0].path, "/health");
    assert_eq!(entries[0].status_or_error, "200");
    assert!(entries[0].response_time >= 0.0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    for channel in p.channels.values() {
        assert_eq!(channel.call_count(), 0);
    }
}

#[tokio::test]
async fn test_database_failure_returns_exact_generic_body() {
    let p = pipeline(MemoryChannel::new, EventLog::new(100));

    let response = failing_request(&p.interceptor, "POST", "/orders").await;

    assert_eq!(response.status, 500);
    assert_eq!(response.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        std::str::from_utf8(&response.body).unwrap(),
        r#"{"status":"error","message":"Error interno en el sistema"}"#
    );
    assert_eq!(&response.body[..], TRANSACTION_FAILURE_BODY.as_bytes());

    let entries = p.interceptor.event_log().recent(10);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event, "db_transaction_error");
    assert_eq!(entries[0].status_or_error, "connection lost");
}

// ─── Routing ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_critical_reaches_all_channels_despite_chat_failure() {
    let log = CallLog::new();
    let p = pipeline(
        |kind| {
            let channel = MemoryChannel::new(kind).with_call_log(log.clone());
            if kind == ChannelKind::Chat {
                channel.failing("chat endpoint unavailable")
            } else {
                channel
            }
        },
        EventLog::new(100),
    );

    failing_request(&p.interceptor, "POST", "/orders").await;
    eventually(|| log.calls().len() == 4).await;

    assert_eq!(
        log.calls(),
        vec![
            ChannelKind::Email,
            ChannelKind::Chat,
            ChannelKind::Sms,
            ChannelKind::Webhook
        ]
    );
    let alert = &p.channels[&ChannelKind::Webhook].received()[0];
    assert_eq!(alert.severity, Severity::Critical);
    assert!(alert.message.contains("POST /orders"));
    assert!(alert.message.contains("connection lost"));
}

#[tokio::test]
async fn test_info_alert_skips_email_and_sms() {
    let log = CallLog::new();
    let mut dispatcher = AlertDispatcher::new(Duration::from_secs(1));
    let mut channels = HashMap::new();
    for kind in ChannelKind::ALL {
        let channel = Arc::new(MemoryChannel::new(kind).with_call_log(log.clone()));
        dispatcher = dispatcher.with_channel(channel.clone());
        channels.insert(kind, channel);
    }

    let outcomes = dispatcher
        .dispatch_alert(&Alert::new("Nightly job", "Finished", Severity::Info))
        .await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.succeeded));
    assert_eq!(channels[&ChannelKind::Email].call_count(), 0);
    assert_eq!(channels[&ChannelKind::Sms].call_count(), 0);
    assert_eq!(channels[&ChannelKind::Chat].call_count(), 1);
    assert_eq!(channels[&ChannelKind::Webhook].call_count(), 1);
}

#[tokio::test]
async fn test_unconfigured_email_does_not_block_others() {
    let dispatcher = ChannelKind::ALL
        .into_iter()
        .fold(AlertDispatcher::new(Duration::from_secs(1)), |d, kind| {
            let channel = if kind == ChannelKind::Email {
                MemoryChannel::unconfigured(kind)
            } else {
                MemoryChannel::new(kind)
            };
            d.with_channel(Arc::new(channel))
        });

    let outcomes = dispatcher
        .dispatch_alert(&Alert::new("Outage", "Database down", Severity::Critical))
        .await;

    let names: Vec<&str> = outcomes.iter().map(|o| o.channel_name.as_str()).collect();
    assert_eq!(names, vec!["email", "chat", "sms", "webhook"]);
    assert!(!outcomes[0].succeeded);
    assert_eq!(outcomes[0].error.as_deref(), Some("unconfigured"));
    assert!(outcomes[1..].iter().all(|o| o.succeeded));
}

// ─── Latency ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_slow_email_does_not_delay_response() {
    let p = pipeline(
        |kind| {
            let channel = MemoryChannel::new(kind);
            if kind == ChannelKind::Email {
                channel.with_delay(Duration::from_secs(5))
            } else {
                channel
            }
        },
        EventLog::new(100),
    );

    let start = Instant::now();
    let response = failing_request(&p.interceptor, "POST", "/orders").await;
    assert!(start.elapsed() < Duration::from_millis(50));
    assert_eq!(response.status, 500);

    // The other channels finish while email is still sleeping
    let webhook = p.channels[&ChannelKind::Webhook].clone();
    eventually(|| webhook.call_count() == 1).await;
}

// ─── Cancellation ────────────────────────────────────────────────

#[tokio::test]
async fn test_aborted_request_alert_still_delivered() {
    let p = pipeline(
        |kind| MemoryChannel::new(kind).with_delay(Duration::from_millis(200)),
        EventLog::new(100),
    );
    let webhook = p.channels[&ChannelKind::Webhook].clone();
    let interceptor = Arc::new(p.interceptor);
    let (handled_tx, handled_rx) = tokio::sync::oneshot::channel();

    let request_task = {
        let interceptor = interceptor.clone();
        tokio::spawn(async move {
            let _response = failing_request(&interceptor, "POST", "/orders").await;
            let _ = handled_tx.send(());
            // Client connection stays open until the task is aborted
            std::future::pending::<()>().await;
        })
    };

    handled_rx.await.unwrap();
    request_task.abort();
    assert!(request_task.await.unwrap_err().is_cancelled());
    assert_eq!(webhook.delivered_count(), 0);

    eventually(|| webhook.delivered_count() == 1).await;
    assert_eq!(webhook.received().len(), 1);
    assert!(webhook.received()[0].message.contains("POST /orders"));
    assert_eq!(interceptor.event_log().len(), 1);
}

// ─── HTTP Channels ───────────────────────────────────────────────

type Captures = Arc<Mutex<Vec<(String, String)>>>;

async fn capture_server() -> (String, Captures) {
    let captures: Captures = Arc::new(Mutex::new(Vec::new()));
    let recorded = captures.clone();

    let app = Router::new().fallback(move |uri: Uri, body: String| {
        let recorded = recorded.clone();
        async move {
            recorded.lock().unwrap().push((uri.path().to_string(), body));
            (StatusCode::OK, r#"{"sid":"SM42"}"#)
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), captures)
}

#[tokio::test]
async fn test_configured_http_channels_deliver() {
    let (base, captures) = capture_server().await;
    let vars: HashMap<&str, String> = HashMap::from([
        ("SLACK_WEBHOOK_URL", format!("{}/chat", base)),
        ("WEBHOOK_URL", format!("{}/hook", base)),
        ("TWILIO_ACCOUNT_SID", "AC1".to_string()),
        ("TWILIO_AUTH_TOKEN", "secret".to_string()),
        ("TWILIO_PHONE_NUMBER", "+15550001".to_string()),
        ("ALERT_PHONE_NUMBER", "+15550002".to_string()),
        ("TWILIO_API_BASE", base.clone()),
    ]);
    let config = GuardConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
    let dispatcher = AlertDispatcher::from_config(&config).unwrap();
    assert!(!dispatcher.is_configured(ChannelKind::Email));

    let outcomes = dispatcher
        .dispatch_alert(&Alert::new("Outage", "Database down", Severity::Critical))
        .await;

    let succeeded: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.succeeded)
        .map(|o| o.channel_name.as_str())
        .collect();
    assert_eq!(succeeded, vec!["chat", "sms", "webhook"]);

    let mut paths: Vec<String> = captures
        .lock()
        .unwrap()
        .iter()
        .map(|(path, _)| path.clone())
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "/2010-04-01/Accounts/AC1/Messages.json".to_string(),
            "/chat".to_string(),
            "/hook".to_string(),
        ]
    );

    let chat_body = captures
        .lock()
        .unwrap()
        .iter()
        .find(|(path, _)| path == "/chat")
        .map(|(_, body)| body.clone())
        .unwrap();
    let chat: serde_json::Value = serde_json::from_str(&chat_body).unwrap();
    assert_eq!(chat["text"], "*CRITICAL ALERT*: Database down");
}

// ─── Persistence ─────────────────────────────────────────────────

#[tokio::test]
async fn test_failure_persisted_to_sqlite() {
    let store = Arc::new(SqliteEventStore::connect("sqlite::memory:").await.unwrap());
    let p = pipeline(
        MemoryChannel::new,
        EventLog::new(100).with_store(store.clone(), false),
    );

    p.interceptor
        .handle(&RequestInfo::new("GET", "/health"), async {
            Ok::<_, HandlerError>(Response::json(200, "{}"))
        })
        .await
        .unwrap();
    failing_request(&p.interceptor, "POST", "/orders").await;

    let mut rows = Vec::new();
    for _ in 0..200 {
        rows = store.recent(10).await.unwrap();
        if !rows.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_type, "db_transaction_error");
    assert_eq!(rows[0].description, "POST /orders: connection lost");

    let logged = p.interceptor.event_log().recent(1);
    assert_eq!(rows[0].timestamp, logged[0].timestamp);
}
