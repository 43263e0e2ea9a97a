use mapcast::prelude::*;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// One entry of the `MAPCAST_USERS` seed file.
#[derive(Debug, Deserialize, PartialEq)]
struct SeedUser {
    email: Email,
    token: String,
}

fn bind_addr(ip: Option<String>, port: Option<String>) -> String {
    let ip = ip.unwrap_or_else(|| "127.0.0.1".into());
    let port = port.unwrap_or_else(|| "3000".into());
    format!("{ip}:{port}")
}

fn parse_seed(json: &str) -> Result<Vec<SeedUser>, serde_json::Error> {
    serde_json::from_str(json)
}

async fn seed_store(path: &str) -> Result<MemoryIdentityStore, Box<dyn std::error::Error>> {
    let json = tokio::fs::read_to_string(path).await?;
    let store = MemoryIdentityStore::new();
    for user in parse_seed(&json)? {
        store.insert(Identity::new(user.email), user.token).await;
    }
    Ok(store)
}

// ---------------------------------------------------------------------------
// Event console
// ---------------------------------------------------------------------------

/// Parses one console line. Blank lines are skipped.
fn parse_event(line: &str) -> Option<Result<DomainEvent, serde_json::Error>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

/// Reads JSON-encoded domain events from stdin, one per line, and publishes
/// them. Stands in for the CRUD handlers of the HTTP API.
async fn run_console(events: Arc<EventBus>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_event(&line) {
            Some(Ok(event)) => {
                tracing::info!(kind = %event.kind(), "publishing event");
                events.publish(event);
            }
            Some(Err(e)) => tracing::warn!(error = %e, "unreadable event line"),
            None => {}
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = bind_addr(std::env::var("IP").ok(), std::env::var("PORT").ok());
    let store = match std::env::var("MAPCAST_USERS") {
        Ok(path) => {
            let store = seed_store(&path).await?;
            tracing::info!(%path, users = store.len().await, "seeded identity store");
            store
        }
        Err(_) => MemoryIdentityStore::new(),
    };

    let server = MapcastServerBuilder::new()
        .bind(&addr)
        .build(Arc::new(store))
        .await?;
    tracing::info!(addr = %server.local_addr()?, "map relay listening");

    let events = server.publisher();
    tokio::spawn(async move {
        if let Err(e) = run_console(events).await {
            tracing::error!(error = %e, "event console stopped");
        }
    });

    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    #[test]
    fn test_bind_addr_defaults() {
        assert_eq!(bind_addr(None, None), "127.0.0.1:3000");
        assert_eq!(
            bind_addr(Some("0.0.0.0".into()), Some("8080".into())),
            "0.0.0.0:8080"
        );
    }

    #[test]
    fn test_parse_seed_reads_users() {
        let users = parse_seed(r#"[{"email":"a@x.com","token":"tok-a"}]"#).unwrap();
        assert_eq!(
            users,
            vec![SeedUser {
                email: Email::new("a@x.com"),
                token: "tok-a".into(),
            }]
        );
    }

    #[test]
    fn test_parse_seed_rejects_missing_token() {
        assert!(parse_seed(r#"[{"email":"a@x.com"}]"#).is_err());
    }

    #[test]
    fn test_parse_event_skips_blank_lines() {
        assert!(parse_event("   ").is_none());
    }

    #[test]
    fn test_parse_event_reads_tagged_json() {
        let event = parse_event(r#"{"type":"LayerRemoved","id":"l1"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, DomainEvent::LayerRemoved { id: "l1".into() });
        assert!(parse_event("not json").unwrap().is_err());
    }

    #[tokio::test]
    async fn test_seeded_user_binds_and_receives_others_markers() {
        let store = MemoryIdentityStore::new();
        for user in parse_seed(r#"[{"email":"a@x.com","token":"tok-a"}]"#).unwrap() {
            store.insert(Identity::new(user.email), user.token).await;
        }
        let server = MapcastServerBuilder::new()
            .bind("127.0.0.1:0")
            .build(Arc::new(store))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let events = server.publisher();
        let registry = server.registry();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws.send(Message::text("1|tok-a")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while registry.all_sessions().iter().all(|s| !s.is_authenticated()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let line = r#"{"type":"MarkerAdded","id":"m7","name":"Pond","url":"u","lat":1.5,"lng":50.0,"owner_email":"b@x.com"}"#;
        events.publish(parse_event(line).unwrap().unwrap());

        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(msg.to_text().unwrap(), "101|m7|Pond|u|1.5|50");
    }
}
