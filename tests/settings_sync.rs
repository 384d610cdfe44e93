#![cfg(feature = "server")]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::patch;
use backyard::database::{Database, DatabaseConfig};
use backyard::persistence::SETTINGS_KEY;
use backyard::serve::{ServeState, router};
use backyard::{
    BoardSettings, BoardSettingsPatch, HttpSettingsRemote, KeyValueStore, MemoryStore,
    RemoteConfig, RemoteError, SettingsError, SettingsPersistence,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn spawn(app: Router) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

async fn spawn_backyard() -> Result<(TempDir, SocketAddr)> {
    let temp_dir = TempDir::new()?;
    let db = Database::new(DatabaseConfig {
        path: temp_dir.path().join("settings.db"),
        max_connections: 1,
    })
    .await?;
    let addr = spawn(router(Arc::new(ServeState::new(db)))).await?;
    Ok((temp_dir, addr))
}

async fn spawn_failing() -> Result<SocketAddr> {
    let app = Router::new().route(
        "/api/settings",
        patch(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database offline") }),
    );
    spawn(app).await
}

async fn closed_port() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

fn client(addr: SocketAddr) -> Result<HttpSettingsRemote> {
    Ok(HttpSettingsRemote::new(RemoteConfig {
        base_url: format!("http://{addr}/api"),
        timeout: Duration::from_secs(5),
    })?)
}

fn seeded_store() -> Result<MemoryStore> {
    let store = MemoryStore::new();
    store.set_item(SETTINGS_KEY, r##"{"strokeWidth":2,"edgeColor":"#000"}"##)?;
    Ok(store)
}

fn stored(store: &MemoryStore) -> Result<Value> {
    let raw = store.get_item(SETTINGS_KEY)?.unwrap_or_default();
    Ok(serde_json::from_str(&raw)?)
}

fn white_edges() -> BoardSettingsPatch {
    BoardSettingsPatch {
        edge_color: Some("#fff".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn update_converges_locally_on_success_server_error_and_network_error() -> Result<()> {
    let (_dir, healthy) = spawn_backyard().await?;
    let failing = spawn_failing().await?;
    let offline = closed_port().await?;

    let mut outcomes = Vec::new();
    for addr in [healthy, failing, offline] {
        let store = seeded_store()?;
        let persistence = SettingsPersistence::new(store.clone(), client(addr)?);

        let result = persistence.update_on_server("user-1", &white_edges()).await;

        assert_eq!(stored(&store)?, json!({ "strokeWidth": 2, "edgeColor": "#fff" }));
        outcomes.push(result);
    }

    assert!(outcomes[0].is_ok());
    assert!(matches!(
        &outcomes[1],
        Err(SettingsError::Remote(RemoteError::Server { status: 500, .. }))
    ));
    assert!(matches!(
        &outcomes[2],
        Err(SettingsError::Remote(RemoteError::Network(_)))
    ));
    Ok(())
}

#[tokio::test]
async fn network_failure_keeps_local_edit() -> Result<()> {
    let store = seeded_store()?;
    let persistence = SettingsPersistence::new(store.clone(), client(closed_port().await?)?);

    let result = persistence.update_on_server("user-1", &white_edges()).await;

    assert!(result.is_err());
    assert_eq!(stored(&store)?, json!({ "strokeWidth": 2, "edgeColor": "#fff" }));
    Ok(())
}

#[tokio::test]
async fn saved_settings_come_back_on_another_device() -> Result<()> {
    let (_dir, addr) = spawn_backyard().await?;
    let settings = BoardSettings {
        snap_to_grid: false,
        stroke_width: 3.5,
        ..BoardSettings::default()
    };

    let laptop = SettingsPersistence::new(MemoryStore::new(), client(addr)?);
    laptop.save_to_server("user-7", &settings).await?;
    assert_eq!(laptop.load(), settings);

    let phone_store = MemoryStore::new();
    let phone = SettingsPersistence::new(phone_store.clone(), client(addr)?);
    assert_eq!(phone.load_from_server("user-7").await?, Some(settings.clone()));
    assert_eq!(phone.load(), settings);

    let stranger_store = MemoryStore::new();
    let stranger = SettingsPersistence::new(stranger_store.clone(), client(addr)?);
    assert_eq!(stranger.load_from_server("nobody").await?, None);
    assert!(stranger_store.get_item(SETTINGS_KEY)?.is_none());
    Ok(())
}

#[tokio::test]
async fn patch_on_server_merges_over_saved_record() -> Result<()> {
    let (_dir, addr) = spawn_backyard().await?;
    let persistence = SettingsPersistence::new(MemoryStore::new(), client(addr)?);

    persistence
        .save_to_server("user-2", &BoardSettings::default())
        .await?;
    persistence.update_on_server("user-2", &white_edges()).await?;

    let remote = persistence.load_from_server("user-2").await?.unwrap();
    assert_eq!(remote.edge_color, "#fff");
    assert_eq!(remote.stroke_width, BoardSettings::default().stroke_width);
    Ok(())
}
