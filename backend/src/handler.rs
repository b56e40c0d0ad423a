use crate::{
    client::{Client, Clients, Status},
    session::Sessions,
    ws,
};
use serde::Serialize;
use uuid::Uuid;
use warp::{http::StatusCode, reply::json, Rejection, Reply};

type Result<T> = std::result::Result<T, Rejection>;

#[derive(Serialize, Debug)]
pub struct RegisterResponse {
    url: String,
}

pub async fn register_handler(port: u16, clients: Clients) -> Result<impl Reply> {
    let uuid = Uuid::new_v4().as_simple().to_string();

    register_client(uuid.clone(), clients).await;
    Ok(json(&RegisterResponse {
        url: format!("ws://127.0.0.1:{}/ws/{}", port, uuid),
    }))
}

async fn register_client(id: String, clients: Clients) {
    clients.write().await.insert(
        id,
        Client {
            status: Status::ChoosingMode,
            sender: None,
        },
    );
}

pub async fn unregister_handler(id: String, clients: Clients) -> Result<impl Reply> {
    clients.write().await.remove(&id);
    Ok(StatusCode::OK)
}

pub async fn ws_handler(
    ws: warp::ws::Ws,
    id: String,
    clients: Clients,
    sessions: Sessions,
) -> Result<impl Reply> {
    let client = clients.read().await.get(&id).cloned();
    match client {
        Some(c) => {
            Ok(ws.on_upgrade(move |socket| ws::client_connection(socket, id, clients, c, sessions)))
        }
        None => Err(warp::reject::not_found()),
    }
}

pub async fn health_handler() -> Result<impl Reply> {
    Ok(StatusCode::OK)
}
