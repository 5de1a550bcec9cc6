// src/handlers/price_events.rs

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::{
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::pricing::PRICE_UPDATED_EVENT,
};

// GET /api/price-events
// Cada conexão assina o broadcast e recebe só os canais visíveis para o chamador.
#[utoipa::path(
    get,
    path = "/api/price-events",
    tag = "Pricing",
    responses(
        (status = 200, description = "Stream SSE de eventos 'price:updated'")
    ),
    security(("api_jwt" = []))
)]
pub async fn price_events(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(tenant_id = %caller.tenant_id, "Assinante de eventos de preço conectado");

    let rx = app_state.notifier.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let caller = caller.clone();
        async move {
            match result {
                Ok(message) if message.channel.is_visible_to(&caller) => {
                    match Event::default().event(PRICE_UPDATED_EVENT).json_data(&message.event) {
                        Ok(event) => Some(Ok(event)),
                        Err(e) => {
                            tracing::warn!("Falha ao serializar evento de preço: {:?}", e);
                            None
                        }
                    }
                }
                Ok(_) => None,
                // Assinante lento: os eventos perdidos não são reenviados.
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, tenant_id = %caller.tenant_id, "Assinante de eventos atrasado");
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
