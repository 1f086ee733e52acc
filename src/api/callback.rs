use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::Mutex;

/// Receives the OAuth redirect and parks the authorization code.
///
/// The code is single-use and time-limited; the driver picks it up from
/// the shared state and hands it to the token manager for the actual
/// exchange. Keeping the exchange out of the handler leaves the manager
/// as the only owner of token state.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared_state): Extension<Arc<Mutex<Option<String>>>>,
) -> Html<&'static str> {
    if let Some(code) = params.get("code") {
        let mut state = shared_state.lock().await;
        *state = Some(code.clone());
        Html("<h2>Authorization received.</h2><p>Close this browser window.</p>")
    } else {
        Html("<h4>Missing authorization code.</h4>")
    }
}
