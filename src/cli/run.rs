use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::Mutex,
    time::interval,
};

use crate::{
    config,
    display::{DisplaySink, RefreshScope, TermDisplay},
    error, info,
    management::TokenManager,
    server::start_api_server,
    spotify::player::PlaybackSession,
    success,
    types::{Credentials, TrackPoll},
    warning,
};

/// Runs the controller: authorization flow, then the single control loop.
///
/// The flow mirrors the device's startup: a local callback server is
/// spawned, the authorization URL is opened in the browser, and the
/// redirect delivers a one-time code the token manager exchanges for a
/// token pair. Tokens live in memory only; every run authorizes afresh.
///
/// After authorization the loop alternates between a periodic poll of the
/// currently playing track and single-letter commands read from stdin.
pub async fn run(interval_secs: u64) {
    let credentials = Credentials {
        client_id: config::spotify_client_id(),
        client_secret: config::spotify_client_secret(),
        redirect_uri: config::spotify_redirect_uri(),
    };

    // start API server for the OAuth redirect
    let shared_state: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let server_state = Arc::clone(&shared_state);
    tokio::spawn(async move {
        start_api_server(server_state).await;
    });

    // Construct the authorization URL
    let auth_url = format!(
        "{spotify_auth_url}?client_id={client_id}&response_type=code&redirect_uri={redirect_uri}&scope={scope}",
        spotify_auth_url = &config::spotify_apiauth_url(),
        client_id = &credentials.client_id,
        redirect_uri = &credentials.redirect_uri,
        scope = &config::spotify_scope()
    );

    // Open the authorization URL in the default browser
    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    // wait for the redirect to deliver the one-time code
    let Some(code) = wait_for_code(shared_state).await else {
        error!("Authorization failed or timed out.");
    };

    let mut tokens = TokenManager::new(credentials, config::spotify_apitoken_url());
    if let Err(e) = tokens.acquire(&code).await {
        error!("Token exchange failed: {}", e);
    }
    success!("Authorized with Spotify.");

    let mut session = PlaybackSession::new(tokens, config::spotify_apiurl());
    let mut display = TermDisplay::new();

    poll_and_render(&mut session, &mut display).await;
    print_help();

    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    // the first tick completes immediately and the initial poll already ran
    ticker.tick().await;
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poll_and_render(&mut session, &mut display).await;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(input)) => {
                        if !handle_command(input.trim(), &mut session, &mut display).await {
                            break;
                        }
                    }
                    // stdin closed
                    _ => break,
                }
            }
        }
    }

    info!("Bye.");
}

/// Polls the shared state for the callback code, up to 60 seconds.
async fn wait_for_code(shared_state: Arc<Mutex<Option<String>>>) -> Option<String> {
    use std::time::Instant;

    let max_wait = Duration::from_secs(60);
    let start = Instant::now();

    while start.elapsed() < max_wait {
        let lock = shared_state.lock().await;
        if let Some(code) = lock.as_ref() {
            return Some(code.clone());
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

async fn poll_and_render(session: &mut PlaybackSession, display: &mut TermDisplay) {
    match session.fetch_current_track().await {
        Ok(TrackPoll::Playing(state)) => display.render(&state, RefreshScope::Full),
        Ok(TrackPoll::NothingPlaying) => info!("Nothing playing."),
        Err(e) => warning!("Poll failed: {}", e),
    }
}

/// Executes one stdin command. Returns false when the loop should exit.
async fn handle_command(
    input: &str,
    session: &mut PlaybackSession,
    display: &mut TermDisplay,
) -> bool {
    let mut parts = input.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    let arg = parts.next();

    match cmd {
        "" => {}
        "p" => {
            if let Err(e) = session.toggle_play_pause().await {
                warning!("Play/pause failed: {}", e);
            }
            display.render(session.state(), RefreshScope::Full);
        }
        "n" => {
            if let Err(e) = session.skip_forward().await {
                warning!("Skip failed: {}", e);
            }
            display.render(session.state(), RefreshScope::Full);
        }
        "b" => {
            if let Err(e) = session.skip_back().await {
                warning!("Skip failed: {}", e);
            }
            display.render(session.state(), RefreshScope::Full);
        }
        "l" => {
            let Some(track_id) = session.state().track.as_ref().map(|t| t.id.clone()) else {
                warning!("No track to like yet.");
                return true;
            };
            match session.toggle_liked(&track_id).await {
                Ok(()) => display.render(session.state(), RefreshScope::LikedOnly),
                Err(e) => warning!("Toggling liked failed: {}", e),
            }
        }
        "v" => match arg.and_then(|a| a.parse::<u8>().ok()) {
            Some(percent) if percent <= 100 => {
                if let Err(e) = session.set_volume(percent).await {
                    warning!("Setting volume failed: {}", e);
                } else {
                    display.render(session.state(), RefreshScope::Full);
                }
            }
            _ => warning!("Usage: v <0-100>"),
        },
        "a" => match arg {
            Some(context_uri) => {
                if let Err(e) = session.play_album(context_uri).await {
                    warning!("Starting album failed: {}", e);
                }
                display.render(session.state(), RefreshScope::Full);
            }
            None => warning!("Usage: a <context-uri>"),
        },
        "r" => {
            match session.fetch_current_track().await {
                Ok(TrackPoll::Playing(state)) => display.render(&state, RefreshScope::Full),
                Ok(TrackPoll::NothingPlaying) => info!("Nothing playing."),
                Err(e) => warning!("Poll failed: {}", e),
            };
        }
        "h" | "?" => print_help(),
        "q" => return false,
        other => warning!("Unknown command '{}'. Type h for help.", other),
    }

    true
}

fn print_help() {
    info!(
        "Commands: p play/pause | n next | b previous | l toggle liked | v <pct> volume | a <uri> play album | r refresh | h help | q quit"
    );
}
