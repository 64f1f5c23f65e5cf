use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::blocking::Client;

use super::ScoreService;
use super::protocol::{ScoreStats, ScoreSubmission};

const USER_AGENT: &str = concat!("quote-along/", env!("CARGO_PKG_VERSION"));

enum Request {
    Submit(ScoreSubmission),
    FetchStats,
}

/// Score endpoint client running on a background worker thread.
///
/// Requests are queued and never block the caller; fetched stats come back
/// through [`ScoreService::poll_stats`].
pub struct HttpScoreService {
    requests: Sender<Request>,
    stats: Receiver<ScoreStats>,
}

impl HttpScoreService {
    /// Spawn the worker for the given base URL (`{base_url}/score`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;
        let endpoint = format!("{}/score", base_url.into().trim_end_matches('/'));

        let (requests, request_rx) = mpsc::channel();
        let (stats_tx, stats) = mpsc::channel();
        thread::Builder::new()
            .name("score-service".to_string())
            .spawn(move || worker(client, endpoint, request_rx, stats_tx))
            .context("Failed to spawn score service worker")?;

        Ok(Self { requests, stats })
    }
}

impl ScoreService for HttpScoreService {
    fn submit(&mut self, submission: ScoreSubmission) {
        if self.requests.send(Request::Submit(submission)).is_err() {
            warn!("score service worker is gone, submission dropped");
        }
    }

    fn request_stats(&mut self) {
        if self.requests.send(Request::FetchStats).is_err() {
            warn!("score service worker is gone, stats request dropped");
        }
    }

    fn poll_stats(&mut self) -> Option<ScoreStats> {
        self.stats.try_iter().last()
    }
}

fn worker(client: Client, endpoint: String, requests: Receiver<Request>, stats: Sender<ScoreStats>) {
    for request in requests {
        match request {
            Request::Submit(submission) => {
                if let Err(e) = post_score(&client, &endpoint, &submission) {
                    warn!("score submission failed: {:#}", e);
                }
            }
            Request::FetchStats => match fetch_stats(&client, &endpoint) {
                Ok(fetched) => {
                    if stats.send(fetched).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("score stats fetch failed: {:#}", e),
            },
        }
    }
    debug!("score service worker stopped");
}

fn post_score(client: &Client, endpoint: &str, submission: &ScoreSubmission) -> Result<()> {
    let response = client
        .post(endpoint)
        .json(submission)
        .send()
        .context("Failed to submit score")?;
    if !response.status().is_success() {
        warn!("score endpoint answered HTTP {}", response.status());
    }
    Ok(())
}

fn fetch_stats(client: &Client, endpoint: &str) -> Result<ScoreStats> {
    let response = client
        .get(endpoint)
        .send()
        .context("Failed to fetch score stats")?
        .error_for_status()
        .context("Score endpoint returned an error")?;
    response.json().context("Failed to parse score stats")
}
