//! Stand-in upstream for local runs: serves a fixed teams document on
//! `GET /api/teams` and bumps its `last_updated` marker on a timer, so a
//! PollCast server pointed at it sees a change every refresh period.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use clap::Parser;
use serde_json::{json, Map, Value};
use tokio::signal;
use tokio::sync::RwLock;

use lib_pollcast::loggers::setup_logging;

#[derive(Parser, Debug)]
#[clap(about = "Mock teams provider for PollCast", version)]
struct Args {
    #[clap(long, env = "MOCK_PORT", default_value_t = 5000, help = "Port to serve /api/teams on.")]
    port: u16,

    #[clap(long, env = "MOCK_REFRESH_SECS", default_value_t = 30, help = "Seconds between last_updated bumps.")]
    refresh_secs: u64,

    #[clap(long, env = "MOCK_LOG_DIR", default_value = "./logs", help = "Directory for log files.")]
    log_dir: PathBuf,

    #[clap(long, env = "MOCK_LOG_LEVEL", default_value = "info", help = "Logging level.")]
    log_level: String,
}

/// `(id, name, nickname, display_name, conference, division, logo)`
type Team = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

const GROUPS: &[(&str, &[Team])] = &[
    (
        "NCAAB",
        &[
            ("1", "Blue Devils", "DUKE", "Duke University", "ACC", "Atlantic", "https://upload.wikimedia.org/wikipedia/commons/e/e1/Duke_Athletics_logo.svg"),
            ("2", "Wildcats", "UK", "University of Kentucky", "SEC", "East", "https://upload.wikimedia.org/wikipedia/commons/b/b6/Kentucky_Wildcats_logo.svg"),
            ("3", "Tar Heels", "UNC", "University of North Carolina", "ACC", "Coastal", "https://upload.wikimedia.org/wikipedia/commons/d/d7/North_Carolina_Tar_Heels_logo.svg"),
            ("4", "Jayhawks", "KU", "University of Kansas", "Big 12", "None", "https://upload.wikimedia.org/wikipedia/commons/9/90/Kansas_Jayhawks_1946_logo.svg"),
            ("5", "Gonzaga Bulldogs", "ZAGS", "Gonzaga University", "WCC", "None", "https://upload.wikimedia.org/wikipedia/commons/b/bf/Gonzaga_Bulldogs_wordmark.svg"),
            ("6", "Spartans", "MSU", "Michigan State University", "Big Ten", "East", "https://upload.wikimedia.org/wikipedia/en/a/a7/Michigan_State_Athletics_logo.svg"),
        ],
    ),
    (
        "NCAAF",
        &[
            ("7", "Crimson Tide", "ALA", "University of Alabama", "SEC", "West", "https://upload.wikimedia.org/wikipedia/commons/1/12/Alabama_Athletics_logo.svg"),
            ("8", "Buckeyes", "OSU", "Ohio State University", "Big Ten", "East", "https://upload.wikimedia.org/wikipedia/commons/c/c1/Ohio_State_Buckeyes_logo.svg"),
            ("9", "Tigers", "LSU", "Louisiana State University", "SEC", "West", "https://upload.wikimedia.org/wikipedia/commons/4/4a/LSU_Athletics_logo.svg"),
            ("10", "Wolverines", "MICH", "University of Michigan", "Big Ten", "East", "https://upload.wikimedia.org/wikipedia/commons/f/fb/Michigan_Wolverines_logo.svg"),
            ("11", "Longhorns", "TEX", "University of Texas", "Big 12", "None", "https://upload.wikimedia.org/wikipedia/commons/8/8d/Texas_Longhorns_logo.svg"),
            ("12", "Trojans", "USC", "University of Southern California", "Pac-12", "South", "https://upload.wikimedia.org/wikipedia/commons/9/94/USC_Trojans_logo.svg"),
        ],
    ),
    (
        "NFL",
        &[
            ("13", "Vikings", "MIN", "Minnesota", "NFC", "North", "https://upload.wikimedia.org/wikipedia/en/4/48/Minnesota_Vikings_logo.svg"),
            ("14", "Packers", "GB", "Green Bay", "NFC", "North", "https://upload.wikimedia.org/wikipedia/commons/5/50/Green_Bay_Packers_logo.svg"),
            ("15", "Chiefs", "KC", "Kansas City", "AFC", "West", "https://upload.wikimedia.org/wikipedia/en/e/e1/Kansas_City_Chiefs_logo.svg"),
            ("16", "Cowboys", "DAL", "Dallas", "NFC", "East", "https://upload.wikimedia.org/wikipedia/commons/1/15/Dallas_Cowboys.svg"),
            ("17", "Eagles", "PHI", "Philadelphia", "NFC", "East", "https://upload.wikimedia.org/wikipedia/en/8/8e/Philadelphia_Eagles_logo.svg"),
            ("18", "49ers", "SF", "San Francisco", "NFC", "West", "https://upload.wikimedia.org/wikipedia/commons/3/3a/San_Francisco_49ers_logo.svg"),
            ("19", "Bills", "BUF", "Buffalo", "AFC", "East", "https://upload.wikimedia.org/wikipedia/en/7/77/Buffalo_Bills_logo.svg"),
        ],
    ),
    (
        "UFL",
        &[
            ("20", "Battlehawks", "STL", "St. Louis", "XFL", "None", "https://upload.wikimedia.org/wikipedia/en/9/9c/St._Louis_Battlehawks_logo.png"),
            ("21", "Brahmas", "SA", "San Antonio", "XFL", "None", "https://upload.wikimedia.org/wikipedia/en/2/22/San_Antonio_Brahmas_logo.png"),
            ("22", "Defenders", "DC", "Washington", "XFL", "None", "https://upload.wikimedia.org/wikipedia/commons/a/aa/DC_Defenders_logo.png"),
            ("23", "Roughnecks", "HOU", "Houston", "XFL", "None", "https://upload.wikimedia.org/wikipedia/en/d/d9/Houston_Roughnecks_logo_%282022%29.png"),
        ],
    ),
    (
        "USFL",
        &[
            ("24", "Stallions", "BIRM", "Birmingham", "USFL", "None", "https://upload.wikimedia.org/wikipedia/en/9/9a/Birmingham_Stallions_logo.svg"),
            ("25", "Generals", "NJ", "New Jersey", "USFL", "None", "https://upload.wikimedia.org/wikipedia/en/0/02/New_Jersey_Generals_logo.svg"),
            ("26", "Stars", "PHI", "Philadelphia", "USFL", "None", "https://upload.wikimedia.org/wikipedia/en/5/5c/Philadelphia_Stars_logo.svg"),
            ("27", "Panthers", "MICH", "Michigan", "USFL", "None", "https://upload.wikimedia.org/wikipedia/en/7/71/Michigan_Panthers_transparent.png"),
        ],
    ),
];

fn now_marker() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn teams_document() -> Value {
    let mut doc = Map::new();
    doc.insert("last_updated".to_string(), now_marker());
    for (group, teams) in GROUPS {
        let rows = teams
            .iter()
            .map(|(id, name, nickname, display_name, conference, division, logo)| {
                json!({
                    "id": id,
                    "name": name,
                    "nickname": nickname,
                    "display_name": display_name,
                    "conference": conference,
                    "division": division,
                    "logo": logo,
                })
            })
            .collect();
        doc.insert(group.to_string(), Value::Array(rows));
    }
    Value::Object(doc)
}

async fn teams(State(doc): State<Arc<RwLock<Value>>>) -> Json<Value> {
    Json(doc.read().await.clone())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_dir, &args.log_level, "server_mock")?;

    let doc = Arc::new(RwLock::new(teams_document()));

    let refresher = Arc::clone(&doc);
    let period = Duration::from_secs(args.refresh_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            let marker = now_marker();
            if let Some(map) = refresher.write().await.as_object_mut() {
                map.insert("last_updated".to_string(), marker.clone());
            }
            log::info!("Data updated at {}", marker);
        }
    });

    let app = Router::new().route("/api/teams", get(teams)).with_state(doc);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    log::info!("Mock provider listening on http://{}/api/teams", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            log::info!("Ctrl-C received, shutting down.");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_pollcast::core::Snapshot;

    #[test]
    fn test_teams_document_is_a_valid_feed_with_full_records() {
        let doc = teams_document();
        let snapshot = Snapshot::from_document(doc.clone()).unwrap();

        let mut groups: Vec<&str> = snapshot.group_names().collect();
        groups.sort_unstable();
        assert_eq!(groups, vec!["NCAAB", "NCAAF", "NFL", "UFL", "USFL"]);

        for group in groups {
            for team in snapshot.group(group).unwrap() {
                for field in ["id", "name", "nickname", "display_name", "conference", "division", "logo"] {
                    let value = team[field].as_str().unwrap_or_default();
                    assert!(!value.is_empty(), "{} record {} lacks {}", group, team["id"], field);
                }
                assert!(team["logo"].as_str().unwrap().starts_with("https://"));
            }
        }
    }
}
