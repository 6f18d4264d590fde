mod support;

use std::time::Duration;

use tokio::time::Instant;

const POLL_DEADLINE: Duration = Duration::from_secs(10);
const POLL_PAUSE: Duration = Duration::from_millis(100);

async fn get_json(client: &reqwest::Client, url: &str) -> serde_json::Value {
    client
        .get(url)
        .send()
        .await
        .expect("request should succeed")
        .json()
        .await
        .expect("response should be JSON")
}

#[tokio::test]
async fn players_endpoint_serves_the_live_roster_with_provenance() {
    let (base_url, _console) = support::ensure_service();
    let client = reqwest::Client::new();
    let deadline = Instant::now() + POLL_DEADLINE;

    // The first player poll may still be in flight; retry briefly.
    loop {
        let body = get_json(&client, &format!("{base_url}/players")).await;
        if body["provenance"] == "live" {
            let players = body["players"].as_array().expect("players should be a list");
            assert_eq!(players.len(), 2);
            let names: Vec<&str> = players
                .iter()
                .map(|p| p["display_name"].as_str().expect("name should be a string"))
                .collect();
            assert!(names.contains(&"[ZERG] Moss"));
            assert!(names.contains(&"Ratte"));
            assert!(body["fetched_at_epoch_seconds"].as_u64().expect("timestamp") > 0);
            return;
        }
        assert!(
            Instant::now() < deadline,
            "roster never went live, last response: {body}"
        );
        tokio::time::sleep(POLL_PAUSE).await;
    }
}

#[tokio::test]
async fn telemetry_endpoint_reports_link_state_and_faction_counts() {
    let (base_url, _console) = support::ensure_service();
    let client = reqwest::Client::new();
    let deadline = Instant::now() + POLL_DEADLINE;

    loop {
        let body = get_json(&client, &format!("{base_url}/telemetry")).await;
        if body["link"] == "ready" && body["player_count"] == 2 {
            assert_eq!(body["counts_by_faction"]["ZERG"], 1);
            assert_eq!(body["counts_by_faction"]["unaffiliated"], 1);
            assert_eq!(body["provenance"], "live");
            assert!(body["kill_count"].is_u64());
            assert!(body["airdrop_active"].is_boolean());
            return;
        }
        assert!(
            Instant::now() < deadline,
            "telemetry never settled, last response: {body}"
        );
        tokio::time::sleep(POLL_PAUSE).await;
    }
}

#[tokio::test]
async fn pushed_kill_lines_show_up_in_the_event_log() {
    let (base_url, console) = support::ensure_service();
    let client = reqwest::Client::new();
    // A unique victim name isolates this test from other pushed lines.
    let marker = format!("Vex{}", uuid::Uuid::new_v4().simple());
    let line = format!("{marker}[76561198000000009] was killed by Ratte[76561198000000002]");
    let deadline = Instant::now() + POLL_DEADLINE;

    loop {
        // Re-pushed every round in case the push path was not yet live.
        console.push_notice(&line);
        tokio::time::sleep(POLL_PAUSE).await;

        let body = get_json(&client, &format!("{base_url}/events?limit=50")).await;
        let events = body.as_array().expect("events should be a list");
        let found = events.iter().any(|event| {
            event["kind"] == "kill"
                && event["participants"]
                    .as_array()
                    .is_some_and(|p| p.iter().any(|r| r["display_name"] == marker.as_str()))
        });
        if found {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "pushed kill never appeared, last response: {body}"
        );
    }
}

#[tokio::test]
async fn heat_endpoint_always_includes_the_landmark_baseline() {
    let (base_url, _console) = support::ensure_service();
    let client = reqwest::Client::new();

    let body = get_json(&client, &format!("{base_url}/heat")).await;
    let points = body.as_array().expect("heat should be a list");

    let landmarks = points
        .iter()
        .filter(|point| point["category"] == "landmark")
        .count();
    assert_eq!(landmarks, 5);
    for point in points {
        assert!(point["x"].is_number());
        assert!(point["y"].is_number());
        assert!(point["intensity"].as_f64().expect("intensity") > 0.0);
    }
}
