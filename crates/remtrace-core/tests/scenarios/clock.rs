use std::time::{Duration, SystemTime, UNIX_EPOCH};

use remtrace_core::{
    ClockOffset, ClockSyncError, ClockSyncOptions, SYNC_ROUNDS, sync_clock, sync_clock_with,
};
use test_log::test;

use crate::common::{FakeTransport, ScriptedClock, TimeService};

const BANNER: &str = "Press 't' to get a timestamp, 'q' to quit.\n";

/// Local send/receive times, one second apart per round.
fn rounds(rtts_ms: &[u64]) -> Vec<(SystemTime, SystemTime)> {
    let base = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    rtts_ms
        .iter()
        .enumerate()
        .map(|(i, rtt)| {
            let sent = base + Duration::from_secs(i as u64);
            (sent, sent + Duration::from_millis(*rtt))
        })
        .collect()
}

fn micros(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH).unwrap().as_micros()
}

fn service(responses: Vec<String>) -> TimeService {
    TimeService {
        banner: Some(BANNER.to_owned()),
        responses,
        exit_code: 0,
        hang: false,
    }
}

#[test(tokio::test)]
async fn best_round_trip_wins() {
    let rtts = [50, 40, 30, 20, 10, 15, 25, 35, 45, 55];
    let rounds = rounds(&rtts);

    // each round sees a different remote clock, so that the selected round
    // is identifiable from the offset
    let remote_times = rounds
        .iter()
        .enumerate()
        .map(|(i, (sent, _))| *sent - Duration::from_millis(200 + i as u64))
        .collect::<Vec<_>>();

    let responses = remote_times
        .iter()
        .map(|t| format!("{}\n", micros(*t)))
        .collect();

    let transport = FakeTransport::new().with_time_service(service(responses));
    let clock = ScriptedClock::from_rounds(&rounds);

    let res = sync_clock_with(&transport, &ClockSyncOptions::default(), &clock)
        .await
        .unwrap();

    assert_eq!(res.delta, Duration::from_millis(10));

    // round 5: midpoint of the round trip minus the remote timestamp
    let midpoint = rounds[4].0 + Duration::from_millis(5);
    let expected = midpoint.duration_since(remote_times[4]).unwrap();
    assert_eq!(res.offset, ClockOffset::from_nanos(expected.as_nanos() as i64));
    assert_eq!(res.offset.as_nanos(), 209_000_000);

    let mut expected_requests = vec![b't'; SYNC_ROUNDS];
    expected_requests.push(b'q');
    assert_eq!(transport.time_requests(), expected_requests);

    assert_eq!(transport.commands(), ["trace time"]);
}

#[test(tokio::test)]
async fn equal_round_trip_is_not_a_new_best() {
    let rtts = [10; SYNC_ROUNDS];
    let rounds = rounds(&rtts);

    let responses = rounds
        .iter()
        .enumerate()
        .map(|(i, (sent, _))| format!("{}\n", micros(*sent) - 1000 * i as u128))
        .collect();

    let transport = FakeTransport::new().with_time_service(service(responses));
    let clock = ScriptedClock::from_rounds(&rounds);

    let res = sync_clock_with(&transport, &ClockSyncOptions::default(), &clock)
        .await
        .unwrap();

    // only the first round is kept: local midpoint 5ms after the remote time
    assert_eq!(res.delta, Duration::from_millis(10));
    assert_eq!(res.offset.as_nanos(), 5_000_000);
}

#[test(tokio::test)]
async fn fractional_remote_timestamps() {
    let rounds = rounds(&[2; SYNC_ROUNDS]);

    let responses = rounds
        .iter()
        .map(|(sent, _)| format!("{}.5\n", micros(*sent)))
        .collect();

    let transport = FakeTransport::new().with_time_service(service(responses));
    let clock = ScriptedClock::from_rounds(&rounds);

    let res = sync_clock_with(&transport, &ClockSyncOptions::default(), &clock)
        .await
        .unwrap();

    assert_eq!(res.offset.as_nanos(), 1_000_000 - 500);
}

#[test(tokio::test)]
async fn malformed_timestamp_aborts() {
    let rounds = rounds(&[50, 40, 30, 20, 10, 15, 25, 35, 45, 55]);

    let mut responses = rounds
        .iter()
        .map(|(sent, _)| format!("{}\n", micros(*sent)))
        .collect::<Vec<_>>();
    responses[2] = "not-a-timestamp\n".to_owned();

    let transport = FakeTransport::new().with_time_service(service(responses));
    let clock = ScriptedClock::from_rounds(&rounds);

    let res = sync_clock_with(&transport, &ClockSyncOptions::default(), &clock).await;

    assert!(matches!(res, Err(ClockSyncError::Parse(line)) if line == "not-a-timestamp"));
    assert_eq!(transport.time_requests(), b"ttt");
}

#[test(tokio::test)]
async fn failed_termination_invalidates_result() {
    let rounds = rounds(&[10; SYNC_ROUNDS]);

    let responses = rounds
        .iter()
        .map(|(sent, _)| format!("{}\n", micros(*sent)))
        .collect();

    let transport = FakeTransport::new().with_time_service(TimeService {
        exit_code: 1,
        ..service(responses)
    });
    let clock = ScriptedClock::from_rounds(&rounds);

    let res = sync_clock_with(&transport, &ClockSyncOptions::default(), &clock).await;

    assert!(matches!(res, Err(ClockSyncError::RemoteExit(status)) if status.code() == Some(1)));
}

#[test(tokio::test)]
async fn missing_banner() {
    let transport = FakeTransport::new().with_time_service(TimeService {
        banner: None,
        responses: vec![],
        exit_code: 0,
        hang: false,
    });

    let res = sync_clock(&transport, &ClockSyncOptions::default()).await;

    assert!(matches!(res, Err(ClockSyncError::Eof)));
}

#[test(tokio::test)]
async fn early_end_of_output() {
    // the second response is cut short by the service closing its output
    let transport = FakeTransport::new().with_time_service(TimeService {
        banner: Some(BANNER.to_owned()),
        responses: vec!["1\n".to_owned(), "2".to_owned()],
        exit_code: 0,
        hang: false,
    });

    let res = sync_clock(&transport, &ClockSyncOptions::default()).await;

    assert!(matches!(res, Err(ClockSyncError::Eof)));
}

#[test(tokio::test(start_paused = true))]
async fn unresponsive_service_times_out() {
    let transport = FakeTransport::new().with_time_service(TimeService {
        hang: true,
        ..service(vec![])
    });

    let options = ClockSyncOptions {
        response_timeout: Some(Duration::from_secs(5)),
        ..ClockSyncOptions::default()
    };

    let res = sync_clock(&transport, &options).await;

    assert!(matches!(res, Err(ClockSyncError::Timeout(t)) if t == Duration::from_secs(5)));
}

#[test(tokio::test)]
async fn custom_time_service_command() {
    let transport = FakeTransport::new();

    let options = ClockSyncOptions {
        command: "trace time --verbose".to_owned(),
        ..ClockSyncOptions::default()
    };

    let res = sync_clock(&transport, &options).await;

    assert!(matches!(res, Err(ClockSyncError::Session(_))));
    assert_eq!(transport.commands(), ["trace time --verbose"]);
}
