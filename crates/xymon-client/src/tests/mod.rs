//! Client and dispatcher behaviour over a mocked transport.

use std::io;

use mockall::mock;
use rstest::rstest;

use crate::{
    Arguments, ClientError, Client, Color, Criteria, DispatchMode, Dispatcher, Reply, ReplyMode,
    Sender, Target, Transport,
};

mock! {
    Wire {}
    impl Transport for Wire {
        fn exchange(
            &self,
            target: &Target,
            payload: &[u8],
            reply: ReplyMode,
        ) -> Result<String, ClientError>;
    }
}

fn target(host: &str) -> Target {
    Target::new(host, 1984)
}

fn refused(target: &Target) -> ClientError {
    ClientError::Connect {
        target: target.clone(),
        source: io::Error::from(io::ErrorKind::ConnectionRefused),
    }
}

/// A transport where every host answers `pong` except `down`, which refuses connections.
fn fleet_wire() -> MockWire {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .times(3)
        .returning(|target, _payload, _reply| {
            if target.host() == "down" {
                Err(refused(target))
            } else {
                Ok(format!("pong from {}", target.host()))
            }
        });
    wire
}

#[test]
fn status_line_starts_with_verb_target_and_colour() {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .once()
        .withf(|target, payload, reply| {
            let line = String::from_utf8_lossy(payload);
            target.host() == "xymon"
                && *reply == ReplyMode::Await
                && line.starts_with("status h.t red Message generated by monitor at ")
                && line.ends_with("\ndisk full")
        })
        .returning(|_, _, _| Ok(String::new()));

    let client = Client::with_transport(target("xymon"), wire).with_sender(Sender::new("monitor"));
    client
        .status("h", "t", Color::Red, "disk full")
        .expect("status is sent");
}

#[test]
fn board_with_fields_decodes_rows() {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .once()
        .withf(|_, payload, _| payload == b"xymondboard color=red fields=hostname,testname")
        .returning(|_, _, _| Ok(String::from("a|b\nc|d")));

    let client = Client::with_transport(target("xymon"), wire);
    let reply = client
        .xymondboard(Some(Criteria::from("color=red")), &["hostname", "testname"])
        .expect("board is fetched");
    assert_eq!(
        reply,
        Reply::Rows(vec![
            vec![String::from("a"), String::from("b")],
            vec![String::from("c"), String::from("d")],
        ])
    );
}

#[test]
fn board_without_fields_decodes_lines() {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .once()
        .returning(|_, _, _| Ok(String::from("h1|t1|green\nh2|t2|red\n")));

    let client = Client::with_transport(target("xymon"), wire);
    let reply = client
        .call("xymondboard", &Arguments::new())
        .expect("board is fetched");
    assert_eq!(
        reply,
        Reply::Lines(vec![String::from("h1|t1|green"), String::from("h2|t2|red")])
    );
}

#[test]
fn ghostlist_skips_malformed_records() {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .once()
        .withf(|target, payload, reply| {
            target.host() == "xymon" && payload == b"ghostlist" && *reply == ReplyMode::Await
        })
        .returning(|_, _, _| {
            Ok(String::from(
                "host1|10.0.0.1|1700000000\nBADLINE\nhost2|10.0.0.2|1700000100",
            ))
        });

    let client = Client::with_transport(target("xymon"), wire);
    let ghosts = client.ghostlist().expect("ghostlist is fetched");
    let hosts: Vec<&str> = ghosts.iter().map(|ghost| ghost.hostname.as_str()).collect();
    assert_eq!(hosts, ["host1", "host2"]);
}

#[rstest]
#[case("notify", Arguments::new().with("hostname", "h").with("testname", "t"), ReplyMode::Blind)]
#[case("query", Arguments::new().with("hostname", "h").with("testname", "t"), ReplyMode::Await)]
#[case("schedule", Arguments::new(), ReplyMode::Await)]
fn blind_clients_only_skip_report_replies(
    #[case] name: &str,
    #[case] arguments: Arguments,
    #[case] expected: ReplyMode,
) {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .once()
        .withf(move |_, _, reply| *reply == expected)
        .returning(|_, _, _| Ok(String::new()));

    let client =
        Client::with_transport(target("xymon"), wire).with_reply_mode(ReplyMode::Blind);
    client.call(name, &arguments).expect("call succeeds");
}

#[rstest]
#[case("client", Arguments::new().with("hostname", "h").with("ostype", "linux"))]
#[case("pullclient", Arguments::new())]
#[case("query", Arguments::new().with("hostname", "h"))]
fn invalid_calls_never_reach_the_transport(#[case] name: &str, #[case] arguments: Arguments) {
    let client = Client::with_transport(target("xymon"), MockWire::new());
    assert!(client.call(name, &arguments).is_err());
}

#[rstest]
#[case(DispatchMode::Sequential)]
#[case(DispatchMode::Concurrent)]
fn dispatch_isolates_failing_targets(#[case] mode: DispatchMode) {
    let dispatcher =
        Dispatcher::with_transport([target("a"), target("down"), target("c")], fleet_wire())
            .with_mode(mode);

    let results = dispatcher.invoke(|client| client.ping());

    assert_eq!(results.len(), 3);
    assert_eq!(
        results.get(&target("a")).map(|outcome| outcome.as_deref().ok()),
        Some(Some("pong from a"))
    );
    assert_eq!(
        results.get(&target("c")).map(|outcome| outcome.as_deref().ok()),
        Some(Some("pong from c"))
    );
    let failure = results.get(&target("down")).expect("failing target is present");
    assert!(matches!(failure, Err(err) if err.is_connection_error()));
}

#[test]
fn dispatch_modes_produce_identical_maps() {
    let render = |mode| {
        Dispatcher::with_transport([target("c"), target("down"), target("a")], fleet_wire())
            .with_mode(mode)
            .execute(&crate::Command::Ping)
            .into_iter()
            .map(|(target, outcome)| (target.to_string(), outcome.map_err(|err| err.to_string())))
            .collect::<Vec<_>>()
    };
    assert_eq!(
        render(DispatchMode::Sequential),
        render(DispatchMode::Concurrent)
    );
}

#[rstest]
#[case(DispatchMode::Sequential)]
#[case(DispatchMode::Concurrent)]
fn panicking_worker_is_recorded_for_its_target(#[case] mode: DispatchMode) {
    let dispatcher =
        Dispatcher::with_transport([target("a"), target("b"), target("c")], MockWire::new())
            .with_mode(mode);

    let results = dispatcher.invoke(|client| {
        assert_ne!(client.target().host(), "b", "worker gives up");
        Ok(client.target().host().to_owned())
    });

    assert_eq!(results.len(), 3);
    for host in ["a", "c"] {
        assert_eq!(
            results.get(&target(host)).map(|outcome| outcome.as_deref().ok()),
            Some(Some(host)),
            "{mode} run for {host}"
        );
    }
    assert!(matches!(
        results.get(&target("b")),
        Some(Err(ClientError::WorkerPanicked { target })) if target.host() == "b"
    ));
}

#[test]
fn dispatcher_exposes_its_configuration() {
    let dispatcher =
        Dispatcher::with_transport([target("b"), target("a"), target("b")], MockWire::new())
            .with_sender(Sender::new("monitor"))
            .with_mode(DispatchMode::Concurrent);

    assert_eq!(dispatcher.targets(), [target("a"), target("b")]);
    assert_eq!(dispatcher.mode(), DispatchMode::Concurrent);
    assert_eq!(dispatcher.sender().as_str(), "monitor");
}

#[test]
fn client_report_carries_sender_and_target() {
    let client = Client::with_transport(target("xymon"), MockWire::new())
        .with_sender(Sender::new("monitor"));

    let report = client.report("h", "t", Color::Yellow, "slow");

    assert_eq!(client.target(), &target("xymon"));
    assert_eq!(client.sender().as_str(), "monitor");
    assert_eq!(report.color, Color::Yellow);
    assert!(report.headline.starts_with("Message generated by monitor at "));
}

#[test]
fn dispatcher_rejects_arguments_before_fan_out() {
    let dispatcher = Dispatcher::with_transport([target("a"), target("b")], MockWire::new());
    let error = dispatcher
        .call("status", &Arguments::new().with("hostname", "h"))
        .expect_err("missing arguments are rejected");
    assert!(error.is_argument_error());
}
