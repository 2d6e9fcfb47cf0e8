//! Socket-level tests: a real client session against a scripted room server.

use iso_client::{conn::TcpDialer, input::PointerEvent, Session};
use iso_shared::{
    math::{GridCell, GridPos},
    monster::{Facing, MonsterKind},
    net::{decode_from_bytes, encode_to_bytes, NetMsg},
    render::RecordingRenderer,
};
use iso_tests::{bind_ephemeral, init_tracing, player, pump_until, snapshot, test_map, within};

fn start(cfg: &iso_shared::config::ClientConfig) -> anyhow::Result<Session<RecordingRenderer>> {
    let dialer = TcpDialer::new(&cfg.server_addr, cfg.reconnect.connect_timeout())?;
    Ok(Session::start(cfg, dialer, RecordingRenderer::default()))
}

/// Outbound events carry the names and fields the room server expects.
#[test]
fn outbound_events_use_room_envelope() -> anyhow::Result<()> {
    let join = NetMsg::JoinRoom {
        name: "Ana".into(),
        monster: "goblin".into(),
    };
    let v: serde_json::Value = serde_json::from_slice(&encode_to_bytes(&join)?)?;
    assert_eq!(v["event"], "join_room");
    assert_eq!(v["data"]["monster"], "goblin");

    let mv: serde_json::Value =
        serde_json::from_slice(&encode_to_bytes(&NetMsg::MoveTo { x: 3, y: 7 })?)?;
    assert_eq!(mv, serde_json::json!({"event": "move_to", "data": {"x": 3, "y": 7}}));

    let inbound = br#"{"event":"player_joined","data":{"sid":"b","name":"Bia","monster":"golem","x":"4","y":2}}"#;
    match decode_from_bytes(inbound)? {
        NetMsg::PlayerJoined(p) => {
            assert_eq!((p.x, p.y), (4.0, 2.0));
            assert_eq!(p.monster.as_deref(), Some("golem"));
        }
        other => anyhow::bail!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn session_joins_and_entities_converge() -> anyhow::Result<()> {
    init_tracing();
    let (server, mut cfg) = bind_ephemeral().await?;
    cfg.player_name = "Ana".into();
    cfg.monster = "GOLEM".into();
    let mut session = start(&cfg)?;

    let mut client = server.accept_join().await?;
    assert_eq!(client.name, "Ana");
    assert_eq!(client.monster, "golem");

    client
        .conn
        .send(&snapshot(
            "me",
            test_map(16, 16),
            vec![
                player("me", "Ana", "golem", 2.0, 2.0),
                player("b", "Bia", "vampire", 8.0, 8.0),
            ],
        ))
        .await?;
    pump_until(&mut session, |s| s.world().registry().len() == 2).await?;
    assert_eq!(session.world().you(), Some("me"));
    assert_eq!(session.world().map().width(), 16);
    assert_eq!(session.world().map().decorations().len(), 2);

    client
        .conn
        .send(&NetMsg::PlayerMoved {
            sid: "b".into(),
            x: 11.0,
            y: 8.0,
        })
        .await?;
    pump_until(&mut session, |s| {
        s.world().registry().get("b").map(|e| e.target) == Some(GridPos::new(11.0, 8.0))
    })
    .await?;

    // One tick in: walking east.
    session.tick(1.0 / 60.0);
    let b = session.world().registry().get("b").cloned().unwrap();
    assert_eq!(b.facing, Facing::East);
    let sprite = session.world().render().sprite(b.sprite).unwrap();
    assert_eq!(sprite.playing.map(|k| k.to_string()).as_deref(), Some("vampire_walk_e"));

    for _ in 0..60 {
        session.tick(1.0 / 60.0);
    }
    let b = session.world().registry().get("b").cloned().unwrap();
    assert_eq!(b.current, GridPos::new(11.0, 8.0));
    assert_eq!(b.kind, MonsterKind::Vampire);
    let sprite = session.world().render().sprite(b.sprite).unwrap();
    assert_eq!(sprite.playing, None);
    assert_eq!(sprite.frame, MonsterKind::Vampire.def().idle_frame(Facing::East));
    assert_eq!(sprite.depth, 1000.0 + 19.0);

    client
        .conn
        .send(&NetMsg::PlayerLeft { sid: "b".into() })
        .await?;
    pump_until(&mut session, |s| s.world().registry().len() == 1).await?;
    assert_eq!(session.world().render().released, vec![b.sprite]);

    assert!(session.shutdown());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clicks_send_clamped_moves() -> anyhow::Result<()> {
    init_tracing();
    let (server, cfg) = bind_ephemeral().await?;
    let mut session = start(&cfg)?;
    let mut client = server.accept_join().await?;

    client
        .conn
        .send(&snapshot("me", test_map(8, 6), vec![player("me", "Ana", "wolf", 1.0, 1.0)]))
        .await?;
    pump_until(&mut session, |s| s.world().registry().len() == 1).await?;

    let origin = session.world().origin();
    let far = session
        .world()
        .projection()
        .grid_to_screen(GridPos::new(20.0, 3.0), origin);
    assert_eq!(
        session.click(PointerEvent::on_world(far.x, far.y)),
        Some(GridCell::new(7, 3))
    );
    assert_eq!(within(client.conn.recv()).await??, NetMsg::MoveTo { x: 7, y: 3 });

    session.focus_chat();
    assert!(!session.ui().game_keys_enabled());
    assert!(session.say("hi there"));
    assert_eq!(
        within(client.conn.recv()).await??,
        NetMsg::Chat {
            msg: "hi there".into()
        }
    );

    client
        .conn
        .send(&NetMsg::ChatMsg {
            sid: Some("me".into()),
            name: "Ana".into(),
            msg: "hi there".into(),
        })
        .await?;
    pump_until(&mut session, |s| {
        s.world()
            .chat()
            .last()
            .map(|l| l.name == "Ana" && l.msg == "hi there")
            .unwrap_or(false)
    })
    .await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reconnect_rejoins_the_room() -> anyhow::Result<()> {
    init_tracing();
    let (server, mut cfg) = bind_ephemeral().await?;
    cfg.player_name = "Ana".into();
    let mut session = start(&cfg)?;

    let mut first = server.accept_join().await?;
    first
        .conn
        .send(&snapshot("me", test_map(10, 10), vec![player("me", "Ana", "wolf", 2.0, 2.0)]))
        .await?;
    pump_until(&mut session, |s| s.world().registry().len() == 1).await?;
    drop(first);

    pump_until(&mut session, |s| !s.is_online()).await?;
    assert!(!session.move_to(GridCell::new(3, 3)));

    let mut second = server.accept_join().await?;
    assert_eq!(second.name, "Ana");
    pump_until(&mut session, |s| s.is_online()).await?;
    assert!(session.world().registry().is_empty());

    second
        .conn
        .send(&snapshot("me2", test_map(10, 10), vec![player("me2", "Ana", "wolf", 5.0, 5.0)]))
        .await?;
    pump_until(&mut session, |s| s.world().registry().len() == 1).await?;
    assert_eq!(session.world().you(), Some("me2"));

    let lines: Vec<String> = session.world().chat().lines().map(|l| l.msg.clone()).collect();
    let pos = |text: &str| lines.iter().position(|l| l == text);
    assert!(pos("Connected.").is_some());
    assert!(pos("Connection lost... reconnecting.") < pos("Reconnected!"));
    Ok(())
}
