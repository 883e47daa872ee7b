use std::time::Duration;

use color_eyre::Result;
use grbl_keel::actions::{Action, Response};
use pretty_assertions::assert_eq;

mod common;
use common::*;

const MOCK: &str = "mock:grbl";

async fn connect_mock() -> Result<Client> {
    let mut client = start_server_and_connect().await?;

    let response = send_receive(&mut client, &Action::connect(MOCK, None)).await?;
    assert_eq!(response, Response::Connected { port: MOCK.into() });

    Ok(client)
}

fn is_position(x: f64, y: f64) -> impl Fn(&Response) -> bool {
    move |response: &Response| *response == Response::Position { x, y }
}

#[tokio::test]
async fn banner_then_position() -> Result<()> {
    let mut client = connect_mock().await?;

    let response = receive(&mut client).await?;
    assert_eq!(
        response,
        Response::Status {
            text: "Grbl 1.1h ['$' for help]".into()
        }
    );

    let response = receive(&mut client).await?;
    assert_eq!(response, Response::Position { x: 0.0, y: 0.0 });

    Ok(())
}

#[tokio::test]
async fn positions_keep_coming() -> Result<()> {
    let mut client = connect_mock().await?;

    for _ in 0..5 {
        receive_until(&mut client, is_position(0.0, 0.0)).await?;
    }

    Ok(())
}

#[tokio::test]
async fn gcode_moves_the_machine() -> Result<()> {
    let mut client = connect_mock().await?;

    send(&mut client, &Action::gcode("G90 G0 X10 Y-2.5")).await?;
    receive_until(&mut client, is_position(10.0, -2.5)).await?;

    send(&mut client, &Action::gcode("G91")).await?;
    send(&mut client, &Action::gcode("G0 X1 Y1\n")).await?;
    receive_until(&mut client, is_position(11.0, -1.5)).await?;

    send(&mut client, &Action::gcode("$H")).await?;
    receive_until(&mut client, is_position(0.0, 0.0)).await?;

    Ok(())
}

#[tokio::test]
async fn successful_gcode_has_no_reply() -> Result<()> {
    let mut client = connect_mock().await?;

    send(&mut client, &Action::gcode("G0 X1")).await?;
    assert_no_reply(&mut client, Duration::from_millis(300)).await;

    Ok(())
}

#[tokio::test]
async fn firmware_errors_are_forwarded() -> Result<()> {
    let mut client = connect_mock().await?;

    send(&mut client, &Action::gcode("HELLO")).await?;

    let response = receive_until(&mut client, |r| matches!(r, Response::Error { .. })).await?;
    assert_eq!(
        response,
        Response::Error {
            text: "error:1".into()
        }
    );

    Ok(())
}

#[tokio::test]
async fn firmware_messages_are_status() -> Result<()> {
    let mut client = connect_mock().await?;

    send(&mut client, &Action::gcode("$I")).await?;

    let response = receive_until(&mut client, |r| {
        matches!(r, Response::Status { text } if text.starts_with('['))
    })
    .await?;
    assert_eq!(
        response,
        Response::Status {
            text: "[VER:1.1h.mock]".into()
        }
    );

    Ok(())
}

#[tokio::test]
async fn connect_disconnect_connect() -> Result<()> {
    let mut client = connect_mock().await?;

    send(&mut client, &Action::gcode("G0 X5 Y5")).await?;
    receive_until(&mut client, is_position(5.0, 5.0)).await?;

    let response = send_receive(&mut client, &Action::Disconnect).await?;
    assert_eq!(response, Response::Disconnected);

    let response = send_receive(&mut client, &Action::gcode("G0 X1")).await?;
    assert_eq!(
        response,
        Response::Error {
            text: "Not connected".into()
        }
    );

    // A fresh machine, back at the origin
    let response = send_receive(&mut client, &Action::connect(MOCK, None)).await?;
    assert_eq!(response, Response::Connected { port: MOCK.into() });
    receive_until(&mut client, is_position(0.0, 0.0)).await?;

    Ok(())
}

#[tokio::test]
async fn reconnect_replaces_the_session() -> Result<()> {
    let mut client = connect_mock().await?;

    send(&mut client, &Action::gcode("G0 X3")).await?;
    receive_until(&mut client, is_position(3.0, 0.0)).await?;

    let other = "mock:other";
    let response = send_receive(&mut client, &Action::connect(other, Some(9600))).await?;
    assert_eq!(response, Response::Connected { port: other.into() });
    receive_until(&mut client, is_position(0.0, 0.0)).await?;

    Ok(())
}

#[tokio::test]
async fn clients_have_their_own_machines() -> Result<()> {
    let port = start_server().await;

    let mut first = connect(port).await?;
    let mut second = connect(port).await?;

    for client in [&mut first, &mut second] {
        let response = send_receive(client, &Action::connect(MOCK, None)).await?;
        assert_eq!(response, Response::Connected { port: MOCK.into() });
    }

    send(&mut first, &Action::gcode("G0 X7")).await?;
    receive_until(&mut first, is_position(7.0, 0.0)).await?;

    // The second machine never moved
    for _ in 0..3 {
        receive_until(&mut second, |r| matches!(r, Response::Position { .. })).await?;
    }
    let response = receive_until(&mut second, |r| matches!(r, Response::Position { .. })).await?;
    assert_eq!(response, Response::Position { x: 0.0, y: 0.0 });

    Ok(())
}

#[tokio::test]
async fn closing_the_websocket_keeps_the_server_running() -> Result<()> {
    let port = start_server().await;

    let client = connect(port).await?;
    drop(client);

    let mut client = connect(port).await?;
    let response = send_receive(&mut client, &Action::connect(MOCK, None)).await?;
    assert_eq!(response, Response::Connected { port: MOCK.into() });

    Ok(())
}
