use std::{net::SocketAddr, str::FromStr};

use anyhow::{Context as _, Error, Result, bail};
use tokio::{
    io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_stream::{StreamExt as _, wrappers::LinesStream};
use tracing::{debug, info, warn};

use crate::control::{Actuator, DeviceState, SharedDeviceState};

const QUEUE_CAPACITY: usize = 32;

/// A requested actuator transition, applied at the start of the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub actuator: Actuator,
    pub on: bool,
}

impl Command {
    pub fn apply(&self, state: &mut DeviceState) {
        state.set(self.actuator, self.on);
    }
}

/// One line received on the command interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Set(Command),
    Status,
}

impl FromStr for Request {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim().to_ascii_lowercase();
        let words: Vec<&str> = line.split_whitespace().collect();

        let set = |actuator, on| Ok(Request::Set(Command { actuator, on }));

        match words.as_slice() {
            ["status"] => Ok(Request::Status),
            ["on"] => set(Actuator::Relay, true),
            ["off"] => set(Actuator::Relay, false),
            ["arm"] => set(Actuator::Lock, true),
            ["disarm"] => set(Actuator::Lock, false),
            [actuator, state] => {
                let actuator: Actuator = actuator.parse()?;
                match *state {
                    "on" => set(actuator, true),
                    "off" => set(actuator, false),
                    _ => bail!("unknown state: {}", state),
                }
            }
            _ => bail!("unknown command: {}", s.trim()),
        }
    }
}

pub type CommandSender = mpsc::Sender<Command>;
pub type CommandReceiver = mpsc::Receiver<Command>;

pub fn command_queue() -> (CommandSender, CommandReceiver) {
    mpsc::channel(QUEUE_CAPACITY)
}

/// Accepts command connections until the listener fails.
pub async fn serve_commands(
    listener: TcpListener,
    commands: CommandSender,
    state: SharedDeviceState,
) -> Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("failed to accept command connection")?;
        debug!("command connection from {peer}");

        let commands = commands.clone();
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, peer, commands, state).await {
                warn!("command connection {peer} closed with error: {err:#}");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    commands: CommandSender,
    state: SharedDeviceState,
) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = LinesStream::new(BufReader::new(read).lines());

    while let Some(line) = lines.next().await {
        let line = line.context("failed to read command line")?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match line.parse::<Request>() {
            Ok(Request::Status) => {
                let snapshot = state.snapshot();
                serde_json::to_string(&snapshot).context("failed to serialize state")?
            }
            Ok(Request::Set(command)) => {
                info!("command from {peer}: {} {}", command.actuator, command.on);
                commands
                    .send(command)
                    .await
                    .context("command queue closed")?;
                "ok".to_string()
            }
            Err(err) => {
                warn!("ignoring command from {peer}: {err:#}");
                format!("error: {err}")
            }
        };

        write
            .write_all(format!("{reply}\n").as_bytes())
            .await
            .context("failed to write command reply")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _};

    use super::*;

    fn set(actuator: Actuator, on: bool) -> Request {
        Request::Set(Command { actuator, on })
    }

    #[test]
    fn bare_on_off_drive_the_relay() {
        assert_eq!("on".parse::<Request>().unwrap(), set(Actuator::Relay, true));
        assert_eq!("OFF\r".parse::<Request>().unwrap(), set(Actuator::Relay, false));
    }

    #[test]
    fn arm_and_disarm_drive_the_lock() {
        assert_eq!("ARM".parse::<Request>().unwrap(), set(Actuator::Lock, true));
        assert_eq!("DISARM".parse::<Request>().unwrap(), set(Actuator::Lock, false));
    }

    #[test]
    fn named_actuator() {
        assert_eq!("fan on".parse::<Request>().unwrap(), set(Actuator::Fan, true));
        assert_eq!("Light  off".parse::<Request>().unwrap(), set(Actuator::Light, false));
        assert_eq!("status".parse::<Request>().unwrap(), Request::Status);
    }

    #[test]
    fn unrecognized_commands_are_errors() {
        assert!("open the pod bay doors".parse::<Request>().is_err());
        assert!("heater on".parse::<Request>().is_err());
        assert!("fan maybe".parse::<Request>().is_err());
        assert!("".parse::<Request>().is_err());
    }

    #[tokio::test]
    async fn listener_queues_commands_and_reports_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = command_queue();
        let state = SharedDeviceState::new(DeviceState {
            fan: true,
            ..Default::default()
        });
        tokio::spawn(serve_commands(listener, tx, state));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut replies = BufReader::new(read).lines();

        write.write_all(b"light on\nbogus\nstatus\n").await.unwrap();

        assert_eq!(replies.next_line().await.unwrap().unwrap(), "ok");
        assert!(replies.next_line().await.unwrap().unwrap().starts_with("error:"));
        let status: DeviceState =
            serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
        assert!(status.fan);

        assert_eq!(
            rx.recv().await.unwrap(),
            Command {
                actuator: Actuator::Light,
                on: true
            }
        );
        assert!(rx.try_recv().is_err());
    }
}
