/*!
# Bitcoin Wire Protocol Command Line Interface

Decode payloads the way the network core does, and show what this node would
send in its handshake.

## Usage

```bash
btcnetcli help [subcommand]
```

## Available subcommands

**decode**

parses one payload and prints the record as JSON

**version**

prints the `version` payload this node would send, as hex

## Example

```bash
btcnetcli decode --command ping --payload 0102030405060708
```
or
```bash
btcnetcli version --config config --remote 127.0.0.1:8333
```

## Dev

To run from source:

```bash
cargo run --bin btcnetcli -- decode -c inv -p 0101000000c0ffee...
```
*/
use btcnet_rust::networking::dispatcher::Dispatcher;
use btcnet_rust::networking::network::Network;
use btcnet_rust::settings::NetworkSettings;
use clap::{App, Arg};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::{event, Level};

#[tokio::main]
pub async fn main() -> btcnet_rust::Result<()> {
    tracing_subscriber::fmt::init();

    let command_matches = App::new("Bitcoin Wire Protocol Command Line Interface")
        .about("Decode Bitcoin network payloads and inspect the local handshake")
        .subcommand(
            App::new("decode")
                .about("parses a payload and prints it as JSON")
                .arg(
                    Arg::with_name("command")
                        .short("c")
                        .long("command")
                        .required(true)
                        .takes_value(true)
                        .help("command name, e.g. version or inv"),
                )
                .arg(
                    Arg::with_name("payload")
                        .short("p")
                        .long("payload")
                        .required(true)
                        .takes_value(true)
                        .help("payload as hex, without framing"),
                ),
        )
        .subcommand(
            App::new("version")
                .about("prints the version payload sent to a new peer")
                .arg(
                    Arg::with_name("config")
                        .short("c")
                        .long("config")
                        .takes_value(true)
                        .help("config file name"),
                )
                .arg(
                    Arg::with_name("remote")
                        .short("r")
                        .long("remote")
                        .default_value("127.0.0.1:8333")
                        .takes_value(true)
                        .help("address of the peer the version is for"),
                ),
        )
        .get_matches();

    if let Some(matches) = command_matches.subcommand_matches("decode") {
        let command = matches.value_of("command").unwrap_or_default();
        let payload = hex::decode(matches.value_of("payload").unwrap_or_default())?;

        let dispatcher = Dispatcher::new()?;
        match dispatcher.parse(command, &payload) {
            Ok(message) => println!("{}", serde_json::to_string_pretty(&message)?),
            Err(err) => {
                event!(Level::ERROR, "could not decode {}: {}", command, err);
                return Err(err.into());
            }
        }
    }

    if let Some(matches) = command_matches.subcommand_matches("version") {
        let settings = match matches.value_of("config") {
            Some(config_name) => NetworkSettings::load(config_name)?,
            None => NetworkSettings::default(),
        };
        let remote: SocketAddr = matches.value_of("remote").unwrap_or("127.0.0.1:8333").parse()?;

        let (transport_sender, _transport_commands) = mpsc::unbounded_channel();
        let network = Network::new(settings, transport_sender)?;
        let version = network.version_message(&remote);
        println!("{}", hex::encode(version.serialize()));
    }

    Ok(())
}
