/*!
# btcnet-rust

A client-side implementation of the Bitcoin peer-to-peer wire protocol.

The crate decodes and encodes the binary payloads exchanged with remote peers,
drives the VERSION/VERACK handshake, batches `getdata` requests and correlates
their replies, and keeps the small amount of shared protocol state a light
peer needs: the book of peers that completed a handshake and the set of live
network alerts.

Socket I/O, message framing (magic, command name, length, checksum) and the
connection pool are owned by a transport layer. The core consumes that layer's
[`TransportEvent`](networking::transport::TransportEvent)s and answers with
[`TransportCommand`](networking::transport::TransportCommand)s.

# Usage

```no_run
use btcnet_rust::networking::network::Network;
use btcnet_rust::settings::NetworkSettings;
use tokio::sync::mpsc;

# async fn example() -> btcnet_rust::Result<()> {
let (transport_sender, _transport_commands) = mpsc::unbounded_channel();
let (_transport_events_sender, transport_events) = mpsc::unbounded_channel();

let network = Network::new(NetworkSettings::default(), transport_sender)?;
let handle = network.handle();
let mut events = network.subscribe();

tokio::spawn(network.run(transport_events));
handle.launch(vec![]);
while let Ok(event) = events.recv().await {
    println!("{:?}", event);
}
# Ok(())
# }
```
*/
pub mod address_book;
pub mod alert_store;
pub mod crypto;
pub mod networking;
pub mod settings;
pub mod time;

#[cfg(test)]
mod test_setup;
#[cfg(test)]
mod test_utilities;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
