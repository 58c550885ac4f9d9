/*!

# Networking Interfaces and Methods

## Introduction

Peers on the Bitcoin network exchange messages: a command name and a binary
payload. The transport frames each message and hands this crate the command
name and the unframed payload; outgoing messages travel the same way.

All integers are little-endian except address ports, which are big-endian.

## Primitives

```bytes
varint      < 0xFD: the value itself
            0xFD + u16, 0xFE + u32, 0xFF + u64
varstring   varint length, then one byte per character
address     [u32 timestamp] [u64 services] 16-byte host, u16 port (big-endian)
```

An address is 30 bytes in `addr`, 26 bytes (no timestamp) in `version` and
18 bytes (host and port alone) elsewhere. IPv4 hosts are written behind the
`::ffff:` prefix.

## Messages

### version

```bytes
0-3         version (i32)
4-11        services
12-19       time
20-45       addr_recv (26-byte address)
46-71       addr_from (26-byte address)
72-79       nonce
80..        client (varstring), height (i32), [relay (u8)]
```

### verack, getaddr

Empty.

### addr

varint count, then count 30-byte addresses.

### inv, notfound, getdata

varint count, then count × (type: u32, hash: 32 bytes). Type 1 is a
transaction, 2 a block, anything else unknown.

### getblocks, getheaders

version (i32), varint count of 32-byte locator hashes, 32-byte hash_stop.

### headers

varint count, then count × (version, prev_block, merkle_root, timestamp (u32),
bits, nonce, varint tx count).

### tx

version, varint-counted inputs (outpoint hash, outpoint index, varbytes
script, sequence), varint-counted outputs (value: u64, varbytes script),
lock_time. The identifier is SHA-256 applied twice to the payload.

### alert

varbytes message, varbytes signature. A version 1 message holds relay_until,
expiration, uuid, cancel, cancel_set, min/max version, subversion_set,
priority, comment, status_bar and reserved bytes.

### ping, pong

An 8-byte nonce. A pong echoes the ping's nonce.

*/

pub mod builder;
pub mod command;
pub mod cursor;
pub mod dispatcher;
pub mod events;
pub mod getdata;
pub mod handlers;
pub mod handshake;
pub mod message_types;
pub mod net_address;
pub mod network;
pub mod peer;
pub mod timers;
pub mod transport;
