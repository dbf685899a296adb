//! Text codec for the shared chat channel.
//!
//! Requests are plain tagged lines: `[REQ]<opcode>|<dropId>|<requester>|...`.
//! Broadcasts are wrapped in a zero-size rich-text span so a generic chat
//! view renders them as nothing: `<size=0>[SYNC]<opcode>|<dropId>|...</size>`.
//!
//! Decoding never panics. A line with neither marker is unrelated traffic and
//! decodes to `Ok(None)`; a marked line that does not parse is a
//! [`DecodeError`].

use std::fmt::{Display, Write as _};

use crate::{
    errors::{DecodeError, Result},
    item::{ItemKind, ItemSnapshot, Position, Rarity, StatBonus},
    message::{Broadcast, BroadcastOpcode, DropSnapshot, Message, Request, RequestOpcode},
};

/// Prefix marking a client request.
pub const REQUEST_TAG: &str = "[REQ]";

/// Opening of the invisible broadcast wrapper.
pub const BROADCAST_OPEN: &str = "<size=0>";

/// Marker following [`BROADCAST_OPEN`].
pub const BROADCAST_TAG: &str = "[SYNC]";

/// Closing of the invisible broadcast wrapper.
pub const BROADCAST_CLOSE: &str = "</size>";

/// Field separator.
pub const SEPARATOR: char = '|';

/// Upper bound on bonuses per item, so a hostile count can't force a large
/// allocation.
pub const MAX_BONUSES: usize = 32;

impl Message {
    /// Encode for the chat channel.
    pub fn encode(&self) -> String {
        match self {
            Self::Request(request) => encode_request(request),
            Self::Broadcast(broadcast) => encode_broadcast(broadcast),
        }
    }

    /// Decode a chat line. See [`decode`].
    pub fn decode(line: &str) -> Result<Option<Self>> {
        decode(line)
    }
}

/// Pipe-joined field writer.
struct Encoder {
    buf: String,
    first: bool,
}

impl Encoder {
    fn new(prefix: &str) -> Self {
        Self { buf: prefix.to_string(), first: true }
    }

    fn field(&mut self, value: impl Display) -> &mut Self {
        if !self.first {
            self.buf.push(SEPARATOR);
        }
        self.first = false;
        // Writing into a String cannot fail.
        let _ = write!(self.buf, "{value}");
        self
    }

    fn flag(&mut self, value: bool) -> &mut Self {
        self.field(u8::from(value))
    }

    fn position(&mut self, position: &Position) -> &mut Self {
        self.field(position.x).field(position.y).field(position.z)
    }

    fn item(&mut self, item: &ItemSnapshot) -> &mut Self {
        self.field(item.item_id)
            .field(item.kind.code())
            .field(item.rarity.code())
            .field(item.stack)
            .field(item.upgrade_level)
            .field(item.bonuses.len());
        for bonus in &item.bonuses {
            self.field(bonus.stat).field(bonus.value);
        }
        self
    }

    fn finish(self) -> String {
        self.buf
    }
}

/// Encode a request line.
pub fn encode_request(request: &Request) -> String {
    let mut enc = Encoder::new(REQUEST_TAG);
    enc.field(request.opcode().as_str())
        .field(request.drop_id().unwrap_or(0))
        .field(request.requester());

    match request {
        Request::Pickup { .. } | Request::Share { .. } | Request::InstantDismantle { .. } => {},
        Request::DismantleTap { strength, .. } => {
            enc.field(strength);
        },
        Request::Drop { session, seq, item, position, .. } => {
            enc.field(session).field(seq).position(position).item(item);
        },
    }

    enc.finish()
}

/// Encode a broadcast line, wrapped so it renders invisibly.
pub fn encode_broadcast(broadcast: &Broadcast) -> String {
    let mut enc = Encoder::new(&format!("{BROADCAST_OPEN}{BROADCAST_TAG}"));
    enc.field(broadcast.opcode().as_str()).field(broadcast.drop_id());

    match broadcast {
        Broadcast::DropCreated(snapshot) => {
            enc.field(snapshot.revision)
                .field(snapshot.owner)
                .flag(snapshot.shared)
                .flag(snapshot.monster)
                .field(snapshot.progress)
                .position(&snapshot.position)
                .item(&snapshot.item);
        },
        Broadcast::ItemPickedUp { requester, .. } => {
            enc.field(requester);
        },
        Broadcast::ItemShared { revision, .. } => {
            enc.field(revision);
        },
        Broadcast::DismantleProgress { revision, progress, .. } => {
            enc.field(revision).field(progress);
        },
        Broadcast::ItemDismantled { reward, .. } => {
            enc.field(reward);
        },
    }

    let mut line = enc.finish();
    line.push_str(BROADCAST_CLOSE);
    line
}

/// Decode one chat line.
///
/// Returns `Ok(None)` for traffic that isn't ours.
pub fn decode(line: &str) -> Result<Option<Message>> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(body) = line.strip_prefix(REQUEST_TAG) {
        return decode_request(body).map(|r| Some(Message::Request(r)));
    }

    if let Some(rest) = line.strip_prefix(BROADCAST_OPEN) {
        // Someone else's zero-size markup.
        let Some(rest) = rest.strip_prefix(BROADCAST_TAG) else {
            return Ok(None);
        };
        let body = rest.strip_suffix(BROADCAST_CLOSE).ok_or(DecodeError::Unterminated)?;
        return decode_broadcast(body).map(|b| Some(Message::Broadcast(b)));
    }

    Ok(None)
}

/// Decode one chat line, logging and discarding anything malformed.
pub fn decode_lossy(line: &str) -> Option<Message> {
    match decode(line) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, line, "discarding malformed protocol message");
            None
        },
    }
}

fn decode_request(body: &str) -> Result<Request> {
    let mut fields = Fields::new(body);
    let name = fields.text("opcode")?;
    let opcode =
        RequestOpcode::parse(name).ok_or_else(|| DecodeError::UnknownOpcode(name.to_string()))?;
    let drop_id = fields.u64("drop_id")?;
    let requester = fields.u64("requester")?;

    let request = match opcode {
        RequestOpcode::Pickup => Request::Pickup { drop_id, requester },
        RequestOpcode::Share => Request::Share { drop_id, requester },
        RequestOpcode::Instant => Request::InstantDismantle { drop_id, requester },
        RequestOpcode::Tap => {
            let strength = fields.f32("strength")?;
            Request::DismantleTap { drop_id, requester, strength }
        },
        RequestOpcode::Drop => {
            if drop_id != 0 {
                return Err(DecodeError::InvalidField {
                    field: "drop_id",
                    value: drop_id.to_string(),
                });
            }
            let session = fields.u64("session")?;
            let seq = fields.u64("seq")?;
            let position = fields.position()?;
            let item = fields.item()?;
            Request::Drop { requester, session, seq, item, position }
        },
    };

    fields.finish()?;
    Ok(request)
}

fn decode_broadcast(body: &str) -> Result<Broadcast> {
    let mut fields = Fields::new(body);
    let name = fields.text("opcode")?;
    let opcode =
        BroadcastOpcode::parse(name).ok_or_else(|| DecodeError::UnknownOpcode(name.to_string()))?;
    let drop_id = fields.u64("drop_id")?;

    let broadcast = match opcode {
        BroadcastOpcode::Created => {
            let revision = fields.u64("revision")?;
            let owner = fields.u64("owner")?;
            let shared = fields.flag("shared")?;
            let monster = fields.flag("monster")?;
            let progress = fields.progress()?;
            let position = fields.position()?;
            let item = fields.item()?;
            Broadcast::DropCreated(DropSnapshot {
                drop_id,
                revision,
                owner,
                shared,
                monster,
                progress,
                position,
                item,
            })
        },
        BroadcastOpcode::PickedUp => {
            Broadcast::ItemPickedUp { drop_id, requester: fields.u64("requester")? }
        },
        BroadcastOpcode::Shared => {
            Broadcast::ItemShared { drop_id, revision: fields.u64("revision")? }
        },
        BroadcastOpcode::Progress => {
            let revision = fields.u64("revision")?;
            let progress = fields.progress()?;
            Broadcast::DismantleProgress { drop_id, revision, progress }
        },
        BroadcastOpcode::Dismantled => {
            Broadcast::ItemDismantled { drop_id, reward: fields.u64("reward")? }
        },
    };

    fields.finish()?;
    Ok(broadcast)
}

/// Cursor over pipe-separated fields.
struct Fields<'a> {
    inner: std::str::Split<'a, char>,
}

impl<'a> Fields<'a> {
    fn new(body: &'a str) -> Self {
        Self { inner: body.split(SEPARATOR) }
    }

    fn text(&mut self, field: &'static str) -> Result<&'a str> {
        self.inner.next().ok_or(DecodeError::MissingField(field))
    }

    fn parse<T: std::str::FromStr>(&mut self, field: &'static str) -> Result<T> {
        let raw = self.text(field)?;
        raw.parse().map_err(|_| DecodeError::InvalidField { field, value: raw.to_string() })
    }

    fn u64(&mut self, field: &'static str) -> Result<u64> {
        self.parse(field)
    }

    fn f32(&mut self, field: &'static str) -> Result<f32> {
        let raw = self.text(field)?;
        match raw.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(DecodeError::InvalidField { field, value: raw.to_string() }),
        }
    }

    fn progress(&mut self) -> Result<f32> {
        let value = self.f32("progress")?;
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(DecodeError::InvalidField { field: "progress", value: value.to_string() })
        }
    }

    fn flag(&mut self, field: &'static str) -> Result<bool> {
        match self.text(field)? {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(DecodeError::InvalidField { field, value: other.to_string() }),
        }
    }

    fn position(&mut self) -> Result<Position> {
        Ok(Position { x: self.f32("x")?, y: self.f32("y")?, z: self.f32("z")? })
    }

    fn item(&mut self) -> Result<ItemSnapshot> {
        let item_id = self.parse("item_id")?;

        let kind_raw = self.text("kind")?;
        let kind = ItemKind::from_code(kind_raw).ok_or_else(|| DecodeError::InvalidField {
            field: "kind",
            value: kind_raw.to_string(),
        })?;

        let rarity_code: u8 = self.parse("rarity")?;
        let rarity = Rarity::from_code(rarity_code).ok_or_else(|| DecodeError::InvalidField {
            field: "rarity",
            value: rarity_code.to_string(),
        })?;

        let stack = self.parse("stack")?;
        let upgrade_level = self.parse("upgrade_level")?;

        let count: usize = self.parse("bonus_count")?;
        if count > MAX_BONUSES {
            return Err(DecodeError::InvalidField {
                field: "bonus_count",
                value: count.to_string(),
            });
        }

        let mut bonuses = Vec::with_capacity(count);
        for _ in 0..count {
            let stat = self.parse("bonus_stat")?;
            let value = self.parse("bonus_value")?;
            bonuses.push(StatBonus { stat, value });
        }

        Ok(ItemSnapshot { item_id, kind, rarity, stack, upgrade_level, bonuses })
    }

    fn finish(mut self) -> Result<()> {
        let extra = self.inner.by_ref().count();
        if extra == 0 { Ok(()) } else { Err(DecodeError::TrailingFields(extra)) }
    }
}
