//! Maps `(state, direction, version)` to a packet id and back, for the
//! small set of packets the proxy interprets. Everything not listed here
//! is looked up via [`Registry::is_known`] only, and otherwise forwarded as
//! an opaque [`crate::decode::PacketFrame`].

use crate::{PacketSide, PacketState};

/// A closed interval of protocol version numbers a particular packet id is
/// valid for. Protocol version numbers are the integers Mojang assigns per
/// release (e.g. 47 for 1.8, 765 for 1.20.1); within this proxy they are
/// compared as plain `i32`s, which is a total order matching release order
/// closely enough for every packet this registry tracks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VersionRange {
    pub min: i32,
    pub max: i32,
}

impl VersionRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub const fn at_least(min: i32) -> Self {
        Self { min, max: i32::MAX }
    }

    pub fn contains(self, version: i32) -> bool {
        (self.min..=self.max).contains(&version)
    }

    fn overlaps(self, other: VersionRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

/// One entry in the registry: a packet kind known by name, valid for a
/// given id across a given version range.
#[derive(Copy, Clone, Debug)]
pub struct RegistryEntry {
    pub name: &'static str,
    pub state: PacketState,
    pub side: PacketSide,
    pub id: i32,
    pub versions: VersionRange,
}

/// Protocol version above which the Configuration state exists at all
/// (1.20.2).
pub const CONFIGURATION_STATE_SINCE: i32 = 764;

/// Protocol version above which clients accept the modern, NBT-registry
/// `JoinGame`/`Respawn` layout this crate models (1.16, release 735, used
/// here as the boundary between "needs a throwaway-dimension `JoinGame`
/// pair" and "can use `Respawn` directly").
pub const RESPAWN_CAPABLE_SINCE: i32 = 735;

macro_rules! entries {
    ($($name:ident, $state:expr, $side:expr, $id:expr, $versions:expr;)*) => {
        pub static ENTRIES: &[RegistryEntry] = &[
            $(RegistryEntry {
                name: stringify!($name),
                state: $state,
                side: $side,
                id: $id,
                versions: $versions,
            }),*
        ];
    };
}

entries! {
    HandshakeC2s, PacketState::Handshake, PacketSide::Serverbound, 0x00, VersionRange::at_least(0);

    StatusRequestC2s, PacketState::Status, PacketSide::Serverbound, 0x00, VersionRange::at_least(0);
    StatusResponseS2c, PacketState::Status, PacketSide::Clientbound, 0x00, VersionRange::at_least(0);
    PingC2s, PacketState::Status, PacketSide::Serverbound, 0x01, VersionRange::at_least(0);
    PongS2c, PacketState::Status, PacketSide::Clientbound, 0x01, VersionRange::at_least(0);

    LoginHelloC2s, PacketState::Login, PacketSide::Serverbound, 0x00, VersionRange::at_least(0);
    LoginDisconnectS2c, PacketState::Login, PacketSide::Clientbound, 0x00, VersionRange::at_least(0);
    LoginHelloS2c, PacketState::Login, PacketSide::Clientbound, 0x01, VersionRange::at_least(0);
    LoginKeyC2s, PacketState::Login, PacketSide::Serverbound, 0x01, VersionRange::at_least(0);
    LoginSuccessS2c, PacketState::Login, PacketSide::Clientbound, 0x02, VersionRange::at_least(0);
    LoginCompressionS2c, PacketState::Login, PacketSide::Clientbound, 0x03, VersionRange::at_least(0);
    LoginQueryRequestS2c, PacketState::Login, PacketSide::Clientbound, 0x04, VersionRange::at_least(0);
    LoginQueryResponseC2s, PacketState::Login, PacketSide::Serverbound, 0x02, VersionRange::at_least(0);
    LoginAcknowledgedC2s, PacketState::Login, PacketSide::Serverbound, 0x03, VersionRange::at_least(CONFIGURATION_STATE_SINCE);

    FinishConfigurationS2c, PacketState::Configuration, PacketSide::Clientbound, 0x02, VersionRange::at_least(CONFIGURATION_STATE_SINCE);
    FinishConfigurationC2s, PacketState::Configuration, PacketSide::Serverbound, 0x02, VersionRange::at_least(CONFIGURATION_STATE_SINCE);

    JoinGameS2c, PacketState::Play, PacketSide::Clientbound, 0x28, VersionRange::at_least(0);
    RespawnS2c, PacketState::Play, PacketSide::Clientbound, 0x41, VersionRange::at_least(0);
    DisconnectS2c, PacketState::Play, PacketSide::Clientbound, 0x1a, VersionRange::at_least(0);
    KeepAliveS2c, PacketState::Play, PacketSide::Clientbound, 0x23, VersionRange::at_least(0);
    KeepAliveC2s, PacketState::Play, PacketSide::Serverbound, 0x14, VersionRange::at_least(0);
    PluginMessageS2c, PacketState::Play, PacketSide::Clientbound, 0x17, VersionRange::at_least(0);
    PluginMessageC2s, PacketState::Play, PacketSide::Serverbound, 0x0c, VersionRange::at_least(0);
}

/// Returns the entry, if any, for a packet id observed in the given
/// `(state, side, version)` triple.
pub fn lookup(state: PacketState, side: PacketSide, version: i32, id: i32) -> Option<&'static RegistryEntry> {
    ENTRIES
        .iter()
        .find(|e| e.state == state && e.side == side && e.id == id && e.versions.contains(version))
}

/// Finds the current id for a named packet kind at the given version. Used
/// when the proxy must *synthesize* a packet (e.g. `FinishConfigurationS2c`)
/// rather than just re-frame one it decoded.
pub fn id_for(name: &str, state: PacketState, side: PacketSide, version: i32) -> Option<i32> {
    ENTRIES
        .iter()
        .find(|e| e.name == name && e.state == state && e.side == side && e.versions.contains(version))
        .map(|e| e.id)
}

/// Startup validation: no two entries for the same `(state, side, id)` may
/// have overlapping version ranges, since that would make the id→kind
/// lookup ambiguous. Returns the offending pair's names on failure.
pub fn check_no_overlaps() -> Result<(), (String, String)> {
    for (i, a) in ENTRIES.iter().enumerate() {
        for b in &ENTRIES[i + 1..] {
            if a.state == b.state && a.side == b.side && a.id == b.id && a.versions.overlaps(b.versions) {
                return Err((a.name.to_owned(), b.name.to_owned()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_overlapping_ranges() {
        assert!(check_no_overlaps().is_ok());
    }

    #[test]
    fn looks_up_login_success() {
        let entry = lookup(PacketState::Login, PacketSide::Clientbound, 765, 0x02).unwrap();
        assert_eq!(entry.name, "LoginSuccessS2c");
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(lookup(PacketState::Play, PacketSide::Clientbound, 765, 0x7f).is_none());
    }
}
