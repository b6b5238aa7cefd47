//! LEGACY (BungeeCord) and BUNGEEGUARD forwarding: both encode identity into
//! the handshake's `server_address` field as a set of `\0`-joined parts.
//! Grounded on the inverse of `valence_network::connect::login_bungeecord`,
//! which parses exactly this format on the receiving end.

use uuid::Uuid;

use crate::profile::Property;

/// Builds the `server_address` field the proxy sends in the backend-facing
/// handshake for LEGACY forwarding: `hostname\0client_ip\0uuid\0properties`.
pub fn encode_vhost(hostname: &str, client_ip: std::net::IpAddr, uuid: Uuid, properties: &[Property]) -> anyhow::Result<String> {
    let props_json = serde_json::to_string(properties)?;
    Ok(format!(
        "{hostname}\0{client_ip}\0{}\0{props_json}",
        uuid.simple()
    ))
}

/// BUNGEEGUARD forwarding is LEGACY plus a `bungeeguard-token` property
/// carrying the shared forwarding secret, which the backend is expected to
/// check and reject connections lacking.
pub fn encode_vhost_with_token(
    hostname: &str,
    client_ip: std::net::IpAddr,
    uuid: Uuid,
    properties: &[Property],
    token: &str,
) -> anyhow::Result<String> {
    let mut props = properties.to_vec();
    props.push(Property {
        name: "bungeeguard-token".to_owned(),
        value: token.to_owned(),
        signature: None,
    });
    encode_vhost(hostname, client_ip, uuid, &props)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_expected_shape() {
        let uuid = Uuid::parse_str("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap();
        let vhost = encode_vhost(
            "lobby.example.com",
            "203.0.113.5".parse().unwrap(),
            uuid,
            &[],
        )
        .unwrap();
        let parts: Vec<&str> = vhost.split('\0').collect();
        assert_eq!(parts[0], "lobby.example.com");
        assert_eq!(parts[1], "203.0.113.5");
        assert_eq!(parts[2], "069a79f444e94726a5befca90e38aaf5");
        assert_eq!(parts[3], "[]");
    }

    #[test]
    fn bungeeguard_appends_token_property() {
        let uuid = Uuid::nil();
        let vhost =
            encode_vhost_with_token("h", "127.0.0.1".parse().unwrap(), uuid, &[], "secret123")
                .unwrap();
        assert!(vhost.contains("bungeeguard-token"));
        assert!(vhost.contains("secret123"));
    }
}
